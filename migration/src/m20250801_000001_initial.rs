use sea_orm_migration::prelude::*;
use sea_orm_migration::prelude::extension::postgres::Type;

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    Country,
    AdminEmail,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Phone,
    DeviceId,
    IsVerified,
    TermsAccepted,
    TermsAcceptedAt,
    CreatedAt,
    UpdatedAt,
}

/// Events (活动表)
/// 计数器说明:
/// - total_tiles / successful_deeps: 瓦片互动统计，仅由完成参与流程时递增
/// - gifts_redeemed / gifts_unredeemed: 礼品库存统计，由导入与核销维护
#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    Title,
    Description,
    Date,
    OrganizationId,
    QrCode,
    Instructions,
    TermsAndConditions,
    TileBackgroundImage,
    TotalTiles,
    SuccessfulDeeps,
    GiftsRedeemed,
    GiftsUnredeemed,
    Status,
    CreatedAt,
    UpdatedAt,
}

/// Event Participations (用户活动参与记录)
/// tiles_interacted 按 (event, user) 维度记录，避免多个活动共享同一计数
#[derive(DeriveIden)]
enum EventParticipations {
    Table,
    Id,
    EventId,
    UserId,
    TilesInteracted,
    StartedAt,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Gifts {
    Table,
    Id,
    EventId,
    Name,
    Quantity,
    Claimed,
    ClaimedBy,
    QrCode,
    CollectedAt,
    RedeemedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    Action,
    UserId,
    OrganizationId,
    Target,
    Metadata,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("event_status"))
                    .values(vec![
                        Alias::new("active"),
                        Alias::new("completed"),
                        Alias::new("cancelled"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organizations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organizations::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Organizations::Country).string_len(100).null())
                    .col(ColumnDef::new(Organizations::AdminEmail).string_len(255).null())
                    .col(
                        ColumnDef::new(Organizations::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Organizations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Phone)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::DeviceId).string_len(255).null())
                    .col(
                        ColumnDef::new(Users::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::TermsAccepted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::TermsAcceptedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Events::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Events::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Events::Description).text().null())
                    .col(
                        ColumnDef::new(Events::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Events::OrganizationId).big_integer().not_null())
                    .col(ColumnDef::new(Events::QrCode).text().null())
                    .col(ColumnDef::new(Events::Instructions).text().null())
                    .col(ColumnDef::new(Events::TermsAndConditions).text().null())
                    .col(ColumnDef::new(Events::TileBackgroundImage).text().null())
                    .col(
                        ColumnDef::new(Events::TotalTiles)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Events::SuccessfulDeeps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Events::GiftsRedeemed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Events::GiftsUnredeemed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Events::Status)
                            .custom(Alias::new("event_status"))
                            .not_null()
                            .default("'active'"),
                    )
                    .col(
                        ColumnDef::new(Events::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Events::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_events_organization")
                            .from(Events::Table, Events::OrganizationId)
                            .to(Organizations::Table, Organizations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_events_organization_id")
                    .table(Events::Table)
                    .col(Events::OrganizationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EventParticipations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventParticipations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EventParticipations::EventId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventParticipations::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventParticipations::TilesInteracted)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventParticipations::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventParticipations::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EventParticipations::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EventParticipations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_participations_event")
                            .from(EventParticipations::Table, EventParticipations::EventId)
                            .to(Events::Table, Events::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_participations_user")
                            .from(EventParticipations::Table, EventParticipations::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一用户同一活动只允许一条参与记录
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_event_participations_event_user")
                    .table(EventParticipations::Table)
                    .col(EventParticipations::EventId)
                    .col(EventParticipations::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Gifts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Gifts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Gifts::EventId).big_integer().not_null())
                    .col(ColumnDef::new(Gifts::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Gifts::Quantity).big_integer().not_null())
                    .col(
                        ColumnDef::new(Gifts::Claimed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Gifts::ClaimedBy).big_integer().null())
                    .col(ColumnDef::new(Gifts::QrCode).text().null())
                    .col(
                        ColumnDef::new(Gifts::CollectedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Gifts::RedeemedBy).big_integer().null())
                    .col(
                        ColumnDef::new(Gifts::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Gifts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_gifts_event")
                            .from(Gifts::Table, Gifts::EventId)
                            .to(Events::Table, Events::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_gifts_claimed_by")
                            .from(Gifts::Table, Gifts::ClaimedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_gifts_redeemed_by")
                            .from(Gifts::Table, Gifts::RedeemedBy)
                            .to(Organizations::Table, Organizations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_gifts_event_id")
                    .table(Gifts::Table)
                    .col(Gifts::EventId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_gifts_claimed_by")
                    .table(Gifts::Table)
                    .col(Gifts::ClaimedBy)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogs::Action).string_len(100).not_null())
                    .col(ColumnDef::new(AuditLogs::UserId).big_integer().null())
                    .col(ColumnDef::new(AuditLogs::OrganizationId).big_integer().null())
                    .col(ColumnDef::new(AuditLogs::Target).string_len(255).null())
                    .col(ColumnDef::new(AuditLogs::Metadata).json_binary().null())
                    .col(
                        ColumnDef::new(AuditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_logs_action")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::Action)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_audit_logs_created_at")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Gifts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EventParticipations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("event_status")).to_owned())
            .await?;
        Ok(())
    }
}
