use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde_json::json;

use crate::entities::{event_entity as events, gift_entity as gifts};
use crate::error::{AppError, AppResult};
use crate::models::{BulkIngestResponse, GiftInventoryRow, NewAuditLog};
use crate::services::AuditLogService;
use crate::utils;
use std::sync::Arc;

#[derive(Clone)]
pub struct GiftService {
    pool: Arc<DatabaseConnection>,
    audit_log_service: AuditLogService,
}

impl GiftService {
    pub fn new(
        pool: impl Into<Arc<DatabaseConnection>>,
        audit_log_service: AuditLogService,
    ) -> Self {
        Self {
            pool: pool.into(),
            audit_log_service,
        }
    }

    pub async fn find_all(&self) -> AppResult<Vec<gifts::Model>> {
        Ok(gifts::Entity::find()
            .order_by(gifts::Column::CreatedAt, Order::Desc)
            .all(self.pool.as_ref())
            .await?)
    }

    pub async fn find_one(&self, gift_id: i64) -> AppResult<gifts::Model> {
        gifts::Entity::find_by_id(gift_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("Gift not found".to_string()))
    }

    /// 用户认领礼品
    /// 认领写入是针对 claimed=false 的条件更新，并发竞争时
    /// 只有一个请求能命中，失败方拿到与顺序场景一致的错误
    pub async fn claim(&self, gift_id: i64, user_id: i64) -> AppResult<gifts::Model> {
        let txn = self.pool.begin().await?;

        let gift = gifts::Entity::find_by_id(gift_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Gift not found".to_string()))?;
        if gift.claimed {
            return Err(AppError::Forbidden("Gift already claimed".to_string()));
        }

        let qr_code = utils::render_data_url(&utils::gift_payload(gift.id));
        let now = Utc::now();

        let update = gifts::Entity::update_many()
            .col_expr(gifts::Column::Claimed, Expr::value(true))
            .col_expr(gifts::Column::ClaimedBy, Expr::value(user_id))
            .col_expr(gifts::Column::QrCode, Expr::value(qr_code))
            .col_expr(gifts::Column::UpdatedAt, Expr::value(now))
            .filter(gifts::Column::Id.eq(gift.id))
            .filter(gifts::Column::Claimed.eq(false))
            .exec(&txn)
            .await?;
        if update.rows_affected == 0 {
            return Err(AppError::Forbidden("Gift already claimed".to_string()));
        }

        let claimed = gifts::Entity::find_by_id(gift.id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Gift not found".to_string()))?;

        self.audit_log_service
            .create_log_in(
                &txn,
                NewAuditLog {
                    action: "gift_claimed".to_string(),
                    user_id: Some(user_id),
                    target: Some(gift.id.to_string()),
                    metadata: Some(json!({
                        "event": gift.event_id,
                        "giftName": gift.name.clone(),
                    })),
                    ..Default::default()
                },
            )
            .await?;

        txn.commit().await?;
        Ok(claimed)
    }

    /// 机构核销已认领的礼品
    /// 核销写入与活动计数器更新在同一事务内:
    /// - collected_at 仅在已认领且未核销时写入（条件更新）
    /// - gifts_redeemed +1 / gifts_unredeemed -1
    pub async fn redeem(&self, gift_id: i64, organization_id: i64) -> AppResult<gifts::Model> {
        let txn = self.pool.begin().await?;

        let gift = gifts::Entity::find_by_id(gift_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Gift not found".to_string()))?;
        if !gift.claimed {
            return Err(AppError::Forbidden(
                "Gift must be claimed before redemption".to_string(),
            ));
        }
        if gift.is_redeemed() {
            return Err(AppError::Forbidden("Gift already redeemed".to_string()));
        }

        let now = Utc::now();
        let update = gifts::Entity::update_many()
            .col_expr(gifts::Column::CollectedAt, Expr::value(now))
            .col_expr(gifts::Column::RedeemedBy, Expr::value(organization_id))
            .col_expr(gifts::Column::UpdatedAt, Expr::value(now))
            .filter(gifts::Column::Id.eq(gift.id))
            .filter(gifts::Column::Claimed.eq(true))
            .filter(gifts::Column::CollectedAt.is_null())
            .exec(&txn)
            .await?;
        if update.rows_affected == 0 {
            return Err(AppError::Forbidden("Gift already redeemed".to_string()));
        }

        events::Entity::update_many()
            .col_expr(
                events::Column::GiftsRedeemed,
                Expr::col(events::Column::GiftsRedeemed).add(1),
            )
            .col_expr(
                events::Column::GiftsUnredeemed,
                Expr::col(events::Column::GiftsUnredeemed).sub(1),
            )
            .col_expr(events::Column::UpdatedAt, Expr::value(now))
            .filter(events::Column::Id.eq(gift.event_id))
            .exec(&txn)
            .await?;

        let redeemed = gifts::Entity::find_by_id(gift.id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Gift not found".to_string()))?;

        self.audit_log_service
            .create_log_in(
                &txn,
                NewAuditLog {
                    action: "gift_redeemed".to_string(),
                    organization_id: Some(organization_id),
                    target: Some(gift.id.to_string()),
                    metadata: Some(json!({
                        "event": gift.event_id,
                        "giftName": gift.name.clone(),
                        "claimedBy": gift.claimed_by,
                    })),
                    ..Default::default()
                },
            )
            .await?;

        txn.commit().await?;
        Ok(redeemed)
    }

    /// 批量导入礼品库存（电子表格已由上游解析为行）
    /// 缺名称或数量非正的行静默跳过；全部写入与
    /// gifts_unredeemed 计数更新在同一事务内。
    /// 瓦片互动计数器不受库存导入影响。
    pub async fn bulk_ingest(
        &self,
        event_id: i64,
        rows: Vec<GiftInventoryRow>,
    ) -> AppResult<BulkIngestResponse> {
        if rows.is_empty() {
            return Err(AppError::ValidationError(
                "No gift rows provided".to_string(),
            ));
        }

        let event = events::Entity::find_by_id(event_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        let txn = self.pool.begin().await?;

        let mut created = Vec::new();
        let mut total_quantity: i64 = 0;
        for row in &rows {
            let Some((name, quantity)) = row.normalized() else {
                continue;
            };
            let gift = gifts::ActiveModel {
                event_id: Set(event.id),
                name: Set(name),
                quantity: Set(quantity),
                claimed: Set(false),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            total_quantity += quantity;
            created.push(gift);
        }

        if total_quantity > 0 {
            events::Entity::update_many()
                .col_expr(
                    events::Column::GiftsUnredeemed,
                    Expr::col(events::Column::GiftsUnredeemed).add(total_quantity),
                )
                .col_expr(events::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(events::Column::Id.eq(event.id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        Ok(BulkIngestResponse {
            message: format!("{} gifts uploaded successfully", created.len()),
            gifts: created.into_iter().map(Into::into).collect(),
            total_quantity,
        })
    }

    /// 用户的认领记录
    pub async fn user_gift_history(&self, user_id: i64) -> AppResult<Vec<gifts::Model>> {
        Ok(gifts::Entity::find()
            .filter(gifts::Column::ClaimedBy.eq(user_id))
            .order_by(gifts::Column::CreatedAt, Order::Desc)
            .all(self.pool.as_ref())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EventStatus, audit_log_entity as audit_logs};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn service(db: DatabaseConnection) -> GiftService {
        let db = std::sync::Arc::new(db);
        GiftService::new(db.clone(), AuditLogService::new(db))
    }

    fn gift(id: i64, claimed: bool, collected: bool) -> gifts::Model {
        gifts::Model {
            id,
            event_id: 1,
            name: "Gift Card".to_string(),
            quantity: 1,
            claimed,
            claimed_by: claimed.then_some(7),
            qr_code: claimed.then(|| utils::render_data_url("gift:1")),
            collected_at: collected.then(Utc::now),
            redeemed_by: collected.then_some(3),
            created_at: None,
            updated_at: None,
        }
    }

    fn event(id: i64) -> events::Model {
        events::Model {
            id,
            title: "Summer Festival".to_string(),
            description: None,
            date: Utc::now(),
            organization_id: 3,
            qr_code: None,
            instructions: None,
            terms_and_conditions: None,
            tile_background_image: None,
            total_tiles: 0,
            successful_deeps: 0,
            gifts_redeemed: 0,
            gifts_unredeemed: 0,
            status: EventStatus::Active,
            created_at: None,
            updated_at: None,
        }
    }

    fn audit_log(action: &str) -> audit_logs::Model {
        audit_logs::Model {
            id: 1,
            action: action.to_string(),
            user_id: None,
            organization_id: None,
            target: None,
            metadata: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn claim_rejects_unknown_gift() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<gifts::Model>::new()])
            .into_connection();

        let err = service(db).claim(1, 7).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn claim_rejects_already_claimed_gift() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![gift(1, true, false)]])
            .into_connection();

        let err = service(db).claim(1, 7).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg == "Gift already claimed"));
    }

    #[tokio::test]
    async fn claim_loser_of_race_gets_already_claimed() {
        // 读取时未认领，但条件更新没有命中任何行（另一请求抢先）
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![gift(1, false, false)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let err = service(db).claim(1, 7).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg == "Gift already claimed"));
    }

    #[tokio::test]
    async fn claim_sets_owner_and_qr_code() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![gift(1, false, false)], vec![gift(1, true, false)]])
            .append_query_results([vec![audit_log("gift_claimed")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let claimed = service(db).claim(1, 7).await.unwrap();
        assert!(claimed.claimed);
        assert_eq!(claimed.claimed_by, Some(7));
        assert_eq!(claimed.qr_code, Some(utils::render_data_url("gift:1")));
    }

    #[tokio::test]
    async fn redeem_requires_prior_claim() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![gift(1, false, false)]])
            .into_connection();

        let err = service(db).redeem(1, 3).await.unwrap_err();
        assert!(
            matches!(err, AppError::Forbidden(msg) if msg == "Gift must be claimed before redemption")
        );
    }

    #[tokio::test]
    async fn redeem_rejects_second_redemption() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![gift(1, true, true)]])
            .into_connection();

        let err = service(db).redeem(1, 3).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg == "Gift already redeemed"));
    }

    #[tokio::test]
    async fn redeem_marks_gift_collected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![gift(1, true, false)], vec![gift(1, true, true)]])
            .append_query_results([vec![audit_log("gift_redeemed")]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        let redeemed = service(db).redeem(1, 3).await.unwrap();
        assert!(redeemed.is_redeemed());
        assert_eq!(redeemed.redeemed_by, Some(3));
    }

    #[tokio::test]
    async fn bulk_ingest_rejects_empty_input() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = service(db).bulk_ingest(1, Vec::new()).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn bulk_ingest_skips_incomplete_rows() {
        let mut ingested = gift(5, false, false);
        ingested.name = "A".to_string();
        ingested.quantity = 5;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1)]])
            .append_query_results([vec![ingested]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let rows = vec![
            GiftInventoryRow {
                name: Some("A".to_string()),
                quantity: Some(5),
            },
            GiftInventoryRow {
                name: Some("B".to_string()),
                quantity: None,
            },
            GiftInventoryRow {
                name: None,
                quantity: Some(3),
            },
        ];
        let res = service(db).bulk_ingest(1, rows).await.unwrap();
        assert_eq!(res.gifts.len(), 1);
        assert_eq!(res.total_quantity, 5);
        assert_eq!(res.message, "1 gifts uploaded successfully");
    }
}
