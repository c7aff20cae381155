use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, Set, TransactionTrait,
};
use serde_json::json;

use crate::entities::{
    event_entity as events, event_participation_entity as participations, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AcceptTermsResponse, CompleteParticipationResponse, InteractTilesResponse, NewAuditLog,
    ParticipationSnapshot, ParticipationStatusResponse, ParticipationStep,
    StartParticipationResponse, UserParticipationStatus, derive_current_step,
};
use crate::services::AuditLogService;
use crate::utils;
use std::sync::Arc;

#[derive(Clone)]
pub struct ParticipationService {
    pool: Arc<DatabaseConnection>,
    audit_log_service: AuditLogService,
    required_tile_count: i64,
}

impl ParticipationService {
    pub fn new(
        pool: impl Into<Arc<DatabaseConnection>>,
        audit_log_service: AuditLogService,
        required_tile_count: i64,
    ) -> Self {
        Self {
            pool: pool.into(),
            audit_log_service,
            required_tile_count,
        }
    }

    /// 开始参与活动
    /// 参与记录在此创建，是记录参与关系的唯一入口
    pub async fn start(
        &self,
        event_id: i64,
        user_id: i64,
    ) -> AppResult<StartParticipationResponse> {
        let event = self.find_event(event_id).await?;
        if !event.is_active() {
            return Err(AppError::ValidationError("Event is not active".to_string()));
        }

        let user = self.find_user(user_id).await?;

        let existing = participations::Entity::find()
            .filter(participations::Column::EventId.eq(event.id))
            .filter(participations::Column::UserId.eq(user.id))
            .one(self.pool.as_ref())
            .await?;
        if existing.is_some() {
            return Err(AppError::ValidationError(
                "User already participated in this event".to_string(),
            ));
        }

        participations::ActiveModel {
            event_id: Set(event.id),
            user_id: Set(user.id),
            tiles_interacted: Set(0),
            started_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await?;

        self.audit_log_service
            .create_log(NewAuditLog {
                action: "event_participation_started".to_string(),
                user_id: Some(user.id),
                target: Some(event.id.to_string()),
                metadata: Some(json!({ "eventTitle": event.title.clone() })),
                ..Default::default()
            })
            .await?;

        let message = format!(
            "Welcome to {}! Please read the terms and conditions to continue.",
            event.title
        );
        Ok(StartParticipationResponse {
            event: event.into(),
            step: ParticipationStep::Welcome,
            message,
        })
    }

    /// 同意条款（账号级状态，重复调用自然幂等）
    pub async fn accept_terms(&self, event_id: i64, user_id: i64) -> AppResult<AcceptTermsResponse> {
        let event = self.find_event(event_id).await?;
        let user = self.find_user(user_id).await?;

        let user_id = user.id;
        let mut am = user.into_active_model();
        am.terms_accepted = Set(true);
        am.terms_accepted_at = Set(Some(Utc::now()));
        am.updated_at = Set(Some(Utc::now()));
        am.update(self.pool.as_ref()).await?;

        self.audit_log_service
            .create_log(NewAuditLog {
                action: "terms_accepted".to_string(),
                user_id: Some(user_id),
                target: Some(event.id.to_string()),
                metadata: Some(json!({ "eventTitle": event.title.clone() })),
                ..Default::default()
            })
            .await?;

        let terms = event
            .terms_and_conditions
            .unwrap_or_else(|| "No terms and conditions specified.".to_string());
        Ok(AcceptTermsResponse {
            step: ParticipationStep::Tiles,
            message: "Terms accepted! Now interact with the tiles to claim your gift.".to_string(),
            terms,
        })
    }

    /// 瓦片互动，计数按 (event, user) 维度累加
    pub async fn interact_with_tiles(
        &self,
        event_id: i64,
        user_id: i64,
        tile_count: i64,
    ) -> AppResult<InteractTilesResponse> {
        if tile_count < 1 {
            return Err(AppError::ValidationError(
                "Tile count must be at least 1".to_string(),
            ));
        }

        let event = self.find_event(event_id).await?;
        let user = self.find_user(user_id).await?;
        if !user.terms_accepted {
            return Err(AppError::ValidationError(
                "Terms must be accepted before interacting with tiles".to_string(),
            ));
        }

        let txn = self.pool.begin().await?;

        let participation = self.ensure_participation(&txn, event.id, user.id).await?;
        let previous_tiles = participation.tiles_interacted;
        let new_tiles = previous_tiles + tile_count;

        // 原子自增，并发互动不会丢计数
        participations::Entity::update_many()
            .col_expr(
                participations::Column::TilesInteracted,
                Expr::col(participations::Column::TilesInteracted).add(tile_count),
            )
            .col_expr(participations::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(participations::Column::Id.eq(participation.id))
            .exec(&txn)
            .await?;

        self.audit_log_service
            .create_log_in(
                &txn,
                NewAuditLog {
                    action: "tiles_interacted".to_string(),
                    user_id: Some(user.id),
                    target: Some(event.id.to_string()),
                    metadata: Some(json!({
                        "eventTitle": event.title.clone(),
                        "tilesInteracted": new_tiles,
                        "previousTiles": previous_tiles,
                    })),
                    ..Default::default()
                },
            )
            .await?;

        txn.commit().await?;

        if new_tiles >= self.required_tile_count {
            Ok(InteractTilesResponse {
                step: ParticipationStep::Success,
                message: "Congratulations! You have successfully completed the event.".to_string(),
                tiles_interacted: new_tiles,
                total_tiles: self.required_tile_count,
            })
        } else {
            Ok(InteractTilesResponse {
                step: ParticipationStep::Tiles,
                message: format!("Great! You've interacted with {new_tiles} tiles. Keep going!"),
                tiles_interacted: new_tiles,
                total_tiles: self.required_tile_count,
            })
        }
    }

    /// 完成参与:
    /// 1. 校验条款已同意、瓦片达标、未曾完成
    /// 2. 条件更新写入完成时间（同一记录只允许完成一次）
    /// 3. 活动计数器 total_tiles / successful_deeps 各 +1
    /// 4. 生成核销二维码负载并写审计日志
    /// 全部写入在同一事务内提交
    pub async fn complete(
        &self,
        event_id: i64,
        user_id: i64,
    ) -> AppResult<CompleteParticipationResponse> {
        let event = self.find_event(event_id).await?;
        let user = self.find_user(user_id).await?;
        if !user.terms_accepted {
            return Err(AppError::ValidationError(
                "Terms must be accepted before completing the event".to_string(),
            ));
        }

        let participation = participations::Entity::find()
            .filter(participations::Column::EventId.eq(event.id))
            .filter(participations::Column::UserId.eq(user.id))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| self.insufficient_tiles_error())?;
        if participation.is_completed() {
            return Err(AppError::ValidationError(
                "User already completed this event".to_string(),
            ));
        }
        if participation.tiles_interacted < self.required_tile_count {
            return Err(self.insufficient_tiles_error());
        }

        let completed_at = Utc::now();
        let txn = self.pool.begin().await?;

        let update = participations::Entity::update_many()
            .col_expr(participations::Column::CompletedAt, Expr::value(completed_at))
            .col_expr(participations::Column::UpdatedAt, Expr::value(completed_at))
            .filter(participations::Column::Id.eq(participation.id))
            .filter(participations::Column::CompletedAt.is_null())
            .exec(&txn)
            .await?;
        if update.rows_affected == 0 {
            // 并发完成的竞争失败方
            return Err(AppError::ValidationError(
                "User already completed this event".to_string(),
            ));
        }

        events::Entity::update_many()
            .col_expr(
                events::Column::TotalTiles,
                Expr::col(events::Column::TotalTiles).add(1),
            )
            .col_expr(
                events::Column::SuccessfulDeeps,
                Expr::col(events::Column::SuccessfulDeeps).add(1),
            )
            .col_expr(events::Column::UpdatedAt, Expr::value(completed_at))
            .filter(events::Column::Id.eq(event.id))
            .exec(&txn)
            .await?;

        let updated_event = events::Entity::find_by_id(event.id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        let qr_code = utils::render_data_url(&utils::completion_payload(event.id, user.id));

        self.audit_log_service
            .create_log_in(
                &txn,
                NewAuditLog {
                    action: "event_completed".to_string(),
                    user_id: Some(user.id),
                    target: Some(event.id.to_string()),
                    metadata: Some(json!({
                        "eventTitle": event.title.clone(),
                        "tilesInteracted": participation.tiles_interacted,
                        "completionTime": completed_at,
                    })),
                    ..Default::default()
                },
            )
            .await?;

        txn.commit().await?;

        Ok(CompleteParticipationResponse {
            success: true,
            message: "Event completed successfully! You can now redeem your gift using the QR code."
                .to_string(),
            event: updated_event.into(),
            qr_code,
        })
    }

    /// 查询参与状态（纯读取，展示步骤按规则表派生）
    pub async fn status(
        &self,
        event_id: i64,
        user_id: i64,
    ) -> AppResult<ParticipationStatusResponse> {
        let event = self.find_event(event_id).await?;
        let user = self.find_user(user_id).await?;

        let participation = participations::Entity::find()
            .filter(participations::Column::EventId.eq(event.id))
            .filter(participations::Column::UserId.eq(user.id))
            .one(self.pool.as_ref())
            .await?;

        let snapshot = ParticipationSnapshot {
            has_participated: participation.is_some(),
            has_completed: participation
                .as_ref()
                .map(participations::Model::is_completed)
                .unwrap_or(false),
            terms_accepted: user.terms_accepted,
            tiles_interacted: participation
                .as_ref()
                .map(|p| p.tiles_interacted)
                .unwrap_or(0),
        };
        let current_step = derive_current_step(&snapshot, self.required_tile_count);

        Ok(ParticipationStatusResponse {
            event: event.into(),
            user_status: UserParticipationStatus {
                has_participated: snapshot.has_participated,
                has_completed: snapshot.has_completed,
                terms_accepted: snapshot.terms_accepted,
                tiles_interacted: snapshot.tiles_interacted,
                current_step,
            },
        })
    }

    fn insufficient_tiles_error(&self) -> AppError {
        AppError::ValidationError(format!(
            "Must interact with at least {} tiles to complete the event",
            self.required_tile_count
        ))
    }

    async fn find_event(&self, event_id: i64) -> AppResult<events::Model> {
        events::Entity::find_by_id(event_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    async fn find_user(&self, user_id: i64) -> AppResult<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn ensure_participation(
        &self,
        txn: &DatabaseTransaction,
        event_id: i64,
        user_id: i64,
    ) -> AppResult<participations::Model> {
        if let Some(p) = participations::Entity::find()
            .filter(participations::Column::EventId.eq(event_id))
            .filter(participations::Column::UserId.eq(user_id))
            .one(txn)
            .await?
        {
            return Ok(p);
        }
        let p = participations::ActiveModel {
            event_id: Set(event_id),
            user_id: Set(user_id),
            tiles_interacted: Set(0),
            started_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        Ok(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EventStatus, audit_log_entity as audit_logs};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn service(db: DatabaseConnection) -> ParticipationService {
        let db = std::sync::Arc::new(db);
        ParticipationService::new(db.clone(), AuditLogService::new(db), 3)
    }

    fn event(id: i64, status: EventStatus) -> events::Model {
        events::Model {
            id,
            title: "Summer Festival".to_string(),
            description: None,
            date: Utc::now(),
            organization_id: 1,
            qr_code: None,
            instructions: None,
            terms_and_conditions: None,
            tile_background_image: None,
            total_tiles: 0,
            successful_deeps: 0,
            gifts_redeemed: 0,
            gifts_unredeemed: 0,
            status,
            created_at: None,
            updated_at: None,
        }
    }

    fn user(id: i64, terms_accepted: bool) -> users::Model {
        users::Model {
            id,
            phone: format!("+100000000{id}"),
            device_id: None,
            is_verified: true,
            terms_accepted,
            terms_accepted_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn participation(
        id: i64,
        event_id: i64,
        user_id: i64,
        tiles_interacted: i64,
        completed: bool,
    ) -> participations::Model {
        participations::Model {
            id,
            event_id,
            user_id,
            tiles_interacted,
            started_at: Utc::now(),
            completed_at: completed.then(Utc::now),
            created_at: None,
            updated_at: None,
        }
    }

    fn audit_log(action: &str) -> audit_logs::Model {
        audit_logs::Model {
            id: 1,
            action: action.to_string(),
            user_id: Some(7),
            organization_id: None,
            target: Some("1".to_string()),
            metadata: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn start_rejects_unknown_event() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<events::Model>::new()])
            .into_connection();

        let err = service(db).start(1, 7).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn start_rejects_inactive_event() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Completed)]])
            .into_connection();

        let err = service(db).start(1, 7).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg == "Event is not active"));
    }

    #[tokio::test]
    async fn start_rejects_repeat_participation() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Active)]])
            .append_query_results([vec![user(7, false)]])
            .append_query_results([vec![participation(10, 1, 7, 0, false)]])
            .into_connection();

        let err = service(db).start(1, 7).await.unwrap_err();
        assert!(
            matches!(err, AppError::ValidationError(msg) if msg == "User already participated in this event")
        );
    }

    #[tokio::test]
    async fn start_creates_participation_and_returns_welcome() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Active)]])
            .append_query_results([vec![user(7, false)]])
            .append_query_results([Vec::<participations::Model>::new()])
            .append_query_results([vec![participation(10, 1, 7, 0, false)]])
            .append_query_results([vec![audit_log("event_participation_started")]])
            .into_connection();

        let res = service(db).start(1, 7).await.unwrap();
        assert_eq!(res.step, ParticipationStep::Welcome);
        assert!(res.message.contains("Summer Festival"));
    }

    #[tokio::test]
    async fn interact_requires_accepted_terms() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Active)]])
            .append_query_results([vec![user(7, false)]])
            .into_connection();

        let err = service(db).interact_with_tiles(1, 7, 1).await.unwrap_err();
        assert!(
            matches!(err, AppError::ValidationError(msg) if msg.contains("Terms must be accepted"))
        );
    }

    #[tokio::test]
    async fn interact_rejects_non_positive_count() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = service(db).interact_with_tiles(1, 7, 0).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn interact_reports_success_at_threshold() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Active)]])
            .append_query_results([vec![user(7, true)]])
            .append_query_results([vec![participation(10, 1, 7, 2, false)]])
            .append_query_results([vec![audit_log("tiles_interacted")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let res = service(db).interact_with_tiles(1, 7, 1).await.unwrap();
        assert_eq!(res.step, ParticipationStep::Success);
        assert_eq!(res.tiles_interacted, 3);
        assert_eq!(res.total_tiles, 3);
    }

    #[tokio::test]
    async fn interact_below_threshold_stays_on_tiles() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Active)]])
            .append_query_results([vec![user(7, true)]])
            .append_query_results([vec![participation(10, 1, 7, 0, false)]])
            .append_query_results([vec![audit_log("tiles_interacted")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let res = service(db).interact_with_tiles(1, 7, 2).await.unwrap();
        assert_eq!(res.step, ParticipationStep::Tiles);
        assert_eq!(res.tiles_interacted, 2);
    }

    #[tokio::test]
    async fn complete_requires_enough_tiles() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Active)]])
            .append_query_results([vec![user(7, true)]])
            .append_query_results([vec![participation(10, 1, 7, 2, false)]])
            .into_connection();

        let err = service(db).complete(1, 7).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg.contains("at least 3 tiles")));
    }

    #[tokio::test]
    async fn complete_rejects_second_completion() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Active)]])
            .append_query_results([vec![user(7, true)]])
            .append_query_results([vec![participation(10, 1, 7, 3, true)]])
            .into_connection();

        let err = service(db).complete(1, 7).await.unwrap_err();
        assert!(
            matches!(err, AppError::ValidationError(msg) if msg == "User already completed this event")
        );
    }

    #[tokio::test]
    async fn complete_updates_counters_and_returns_qr() {
        let mut completed_event = event(1, EventStatus::Active);
        completed_event.total_tiles = 1;
        completed_event.successful_deeps = 1;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Active)]])
            .append_query_results([vec![user(7, true)]])
            .append_query_results([vec![participation(10, 1, 7, 3, false)]])
            .append_query_results([vec![completed_event]])
            .append_query_results([vec![audit_log("event_completed")]])
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

        let res = service(db).complete(1, 7).await.unwrap();
        assert!(res.success);
        assert_eq!(res.event.total_tiles, 1);
        assert_eq!(res.event.successful_deeps, 1);
        assert_eq!(res.qr_code, utils::render_data_url("event:1:user:7"));
    }

    #[tokio::test]
    async fn complete_loses_race_to_concurrent_completion() {
        // 条件更新没有命中任何行，说明另一请求已先完成
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Active)]])
            .append_query_results([vec![user(7, true)]])
            .append_query_results([vec![participation(10, 1, 7, 3, false)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let err = service(db).complete(1, 7).await.unwrap_err();
        assert!(
            matches!(err, AppError::ValidationError(msg) if msg == "User already completed this event")
        );
    }

    #[tokio::test]
    async fn status_derives_not_started_for_fresh_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Active)]])
            .append_query_results([vec![user(7, false)]])
            .append_query_results([Vec::<participations::Model>::new()])
            .into_connection();

        let res = service(db).status(1, 7).await.unwrap();
        assert!(!res.user_status.has_participated);
        assert_eq!(res.user_status.current_step, ParticipationStep::NotStarted);
    }

    #[tokio::test]
    async fn status_derives_ready_to_complete_at_threshold() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, EventStatus::Active)]])
            .append_query_results([vec![user(7, true)]])
            .append_query_results([vec![participation(10, 1, 7, 3, false)]])
            .into_connection();

        let res = service(db).status(1, 7).await.unwrap();
        assert_eq!(
            res.user_status.current_step,
            ParticipationStep::ReadyToComplete
        );
        assert_eq!(res.user_status.tiles_interacted, 3);
    }
}
