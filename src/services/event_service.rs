use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Order,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::entities::{
    EventStatus, event_entity as events, event_participation_entity as participations,
};
use crate::error::{AppError, AppResult};
use crate::models::{CreateEventRequest, UpdateEventRequest};
use crate::utils;
use std::sync::Arc;

#[derive(Clone)]
pub struct EventService {
    pool: Arc<DatabaseConnection>,
}

impl EventService {
    pub fn new(pool: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { pool: pool.into() }
    }

    /// 创建活动（status=active），拿到 ID 后生成活动二维码负载
    pub async fn create(
        &self,
        organization_id: i64,
        payload: CreateEventRequest,
    ) -> AppResult<events::Model> {
        let txn = self.pool.begin().await?;

        let event = events::ActiveModel {
            title: Set(payload.title),
            description: Set(payload.description),
            date: Set(payload.date),
            organization_id: Set(organization_id),
            instructions: Set(payload.instructions),
            terms_and_conditions: Set(payload.terms_and_conditions),
            tile_background_image: Set(payload.tile_background_image),
            total_tiles: Set(0),
            successful_deeps: Set(0),
            gifts_redeemed: Set(0),
            gifts_unredeemed: Set(0),
            status: Set(EventStatus::Active),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let qr_code = utils::render_data_url(&utils::event_payload(event.id));
        let mut am = event.into_active_model();
        am.qr_code = Set(Some(qr_code));
        am.updated_at = Set(Some(Utc::now()));
        let event = am.update(&txn).await?;

        txn.commit().await?;
        Ok(event)
    }

    pub async fn find_all(&self) -> AppResult<Vec<events::Model>> {
        Ok(events::Entity::find()
            .order_by(events::Column::CreatedAt, Order::Desc)
            .all(self.pool.as_ref())
            .await?)
    }

    pub async fn find_one(&self, event_id: i64) -> AppResult<events::Model> {
        events::Entity::find_by_id(event_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    /// 更新描述性字段
    pub async fn update(
        &self,
        event_id: i64,
        payload: UpdateEventRequest,
    ) -> AppResult<events::Model> {
        let event = self.find_one(event_id).await?;
        let mut am = event.into_active_model();

        if let Some(title) = payload.title {
            am.title = Set(title);
        }
        if let Some(description) = payload.description {
            am.description = Set(Some(description));
        }
        if let Some(date) = payload.date {
            am.date = Set(date);
        }
        if let Some(instructions) = payload.instructions {
            am.instructions = Set(Some(instructions));
        }
        if let Some(terms) = payload.terms_and_conditions {
            am.terms_and_conditions = Set(Some(terms));
        }
        if let Some(image) = payload.tile_background_image {
            am.tile_background_image = Set(Some(image));
        }
        am.updated_at = Set(Some(Utc::now()));

        Ok(am.update(self.pool.as_ref()).await?)
    }

    /// 显式状态流转；completed / cancelled 为终态，start 入口会拒绝参与
    pub async fn update_status(
        &self,
        event_id: i64,
        status: EventStatus,
    ) -> AppResult<events::Model> {
        let event = self.find_one(event_id).await?;
        let mut am = event.into_active_model();
        am.status = Set(status);
        am.updated_at = Set(Some(Utc::now()));
        Ok(am.update(self.pool.as_ref()).await?)
    }

    pub async fn remove(&self, event_id: i64) -> AppResult<events::Model> {
        let event = self.find_one(event_id).await?;
        events::Entity::delete_by_id(event.id).exec(self.pool.as_ref()).await?;
        Ok(event)
    }

    pub async fn organization_events(&self, organization_id: i64) -> AppResult<Vec<events::Model>> {
        Ok(events::Entity::find()
            .filter(events::Column::OrganizationId.eq(organization_id))
            .order_by(events::Column::CreatedAt, Order::Desc)
            .all(self.pool.as_ref())
            .await?)
    }

    /// 用户参与过的活动（来自参与记录）
    pub async fn user_event_history(&self, user_id: i64) -> AppResult<Vec<events::Model>> {
        let participated = participations::Entity::find()
            .filter(participations::Column::UserId.eq(user_id))
            .all(self.pool.as_ref())
            .await?;
        if participated.is_empty() {
            return Ok(Vec::new());
        }

        let event_ids: Vec<i64> = participated.iter().map(|p| p.event_id).collect();
        Ok(events::Entity::find()
            .filter(events::Column::Id.is_in(event_ids))
            .order_by(events::Column::CreatedAt, Order::Desc)
            .all(self.pool.as_ref())
            .await?)
    }

    /// 校验活动二维码负载并返回对应活动
    pub async fn validate_qr(&self, qr_code_data: &str) -> AppResult<events::Model> {
        let event_id = utils::parse_event_payload(qr_code_data)?;
        self.find_one(event_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn event(id: i64, qr_code: Option<String>) -> events::Model {
        events::Model {
            id,
            title: "Summer Festival".to_string(),
            description: None,
            date: Utc::now(),
            organization_id: 3,
            qr_code,
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

    #[tokio::test]
    async fn create_stamps_qr_payload_after_insert() {
        let qr = utils::render_data_url("event:1");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(1, None)], vec![event(1, Some(qr.clone()))]])
            .into_connection();

        let created = EventService::new(db)
            .create(
                3,
                CreateEventRequest {
                    title: "Summer Festival".to_string(),
                    description: None,
                    date: Utc::now(),
                    instructions: None,
                    terms_and_conditions: None,
                    tile_background_image: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.qr_code, Some(qr));
    }

    #[tokio::test]
    async fn validate_qr_rejects_malformed_payload() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = EventService::new(db).validate_qr("gift:1").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn validate_qr_returns_referenced_event() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(42, None)]])
            .into_connection();

        let found = EventService::new(db).validate_qr("event:42").await.unwrap();
        assert_eq!(found.id, 42);
    }

    #[tokio::test]
    async fn user_event_history_is_empty_without_participations() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<participations::Model>::new()])
            .into_connection();

        let history = EventService::new(db).user_event_history(7).await.unwrap();
        assert!(history.is_empty());
    }
}
