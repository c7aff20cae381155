use sea_orm::sea_query::{Alias, Expr};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entities::{event_entity as events, gift_entity as gifts};
use crate::error::{AppError, AppResult};
use crate::models::{
    EventGiftStatisticsResponse, EventStatisticsResponse, OrganizationEventGiftStatistics,
    percentage,
};
use std::sync::Arc;

/// 读侧统计投影，无任何写入；空分组一律归零
#[derive(Clone)]
pub struct StatsService {
    pool: Arc<DatabaseConnection>,
}

impl StatsService {
    pub fn new(pool: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { pool: pool.into() }
    }

    /// 单个活动的礼品统计
    pub async fn event_gift_statistics(
        &self,
        event_id: i64,
    ) -> AppResult<EventGiftStatisticsResponse> {
        let total_gifts = self.total_gift_units(event_id).await?;

        let (claimed, redeemed) = tokio::try_join!(
            gifts::Entity::find()
                .filter(gifts::Column::EventId.eq(event_id))
                .filter(gifts::Column::Claimed.eq(true))
                .count(self.pool.as_ref()),
            gifts::Entity::find()
                .filter(gifts::Column::EventId.eq(event_id))
                .filter(gifts::Column::CollectedAt.is_not_null())
                .count(self.pool.as_ref()),
        )?;
        let claimed_gifts = claimed as i64;
        let redeemed_gifts = redeemed as i64;

        Ok(EventGiftStatisticsResponse {
            total_gifts,
            claimed_gifts,
            redeemed_gifts,
            unclaimed_gifts: total_gifts - claimed_gifts,
            unredeemed_gifts: claimed_gifts - redeemed_gifts,
        })
    }

    /// 机构维度的礼品统计（按其每个活动分组）
    pub async fn organization_gift_statistics(
        &self,
        organization_id: i64,
    ) -> AppResult<Vec<OrganizationEventGiftStatistics>> {
        let org_events = events::Entity::find()
            .filter(events::Column::OrganizationId.eq(organization_id))
            .order_by(events::Column::CreatedAt, Order::Desc)
            .all(self.pool.as_ref())
            .await?;

        let mut stats = Vec::with_capacity(org_events.len());
        for event in org_events {
            let breakdown = self.event_gift_statistics(event.id).await?;
            stats.push(OrganizationEventGiftStatistics {
                event_id: event.id,
                event_title: event.title,
                event_date: event.date,
                total_gifts: breakdown.total_gifts,
                claimed_gifts: breakdown.claimed_gifts,
                redeemed_gifts: breakdown.redeemed_gifts,
                unclaimed_gifts: breakdown.unclaimed_gifts,
                unredeemed_gifts: breakdown.unredeemed_gifts,
            });
        }
        Ok(stats)
    }

    /// 活动参与统计（计数器快照 + 派生比率）
    pub async fn event_statistics(&self, event_id: i64) -> AppResult<EventStatisticsResponse> {
        let event = events::Entity::find_by_id(event_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        Ok(EventStatisticsResponse {
            total_tiles: event.total_tiles,
            successful_deeps: event.successful_deeps,
            undeeped: event.total_tiles - event.successful_deeps,
            gifts_redeemed: event.gifts_redeemed,
            gifts_unredeemed: event.gifts_unredeemed,
            participation_rate: percentage(event.successful_deeps, event.total_tiles),
        })
    }

    /// Σquantity；SUM 在 Postgres 返回 numeric，这里显式转回 BIGINT
    async fn total_gift_units(&self, event_id: i64) -> AppResult<i64> {
        #[derive(Debug, sea_orm::FromQueryResult)]
        struct SumRow {
            total: Option<i64>,
        }
        let row: Option<SumRow> = gifts::Entity::find()
            .filter(gifts::Column::EventId.eq(event_id))
            .select_only()
            .column_as(
                Expr::col(gifts::Column::Quantity)
                    .sum()
                    .cast_as(Alias::new("BIGINT")),
                "total",
            )
            .into_model::<SumRow>()
            .one(self.pool.as_ref())
            .await?;
        Ok(row.and_then(|r| r.total).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EventStatus;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    fn event(total_tiles: i64, successful_deeps: i64) -> events::Model {
        events::Model {
            id: 1,
            title: "Summer Festival".to_string(),
            description: None,
            date: Utc::now(),
            organization_id: 3,
            qr_code: None,
            instructions: None,
            terms_and_conditions: None,
            tile_background_image: None,
            total_tiles,
            successful_deeps,
            gifts_redeemed: 2,
            gifts_unredeemed: 8,
            status: EventStatus::Active,
            created_at: None,
            updated_at: None,
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        BTreeMap::from([("num_items", sea_orm::Value::from(n))])
    }

    #[tokio::test]
    async fn event_statistics_handles_zero_tiles() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(0, 0)]])
            .into_connection();

        let stats = StatsService::new(db).event_statistics(1).await.unwrap();
        assert_eq!(stats.undeeped, 0);
        assert_eq!(stats.participation_rate, 0.0);
    }

    #[tokio::test]
    async fn event_statistics_derives_rate_and_undeeped() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![event(4, 1)]])
            .into_connection();

        let stats = StatsService::new(db).event_statistics(1).await.unwrap();
        assert_eq!(stats.undeeped, 3);
        assert_eq!(stats.participation_rate, 25.0);
    }

    #[tokio::test]
    async fn gift_statistics_tolerate_event_without_gifts() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&str, sea_orm::Value>>::new()])
            .append_query_results([vec![count_row(0)]])
            .append_query_results([vec![count_row(0)]])
            .into_connection();

        let stats = StatsService::new(db).event_gift_statistics(1).await.unwrap();
        assert_eq!(stats.total_gifts, 0);
        assert_eq!(stats.unclaimed_gifts, 0);
        assert_eq!(stats.unredeemed_gifts, 0);
    }
}
