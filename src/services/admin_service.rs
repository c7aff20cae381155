use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Alias, Expr};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entities::{
    EventStatus, event_entity as events, gift_entity as gifts,
    organization_entity as organizations, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminDashboardResponse, AdminOverview, AuditLogFilters, AuditLogResponse,
    OrganizationDashboardResponse, OrganizationOverview, PeriodStatsResponse, percentage,
};
use crate::services::AuditLogService;
use std::sync::Arc;

/// 管理后台跨实体统计
#[derive(Clone)]
pub struct AdminService {
    pool: Arc<DatabaseConnection>,
    audit_log_service: AuditLogService,
}

impl AdminService {
    pub fn new(
        pool: impl Into<Arc<DatabaseConnection>>,
        audit_log_service: AuditLogService,
    ) -> Self {
        Self {
            pool: pool.into(),
            audit_log_service,
        }
    }

    /// 平台看板: 总览 + 近 30 天 / 近 7 天新增 + 最近审计活动
    pub async fn dashboard(&self) -> AppResult<AdminDashboardResponse> {
        let now = Utc::now();
        let thirty_days_ago = now - Duration::days(30);
        let seven_days_ago = now - Duration::days(7);

        let overview = self.total_stats().await?;
        let monthly = self.period_stats(thirty_days_ago, now).await?;
        let weekly = self.period_stats(seven_days_ago, now).await?;
        let recent_activity = self.recent_activity(20, None).await?;

        Ok(AdminDashboardResponse {
            overview,
            monthly,
            weekly,
            recent_activity,
            last_updated: now,
        })
    }

    /// 机构看板: 活动列表 + 计数器汇总 + 最近审计活动
    pub async fn organization_dashboard(
        &self,
        organization_id: i64,
    ) -> AppResult<OrganizationDashboardResponse> {
        let organization = organizations::Entity::find_by_id(organization_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

        let org_events = events::Entity::find()
            .filter(events::Column::OrganizationId.eq(organization.id))
            .order_by(events::Column::CreatedAt, Order::Desc)
            .all(self.pool.as_ref())
            .await?;

        let mut overview = OrganizationOverview {
            total_events: org_events.len() as i64,
            active_events: 0,
            completed_events: 0,
            total_gift_units: 0,
            total_tiles: 0,
            successful_deeps: 0,
            gifts_redeemed: 0,
            participation_rate: 0.0,
        };
        for event in &org_events {
            match event.status {
                EventStatus::Active => overview.active_events += 1,
                EventStatus::Completed => overview.completed_events += 1,
                EventStatus::Cancelled => {}
            }
            overview.total_tiles += event.total_tiles;
            overview.successful_deeps += event.successful_deeps;
            overview.gifts_redeemed += event.gifts_redeemed;
        }
        overview.participation_rate = percentage(overview.successful_deeps, overview.total_tiles);

        let event_ids: Vec<i64> = org_events.iter().map(|e| e.id).collect();
        if !event_ids.is_empty() {
            #[derive(Debug, sea_orm::FromQueryResult)]
            struct SumRow {
                total: Option<i64>,
            }
            let row: Option<SumRow> = gifts::Entity::find()
                .filter(gifts::Column::EventId.is_in(event_ids))
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
            overview.total_gift_units = row.and_then(|r| r.total).unwrap_or(0);
        }

        let recent_activity = self.recent_activity(10, Some(organization.id)).await?;

        Ok(OrganizationDashboardResponse {
            organization: organization.into(),
            overview,
            events: org_events.into_iter().map(Into::into).collect(),
            recent_activity,
        })
    }

    async fn total_stats(&self) -> AppResult<AdminOverview> {
        let (
            total_organizations,
            total_users,
            total_events,
            total_gifts,
            active_events,
            completed_events,
        ) = tokio::try_join!(
            organizations::Entity::find().count(self.pool.as_ref()),
            users::Entity::find().count(self.pool.as_ref()),
            events::Entity::find().count(self.pool.as_ref()),
            gifts::Entity::find().count(self.pool.as_ref()),
            events::Entity::find()
                .filter(events::Column::Status.eq(EventStatus::Active))
                .count(self.pool.as_ref()),
            events::Entity::find()
                .filter(events::Column::Status.eq(EventStatus::Completed))
                .count(self.pool.as_ref()),
        )?;

        Ok(AdminOverview {
            total_organizations,
            total_users,
            total_events,
            total_gifts,
            active_events,
            completed_events,
            completion_rate: percentage(completed_events as i64, total_events as i64),
        })
    }

    async fn period_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<PeriodStatsResponse> {
        let (new_organizations, new_users, new_events, new_gifts) = tokio::try_join!(
            organizations::Entity::find()
                .filter(organizations::Column::CreatedAt.between(start, end))
                .count(self.pool.as_ref()),
            users::Entity::find()
                .filter(users::Column::CreatedAt.between(start, end))
                .count(self.pool.as_ref()),
            events::Entity::find()
                .filter(events::Column::CreatedAt.between(start, end))
                .count(self.pool.as_ref()),
            gifts::Entity::find()
                .filter(gifts::Column::CreatedAt.between(start, end))
                .count(self.pool.as_ref()),
        )?;

        Ok(PeriodStatsResponse {
            new_organizations,
            new_users,
            new_events,
            new_gifts,
            period_start: start,
            period_end: end,
        })
    }

    async fn recent_activity(
        &self,
        limit: u64,
        organization_id: Option<i64>,
    ) -> AppResult<Vec<AuditLogResponse>> {
        let filters = AuditLogFilters {
            organization_id,
            ..Default::default()
        };
        let logs = self
            .audit_log_service
            .find_logs(&filters, Some(limit))
            .await?;
        Ok(logs.into_iter().map(Into::into).collect())
    }
}
