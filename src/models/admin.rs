use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::organization_entity;
use crate::models::{AuditLogResponse, EventResponse};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResponse {
    pub id: i64,
    pub name: String,
    pub country: Option<String>,
    pub admin_email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<organization_entity::Model> for OrganizationResponse {
    fn from(m: organization_entity::Model) -> Self {
        OrganizationResponse {
            id: m.id,
            name: m.name,
            country: m.country,
            admin_email: m.admin_email,
            created_at: m.created_at,
        }
    }
}

/// 平台总览统计
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub total_organizations: u64,
    pub total_users: u64,
    pub total_events: u64,
    pub total_gifts: u64,
    pub active_events: u64,
    pub completed_events: u64,
    pub completion_rate: f64,
}

/// 一段时间内的新增统计
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStatsResponse {
    pub new_organizations: u64,
    pub new_users: u64,
    pub new_events: u64,
    pub new_gifts: u64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboardResponse {
    pub overview: AdminOverview,
    pub monthly: PeriodStatsResponse,
    pub weekly: PeriodStatsResponse,
    pub recent_activity: Vec<AuditLogResponse>,
    pub last_updated: DateTime<Utc>,
}

/// 机构看板总览
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationOverview {
    pub total_events: i64,
    pub active_events: i64,
    pub completed_events: i64,
    /// 礼品单位总数 (Σquantity)
    pub total_gift_units: i64,
    pub total_tiles: i64,
    pub successful_deeps: i64,
    pub gifts_redeemed: i64,
    pub participation_rate: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDashboardResponse {
    pub organization: OrganizationResponse,
    pub overview: OrganizationOverview,
    pub events: Vec<EventResponse>,
    pub recent_activity: Vec<AuditLogResponse>,
}
