use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::audit_log_entity;

/// 新增审计日志条目
#[derive(Debug, Clone, Default)]
pub struct NewAuditLog {
    pub action: String,
    pub user_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub target: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// 审计日志查询条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogFilters {
    pub action: Option<String>,
    pub user_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub id: i64,
    pub action: String,
    pub user_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub target: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<audit_log_entity::Model> for AuditLogResponse {
    fn from(m: audit_log_entity::Model) -> Self {
        AuditLogResponse {
            id: m.id,
            action: m.action,
            user_id: m.user_id,
            organization_id: m.organization_id,
            target: m.target,
            metadata: m.metadata,
            created_at: m.created_at,
        }
    }
}
