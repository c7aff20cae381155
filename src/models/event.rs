use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{EventStatus, event_entity};

/// 创建活动请求
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    /// 活动说明 (HTML)
    pub instructions: Option<String>,
    /// 条款与细则 (HTML)
    pub terms_and_conditions: Option<String>,
    pub tile_background_image: Option<String>,
}

/// 更新活动请求（仅描述性字段）
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub instructions: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub tile_background_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateEventStatusRequest {
    pub status: EventStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateQrRequest {
    /// 活动二维码负载，如 "event:42"
    pub qr_code_data: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub organization_id: i64,
    pub qr_code: Option<String>,
    pub instructions: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub tile_background_image: Option<String>,
    pub total_tiles: i64,
    pub successful_deeps: i64,
    pub gifts_redeemed: i64,
    pub gifts_unredeemed: i64,
    pub status: EventStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<event_entity::Model> for EventResponse {
    fn from(m: event_entity::Model) -> Self {
        EventResponse {
            id: m.id,
            title: m.title,
            description: m.description,
            date: m.date,
            organization_id: m.organization_id,
            qr_code: m.qr_code,
            instructions: m.instructions,
            terms_and_conditions: m.terms_and_conditions,
            tile_background_image: m.tile_background_image,
            total_tiles: m.total_tiles,
            successful_deeps: m.successful_deeps,
            gifts_redeemed: m.gifts_redeemed,
            gifts_unredeemed: m.gifts_unredeemed,
            status: m.status,
            created_at: m.created_at,
        }
    }
}

/// 活动参与统计响应
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventStatisticsResponse {
    pub total_tiles: i64,
    pub successful_deeps: i64,
    pub undeeped: i64,
    pub gifts_redeemed: i64,
    pub gifts_unredeemed: i64,
    /// successful_deeps / total_tiles × 100，total_tiles 为 0 时取 0
    pub participation_rate: f64,
}
