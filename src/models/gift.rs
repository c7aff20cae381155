use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::gift_entity;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GiftResponse {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub quantity: i64,
    pub claimed: bool,
    pub claimed_by: Option<i64>,
    pub qr_code: Option<String>,
    pub collected_at: Option<DateTime<Utc>>,
    pub redeemed_by: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<gift_entity::Model> for GiftResponse {
    fn from(m: gift_entity::Model) -> Self {
        GiftResponse {
            id: m.id,
            event_id: m.event_id,
            name: m.name,
            quantity: m.quantity,
            claimed: m.claimed,
            claimed_by: m.claimed_by,
            qr_code: m.qr_code,
            collected_at: m.collected_at,
            redeemed_by: m.redeemed_by,
            created_at: m.created_at,
        }
    }
}

/// 库存导入的一行（电子表格解析由上游完成，这里接收解析结果）
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GiftInventoryRow {
    pub name: Option<String>,
    pub quantity: Option<i64>,
}

impl GiftInventoryRow {
    /// 缺名称或数量非正的行视为无效，导入时静默跳过
    pub fn normalized(&self) -> Option<(String, i64)> {
        let name = self.name.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        match self.quantity {
            Some(q) if q > 0 => Some((name.to_string(), q)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkIngestRequest {
    pub rows: Vec<GiftInventoryRow>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkIngestResponse {
    pub message: String,
    pub gifts: Vec<GiftResponse>,
    pub total_quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: Option<&str>, quantity: Option<i64>) -> GiftInventoryRow {
        GiftInventoryRow {
            name: name.map(str::to_string),
            quantity,
        }
    }

    #[test]
    fn complete_row_normalizes() {
        assert_eq!(
            row(Some("Gift Card"), Some(5)).normalized(),
            Some(("Gift Card".to_string(), 5))
        );
    }

    #[test]
    fn incomplete_rows_are_skipped() {
        assert_eq!(row(Some("No Quantity"), None).normalized(), None);
        assert_eq!(row(None, Some(3)).normalized(), None);
        assert_eq!(row(Some("   "), Some(3)).normalized(), None);
        assert_eq!(row(Some("Zero"), Some(0)).normalized(), None);
        assert_eq!(row(Some("Negative"), Some(-2)).normalized(), None);
    }
}
