use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// part / total × 100，total ≤ 0 时取 0，避免除零
pub fn percentage(part: i64, total: i64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// 单个活动的礼品统计
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventGiftStatisticsResponse {
    /// 礼品单位总数 (Σquantity)
    pub total_gifts: i64,
    pub claimed_gifts: i64,
    pub redeemed_gifts: i64,
    pub unclaimed_gifts: i64,
    pub unredeemed_gifts: i64,
}

/// 机构维度的礼品统计（按活动分组）
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationEventGiftStatistics {
    pub event_id: i64,
    pub event_title: String,
    pub event_date: DateTime<Utc>,
    pub total_gifts: i64,
    pub claimed_gifts: i64,
    pub redeemed_gifts: i64,
    pub unclaimed_gifts: i64,
    pub unredeemed_gifts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_handles_zero_total() {
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn percentage_of_part() {
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(4, 4), 100.0);
    }
}
