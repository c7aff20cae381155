use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 礼品实体
/// 状态约束:
/// - claimed=false 时 claimed_by / qr_code 必须为空
/// - collected_at 写入前必须已被认领；写入即视为已核销
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "gifts")]
pub struct Model {
    #[sea_orm(primary_key)]
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
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_redeemed(&self) -> bool {
        self.collected_at.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
