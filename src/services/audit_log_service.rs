use crate::entities::audit_log_entity as audit_logs;
use crate::error::AppResult;
use crate::models::{AuditLogFilters, NewAuditLog};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuditLogService {
    pool: Arc<DatabaseConnection>,
}

impl AuditLogService {
    pub fn new(pool: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { pool: pool.into() }
    }

    /// 追加一条审计日志
    pub async fn create_log(&self, entry: NewAuditLog) -> AppResult<audit_logs::Model> {
        self.create_log_in(self.pool.as_ref(), entry).await
    }

    /// 在给定连接（通常是外层事务）上追加审计日志，
    /// 使日志与业务写入一同提交或回滚
    pub async fn create_log_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: NewAuditLog,
    ) -> AppResult<audit_logs::Model> {
        let log = audit_logs::ActiveModel {
            action: Set(entry.action),
            user_id: Set(entry.user_id),
            organization_id: Set(entry.organization_id),
            target: Set(entry.target),
            metadata: Set(entry.metadata),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        Ok(log)
    }

    /// 按条件查询日志（倒序）
    pub async fn find_logs(
        &self,
        filters: &AuditLogFilters,
        limit: Option<u64>,
    ) -> AppResult<Vec<audit_logs::Model>> {
        let mut query = audit_logs::Entity::find();
        if let Some(action) = &filters.action {
            query = query.filter(audit_logs::Column::Action.eq(action.clone()));
        }
        if let Some(user_id) = filters.user_id {
            query = query.filter(audit_logs::Column::UserId.eq(user_id));
        }
        if let Some(organization_id) = filters.organization_id {
            query = query.filter(audit_logs::Column::OrganizationId.eq(organization_id));
        }
        if let Some(target) = &filters.target {
            query = query.filter(audit_logs::Column::Target.eq(target.clone()));
        }

        let mut query = query.order_by(audit_logs::Column::CreatedAt, Order::Desc);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        Ok(query.all(self.pool.as_ref()).await?)
    }
}
