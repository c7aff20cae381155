use crate::middlewares::caller_identity;
use crate::models::*;
use crate::services::AdminService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "admin",
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "平台看板", body = AdminDashboardResponse),
        (status = 403, description = "需要管理员角色"),
        (status = 401, description = "未授权")
    )
)]
/// 平台总览看板（仅管理员）
pub async fn dashboard(service: web::Data<AdminService>, req: HttpRequest) -> Result<HttpResponse> {
    if let Err(e) = caller_identity(&req).and_then(|c| c.require_admin()) {
        return Ok(e.error_response());
    }
    match service.dashboard().await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/organizations/{org_id}/dashboard",
    tag = "admin",
    params(
        ("org_id" = i64, Path, description = "机构ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "机构看板", body = OrganizationDashboardResponse),
        (status = 403, description = "需要管理员角色"),
        (status = 404, description = "机构不存在"),
        (status = 401, description = "未授权")
    )
)]
/// 指定机构的看板（仅管理员）
pub async fn organization_dashboard(
    service: web::Data<AdminService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = caller_identity(&req).and_then(|c| c.require_admin()) {
        return Ok(e.error_response());
    }
    match service.organization_dashboard(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/dashboard", web::get().to(dashboard))
            .route(
                "/organizations/{org_id}/dashboard",
                web::get().to(organization_dashboard),
            ),
    );
}
