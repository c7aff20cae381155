use crate::middlewares::caller_identity;
use crate::models::*;
use crate::services::{EventService, StatsService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/events",
    tag = "events",
    request_body = CreateEventRequest,
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 201, description = "活动创建成功", body = EventResponse),
        (status = 400, description = "参数错误"),
        (status = 401, description = "未授权")
    )
)]
/// 创建活动，归属于当前机构
pub async fn create_event(
    service: web::Data<EventService>,
    body: web::Json<CreateEventRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let organization_id = match caller_identity(&req).and_then(|c| c.require_organization()) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.create(organization_id, body.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Created()
            .json(json!({ "success": true, "data": EventResponse::from(event) }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    responses(
        (status = 200, description = "活动列表", body = [EventResponse])
    )
)]
pub async fn list_events(service: web::Data<EventService>) -> Result<HttpResponse> {
    match service.find_all().await {
        Ok(list) => {
            let data: Vec<EventResponse> = list.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/{id}",
    tag = "events",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    responses(
        (status = 200, description = "活动详情", body = EventResponse),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_event(
    service: web::Data<EventService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.find_one(path.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Ok()
            .json(json!({ "success": true, "data": EventResponse::from(event) }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/{id}/statistics",
    tag = "events",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "活动统计", body = EventStatisticsResponse),
        (status = 404, description = "活动不存在"),
        (status = 401, description = "未授权")
    )
)]
pub async fn event_statistics(
    stats: web::Data<StatsService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = caller_identity(&req) {
        return Ok(e.error_response());
    }
    match stats.event_statistics(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/events/{id}",
    tag = "events",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    request_body = UpdateEventRequest,
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "活动更新成功", body = EventResponse),
        (status = 404, description = "活动不存在"),
        (status = 401, description = "未授权")
    )
)]
pub async fn update_event(
    service: web::Data<EventService>,
    path: web::Path<i64>,
    body: web::Json<UpdateEventRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = caller_identity(&req).and_then(|c| c.require_organization_or_admin()) {
        return Ok(e.error_response());
    }
    match service.update(path.into_inner(), body.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Ok()
            .json(json!({ "success": true, "data": EventResponse::from(event) }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    patch,
    path = "/events/{id}/status",
    tag = "events",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    request_body = UpdateEventStatusRequest,
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "状态更新成功", body = EventResponse),
        (status = 400, description = "无效状态"),
        (status = 404, description = "活动不存在"),
        (status = 401, description = "未授权")
    )
)]
/// 显式流转活动状态（active / completed / cancelled）
pub async fn update_event_status(
    service: web::Data<EventService>,
    path: web::Path<i64>,
    body: web::Json<UpdateEventStatusRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = caller_identity(&req).and_then(|c| c.require_organization_or_admin()) {
        return Ok(e.error_response());
    }
    match service
        .update_status(path.into_inner(), body.into_inner().status)
        .await
    {
        Ok(event) => Ok(HttpResponse::Ok()
            .json(json!({ "success": true, "data": EventResponse::from(event) }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/events/{id}",
    tag = "events",
    params(
        ("id" = i64, Path, description = "活动ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "活动删除成功", body = EventResponse),
        (status = 404, description = "活动不存在"),
        (status = 401, description = "未授权")
    )
)]
pub async fn delete_event(
    service: web::Data<EventService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = caller_identity(&req).and_then(|c| c.require_organization_or_admin()) {
        return Ok(e.error_response());
    }
    match service.remove(path.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Ok()
            .json(json!({ "success": true, "data": EventResponse::from(event) }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/organization/{org_id}",
    tag = "events",
    params(
        ("org_id" = i64, Path, description = "机构ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "机构活动列表", body = [EventResponse]),
        (status = 401, description = "未授权")
    )
)]
pub async fn organization_events(
    service: web::Data<EventService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = caller_identity(&req) {
        return Ok(e.error_response());
    }
    match service.organization_events(path.into_inner()).await {
        Ok(list) => {
            let data: Vec<EventResponse> = list.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/user/history",
    tag = "events",
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "用户参与过的活动", body = [EventResponse]),
        (status = 401, description = "未授权")
    )
)]
pub async fn user_event_history(
    service: web::Data<EventService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match caller_identity(&req).and_then(|c| c.require_user()) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.user_event_history(user_id).await {
        Ok(list) => {
            let data: Vec<EventResponse> = list.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/validate-qr",
    tag = "events",
    request_body = ValidateQrRequest,
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "二维码有效，返回对应活动", body = EventResponse),
        (status = 400, description = "二维码格式无效"),
        (status = 404, description = "活动不存在"),
        (status = 401, description = "未授权")
    )
)]
/// 校验活动二维码负载并返回对应活动
pub async fn validate_qr(
    service: web::Data<EventService>,
    body: web::Json<ValidateQrRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = caller_identity(&req) {
        return Ok(e.error_response());
    }
    match service.validate_qr(&body.qr_code_data).await {
        Ok(event) => Ok(HttpResponse::Ok()
            .json(json!({ "success": true, "data": EventResponse::from(event) }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn event_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .route("/validate-qr", web::post().to(validate_qr))
            .route("/user/history", web::get().to(user_event_history))
            .route("/organization/{org_id}", web::get().to(organization_events))
            .route("/{id}/statistics", web::get().to(event_statistics))
            .route("/{id}/status", web::patch().to(update_event_status))
            .route("/{id}", web::get().to(get_event))
            .route("/{id}", web::patch().to(update_event))
            .route("/{id}", web::delete().to(delete_event))
            .route("", web::post().to(create_event))
            .route("", web::get().to(list_events)),
    );
}
