use crate::middlewares::caller_identity;
use crate::models::*;
use crate::services::ParticipationService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/event-participation/{event_id}/start",
    tag = "event_participation",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "开始参与成功", body = StartParticipationResponse),
        (status = 400, description = "活动未开放或已参与"),
        (status = 404, description = "活动或用户不存在"),
        (status = 401, description = "未授权")
    )
)]
/// 开始参与活动，返回欢迎步骤
pub async fn start_participation(
    service: web::Data<ParticipationService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match caller_identity(&req).and_then(|c| c.require_user()) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.start(path.into_inner(), user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/event-participation/{event_id}/accept-terms",
    tag = "event_participation",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "条款同意成功", body = AcceptTermsResponse),
        (status = 404, description = "活动或用户不存在"),
        (status = 401, description = "未授权")
    )
)]
/// 同意活动条款，返回条款文本
pub async fn accept_terms(
    service: web::Data<ParticipationService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match caller_identity(&req).and_then(|c| c.require_user()) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.accept_terms(path.into_inner(), user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/event-participation/{event_id}/interact-tiles",
    tag = "event_participation",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    request_body = InteractTilesRequest,
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "瓦片互动成功", body = InteractTilesResponse),
        (status = 400, description = "未同意条款"),
        (status = 404, description = "活动或用户不存在"),
        (status = 401, description = "未授权")
    )
)]
/// 瓦片互动（tileCount 默认 1），达到阈值时返回 success 步骤
pub async fn interact_with_tiles(
    service: web::Data<ParticipationService>,
    path: web::Path<i64>,
    body: Option<web::Json<InteractTilesRequest>>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match caller_identity(&req).and_then(|c| c.require_user()) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let tile_count = body.and_then(|b| b.tile_count).unwrap_or(1);
    match service
        .interact_with_tiles(path.into_inner(), user_id, tile_count)
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/event-participation/{event_id}/complete",
    tag = "event_participation",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "完成参与成功", body = CompleteParticipationResponse),
        (status = 400, description = "条款未同意 / 瓦片不足 / 已完成"),
        (status = 404, description = "活动或用户不存在"),
        (status = 401, description = "未授权")
    )
)]
/// 完成参与，返回核销二维码负载
pub async fn complete_participation(
    service: web::Data<ParticipationService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match caller_identity(&req).and_then(|c| c.require_user()) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.complete(path.into_inner(), user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/event-participation/{event_id}/status",
    tag = "event_participation",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "参与状态查询成功", body = ParticipationStatusResponse),
        (status = 404, description = "活动或用户不存在"),
        (status = 401, description = "未授权")
    )
)]
/// 查询当前用户的参与状态（纯读取）
pub async fn participation_status(
    service: web::Data<ParticipationService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match caller_identity(&req).and_then(|c| c.require_user()) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.status(path.into_inner(), user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn participation_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/event-participation")
            .route("/{event_id}/start", web::post().to(start_participation))
            .route("/{event_id}/accept-terms", web::post().to(accept_terms))
            .route(
                "/{event_id}/interact-tiles",
                web::post().to(interact_with_tiles),
            )
            .route("/{event_id}/complete", web::post().to(complete_participation))
            .route("/{event_id}/status", web::get().to(participation_status)),
    );
}
