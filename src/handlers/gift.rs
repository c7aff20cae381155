use crate::middlewares::caller_identity;
use crate::models::*;
use crate::services::{GiftService, StatsService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/gifts",
    tag = "gifts",
    responses(
        (status = 200, description = "礼品列表", body = [GiftResponse])
    )
)]
pub async fn list_gifts(service: web::Data<GiftService>) -> Result<HttpResponse> {
    match service.find_all().await {
        Ok(list) => {
            let data: Vec<GiftResponse> = list.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/gifts/{id}",
    tag = "gifts",
    params(
        ("id" = i64, Path, description = "礼品ID")
    ),
    responses(
        (status = 200, description = "礼品详情", body = GiftResponse),
        (status = 404, description = "礼品不存在")
    )
)]
pub async fn get_gift(service: web::Data<GiftService>, path: web::Path<i64>) -> Result<HttpResponse> {
    match service.find_one(path.into_inner()).await {
        Ok(gift) => Ok(HttpResponse::Ok()
            .json(json!({ "success": true, "data": GiftResponse::from(gift) }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/gifts/{id}/claim",
    tag = "gifts",
    params(
        ("id" = i64, Path, description = "礼品ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "认领成功", body = GiftResponse),
        (status = 403, description = "礼品已被认领"),
        (status = 404, description = "礼品不存在"),
        (status = 401, description = "未授权")
    )
)]
/// 用户认领礼品；并发认领时只有一个请求成功
pub async fn claim_gift(
    service: web::Data<GiftService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match caller_identity(&req).and_then(|c| c.require_user()) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.claim(path.into_inner(), user_id).await {
        Ok(gift) => Ok(HttpResponse::Ok()
            .json(json!({ "success": true, "data": GiftResponse::from(gift) }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/gifts/{id}/redeem",
    tag = "gifts",
    params(
        ("id" = i64, Path, description = "礼品ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "核销成功", body = GiftResponse),
        (status = 403, description = "未认领或已核销"),
        (status = 404, description = "礼品不存在"),
        (status = 401, description = "未授权")
    )
)]
/// 机构核销已认领的礼品
pub async fn redeem_gift(
    service: web::Data<GiftService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let organization_id = match caller_identity(&req).and_then(|c| c.require_organization()) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.redeem(path.into_inner(), organization_id).await {
        Ok(gift) => Ok(HttpResponse::Ok()
            .json(json!({ "success": true, "data": GiftResponse::from(gift) }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/gifts/upload/{event_id}",
    tag = "gifts",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    request_body = BulkIngestRequest,
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "库存导入成功", body = BulkIngestResponse),
        (status = 400, description = "没有可导入的行"),
        (status = 404, description = "活动不存在"),
        (status = 401, description = "未授权")
    )
)]
/// 批量导入礼品库存（上游已将电子表格解析为 rows）
pub async fn upload_gift_inventory(
    service: web::Data<GiftService>,
    path: web::Path<i64>,
    body: web::Json<BulkIngestRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = caller_identity(&req).and_then(|c| c.require_organization_or_admin()) {
        return Ok(e.error_response());
    }
    match service
        .bulk_ingest(path.into_inner(), body.into_inner().rows)
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/gifts/user/history",
    tag = "gifts",
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "用户认领记录", body = [GiftResponse]),
        (status = 401, description = "未授权")
    )
)]
pub async fn user_gift_history(
    service: web::Data<GiftService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match caller_identity(&req).and_then(|c| c.require_user()) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.user_gift_history(user_id).await {
        Ok(list) => {
            let data: Vec<GiftResponse> = list.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/gifts/event/{event_id}/statistics",
    tag = "gifts",
    params(
        ("event_id" = i64, Path, description = "活动ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "活动礼品统计", body = EventGiftStatisticsResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn event_gift_statistics(
    stats: web::Data<StatsService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = caller_identity(&req) {
        return Ok(e.error_response());
    }
    match stats.event_gift_statistics(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/gifts/organization/{org_id}/statistics",
    tag = "gifts",
    params(
        ("org_id" = i64, Path, description = "机构ID")
    ),
    security(
        ("caller_identity" = [])
    ),
    responses(
        (status = 200, description = "机构礼品统计", body = [OrganizationEventGiftStatistics]),
        (status = 401, description = "未授权")
    )
)]
pub async fn organization_gift_statistics(
    stats: web::Data<StatsService>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = caller_identity(&req) {
        return Ok(e.error_response());
    }
    match stats.organization_gift_statistics(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn gift_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/gifts")
            .route("/user/history", web::get().to(user_gift_history))
            .route(
                "/event/{event_id}/statistics",
                web::get().to(event_gift_statistics),
            )
            .route(
                "/organization/{org_id}/statistics",
                web::get().to(organization_gift_statistics),
            )
            .route("/upload/{event_id}", web::post().to(upload_gift_inventory))
            .route("/{id}/claim", web::post().to(claim_gift))
            .route("/{id}/redeem", web::post().to(redeem_gift))
            .route("/{id}", web::get().to(get_gift))
            .route("", web::get().to(list_gifts)),
    );
}
