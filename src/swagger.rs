use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::EventStatus;
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "caller_identity",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Caller-Id"))),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::participation::start_participation,
        handlers::participation::accept_terms,
        handlers::participation::interact_with_tiles,
        handlers::participation::complete_participation,
        handlers::participation::participation_status,
        handlers::gift::list_gifts,
        handlers::gift::get_gift,
        handlers::gift::claim_gift,
        handlers::gift::redeem_gift,
        handlers::gift::upload_gift_inventory,
        handlers::gift::user_gift_history,
        handlers::gift::event_gift_statistics,
        handlers::gift::organization_gift_statistics,
        handlers::event::create_event,
        handlers::event::list_events,
        handlers::event::get_event,
        handlers::event::event_statistics,
        handlers::event::update_event,
        handlers::event::update_event_status,
        handlers::event::delete_event,
        handlers::event::organization_events,
        handlers::event::user_event_history,
        handlers::event::validate_qr,
        handlers::admin::dashboard,
        handlers::admin::organization_dashboard,
    ),
    components(
        schemas(
            EventStatus,
            EventResponse,
            CreateEventRequest,
            UpdateEventRequest,
            UpdateEventStatusRequest,
            ValidateQrRequest,
            EventStatisticsResponse,
            ParticipationStep,
            InteractTilesRequest,
            StartParticipationResponse,
            AcceptTermsResponse,
            InteractTilesResponse,
            CompleteParticipationResponse,
            UserParticipationStatus,
            ParticipationStatusResponse,
            GiftResponse,
            GiftInventoryRow,
            BulkIngestRequest,
            BulkIngestResponse,
            EventGiftStatisticsResponse,
            OrganizationEventGiftStatistics,
            OrganizationResponse,
            AdminOverview,
            PeriodStatsResponse,
            AdminDashboardResponse,
            OrganizationOverview,
            OrganizationDashboardResponse,
            AuditLogResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "event_participation", description = "Event participation flow API"),
        (name = "events", description = "Event management API"),
        (name = "gifts", description = "Gift claim and redemption API"),
        (name = "admin", description = "Admin dashboard API"),
    ),
    info(
        title = "Giftwave Backend API",
        version = "1.0.0",
        description = "Gift and event promotion platform REST API documentation",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
