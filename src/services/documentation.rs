use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

/// Aggregated OpenAPI specification for Matchday Back.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::list_games,
        crate::routes::game::get_game,
        crate::routes::game::cancel_game,
        crate::routes::game::complete_game,
        crate::routes::join_request::create_join_request,
        crate::routes::join_request::approve_join_request,
        crate::routes::join_request::reject_join_request,
        crate::routes::join_request::cancel_join_request,
        crate::routes::join_request::list_join_requests,
        crate::routes::join_request::legacy_join,
        crate::routes::join_request::legacy_approve,
        crate::routes::join_request::legacy_reject,
        crate::routes::coach::create_slot,
        crate::routes::coach::list_slots,
        crate::routes::coach::delete_slot,
        crate::routes::coach::request_booking,
        crate::routes::coach::list_bookings,
        crate::routes::coach::accept_booking,
        crate::routes::coach::reject_booking,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::common::ActionResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::GameResponse,
            crate::dto::game::GameListResponse,
            crate::dto::join_request::JoinRequestResponse,
            crate::dto::join_request::ApprovalResponse,
            crate::dto::join_request::JoinRequestListResponse,
            crate::dto::coach::CreateSlotRequest,
            crate::dto::coach::BookSlotRequest,
            crate::dto::coach::RejectBookingRequest,
            crate::dto::coach::SlotResponse,
            crate::dto::coach::SlotListResponse,
            crate::dto::coach::BookingResponse,
            crate::dto::coach::BookingListResponse,
            crate::dao::models::GameStatus,
            crate::dao::models::JoinRequestStatus,
            crate::dao::models::CoachBookingStatus,
        )
    ),
    modifiers(&UserIdHeader),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Pickup games"),
        (name = "join-requests", description = "Requests to join a game"),
        (name = "coach", description = "Coach slots and 1:1 bookings"),
    )
)]
pub struct ApiDoc;

/// Documents the identity header forwarded by the auth gateway.
struct UserIdHeader;

impl Modify for UserIdHeader {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    crate::routes::auth::USER_ID_HEADER,
                ))),
            );
        }
    }
}
