use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        coach::{
            BookSlotRequest, BookingListResponse, BookingResponse, CreateSlotRequest,
            ListBookingsQuery, ListSlotsQuery, RejectBookingRequest, SlotListResponse,
            SlotResponse,
        },
        common::ActionResponse,
    },
    error::AppError,
    routes::auth::CurrentUser,
    services::coach_service,
    state::SharedState,
};

/// Coach slot publication and 1:1 booking endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/coach/slots", get(list_slots).post(create_slot))
        .route("/coach/slots/{id}", delete(delete_slot))
        .route("/coach/bookings", get(list_bookings).post(request_booking))
        .route("/coach/bookings/{id}/accept", put(accept_booking))
        .route("/coach/bookings/{id}/reject", put(reject_booking))
}

/// Publish a bookable slot; the caller is the coach.
#[utoipa::path(
    post,
    path = "/coach/slots",
    tag = "coach",
    request_body = CreateSlotRequest,
    security(("user_id" = [])),
    responses(
        (status = 201, description = "Slot created", body = SlotResponse),
        (status = 400, description = "Invalid window or duplicate slot"),
    )
)]
pub async fn create_slot(
    State(state): State<SharedState>,
    CurrentUser(coach_id): CurrentUser,
    Json(payload): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<SlotResponse>), AppError> {
    payload.validate()?;
    let slot = coach_service::create_slot(&state, coach_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SlotResponse {
            success: true,
            message: Some("slot created".into()),
            slot,
        }),
    ))
}

/// List coach slots.
#[utoipa::path(
    get,
    path = "/coach/slots",
    tag = "coach",
    params(ListSlotsQuery),
    responses((status = 200, description = "Slots, earliest first", body = SlotListResponse))
)]
pub async fn list_slots(
    State(state): State<SharedState>,
    Query(query): Query<ListSlotsQuery>,
) -> Result<Json<SlotListResponse>, AppError> {
    let slots = coach_service::list_slots(&state, query).await?;
    Ok(Json(SlotListResponse {
        success: true,
        count: slots.len(),
        slots,
    }))
}

/// Delete an unbooked slot. Owner only.
#[utoipa::path(
    delete,
    path = "/coach/slots/{id}",
    tag = "coach",
    params(("id" = Uuid, Path, description = "Slot identifier")),
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Slot deleted", body = ActionResponse),
        (status = 400, description = "Slot is booked"),
        (status = 403, description = "Caller does not own the slot"),
        (status = 404, description = "Unknown slot"),
    )
)]
pub async fn delete_slot(
    State(state): State<SharedState>,
    CurrentUser(coach_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    coach_service::delete_slot(&state, id, coach_id).await?;
    Ok(Json(ActionResponse::new("slot deleted")))
}

/// Request a coach slot; the caller is the player.
#[utoipa::path(
    post,
    path = "/coach/bookings",
    tag = "coach",
    request_body = BookSlotRequest,
    security(("user_id" = [])),
    responses(
        (status = 201, description = "Booking requested", body = BookingResponse),
        (status = 400, description = "Slot booked, own slot, duplicate or overlapping"),
        (status = 404, description = "Unknown slot"),
    )
)]
pub async fn request_booking(
    State(state): State<SharedState>,
    CurrentUser(player_id): CurrentUser,
    Json(payload): Json<BookSlotRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    payload.validate()?;
    let booking = coach_service::request_booking(&state, player_id, payload.slot_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            success: true,
            message: Some("booking requested".into()),
            booking,
        }),
    ))
}

/// List the caller's bookings as player or as coach.
#[utoipa::path(
    get,
    path = "/coach/bookings",
    tag = "coach",
    params(ListBookingsQuery),
    security(("user_id" = [])),
    responses((status = 200, description = "Caller's bookings", body = BookingListResponse))
)]
pub async fn list_bookings(
    State(state): State<SharedState>,
    CurrentUser(caller): CurrentUser,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<BookingListResponse>, AppError> {
    let bookings = coach_service::list_bookings(&state, caller, query.role).await?;
    Ok(Json(BookingListResponse {
        success: true,
        count: bookings.len(),
        bookings,
    }))
}

/// Accept a pending booking and claim its slot. Coach only.
#[utoipa::path(
    put,
    path = "/coach/bookings/{id}/accept",
    tag = "coach",
    params(("id" = Uuid, Path, description = "Booking identifier")),
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Booking accepted", body = BookingResponse),
        (status = 400, description = "Not pending or slot no longer available"),
        (status = 403, description = "Caller is not the booking's coach"),
        (status = 404, description = "Unknown booking"),
    )
)]
pub async fn accept_booking(
    State(state): State<SharedState>,
    CurrentUser(coach_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = coach_service::accept_booking(&state, id, coach_id).await?;
    Ok(Json(BookingResponse {
        success: true,
        message: Some("booking accepted".into()),
        booking,
    }))
}

/// Reject a pending booking. Coach only.
#[utoipa::path(
    put,
    path = "/coach/bookings/{id}/reject",
    tag = "coach",
    params(("id" = Uuid, Path, description = "Booking identifier")),
    request_body(content = RejectBookingRequest, description = "Optional reason"),
    security(("user_id" = [])),
    responses(
        (status = 200, description = "Booking rejected", body = BookingResponse),
        (status = 400, description = "Not pending"),
        (status = 403, description = "Caller is not the booking's coach"),
        (status = 404, description = "Unknown booking"),
    )
)]
pub async fn reject_booking(
    State(state): State<SharedState>,
    CurrentUser(coach_id): CurrentUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<RejectBookingRequest>>,
) -> Result<Json<BookingResponse>, AppError> {
    let Json(payload) = payload.unwrap_or_default();
    payload.validate()?;
    let booking = coach_service::reject_booking(&state, id, coach_id, payload.reason).await?;
    Ok(Json(BookingResponse {
        success: true,
        message: Some("booking rejected".into()),
        booking,
    }))
}
