use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    service::EventService,
    types::{
        AttendeeResponse, CreateEventRequest, CreateEventResponse, EventResponse,
        PublicEventResponse, RegisterAttendeeRequest, SyncedEventResponse, UpdateEventRequest,
    },
};
use crate::shared::{AppError, AppJson, AppState};
use crate::user::AuthUser;

fn event_service(state: &AppState) -> EventService {
    EventService::new(
        Arc::clone(&state.event_repository),
        Arc::clone(&state.meeting_provider),
    )
}

/// POST /events
/// Creates an event and, when possible, its remote meeting
#[instrument(name = "create_event", skip(state, user, request), fields(user_id = %user.id))]
pub async fn create_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(request): AppJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<CreateEventResponse>), AppError> {
    let outcome = event_service(&state)
        .create_event_with_meeting(&user, request)
        .await?;

    let meeting = outcome.remote.meeting().cloned();
    let response = CreateEventResponse {
        meeting_attached: meeting.is_some(),
        meeting,
        event: outcome.local.into(),
    };

    info!(
        event_id = %response.event.id,
        meeting_attached = response.meeting_attached,
        "Event created successfully"
    );

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /events
#[instrument(name = "list_events", skip(state, user), fields(user_id = %user.id))]
pub async fn list_events(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = event_service(&state).list_events(&user).await?;

    info!(event_count = events.len(), "Events listed successfully");
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

/// GET /events/:id
#[instrument(name = "get_event", skip(state, user), fields(user_id = %user.id))]
pub async fn get_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventResponse>, AppError> {
    let event = event_service(&state).get_event(&user, event_id).await?;
    Ok(Json(event.into()))
}

/// PUT /events/:id
#[instrument(name = "update_event", skip(state, user, request), fields(user_id = %user.id))]
pub async fn update_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<Uuid>,
    AppJson(request): AppJson<UpdateEventRequest>,
) -> Result<Json<SyncedEventResponse>, AppError> {
    let outcome = event_service(&state)
        .update_event_and_meeting(&user, event_id, request)
        .await?;

    Ok(Json(SyncedEventResponse {
        event: outcome.local.into(),
        meeting_sync: outcome.remote,
    }))
}

/// DELETE /events/:id
#[instrument(name = "delete_event", skip(state, user), fields(user_id = %user.id))]
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    event_service(&state)
        .delete_event_and_meeting(&user, event_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /events/:id/meeting/refresh
#[instrument(name = "refresh_meeting", skip(state, user), fields(user_id = %user.id))]
pub async fn refresh_meeting(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<SyncedEventResponse>, AppError> {
    let outcome = event_service(&state)
        .refresh_meeting(&user, event_id)
        .await?;

    Ok(Json(SyncedEventResponse {
        event: outcome.local.into(),
        meeting_sync: outcome.remote,
    }))
}

/// GET /events/:id/attendees
#[instrument(name = "list_attendees", skip(state, user), fields(user_id = %user.id))]
pub async fn list_attendees(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<AttendeeResponse>>, AppError> {
    let attendees = event_service(&state)
        .list_attendees(&user, event_id)
        .await?;

    Ok(Json(
        attendees.into_iter().map(AttendeeResponse::from).collect(),
    ))
}

/// DELETE /events/:id/attendees/:attendee_id
#[instrument(name = "unregister_attendee", skip(state, user), fields(user_id = %user.id))]
pub async fn unregister_attendee(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((event_id, attendee_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    event_service(&state)
        .unregister_attendee(&user, event_id, attendee_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /public/events/:id
#[instrument(name = "get_public_event", skip(state))]
pub async fn get_public_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<PublicEventResponse>, AppError> {
    let event = event_service(&state).get_public_event(event_id).await?;
    Ok(Json(event.into()))
}

/// POST /public/events/:id/register
#[instrument(name = "register_attendee", skip(state, request))]
pub async fn register_attendee(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    AppJson(request): AppJson<RegisterAttendeeRequest>,
) -> Result<(StatusCode, Json<AttendeeResponse>), AppError> {
    let attendee = event_service(&state)
        .register_attendee(event_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(attendee.into())))
}
