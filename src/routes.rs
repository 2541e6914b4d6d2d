use axum::{
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::events;
use crate::shared::AppState;
use crate::user;

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME")
    }))
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(user::current_user))
        .route("/auth/subscription", put(user::change_subscription))
        .route("/events", post(events::create_event).get(events::list_events))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/meeting/refresh", post(events::refresh_meeting))
        .route("/events/:id/attendees", get(events::list_attendees))
        .route(
            "/events/:id/attendees/:attendee_id",
            delete(events::unregister_attendee),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            user::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/register", post(user::register_user))
        .route("/auth/login", post(user::login))
        .route("/public/events/:id", get(events::get_public_event))
        .route("/public/events/:id/register", post(events::register_attendee))
        .merge(protected)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt; // for `oneshot`

    #[tokio::test]
    async fn test_health() {
        let app = build_router(AppStateBuilder::new().build());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_event_routes_require_token() {
        let app = build_router(AppStateBuilder::new().build());

        let response = app
            .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_public_routes_skip_auth() {
        let app = build_router(AppStateBuilder::new().build());

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/public/events/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
