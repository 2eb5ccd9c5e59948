//! Route table and the request-scoped layers wrapped around it.

use crate::ApiContext;
use crate::error::ApiError;
use crate::handlers::{
    consume_batch_handler, create_topic_handler, get_consumer_group_handler, get_topic_handler,
    health_handler, list_brokers_handler, list_consumer_groups_handler, list_topics_handler,
    stream_messages_handler, update_topic_handler,
};

use std::any::Any;

use axum::Router;
use axum::extract::Request;
use axum::http::HeaderName;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use kafka_admin_broker::BrokerGateway;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info_span};

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builds the admin API router.
pub fn create_router<G: BrokerGateway>(ctx: ApiContext<G>) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();

            info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id,
            )
        })
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route("/brokers", get(list_brokers_handler::<G>))
        .route(
            "/topics",
            get(list_topics_handler::<G>).post(create_topic_handler::<G>),
        )
        .route(
            "/topics/{topic}",
            get(get_topic_handler::<G>).put(update_topic_handler::<G>),
        )
        .route("/topics/{topic}/consume", get(consume_batch_handler::<G>))
        .route("/topics/{topic}/messages", get(stream_messages_handler::<G>))
        .route("/consumer-groups", get(list_consumer_groups_handler::<G>))
        .route(
            "/consumer-groups/{group_id}",
            get(get_consumer_group_handler::<G>),
        )
        .fallback(|| async { ApiError::not_found("not found") })
        .with_state(ctx)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(trace)
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
}

/// Turns a handler panic into a 500 with the usual error body.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    error!(panic = detail, "handler panicked");

    ApiError::internal("internal server error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn boom() -> StatusCode {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_panicking_handler_returns_json_error() {
        let router = Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(panic_response));

        let response = router
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "internal server error" }));
    }
}
