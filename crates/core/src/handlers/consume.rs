use crate::ApiContext;
use crate::error::ApiError;
use crate::query::{BATCH_GROUP_ID, ConsumeQuery, STREAM_GROUP_ID, required_topic};

use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, Sse};
use kafka_admin_broker::{BrokerGateway, Message};
use kafka_admin_streaming::{HEARTBEAT_COMMENT, StreamEvent};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{Instrument, Span, error};

#[derive(Debug, Serialize)]
pub(crate) struct BatchResponse {
    topic: String,
    group_id: String,
    count: usize,
    messages: Vec<Message>,
}

pub(crate) async fn consume_batch_handler<G: BrokerGateway>(
    State(ctx): State<ApiContext<G>>,
    Path(topic): Path<String>,
    Query(query): Query<ConsumeQuery>,
) -> Result<Json<BatchResponse>, ApiError> {
    let topic = required_topic(&topic)?;
    let options = query.session_options(topic, BATCH_GROUP_ID)?;
    let group_id = options.group_id.clone();
    let topic = options.topic.clone();

    let messages = ctx
        .gateway
        .batch(options, query.batch_max(), query.batch_timeout())
        .await
        .map_err(|e| ApiError::broker("batch consume", &e))?;

    Ok(Json(BatchResponse {
        topic,
        group_id,
        count: messages.len(),
        messages,
    }))
}

/// Streams messages as server-sent events.
///
/// The stream runs in its own task feeding a single-slot channel that the
/// response body drains. When the client goes away the body is dropped, the
/// next send fails and the stream closes its session.
pub(crate) async fn stream_messages_handler<G: BrokerGateway>(
    State(ctx): State<ApiContext<G>>,
    Path(topic): Path<String>,
    Query(query): Query<ConsumeQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let topic = required_topic(&topic)?;
    let options = query.session_options(topic, STREAM_GROUP_ID)?;
    let max_messages = query.stream_max();

    let (mut sender, receiver) = mpsc::channel::<StreamEvent>(1);
    let gateway = ctx.gateway.clone();

    ctx.stream_tracker.spawn(
        async move {
            gateway.live(options, max_messages, &mut sender).await;
        }
        .instrument(Span::current()),
    );

    Ok(Sse::new(ReceiverStream::new(receiver).filter_map(|event| to_sse_event(&event).map(Ok))))
}

fn to_sse_event(event: &StreamEvent) -> Option<Event> {
    let Some(name) = event.name() else {
        return Some(Event::default().comment(HEARTBEAT_COMMENT));
    };

    match event.data() {
        Ok(data) => Some(Event::default().event(name).data(data.unwrap_or_default())),
        Err(e) => {
            error!(event = name, error = %e, "failed to encode stream event");
            None
        }
    }
}
