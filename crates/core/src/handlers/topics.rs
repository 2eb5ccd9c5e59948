use crate::ApiContext;
use crate::error::ApiError;
use crate::query::required_topic;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use kafka_admin_broker::{
    BrokerGateway, CreateTopicRequest, Topic, TopicDetail, UpdateTopicRequest,
};
use serde_json::{Value, json};
use tracing::debug;

const MAX_REPLICATION_FACTOR: i16 = 3;

pub(crate) async fn list_topics_handler<G: BrokerGateway>(
    State(ctx): State<ApiContext<G>>,
) -> Result<Json<Vec<Topic>>, ApiError> {
    ctx.broker()
        .list_topics()
        .await
        .map(Json)
        .map_err(|e| ApiError::broker("list topics", &e))
}

pub(crate) async fn get_topic_handler<G: BrokerGateway>(
    State(ctx): State<ApiContext<G>>,
    Path(topic): Path<String>,
) -> Result<Json<TopicDetail>, ApiError> {
    let topic = required_topic(&topic)?;

    ctx.broker()
        .get_topic(&topic)
        .await
        .map(Json)
        .map_err(|e| ApiError::broker("get topic", &e))
}

pub(crate) async fn create_topic_handler<G: BrokerGateway>(
    State(ctx): State<ApiContext<G>>,
    body: Result<Json<CreateTopicRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(mut request) = body.map_err(|e| {
        debug!(error = %e, "rejected create topic body");
        ApiError::bad_request("invalid request body")
    })?;

    request.name = request.name.trim().to_string();
    validate_create(&request)?;

    ctx.broker()
        .create_topic(request)
        .await
        .map_err(|e| ApiError::broker("create topic", &e))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "topic created" })),
    ))
}

pub(crate) async fn update_topic_handler<G: BrokerGateway>(
    State(ctx): State<ApiContext<G>>,
    Path(topic): Path<String>,
    body: Result<Json<UpdateTopicRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let topic = required_topic(&topic)?;
    let Json(request) = body.map_err(|_| ApiError::bad_request("invalid request body"))?;

    if request.configs.is_empty() {
        return Err(ApiError::bad_request("configs required"));
    }

    ctx.broker()
        .update_topic_config(&topic, request.configs)
        .await
        .map_err(|e| ApiError::broker("update topic config", &e))?;

    Ok(Json(json!({ "message": "topic config updated" })))
}

fn validate_create(request: &CreateTopicRequest) -> Result<(), ApiError> {
    if request.name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    if request.partitions < 1 {
        return Err(ApiError::bad_request("partitions must be at least 1"));
    }

    if !(1..=MAX_REPLICATION_FACTOR).contains(&request.replication_factor) {
        return Err(ApiError::bad_request(format!(
            "replication_factor must be between 1 and {MAX_REPLICATION_FACTOR}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn request(name: &str, partitions: i32, replication_factor: i16) -> CreateTopicRequest {
        CreateTopicRequest {
            name: name.to_string(),
            partitions,
            replication_factor,
            configs: HashMap::new(),
        }
    }

    #[test]
    fn test_validate_create() {
        assert!(validate_create(&request("orders", 3, 1)).is_ok());
        assert!(validate_create(&request("orders", 1, 3)).is_ok());
        assert!(validate_create(&request("", 1, 1)).is_err());
        assert!(validate_create(&request("orders", 0, 1)).is_err());
        assert!(validate_create(&request("orders", 1, 0)).is_err());
        assert!(validate_create(&request("orders", 1, 4)).is_err());
    }
}
