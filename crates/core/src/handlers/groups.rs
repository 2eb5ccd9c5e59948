use crate::ApiContext;
use crate::error::ApiError;

use axum::Json;
use axum::extract::{Path, State};
use kafka_admin_broker::{BrokerGateway, ConsumerGroup, ConsumerGroupDetail};

pub(crate) async fn list_consumer_groups_handler<G: BrokerGateway>(
    State(ctx): State<ApiContext<G>>,
) -> Result<Json<Vec<ConsumerGroup>>, ApiError> {
    ctx.broker()
        .list_consumer_groups()
        .await
        .map(Json)
        .map_err(|e| ApiError::broker("list consumer groups", &e))
}

pub(crate) async fn get_consumer_group_handler<G: BrokerGateway>(
    State(ctx): State<ApiContext<G>>,
    Path(group_id): Path<String>,
) -> Result<Json<ConsumerGroupDetail>, ApiError> {
    let group_id = group_id.trim();
    if group_id.is_empty() {
        return Err(ApiError::bad_request("group id required"));
    }

    ctx.broker()
        .get_consumer_group(group_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::broker("get consumer group", &e))
}
