use crate::ApiContext;
use crate::error::ApiError;

use axum::Json;
use axum::extract::State;
use kafka_admin_broker::{Broker, BrokerGateway};

pub(crate) async fn list_brokers_handler<G: BrokerGateway>(
    State(ctx): State<ApiContext<G>>,
) -> Result<Json<Vec<Broker>>, ApiError> {
    ctx.broker()
        .list_brokers()
        .await
        .map(Json)
        .map_err(|e| ApiError::broker("list brokers", &e))
}
