use kafka_admin_broker::BrokerGateway;
use kafka_admin_streaming::StreamingGateway;
use tokio_util::task::TaskTracker;

/// State shared by every handler.
#[derive(Clone)]
pub struct ApiContext<G: BrokerGateway> {
    pub(crate) gateway: StreamingGateway<G>,

    /// Live streams outlive the request that started them, so they are
    /// tracked here and awaited on shutdown.
    pub(crate) stream_tracker: TaskTracker,
}

impl<G: BrokerGateway> ApiContext<G> {
    /// Creates a context around a streaming gateway.
    pub const fn new(gateway: StreamingGateway<G>, stream_tracker: TaskTracker) -> Self {
        Self {
            gateway,
            stream_tracker,
        }
    }

    pub(crate) const fn broker(&self) -> &G {
        self.gateway.broker()
    }
}
