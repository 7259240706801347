pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use services::gateway::AiGatewayService;
pub use services::stream::StreamAggregator;
