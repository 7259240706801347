pub mod assistant;
pub mod gateway;
pub mod stream;
