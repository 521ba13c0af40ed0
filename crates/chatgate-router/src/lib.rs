pub mod gateway;

pub use gateway::{GatewayState, gateway_router};
