pub mod account_response;
pub mod activity_response;
pub mod alpaca_client;
pub mod order_response;
pub mod position_response;

pub use alpaca_client::{AlpacaClient, AlpacaConfig};

pub const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";

