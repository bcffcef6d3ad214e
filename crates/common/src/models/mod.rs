pub mod account;
pub mod order;
pub mod position;
pub mod settings;
pub mod signal;

pub use account::{Account, BalancePoint, CloseAllReport, FillActivity, SubmittedOrder};
pub use order::{OrderKind, OrderSide, OrderSpec, OrderType, TimeInForce};
pub use position::{Position, PositionLookup, PositionSide};
pub use settings::TradingSettings;
pub use signal::{NewSignal, Signal, SignalAction, SignalDocument, StrategyPayload, WebhookPayload};
