//! Domain types for MiniBT

pub mod bar;
pub mod broker;
pub mod ids;
pub mod order;
pub mod position;
pub mod trade;

pub use bar::{Bar, BarError};
pub use broker::BrokerState;
pub use ids::{TradeId, TradeIdGen};
pub use order::OrderIntent;
pub use position::{Position, Side};
pub use trade::Trade;
