//! Trading strategy

pub mod momentum;

pub use momentum::{ExitReason, MomentumStrategy, PriceHistory};
