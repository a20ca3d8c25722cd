//! WEEX exchange client

pub mod auth;
pub mod weex;

pub use auth::WeexSigner;
pub use weex::{OrderAck, WeexClient};
