//! Short-lived in-process caching in front of the backend stores.

mod transient;

pub use transient::{SystemTicker, Ticker, TransientCache};
