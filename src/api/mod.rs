//! API layer
//!
//! HTTP handlers for:
//! - Identity of the signed-in user
//! - Metrics (Prometheus)

mod me;
pub mod metrics;

pub use me::{MeResponse, me_router};
pub use metrics::metrics_router;
