//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::Once;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Login Metrics
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("anvil_logins_total", "Total number of OAuth callbacks by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref EMAIL_RESOLUTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("anvil_email_resolutions_total", "Total resolved emails by source tier"),
        &["source"]
    ).expect("metric can be created");

    // Notification Metrics
    pub static ref SIGNUP_NOTIFICATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("anvil_signup_notifications_total", "Total signup notifications by status"),
        &["status"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("anvil_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(LOGINS_TOTAL.clone()))
            .expect("LOGINS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(EMAIL_RESOLUTIONS_TOTAL.clone()))
            .expect("EMAIL_RESOLUTIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(SIGNUP_NOTIFICATIONS_TOTAL.clone()))
            .expect("SIGNUP_NOTIFICATIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}
