//! Signup notifications
//!
//! Best-effort POST of each login to an external collector (e.g. a
//! spreadsheet web hook). Delivery runs on a detached task and never
//! affects the login response.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::Serialize;

use crate::config::NotificationConfig;
use crate::error::{AppError, Result};
use crate::metrics::SIGNUP_NOTIFICATIONS_TOTAL;

/// Event payload sent to the collector
#[derive(Debug, Clone, Serialize)]
pub struct SignupEvent {
    pub name: String,
    pub email: Option<String>,
    pub login: String,
    pub ts: String,
    pub source: String,
}

impl SignupEvent {
    pub fn new(
        name: &str,
        email: Option<&str>,
        login: &str,
        source: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.to_string(),
            email: email.map(str::to_string),
            login: login.to_string(),
            ts: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            source: source.to_string(),
        }
    }
}

/// Delivers [`SignupEvent`]s to the configured endpoint
#[derive(Debug, Clone)]
pub struct SignupNotifier {
    http_client: reqwest::Client,
    endpoint: Option<String>,
    source: String,
}

impl SignupNotifier {
    /// Create the notifier
    ///
    /// The client must not follow redirects: collectors such as Apps Script
    /// acknowledge with a 302, and following it would replay the POST as a GET.
    pub fn new(config: &NotificationConfig, timeout: std::time::Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        let endpoint = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .map(str::to_string);

        if endpoint.is_none() {
            tracing::warn!("notification.endpoint not set; signup notifications are disabled");
        }

        Ok(Self {
            http_client,
            endpoint,
            source: config.source.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Source tag for events built by callers
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fire and forget
    ///
    /// Spawns the delivery and returns immediately. The outcome is only logged.
    pub fn notify(&self, event: SignupEvent) {
        if !self.is_enabled() {
            SIGNUP_NOTIFICATIONS_TOTAL
                .with_label_values(&["skipped"])
                .inc();
            tracing::debug!(login = %event.login, "Skipping signup notification");
            return;
        }

        let notifier = self.clone();
        tokio::spawn(async move {
            match notifier.deliver(&event).await {
                Ok(status) => {
                    SIGNUP_NOTIFICATIONS_TOTAL.with_label_values(&["sent"]).inc();
                    tracing::info!(
                        login = %event.login,
                        status = %status,
                        "Signup notification delivered"
                    );
                }
                Err(error) => {
                    SIGNUP_NOTIFICATIONS_TOTAL
                        .with_label_values(&["failed"])
                        .inc();
                    tracing::warn!(login = %event.login, %error, "Signup notification failed");
                }
            }
        });
    }

    /// POST a single event
    ///
    /// Any 2xx or 3xx answer counts as received.
    pub async fn deliver(&self, event: &SignupEvent) -> Result<StatusCode> {
        let Some(endpoint) = &self.endpoint else {
            return Err(AppError::Config(
                "notification.endpoint is not configured".to_string(),
            ));
        };

        let response = self.http_client.post(endpoint).json(event).send().await?;
        let status = response.status();

        if status.is_success() || status.is_redirection() {
            Ok(status)
        } else {
            Err(AppError::Internal(anyhow::anyhow!(
                "collector answered HTTP {}",
                status
            )))
        }
    }
}
