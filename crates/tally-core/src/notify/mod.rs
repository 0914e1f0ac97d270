//! Outbound notifications about back-office events.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use tally_db::models::ServicePlan;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notice {
    PlanCreated {
        plan_id: Uuid,
        customer_id: Uuid,
        name: String,
        total_price: f64,
    },
    ErpConnectionFailed {
        connection_id: Uuid,
        error: String,
    },
}

impl Notice {
    pub fn plan_created(plan: &ServicePlan) -> Self {
        Self::PlanCreated {
            plan_id: plan.id,
            customer_id: plan.customer_id,
            name: plan.name.clone(),
            total_price: plan.total_price,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifications are not configured")]
    NotConfigured,

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook rejected the notice with HTTP {status}")]
    Rejected { status: u16 },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// POSTs each notice as JSON to a fixed URL.
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        let response = self.http.post(&self.url).json(notice).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }
        debug!(url = %self.url, "notice delivered");
        Ok(())
    }
}

/// Used when no webhook is configured. Every call reports `NotConfigured`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, _notice: &Notice) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }
}

/// Send `notice`, logging a failure instead of propagating it. Returns
/// whether delivery succeeded.
pub async fn deliver(notifier: &dyn Notifier, notice: &Notice) -> bool {
    match notifier.notify(notice).await {
        Ok(()) => true,
        Err(NotifyError::NotConfigured) => {
            debug!("notifications disabled; notice dropped");
            false
        }
        Err(e) => {
            warn!(error = %e, "failed to deliver notice");
            false
        }
    }
}
