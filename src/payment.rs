//! Payment collaborator.
//!
//! The refund workflow issues exactly one call per request through this
//! trait. The outcome is a closed set so callers branch on kind, never on
//! string equality.

use async_trait::async_trait;
use serde::Deserialize;

/// Result of a refund attempt against the external processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefundOutcome {
    /// The only outcome that authorizes the Refunded transition.
    Succeeded,
    /// The processor understood the request and said no.
    Declined { reason: String },
    /// Transport failure or unusable response; retry may be worthwhile.
    Error { detail: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn refund(&self, payment_intent_id: &str) -> RefundOutcome;
}

/// Stripe refunds API over HTTP.
pub struct StripeGateway {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct StripeRefund {
    status: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            base_url: "https://api.stripe.com".into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn refund(&self, payment_intent_id: &str) -> RefundOutcome {
        let response = self
            .http
            .post(format!("{}/v1/refunds", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&[("payment_intent", payment_intent_id)])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                return RefundOutcome::Error {
                    detail: e.to_string(),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // 402 is Stripe's "request was fine, refund was not".
            if status.as_u16() == 402 {
                return RefundOutcome::Declined { reason: body };
            }
            return RefundOutcome::Error {
                detail: format!("{status}: {body}"),
            };
        }

        match response.json::<StripeRefund>().await {
            Ok(refund) if refund.status == "succeeded" => RefundOutcome::Succeeded,
            Ok(refund) => RefundOutcome::Declined {
                reason: refund.status,
            },
            Err(e) => RefundOutcome::Error {
                detail: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Gateway stub that records how often it was invoked.
    pub(crate) struct StubGateway {
        outcome: RefundOutcome,
        calls: AtomicUsize,
    }

    impl StubGateway {
        pub(crate) fn succeeding() -> Self {
            Self::with(RefundOutcome::Succeeded)
        }

        pub(crate) fn declining(reason: &str) -> Self {
            Self::with(RefundOutcome::Declined {
                reason: reason.into(),
            })
        }

        pub(crate) fn with(outcome: RefundOutcome) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn refund(&self, _payment_intent_id: &str) -> RefundOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }
}
