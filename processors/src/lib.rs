use async_trait::async_trait;
use common::{
    donation::{Donation, Redirects},
    error::Res,
};

pub mod card;
pub mod wallet;

/// Transmission headers the wallet processor attaches to webhook deliveries,
/// replayed to its verify-webhook-signature API.
#[derive(Clone, Debug)]
pub struct WebhookHeaders {
    pub transmission_id: String,
    pub transmission_time: String,
    pub transmission_sig: String,
    pub cert_url: String,
    pub auth_algo: String,
}

/// Capability interface over a payment processor.
///
/// One orchestrator drives either implementation: the card processor uses
/// hosted checkout sessions (inline pricing for one-time, catalog prices for
/// recurring), the wallet processor uses orders and plan subscriptions.
/// All methods return a caller-facing redirect URL or an [`common::error::AppError`].
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Creates a single-payment session and returns the donor redirect URL.
    async fn create_one_time_session(&self, donation: &Donation, redirects: &Redirects)
    -> Res<String>;

    /// Creates a recurring-billing session, resolving (or lazily creating)
    /// the catalog product and price/plan for the donation tier.
    async fn create_recurring_session(
        &self,
        donation: &Donation,
        redirects: &Redirects,
    ) -> Res<String>;

    /// Resolves the URL where the donor can self-manage their recurring
    /// donation. `NotFound` when no billing customer matches the email.
    async fn management_url(&self, email: &str, return_url: &str) -> Res<String>;

    /// Finalizes a previously approved one-time order and returns the
    /// processor's resulting status string (e.g. "COMPLETED").
    async fn capture_order(&self, order_id: &str) -> Res<String>;

    /// Verifies an inbound webhook event. Rejects with a validation error on
    /// signature failure; accepts with a warning when verification is not
    /// configured for this deployment.
    async fn verify_webhook(
        &self,
        headers: Option<&WebhookHeaders>,
        event: &serde_json::Value,
    ) -> Res<()>;
}

/// Truncates to the processor's custom-field length limit (127 characters
/// observed on order and subscription custom ids).
pub(crate) fn clip(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
