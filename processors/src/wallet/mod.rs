//! Wallet processor: a PayPal-style REST API driven with `reqwest`.
//!
//! One-time donations become orders (created, then captured when the donor
//! returns); recurring donations become subscriptions against lazily created
//! catalog products and billing plans. Both flows hand back an approval link
//! distinguished by its relation tag.

pub mod client;

mod catalog;
mod orders;
mod subs;

use std::sync::Arc;

use async_trait::async_trait;
use common::{
    donation::{Donation, Redirects},
    env_config::Config,
    error::{AppError, Res},
};
use serde::Deserialize;

use crate::{PaymentProcessor, WebhookHeaders};
use client::WalletClient;

/// URL of the wallet processor's own account-management page. The wallet
/// API has no embeddable billing portal, so recurring donors are sent to
/// the processor's generic autopay page instead.
const ACCOUNT_MANAGEMENT_URL: &str = "https://www.paypal.com/myaccount/autopay/";

#[derive(Clone, Debug, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
}

/// Picks the link with the given relation tag out of an approval-link set:
/// "payer-action" for one-time orders, "approve" for subscriptions.
fn link_with_rel(links: &[Link], rel: &str) -> Res<String> {
    links
        .iter()
        .find(|link| link.rel == rel)
        .map(|link| link.href.clone())
        .ok_or_else(|| AppError::Processor(format!("no approval link (rel \"{rel}\")")))
}

pub struct WalletProcessor {
    client: WalletClient,
    webhook_id: String,
}

impl WalletProcessor {
    pub fn new(config: &Arc<Config>) -> Res<Self> {
        Ok(WalletProcessor {
            client: WalletClient::new(
                &config.wallet,
                &config.brand_name,
                config.outbound_timeout_secs,
            )?,
            webhook_id: config.wallet.webhook_id.clone(),
        })
    }
}

#[async_trait]
impl PaymentProcessor for WalletProcessor {
    async fn create_one_time_session(
        &self,
        donation: &Donation,
        redirects: &Redirects,
    ) -> Res<String> {
        let order = self.client.create_order(donation, redirects).await?;
        link_with_rel(&order.links, "payer-action")
    }

    async fn create_recurring_session(
        &self,
        donation: &Donation,
        redirects: &Redirects,
    ) -> Res<String> {
        let interval = donation
            .frequency
            .interval()
            .ok_or_else(|| AppError::Internal("one-time donation routed as recurring".to_string()))?;

        let product_id = self.client.get_or_create_product(donation.frequency).await?;
        let plan_id = self
            .client
            .get_or_create_plan(&product_id, donation, interval)
            .await?;
        let subscription = self
            .client
            .create_subscription(&plan_id, donation, redirects)
            .await?;
        link_with_rel(&subscription.links, "approve")
    }

    async fn management_url(&self, _email: &str, _return_url: &str) -> Res<String> {
        // Deliberate capability gap: no per-customer portal session exists,
        // donors manage recurring payments in their own wallet account.
        Ok(ACCOUNT_MANAGEMENT_URL.to_string())
    }

    async fn capture_order(&self, order_id: &str) -> Res<String> {
        let captured = self.client.capture_order(order_id).await?;
        Ok(captured.status)
    }

    async fn verify_webhook(
        &self,
        headers: Option<&WebhookHeaders>,
        event: &serde_json::Value,
    ) -> Res<()> {
        if self.webhook_id.is_empty() {
            log::warn!("PAYPAL_WEBHOOK_ID not configured, accepting unverified webhook event");
            return Ok(());
        }

        let headers = headers
            .ok_or_else(|| AppError::Validation("missing_signature".to_string()))?;

        if self
            .client
            .verify_webhook_signature(&self.webhook_id, headers, event)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::Validation("invalid_signature".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> Vec<Link> {
        vec![
            Link {
                href: "https://wallet.example/self".to_string(),
                rel: "self".to_string(),
            },
            Link {
                href: "https://wallet.example/approve".to_string(),
                rel: "approve".to_string(),
            },
            Link {
                href: "https://wallet.example/pay".to_string(),
                rel: "payer-action".to_string(),
            },
        ]
    }

    #[test]
    fn picks_link_by_relation_tag() {
        assert_eq!(
            link_with_rel(&links(), "payer-action").unwrap(),
            "https://wallet.example/pay"
        );
        assert_eq!(
            link_with_rel(&links(), "approve").unwrap(),
            "https://wallet.example/approve"
        );
    }

    #[test]
    fn missing_relation_is_a_processor_error() {
        let err = link_with_rel(&links()[..1], "approve").unwrap_err();
        assert!(err.to_string().contains("no approval link"));
    }
}
