//! Recurring-billing subscriptions referencing a resolved billing plan.

use common::{
    donation::{Donation, Redirects},
    error::Res,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{Link, client::WalletClient};
use crate::clip;

#[derive(Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl WalletClient {
    pub async fn create_subscription(
        &self,
        plan_id: &str,
        donation: &Donation,
        redirects: &Redirects,
    ) -> Res<Subscription> {
        let custom_id = match &donation.note {
            Some(note) => clip(note, 127),
            None => Uuid::new_v4().to_string(),
        };

        let subscription: Subscription = self
            .post_json(
                "/v1/billing/subscriptions",
                &json!({
                    "plan_id": plan_id,
                    "subscriber": {
                        "name": { "given_name": donation.donor.given_name_or_default() },
                        "email_address": donation.donor.email,
                    },
                    "custom_id": custom_id,
                    "application_context": {
                        "brand_name": self.brand,
                        "user_action": "SUBSCRIBE_NOW",
                        "return_url": redirects.success,
                        "cancel_url": redirects.cancel,
                    },
                }),
            )
            .await?;
        log::info!(
            "created subscription {} ({})",
            subscription.id,
            subscription.status
        );
        Ok(subscription)
    }
}
