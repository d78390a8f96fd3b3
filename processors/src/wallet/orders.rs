//! One-time payment orders: create with intent CAPTURE, then capture when
//! the donor returns through the capture endpoint.

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
pub struct Order {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl WalletClient {
    pub async fn create_order(&self, donation: &Donation, redirects: &Redirects) -> Res<Order> {
        let description = format!(
            "{}{} one-time donation to {}",
            donation.currency.symbol(),
            donation.amount,
            self.brand
        );
        // Donation reference carried through capture webhooks; the donor
        // note rides along when present.
        let custom_id = match &donation.note {
            Some(note) => clip(note, 127),
            None => Uuid::new_v4().to_string(),
        };

        let order: Order = self
            .post_json(
                "/v2/checkout/orders",
                &json!({
                    "intent": "CAPTURE",
                    "purchase_units": [
                        {
                            "amount": {
                                "currency_code": donation.currency.upper_code(),
                                "value": donation.value_string(),
                            },
                            "description": clip(&description, 127),
                            "custom_id": custom_id,
                        }
                    ],
                    "payment_source": {
                        "paypal": {
                            "experience_context": {
                                "payment_method_preference": "IMMEDIATE_PAYMENT_REQUIRED",
                                "brand_name": self.brand,
                                "landing_page": "NO_PREFERENCE",
                                "user_action": "PAY_NOW",
                                "return_url": redirects.capture,
                                "cancel_url": redirects.cancel,
                            },
                        },
                    },
                }),
            )
            .await?;
        log::info!("created order {} ({})", order.id, order.status);
        Ok(order)
    }

    pub async fn capture_order(&self, order_id: &str) -> Res<Order> {
        self.post_json(&format!("/v2/checkout/orders/{order_id}/capture"), &json!({}))
            .await
    }
}
