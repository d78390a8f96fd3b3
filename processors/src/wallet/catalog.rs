//! Lookup-or-create of wallet-side catalog products and billing plans.
//!
//! State is re-derived from the processor's list endpoints on every cold
//! call; a dashmap tuple cache fronts the plan query so repeated donations
//! at the same tier skip the list round-trip. Creation is at-least-once
//! under races: two concurrent first donations can both miss the list and
//! each create an object, which clutters the catalog but never double-bills.

use common::{
    donation::Donation,
    error::Res,
    policy::{Frequency, Interval},
};
use serde::Deserialize;
use serde_json::json;

use super::client::WalletClient;

#[derive(Deserialize)]
struct CatalogProduct {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct ProductList {
    #[serde(default)]
    products: Vec<CatalogProduct>,
}

#[derive(Deserialize)]
struct BillingPlan {
    id: String,
    status: String,
    #[serde(default)]
    billing_cycles: Vec<BillingCycle>,
}

#[derive(Deserialize)]
struct BillingCycle {
    frequency: CycleFrequency,
    pricing_scheme: PricingScheme,
}

#[derive(Deserialize)]
struct CycleFrequency {
    interval_unit: String,
}

#[derive(Deserialize)]
struct PricingScheme {
    fixed_price: FixedPrice,
}

#[derive(Deserialize)]
struct FixedPrice {
    value: String,
    currency_code: String,
}

#[derive(Deserialize)]
struct PlanList {
    #[serde(default)]
    plans: Vec<BillingPlan>,
}

impl WalletClient {
    /// One product per recurring frequency class, matched by exact name.
    pub async fn get_or_create_product(&self, frequency: Frequency) -> Res<String> {
        let name = format!("{} {} Donation", self.brand, frequency.label());

        let list: ProductList = self
            .get_json("/v1/catalogs/products?page_size=20&total_required=true")
            .await?;
        if let Some(existing) = list.products.into_iter().find(|p| p.name == name) {
            return Ok(existing.id);
        }

        let product: CatalogProduct = self
            .post_json(
                "/v1/catalogs/products",
                &json!({
                    "name": name,
                    "description": format!("{} donation to {}", frequency.label(), self.brand),
                    "type": "SERVICE",
                    "category": "CHARITY",
                }),
            )
            .await?;
        log::info!("created catalog product \"{}\" ({})", name, product.id);
        Ok(product.id)
    }

    /// One plan per (product, currency, amount, interval), matched exactly
    /// against the product's ACTIVE plans.
    pub async fn get_or_create_plan(
        &self,
        product_id: &str,
        donation: &Donation,
        interval: Interval,
    ) -> Res<String> {
        let currency = donation.currency.upper_code();
        let value = donation.value_string();
        let unit = interval.wallet_unit();

        let key = (product_id.to_string(), currency.clone(), value.clone(), unit);
        if let Some(cached) = self.cached_plan_id(&key) {
            return Ok(cached);
        }

        let list: PlanList = self
            .get_json(&format!(
                "/v1/billing/plans?product_id={product_id}&page_size=20&total_required=true"
            ))
            .await?;

        let existing = list.plans.into_iter().find(|plan| {
            if plan.status != "ACTIVE" {
                return false;
            }
            let Some(cycle) = plan.billing_cycles.first() else {
                return false;
            };
            cycle.frequency.interval_unit == unit
                && cycle.pricing_scheme.fixed_price.value == value
                && cycle.pricing_scheme.fixed_price.currency_code == currency
        });
        if let Some(plan) = existing {
            self.remember_plan(key, &plan.id);
            return Ok(plan.id);
        }

        let plan: BillingPlan = self
            .post_json(
                "/v1/billing/plans",
                &json!({
                    "product_id": product_id,
                    "name": format!("{} Donation {currency} {value}", donation.frequency.label()),
                    "description": format!("{} donation to {}", donation.frequency.label(), self.brand),
                    "billing_cycles": [
                        {
                            "frequency": { "interval_unit": unit, "interval_count": 1 },
                            "tenure_type": "REGULAR",
                            "sequence": 1,
                            // unlimited cycles
                            "total_cycles": 0,
                            "pricing_scheme": {
                                "fixed_price": { "value": value, "currency_code": currency },
                            },
                        }
                    ],
                    "payment_preferences": {
                        "auto_bill_outstanding": true,
                        "payment_failure_threshold": 3,
                    },
                }),
            )
            .await?;
        log::info!(
            "created billing plan {} ({currency} {value} / {unit})",
            plan.id
        );
        self.remember_plan(key, &plan.id);
        Ok(plan.id)
    }
}
