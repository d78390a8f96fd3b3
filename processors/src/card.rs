//! Card processor: hosted checkout sessions against the Stripe API.
//!
//! One-time donations use inline price data (no persisted catalog object);
//! recurring donations resolve a product and price through list-and-match,
//! creating them lazily on the first donation of a tier. Two concurrent
//! first-time donations at the same tier can both miss the list query and
//! create duplicate catalog objects; billing is unaffected, so the
//! duplication is accepted.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use common::{
    donation::{Donation, Redirects},
    env_config::Config,
    error::{AppError, Res},
    policy::{Currency, Frequency, Interval},
};
use stripe::{
    BillingPortalConfiguration, BillingPortalSession, CheckoutSession, CheckoutSessionMode,
    Client, CreateBillingPortalConfiguration, CreateBillingPortalConfigurationBusinessProfile,
    CreateBillingPortalConfigurationFeatures,
    CreateBillingPortalConfigurationFeaturesInvoiceHistory,
    CreateBillingPortalConfigurationFeaturesPaymentMethodUpdate,
    CreateBillingPortalConfigurationFeaturesSubscriptionCancel, CreateBillingPortalSession,
    CreateCheckoutSession, CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionLineItemsPriceDataRecurring,
    CreateCheckoutSessionLineItemsPriceDataRecurringInterval, CreatePrice, CreatePriceRecurring,
    CreatePriceRecurringInterval, CreateProduct, Customer, IdOrCreate,
    ListBillingPortalConfigurations, ListCustomers, ListPrices, ListProducts, Price, Product,
    RecurringInterval, UpdateBillingPortalConfiguration,
    UpdateBillingPortalConfigurationFeatures,
    UpdateBillingPortalConfigurationFeaturesInvoiceHistory,
    UpdateBillingPortalConfigurationFeaturesPaymentMethodUpdate,
    UpdateBillingPortalConfigurationFeaturesSubscriptionCancel,
};

use crate::{PaymentProcessor, WebhookHeaders, clip};

pub struct CardProcessor {
    client: Client,
    brand: String,
    timeout: Duration,
}

impl CardProcessor {
    pub fn new(config: &Arc<Config>) -> Self {
        CardProcessor {
            client: Client::new(config.stripe_secret_key.clone()),
            brand: config.brand_name.clone(),
            timeout: Duration::from_secs(config.outbound_timeout_secs),
        }
    }

    /// Bounds a Stripe call with the configured outbound timeout.
    async fn bounded<T>(
        &self,
        label: &str,
        fut: impl Future<Output = Result<T, stripe::StripeError>>,
    ) -> Res<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::Processor(format!(
                "{label} timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    fn metadata(&self, donation: &Donation) -> stripe::Metadata {
        let mut metadata = stripe::Metadata::new();
        metadata.insert("firstName".to_string(), donation.donor.first_name.clone());
        metadata.insert("lastName".to_string(), donation.donor.last_name.clone());
        metadata.insert("donorEmail".to_string(), donation.donor.email.clone());
        metadata.insert(
            "frequency".to_string(),
            donation.frequency.as_str().to_string(),
        );
        metadata.insert("amount".to_string(), donation.amount.to_string());
        metadata.insert("currency".to_string(), donation.currency.code().to_string());
        if let Some(note) = &donation.note {
            metadata.insert("note".to_string(), clip(note, 127));
        }
        metadata
    }

    /// Product lookup by exact name over the first page of active products.
    /// Creates the product when no page entry matches.
    async fn get_or_create_product(&self, frequency: Frequency) -> Res<String> {
        let name = format!("{} {} Donation", self.brand, frequency.label());

        let params = ListProducts {
            active: Some(true),
            limit: Some(100),
            ..Default::default()
        };
        let products = self
            .bounded("product list", Product::list(&self.client, &params))
            .await?;

        if let Some(existing) = products
            .data
            .into_iter()
            .find(|p| p.name.as_deref() == Some(name.as_str()))
        {
            return Ok(existing.id.to_string());
        }

        let product = self
            .bounded(
                "product create",
                Product::create(&self.client, CreateProduct::new(&name)),
            )
            .await?;
        log::info!("created catalog product \"{}\" ({})", name, product.id);
        Ok(product.id.to_string())
    }

    /// Price lookup by exact (minor-unit amount, interval) within the
    /// product's active prices for the donation currency.
    async fn get_or_create_price(
        &self,
        product_id: &str,
        donation: &Donation,
        interval: Interval,
    ) -> Res<String> {
        let currency = stripe_currency(donation.currency);
        let minor_amount = donation.minor_amount();
        let wanted = recurring_interval(interval);

        let params = ListPrices {
            product: Some(IdOrCreate::Id(product_id)),
            currency: Some(currency),
            active: Some(true),
            limit: Some(100),
            ..Default::default()
        };
        let prices = self
            .bounded("price list", Price::list(&self.client, &params))
            .await?;

        if let Some(existing) = prices.data.into_iter().find(|p| {
            p.unit_amount == Some(minor_amount)
                && p.recurring.as_ref().map(|r| r.interval) == Some(wanted)
        }) {
            return Ok(existing.id.to_string());
        }

        let mut params = CreatePrice::new(currency);
        params.product = Some(IdOrCreate::Id(product_id));
        params.unit_amount = Some(minor_amount);
        params.recurring = Some(CreatePriceRecurring {
            interval: create_price_interval(interval),
            ..Default::default()
        });
        let price = self
            .bounded("price create", Price::create(&self.client, params))
            .await?;
        log::info!(
            "created catalog price {} ({} {} / {:?})",
            price.id,
            minor_amount,
            currency,
            interval
        );
        Ok(price.id.to_string())
    }

    /// Reuses the first existing billing-portal configuration, refreshing
    /// its feature flags, rather than accumulating duplicates.
    async fn ensure_portal_configuration(&self) -> Res<String> {
        let params = ListBillingPortalConfigurations {
            active: Some(true),
            limit: Some(1),
            ..Default::default()
        };
        let configurations = self
            .bounded(
                "portal configuration list",
                BillingPortalConfiguration::list(&self.client, &params),
            )
            .await?;

        if let Some(existing) = configurations.data.into_iter().next() {
            let params = UpdateBillingPortalConfiguration {
                features: Some(UpdateBillingPortalConfigurationFeatures {
                    invoice_history: Some(
                        UpdateBillingPortalConfigurationFeaturesInvoiceHistory { enabled: true },
                    ),
                    payment_method_update: Some(
                        UpdateBillingPortalConfigurationFeaturesPaymentMethodUpdate {
                            enabled: true,
                        },
                    ),
                    subscription_cancel: Some(
                        UpdateBillingPortalConfigurationFeaturesSubscriptionCancel {
                            enabled: true,
                            ..Default::default()
                        },
                    ),
                    ..Default::default()
                }),
                ..Default::default()
            };
            let updated = self
                .bounded(
                    "portal configuration update",
                    BillingPortalConfiguration::update(&self.client, &existing.id, params),
                )
                .await?;
            return Ok(updated.id.to_string());
        }

        let headline = format!("Manage your {} donation", self.brand);
        let params = CreateBillingPortalConfiguration {
            business_profile: CreateBillingPortalConfigurationBusinessProfile {
                headline: Some(&headline),
                ..Default::default()
            },
            features: CreateBillingPortalConfigurationFeatures {
                invoice_history: Some(CreateBillingPortalConfigurationFeaturesInvoiceHistory {
                    enabled: true,
                }),
                payment_method_update: Some(
                    CreateBillingPortalConfigurationFeaturesPaymentMethodUpdate { enabled: true },
                ),
                subscription_cancel: Some(
                    CreateBillingPortalConfigurationFeaturesSubscriptionCancel {
                        enabled: true,
                        ..Default::default()
                    },
                ),
                ..Default::default()
            },
            ..Default::default()
        };
        let configuration = self
            .bounded(
                "portal configuration create",
                BillingPortalConfiguration::create(&self.client, params),
            )
            .await?;
        Ok(configuration.id.to_string())
    }
}

#[async_trait]
impl PaymentProcessor for CardProcessor {
    async fn create_one_time_session(
        &self,
        donation: &Donation,
        redirects: &Redirects,
    ) -> Res<String> {
        let description = format!(
            "{}{} one-time donation to {}",
            donation.currency.symbol(),
            donation.amount,
            self.brand
        );

        let params = CreateCheckoutSession {
            mode: Some(CheckoutSessionMode::Payment),
            payment_method_types: Some(vec![
                stripe::CreateCheckoutSessionPaymentMethodTypes::Card,
            ]),
            customer_email: non_empty(&donation.donor.email),
            line_items: Some(vec![CreateCheckoutSessionLineItems {
                price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                    currency: stripe_currency(donation.currency),
                    product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                        name: format!("{} One-time Donation", self.brand),
                        description: Some(description),
                        ..Default::default()
                    }),
                    unit_amount: Some(donation.minor_amount()),
                    ..Default::default()
                }),
                quantity: Some(1),
                ..Default::default()
            }]),
            metadata: Some(self.metadata(donation)),
            success_url: Some(redirects.success.as_str()),
            cancel_url: Some(redirects.cancel.as_str()),
            ..Default::default()
        };

        let session = self
            .bounded(
                "checkout session create",
                CheckoutSession::create(&self.client, params),
            )
            .await?;
        session
            .url
            .ok_or_else(|| AppError::Processor("no approval link on checkout session".to_string()))
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

        let product_id = self.get_or_create_product(donation.frequency).await?;
        let price_id = self
            .get_or_create_price(&product_id, donation, interval)
            .await?;

        let params = CreateCheckoutSession {
            mode: Some(CheckoutSessionMode::Subscription),
            payment_method_types: Some(vec![
                stripe::CreateCheckoutSessionPaymentMethodTypes::Card,
            ]),
            customer_email: non_empty(&donation.donor.email),
            line_items: Some(vec![CreateCheckoutSessionLineItems {
                price: Some(price_id),
                quantity: Some(1),
                ..Default::default()
            }]),
            metadata: Some(self.metadata(donation)),
            success_url: Some(redirects.success.as_str()),
            cancel_url: Some(redirects.cancel.as_str()),
            ..Default::default()
        };

        let session = self
            .bounded(
                "checkout session create",
                CheckoutSession::create(&self.client, params),
            )
            .await?;
        session
            .url
            .ok_or_else(|| AppError::Processor("no approval link on checkout session".to_string()))
    }

    async fn management_url(&self, email: &str, return_url: &str) -> Res<String> {
        let params = ListCustomers {
            email: Some(email),
            limit: Some(1),
            ..Default::default()
        };
        let customers = self
            .bounded("customer list", Customer::list(&self.client, &params))
            .await?;

        // first exact match wins
        let customer = customers
            .data
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("not_found".to_string()))?;

        let configuration_id = self.ensure_portal_configuration().await?;

        let mut params = CreateBillingPortalSession::new(customer.id.clone());
        params.return_url = Some(return_url);
        params.configuration = Some(configuration_id.as_str());
        let session = self
            .bounded(
                "portal session create",
                BillingPortalSession::create(&self.client, params),
            )
            .await?;
        Ok(session.url)
    }

    async fn capture_order(&self, _order_id: &str) -> Res<String> {
        // Hosted checkout completes on the processor side; there is no
        // separate capture step in the card flow.
        Err(AppError::Processor(
            "order capture is not part of the card checkout flow".to_string(),
        ))
    }

    async fn verify_webhook(
        &self,
        _headers: Option<&WebhookHeaders>,
        event: &serde_json::Value,
    ) -> Res<()> {
        // Card deployments receive their events on the processor's own
        // signed webhook endpoint, not this one. Accept and record.
        log::warn!(
            "unverified event delivered to the card deployment: {}",
            event["event_type"].as_str().unwrap_or("unknown")
        );
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() { None } else { Some(value) }
}

fn stripe_currency(currency: Currency) -> stripe::Currency {
    match currency {
        Currency::Gbp => stripe::Currency::GBP,
        Currency::Usd => stripe::Currency::USD,
        Currency::Aud => stripe::Currency::AUD,
        Currency::Eur => stripe::Currency::EUR,
        Currency::Nzd => stripe::Currency::NZD,
        Currency::Cad => stripe::Currency::CAD,
    }
}

fn recurring_interval(interval: Interval) -> RecurringInterval {
    match interval {
        Interval::Week => RecurringInterval::Week,
        Interval::Month => RecurringInterval::Month,
        Interval::Year => RecurringInterval::Year,
    }
}

fn create_price_interval(interval: Interval) -> CreatePriceRecurringInterval {
    match interval {
        Interval::Week => CreatePriceRecurringInterval::Week,
        Interval::Month => CreatePriceRecurringInterval::Month,
        Interval::Year => CreatePriceRecurringInterval::Year,
    }
}
