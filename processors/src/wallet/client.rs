//! Authenticated HTTP plumbing for the wallet processor API, including the
//! process-wide access-token cache.

use std::time::{Duration, Instant};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use common::{
    env_config::WalletConfig,
    error::{AppError, Res},
};
use dashmap::DashMap;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::WebhookHeaders;

/// Cached bearer credential. `expires_at` already carries the 60 second
/// safety margin, applied when the token is stored.
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Key of the plan tuple cache: (product id, upper currency code,
/// two-decimal amount, interval unit).
pub(crate) type PlanKey = (String, String, String, &'static str);

/// Entries older than this are ignored, so a plan deactivated on the
/// processor side stops being served once the entry ages out.
const PLAN_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

pub(crate) struct CachedPlan {
    id: String,
    inserted_at: Instant,
}

pub struct WalletClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    pub(crate) brand: String,
    /// Single-flight token slot: the mutex is held across the exchange so
    /// concurrent cold callers share one refresh instead of racing.
    token: Mutex<Option<CachedToken>>,
    /// Short-lived local cache in front of the plan list-and-match query,
    /// populated on both match and creation.
    plan_cache: DashMap<PlanKey, CachedPlan>,
}

impl WalletClient {
    pub fn new(config: &WalletConfig, brand: &str, timeout_secs: u64) -> Res<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(WalletClient {
            http,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            brand: brand.to_string(),
            token: Mutex::new(None),
            plan_cache: DashMap::new(),
        })
    }

    /// Returns the cached bearer token, exchanging client credentials when
    /// the slot is empty or within the expiry margin. A failed exchange
    /// caches nothing and surfaces the status and response body.
    pub async fn token(&self) -> Res<String> {
        let mut slot = self.token.lock().await;

        if let Some(cached) = slot.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.value.clone());
            }
        }

        let credentials = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));
        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .header(AUTHORIZATION, format!("Basic {credentials}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Processor(format!(
                "token exchange failed ({status}): {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.saturating_sub(60));
        *slot = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        log::info!("wallet access token refreshed (lifetime {}s)", token.expires_in);
        Ok(token.access_token)
    }

    /// Cached plan id for the tier tuple, if a fresh entry exists.
    pub(crate) fn cached_plan_id(&self, key: &PlanKey) -> Option<String> {
        let entry = self.plan_cache.get(key)?;
        (entry.inserted_at.elapsed() < PLAN_CACHE_TTL).then(|| entry.id.clone())
    }

    pub(crate) fn remember_plan(&self, key: PlanKey, id: &str) {
        self.plan_cache.insert(
            key,
            CachedPlan {
                id: id.to_string(),
                inserted_at: Instant::now(),
            },
        );
    }

    pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Res<T> {
        let token = self.token().await?;
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        Self::parse(path, response).await
    }

    pub(crate) async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Res<T> {
        let token = self.token().await?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(body)
            .send()
            .await?;
        Self::parse(path, response).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Res<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Processor(format!(
                "wallet API {path} failed ({status}): {body}"
            )));
        }
        Ok(response.json().await?)
    }

    /// Replays an event and its transmission headers against the wallet's
    /// verify-webhook-signature API. Returns whether verification succeeded.
    pub async fn verify_webhook_signature(
        &self,
        webhook_id: &str,
        headers: &WebhookHeaders,
        event: &Value,
    ) -> Res<bool> {
        #[derive(Deserialize)]
        struct Verification {
            verification_status: String,
        }

        let body = json!({
            "auth_algo": headers.auth_algo,
            "cert_url": headers.cert_url,
            "transmission_id": headers.transmission_id,
            "transmission_sig": headers.transmission_sig,
            "transmission_time": headers.transmission_time,
            "webhook_id": webhook_id,
            "webhook_event": event,
        });

        let verification: Verification = self
            .post_json("/v1/notifications/verify-webhook-signature", &body)
            .await?;
        Ok(verification.verification_status == "SUCCESS")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> WalletClient {
        WalletClient::new(
            &WalletConfig {
                api_base: "https://wallet.example".to_string(),
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                webhook_id: String::new(),
            },
            "The Moscow Times",
            5,
        )
        .unwrap()
    }

    fn key() -> PlanKey {
        (
            "PROD-1".to_string(),
            "USD".to_string(),
            "15.00".to_string(),
            "MONTH",
        )
    }

    #[test]
    fn fresh_plan_cache_entries_are_served() {
        let client = client();
        assert_eq!(client.cached_plan_id(&key()), None);

        client.remember_plan(key(), "P-1");
        assert_eq!(client.cached_plan_id(&key()), Some("P-1".to_string()));
    }

    #[test]
    fn stale_plan_cache_entries_age_out() {
        let client = client();
        let Some(inserted_at) = Instant::now().checked_sub(PLAN_CACHE_TTL) else {
            // machine uptime shorter than the TTL, nothing to construct
            return;
        };
        client.plan_cache.insert(
            key(),
            CachedPlan {
                id: "P-1".to_string(),
                inserted_at,
            },
        );

        assert_eq!(client.cached_plan_id(&key()), None);
    }
}
