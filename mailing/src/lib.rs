//! Mailing-list collaborator: registers donor emails with a
//! Mailchimp-style audience and tags them.
//!
//! This is a fire-and-forget side effect of the donation flow. Registration
//! runs on a detached task with bounded retry, never blocks the donation
//! response, and never surfaces its failures to the donor. Missing
//! credentials degrade the whole collaborator to a no-op.

use std::time::Duration;

use common::{
    donation::Donor,
    env_config::MailingConfig,
    error::{AppError, Res},
};
use md5::{Digest, Md5};
use serde_json::json;

const RETRY_ATTEMPTS: u32 = 3;

#[derive(Clone)]
struct Inner {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    audience_id: String,
    tag: String,
}

pub struct MailingClient {
    inner: Option<Inner>,
}

impl MailingClient {
    pub fn new(config: &MailingConfig, timeout_secs: u64) -> Res<Self> {
        if config.api_key.is_empty() || config.audience_id.is_empty() {
            log::warn!("mailing-list credentials missing, donor registration disabled");
            return Ok(MailingClient { inner: None });
        }

        // The data-center prefix is the suffix of the API key.
        let prefix = config.api_key.rsplit('-').next().unwrap_or_default();
        let base_url = format!("https://{prefix}.api.mailchimp.com/3.0");

        Ok(MailingClient {
            inner: Some(Inner {
                http: reqwest::Client::builder()
                    .timeout(Duration::from_secs(timeout_secs))
                    .build()?,
                base_url,
                api_key: config.api_key.clone(),
                audience_id: config.audience_id.clone(),
                tag: config.tag.clone(),
            }),
        })
    }

    /// Registers the donor on a detached task. Returns immediately; failures
    /// are retried with backoff inside the task and at most logged.
    pub fn dispatch(&self, donor: &Donor) {
        let Some(inner) = self.inner.clone() else {
            return;
        };
        if donor.email.trim().is_empty() {
            return;
        }
        let donor = donor.clone();

        tokio::spawn(async move {
            for attempt in 1..=RETRY_ATTEMPTS {
                match inner.register(&donor).await {
                    Ok(()) => {
                        log::info!("registered donor with the mailing list");
                        return;
                    }
                    Err(e) if attempt < RETRY_ATTEMPTS => {
                        log::warn!("mailing-list registration attempt {attempt} failed: {e}");
                        tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                    }
                    Err(e) => {
                        log::warn!("mailing-list registration gave up: {e}");
                    }
                }
            }
        });
    }
}

impl Inner {
    /// Upserts the member into the audience, then assigns the tag.
    async fn register(&self, donor: &Donor) -> Res<()> {
        let member_hash = member_hash(&donor.email);

        let response = self
            .http
            .put(format!(
                "{}/lists/{}/members/{member_hash}",
                self.base_url, self.audience_id
            ))
            .header("Authorization", format!("apikey {}", self.api_key))
            .json(&json!({
                "email_address": donor.email.trim(),
                "status_if_new": "subscribed",
                "merge_fields": {
                    "FNAME": donor.first_name,
                    "LNAME": donor.last_name,
                },
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "member upsert failed ({status}): {body}"
            )));
        }

        let response = self
            .http
            .post(format!(
                "{}/lists/{}/members/{member_hash}/tags",
                self.base_url, self.audience_id
            ))
            .header("Authorization", format!("apikey {}", self.api_key))
            .json(&json!({
                "tags": [{ "name": self.tag, "status": "active" }],
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "member tag failed ({status}): {body}"
            )));
        }

        Ok(())
    }
}

/// Member key: MD5 of the lowercased, trimmed email address.
fn member_hash(email: &str) -> String {
    hex::encode(Md5::digest(email.trim().to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path},
    };

    fn donor() -> Donor {
        Donor {
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: " A@B.com ".to_string(),
        }
    }

    fn inner(server: &MockServer) -> Inner {
        Inner {
            http: reqwest::Client::new(),
            base_url: server.uri(),
            api_key: "key-us1".to_string(),
            audience_id: "aud1".to_string(),
            tag: "Donor".to_string(),
        }
    }

    #[test]
    fn member_hash_is_md5_of_lowercased_trimmed_email() {
        // md5("a@b.com")
        assert_eq!(member_hash(" A@B.com "), "357a20e8c56e69d6f9734d23ef9517e8");
    }

    #[test]
    fn missing_credentials_degrade_to_noop() {
        let client = MailingClient::new(
            &MailingConfig {
                api_key: String::new(),
                audience_id: "aud1".to_string(),
                tag: "Donor".to_string(),
            },
            5,
        )
        .unwrap();
        assert!(client.inner.is_none());
        // dispatch on a no-op client must not panic
        client.dispatch(&donor());
    }

    #[tokio::test]
    async fn register_upserts_then_tags() {
        let server = MockServer::start().await;
        let hash = "357a20e8c56e69d6f9734d23ef9517e8";
        Mock::given(method("PUT"))
            .and(path(format!("/lists/aud1/members/{hash}")))
            .and(body_partial_json(json!({
                "status_if_new": "subscribed",
                "merge_fields": { "FNAME": "A", "LNAME": "B" },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": hash })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/lists/aud1/members/{hash}/tags")))
            .and(body_partial_json(json!({
                "tags": [{ "name": "Donor", "status": "active" }],
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        inner(&server).register(&donor()).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_failure_is_surfaced_to_the_retry_loop() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "detail": "Invalid resource",
            })))
            .mount(&server)
            .await;

        let err = inner(&server).register(&donor()).await.unwrap_err();
        assert!(err.to_string().contains("member upsert failed"));
    }
}
