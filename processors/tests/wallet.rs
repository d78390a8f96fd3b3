//! Integration tests for the wallet client against a stubbed processor API.

use std::time::Duration;

use common::{donation::Donor, env_config::DonationPolicy, env_config::WalletConfig, policy};
use processors::wallet::client::WalletClient;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path, query_param},
};

fn wallet_client(server: &MockServer) -> WalletClient {
    WalletClient::new(
        &WalletConfig {
            api_base: server.uri(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            webhook_id: String::new(),
        },
        "The Moscow Times",
        5,
    )
    .unwrap()
}

async fn mount_token(server: &MockServer, token: &str, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "expires_in": expires_in,
        })))
        .mount(server)
        .await;
}

fn donation(amount: f64, currency: &str, frequency: &str) -> common::donation::Donation {
    policy::normalize(
        Some(amount),
        Some(currency),
        Some(frequency),
        Donor {
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: "a@b.com".to_string(),
        },
        None,
        &DonationPolicy {
            min_amount: 1.0,
            allow_zero: false,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn token_exchange_happens_once_within_lifetime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .and(header("Authorization", "Basic aWQ6c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = wallet_client(&server);
    assert_eq!(client.token().await.unwrap(), "tok-1");
    assert_eq!(client.token().await.unwrap(), "tok-1");
}

#[tokio::test]
async fn concurrent_cold_callers_share_one_exchange() {
    let server = MockServer::start().await;
    // the delay keeps the second caller waiting while the first exchange
    // is in flight
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(json!({
                    "access_token": "tok-1",
                    "expires_in": 3600,
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = wallet_client(&server);
    let (first, second) = tokio::join!(client.token(), client.token());
    assert_eq!(first.unwrap(), "tok-1");
    assert_eq!(second.unwrap(), "tok-1");
}

#[tokio::test]
async fn outbound_calls_are_bounded_by_the_configured_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(json!({
                    "access_token": "tok-1",
                    "expires_in": 3600,
                })),
        )
        .mount(&server)
        .await;

    let client = WalletClient::new(
        &WalletConfig {
            api_base: server.uri(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            webhook_id: String::new(),
        },
        "The Moscow Times",
        1,
    )
    .unwrap();

    assert!(client.token().await.is_err());
}

#[tokio::test]
async fn token_is_refreshed_after_expiry() {
    let server = MockServer::start().await;
    // expires_in of 60 leaves no lifetime once the safety margin is applied
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 60,
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-2",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = wallet_client(&server);
    assert_eq!(client.token().await.unwrap(), "tok-1");
    assert_eq!(client.token().await.unwrap(), "tok-2");
}

#[tokio::test]
async fn failed_token_exchange_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = wallet_client(&server);
    let err = client.token().await.unwrap_err().to_string();
    assert!(err.contains("500"), "unexpected error: {err}");
    assert!(err.contains("boom"), "unexpected error: {err}");
}

#[tokio::test]
async fn existing_product_is_reused_by_exact_name() {
    let server = MockServer::start().await;
    mount_token(&server, "tok", 3600).await;
    Mock::given(method("GET"))
        .and(path("/v1/catalogs/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [
                { "id": "PROD-OTHER", "name": "The Moscow Times Annual Donation" },
                { "id": "PROD-1", "name": "The Moscow Times Monthly Donation" },
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = wallet_client(&server);
    let id = client
        .get_or_create_product(common::policy::Frequency::Monthly)
        .await
        .unwrap();
    assert_eq!(id, "PROD-1");
}

#[tokio::test]
async fn missing_product_is_created() {
    let server = MockServer::start().await;
    mount_token(&server, "tok", 3600).await;
    Mock::given(method("GET"))
        .and(path("/v1/catalogs/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "products": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/catalogs/products"))
        .and(body_partial_json(json!({
            "name": "The Moscow Times Weekly Donation",
            "type": "SERVICE",
            "category": "CHARITY",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "PROD-NEW",
            "name": "The Moscow Times Weekly Donation",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = wallet_client(&server);
    let id = client
        .get_or_create_product(common::policy::Frequency::Weekly)
        .await
        .unwrap();
    assert_eq!(id, "PROD-NEW");
}

#[tokio::test]
async fn plan_creation_is_idempotent_per_tier() {
    let server = MockServer::start().await;
    mount_token(&server, "tok", 3600).await;
    Mock::given(method("GET"))
        .and(path("/v1/billing/plans"))
        .and(query_param("product_id", "PROD-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "plans": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/billing/plans"))
        .and(body_partial_json(json!({
            "product_id": "PROD-1",
            "payment_preferences": { "payment_failure_threshold": 3 },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "P-1",
            "status": "ACTIVE",
            "billing_cycles": [],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = wallet_client(&server);
    let donation = donation(15.0, "usd", "monthly");
    let interval = donation.frequency.interval().unwrap();

    let first = client
        .get_or_create_plan("PROD-1", &donation, interval)
        .await
        .unwrap();
    // second resolution hits the tuple cache, no further processor calls
    let second = client
        .get_or_create_plan("PROD-1", &donation, interval)
        .await
        .unwrap();
    assert_eq!(first, "P-1");
    assert_eq!(second, "P-1");
}

#[tokio::test]
async fn active_plan_with_matching_tuple_is_reused() {
    let server = MockServer::start().await;
    mount_token(&server, "tok", 3600).await;
    Mock::given(method("GET"))
        .and(path("/v1/billing/plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plans": [
                {
                    "id": "P-INACTIVE",
                    "status": "INACTIVE",
                    "billing_cycles": [{
                        "frequency": { "interval_unit": "MONTH" },
                        "pricing_scheme": { "fixed_price": { "value": "15.00", "currency_code": "USD" } },
                    }],
                },
                {
                    "id": "P-9",
                    "status": "ACTIVE",
                    "billing_cycles": [{
                        "frequency": { "interval_unit": "MONTH" },
                        "pricing_scheme": { "fixed_price": { "value": "15.00", "currency_code": "USD" } },
                    }],
                },
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = wallet_client(&server);
    let donation = donation(15.0, "usd", "monthly");
    let interval = donation.frequency.interval().unwrap();
    let id = client
        .get_or_create_plan("PROD-1", &donation, interval)
        .await
        .unwrap();
    assert_eq!(id, "P-9");
}

#[tokio::test]
async fn order_capture_returns_processor_status() {
    let server = MockServer::start().await;
    mount_token(&server, "tok", 3600).await;
    Mock::given(method("POST"))
        .and(path("/v2/checkout/orders/ORDER-1/capture"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "ORDER-1",
            "status": "COMPLETED",
            "links": [],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = wallet_client(&server);
    let captured = client.capture_order("ORDER-1").await.unwrap();
    assert_eq!(captured.status, "COMPLETED");
}

#[tokio::test]
async fn webhook_signature_verification_roundtrip() {
    let server = MockServer::start().await;
    mount_token(&server, "tok", 3600).await;
    Mock::given(method("POST"))
        .and(path("/v1/notifications/verify-webhook-signature"))
        .and(body_partial_json(json!({ "webhook_id": "WH-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "verification_status": "SUCCESS",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = wallet_client(&server);
    let headers = processors::WebhookHeaders {
        transmission_id: "t-id".to_string(),
        transmission_time: "2026-01-01T00:00:00Z".to_string(),
        transmission_sig: "sig".to_string(),
        cert_url: "https://wallet.example/cert".to_string(),
        auth_algo: "SHA256withRSA".to_string(),
    };
    let verified = client
        .verify_webhook_signature(
            "WH-1",
            &headers,
            &json!({ "event_type": "PAYMENT.CAPTURE.COMPLETED" }),
        )
        .await
        .unwrap();
    assert!(verified);
}
