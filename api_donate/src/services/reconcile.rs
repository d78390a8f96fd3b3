//! Completion of asynchronous payment flows: capturing approved one-time
//! orders on return redirect, and receiving processor webhook events.

use common::{
    donation::Redirects,
    error::{AppError, Res},
};
use processors::{PaymentProcessor, WebhookHeaders};
use serde_json::Value;

/// Processor status that marks a captured order as paid.
const COMPLETED: &str = "COMPLETED";

/// Captures a pending order and maps the outcome to a redirect destination.
/// Never errors: the donor arrives here by browser navigation, so every
/// failure becomes the error destination. A failed capture is terminal; the
/// donor restarts the flow.
pub async fn capture(
    processor: &dyn PaymentProcessor,
    token: Option<String>,
    redirects: &Redirects,
) -> String {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return redirects.error.clone();
    };

    match processor.capture_order(&token).await {
        Ok(status) if status == COMPLETED => redirects.success.clone(),
        Ok(status) => {
            log::warn!("capture of order {token} ended in status {status}");
            redirects.error.clone()
        }
        Err(e) => {
            log::error!("capture of order {token} failed: {e}");
            redirects.error.clone()
        }
    }
}

/// Verifies and records an inbound webhook event. Unparseable bodies reject
/// with a client error so the sender retries per its own policy; everything
/// else acknowledges.
pub async fn webhook(
    processor: &dyn PaymentProcessor,
    headers: Option<&WebhookHeaders>,
    payload: &str,
) -> Res<()> {
    let event: Value = serde_json::from_str(payload)
        .map_err(|_| AppError::Validation("webhook_error".to_string()))?;

    processor.verify_webhook(headers, &event).await?;

    let resource_id = event["resource"]["id"].as_str().unwrap_or("unknown");
    match event["event_type"].as_str().unwrap_or_default() {
        "PAYMENT.CAPTURE.COMPLETED" => log::info!("payment captured: {resource_id}"),
        "BILLING.SUBSCRIPTION.ACTIVATED" => log::info!("subscription activated: {resource_id}"),
        "BILLING.SUBSCRIPTION.CANCELLED" => log::info!("subscription cancelled: {resource_id}"),
        other => log::info!("unhandled processor event: {other}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::orchestrate::tests::StubProcessor;
    use common::donation::Redirects;

    fn redirects() -> Redirects {
        Redirects::from_origin("http://localhost:3000")
    }

    #[tokio::test]
    async fn completed_capture_redirects_to_success() {
        let stub = StubProcessor::with_capture_status("COMPLETED");
        let target = capture(&stub, Some("ORDER-1".to_string()), &redirects()).await;
        assert!(target.contains("success=true"));
    }

    #[tokio::test]
    async fn declined_capture_redirects_to_error() {
        let stub = StubProcessor::with_capture_status("DECLINED");
        let target = capture(&stub, Some("ORDER-1".to_string()), &redirects()).await;
        assert!(target.contains("error=true"));
    }

    #[tokio::test]
    async fn missing_token_redirects_to_error_without_processor_calls() {
        let stub = StubProcessor::with_capture_status("COMPLETED");
        let target = capture(&stub, None, &redirects()).await;
        assert!(target.contains("error=true"));
        assert_eq!(stub.total_calls(), 0);
    }

    #[tokio::test]
    async fn unparseable_webhook_body_is_a_client_error() {
        let stub = StubProcessor::default();
        let err = webhook(&stub, None, "not json").await.unwrap_err();
        assert_eq!(err.to_string(), "webhook_error");
    }

    #[tokio::test]
    async fn known_and_unknown_events_both_acknowledge() {
        let stub = StubProcessor::default();
        for body in [
            r#"{"event_type":"PAYMENT.CAPTURE.COMPLETED","resource":{"id":"ORDER-1"}}"#,
            r#"{"event_type":"BILLING.SUBSCRIPTION.CANCELLED","resource":{"id":"SUB-1"}}"#,
            r#"{"event_type":"SOMETHING.ELSE","resource":{}}"#,
        ] {
            webhook(&stub, None, body).await.unwrap();
        }
    }
}
