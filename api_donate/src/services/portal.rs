use common::error::{AppError, Res};
use processors::PaymentProcessor;

/// Resolves the self-management URL for a donor's recurring donation.
/// Email shape is checked before touching the processor.
pub async fn resolve_management_url(
    processor: &dyn PaymentProcessor,
    email: &str,
    return_url: &str,
) -> Res<String> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("invalid_email".to_string()));
    }
    processor.management_url(email, return_url).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::orchestrate::tests::StubProcessor;

    #[tokio::test]
    async fn malformed_email_is_rejected_locally() {
        let stub = StubProcessor::default();
        let err = resolve_management_url(&stub, "not-an-email", "http://localhost:3000/donate")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid_email");
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let stub = StubProcessor::default();
        let err = resolve_management_url(&stub, "missing@donor.org", "http://localhost:3000/donate")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "not_found");
    }

    #[tokio::test]
    async fn known_email_resolves_to_a_url_with_a_scheme() {
        let stub = StubProcessor::default();
        let url = resolve_management_url(&stub, "known@donor.org", "http://localhost:3000/donate")
            .await
            .unwrap();
        assert!(url.starts_with("https://"));
    }
}
