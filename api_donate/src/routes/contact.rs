use actix_web::{Responder, post, web};
use common::{
    error::{AppError, Res},
    http::Success,
};

use crate::dtos::donate::ContactRequest;

/// Accepts a contact-form submission.
///
/// # Input
/// - `body`: JSON payload with `name` (optional), `email` and `message`
///
/// # Output
/// - Success: `{ ok: true }`
/// - Error: 400 with `{ error: "invalid_email" | "missing_message" }`
#[post("")]
async fn post_contact(body: web::Json<ContactRequest>) -> Res<impl Responder> {
    let req = body.into_inner();

    let email = req.email.unwrap_or_default();
    if !email.contains('@') {
        return Err(AppError::Validation("invalid_email".to_string()));
    }
    let message = req.message.unwrap_or_default();
    if message.trim().is_empty() {
        return Err(AppError::Validation("missing_message".to_string()));
    }

    // No email collaborator is wired up yet; record the submission.
    log::info!(
        "contact form submission from {} <{}> at {}: {}",
        req.name.as_deref().unwrap_or("").trim(),
        email.trim(),
        chrono::Utc::now().to_rfc3339(),
        message.trim()
    );

    Success::ok(serde_json::json!({ "ok": true }))
}
