use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, get, post, web};
use common::{env_config::Config, error::Res, http::Success};
use mailing::MailingClient;
use processors::{PaymentProcessor, WebhookHeaders};

use crate::{
    dtos::donate::{CaptureQuery, CheckoutResponse, CheckoutRequest, PortalRequest, PortalResponse},
    misc::redirect,
    services,
};

/// Creates a payment-processor checkout session for a donation.
///
/// # Input
/// - `body`: JSON payload with donation details:
///   - `amount`: Donation amount in major currency units
///   - `frequency`: "one-time", "weekly", "monthly" or "annual" (unknown values fall back to monthly)
///   - `currency`: One of gbp/usd/aud/eur/nzd/cad (anything else falls back to usd)
///   - `firstName` (or `name`), `lastName`, `email`: Donor identity
///   - `prayer`: (Optional) free-text note for note-taking deployments
/// - `config`: Application configuration with the donation policy
///
/// # Output
/// - Success: Returns `{ url }`, the processor-hosted page to redirect the donor to
/// - Error: 400 with `{ error: "invalid_amount" }`, or 500 with a generic error
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/donations/checkout', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({
///     amount: 15,
///     frequency: 'monthly',
///     currency: 'usd',
///     firstName: 'Ada',
///     lastName: 'Lovelace',
///     email: 'ada@example.org',
///   })
/// });
///
/// if (response.ok) {
///   const { url } = await response.json();
///   window.location.href = url;
/// }
/// ```
#[post("/checkout")]
async fn post_checkout(
    req: HttpRequest,
    body: web::Json<CheckoutRequest>,
    processor: web::Data<dyn PaymentProcessor>,
    mailing: web::Data<MailingClient>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let redirects = redirect::from_request(&req, &config);
    let url = services::orchestrate::create_checkout(
        processor.get_ref(),
        mailing.get_ref(),
        &config,
        body.into_inner(),
        &redirects,
    )
    .await?;

    Success::ok(CheckoutResponse { url })
}

/// Resolves the URL where a donor can self-manage their recurring donation.
///
/// # Input
/// - `body`: JSON payload with the donor's `email`
///
/// # Output
/// - Success: Returns `{ url }`
/// - Error: 400 `{ error: "invalid_email" }`, 404 `{ error: "not_found" }`,
///   or 500 `{ error: "server" }`
#[post("/portal")]
async fn post_portal(
    req: HttpRequest,
    body: web::Json<PortalRequest>,
    processor: web::Data<dyn PaymentProcessor>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let redirects = redirect::from_request(&req, &config);
    let url =
        services::portal::resolve_management_url(processor.get_ref(), &body.email, &redirects.cancel)
            .await?;

    Success::ok(PortalResponse { url })
}

/// Finalizes a one-time order when the processor redirects the donor back.
///
/// Reached by browser navigation, so the outcome is always an HTTP redirect:
/// to the success destination when the capture completes, to the error
/// destination on any other status, any error, or a missing token.
#[get("/capture")]
async fn get_capture(
    req: HttpRequest,
    query: web::Query<CaptureQuery>,
    processor: web::Data<dyn PaymentProcessor>,
    config: web::Data<Arc<Config>>,
) -> impl Responder {
    let redirects = redirect::from_request(&req, &config);
    let target =
        services::reconcile::capture(processor.get_ref(), query.into_inner().token, &redirects)
            .await;

    HttpResponse::Found()
        .insert_header(("Location", target))
        .finish()
}

/// Receives asynchronous status-change events from the payment processor.
///
/// # Note
/// This endpoint is called by the processor's servers, not by the frontend.
/// Register it in the processor dashboard and set PAYPAL_WEBHOOK_ID so
/// inbound events are signature-verified; without it events are accepted
/// with a warning (development only).
///
/// # Output
/// - Success: `{ received: true }` (also for unhandled event types)
/// - Error: 400 when the body is unparseable or the signature check fails
#[post("/webhook")]
async fn post_webhook(
    payload: String,
    req: HttpRequest,
    processor: web::Data<dyn PaymentProcessor>,
) -> Res<impl Responder> {
    let headers = webhook_headers(&req);
    services::reconcile::webhook(processor.get_ref(), headers.as_ref(), &payload).await?;

    Success::ok(serde_json::json!({ "received": true }))
}

/// Transmission headers accompanying a wallet webhook delivery; None when
/// any of them is absent.
fn webhook_headers(req: &HttpRequest) -> Option<WebhookHeaders> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    Some(WebhookHeaders {
        transmission_id: header("paypal-transmission-id")?,
        transmission_time: header("paypal-transmission-time")?,
        transmission_sig: header("paypal-transmission-sig")?,
        cert_url: header("paypal-cert-url")?,
        auth_algo: header("paypal-auth-algo")?,
    })
}
