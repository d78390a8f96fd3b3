use common::{
    donation::{Donor, Redirects},
    env_config::Config,
    error::Res,
    policy,
};
use mailing::MailingClient;
use processors::PaymentProcessor;

use crate::dtos::donate::CheckoutRequest;

/// Turns a raw donation submission into a processor checkout session and
/// returns the redirect URL for the donor.
///
/// Validation happens before any network call. A permitted zero-amount
/// submission skips the processor entirely and resolves straight to the
/// success destination. The mailing-list registration is dispatched
/// fire-and-forget in both paths.
pub async fn create_checkout(
    processor: &dyn PaymentProcessor,
    mailing: &MailingClient,
    config: &Config,
    req: CheckoutRequest,
    redirects: &Redirects,
) -> Res<String> {
    let donor = Donor {
        first_name: req.first_name.unwrap_or_default(),
        last_name: req.last_name.unwrap_or_default(),
        email: req.email.unwrap_or_default(),
    };
    let donation = policy::normalize(
        req.amount,
        req.currency.as_deref(),
        req.frequency.as_deref(),
        donor,
        req.prayer,
        &config.donation,
    )?;

    if donation.is_zero() {
        mailing.dispatch(&donation.donor);
        log::info!("zero-amount submission accepted without payment");
        return Ok(redirects.success.clone());
    }

    let url = if donation.frequency.is_one_time() {
        processor.create_one_time_session(&donation, redirects).await?
    } else {
        processor.create_recurring_session(&donation, redirects).await?
    };

    mailing.dispatch(&donation.donor);
    Ok(url)
}
