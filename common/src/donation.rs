use crate::policy::{Currency, Frequency};

#[derive(Clone, Debug, Default)]
/// Identity of the person donating. Name parts and email may be empty when
/// the form omitted them; the processors tolerate that.
pub struct Donor {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Donor {
    /// Single display name, falling back to "Donor" when the form left the
    /// name blank (the wallet processor requires a subscriber given name).
    pub fn given_name_or_default(&self) -> &str {
        if self.first_name.is_empty() {
            "Donor"
        } else {
            &self.first_name
        }
    }
}

#[derive(Clone, Debug)]
/// A donation request after normalization: the currency and frequency are
/// canonical members of their enums and the amount has passed policy.
pub struct Donation {
    /// Amount in major currency units.
    pub amount: f64,
    pub currency: Currency,
    pub frequency: Frequency,
    pub donor: Donor,
    /// Optional free-text note carried to the processor as opaque custom data.
    pub note: Option<String>,
}

impl Donation {
    /// Amount in minor units (cents), as the card processor expects.
    pub fn minor_amount(&self) -> i64 {
        (self.amount * 100.0).round() as i64
    }

    /// Amount formatted with two decimals, as the wallet processor expects.
    pub fn value_string(&self) -> String {
        format!("{:.2}", self.amount)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0.0
    }
}

#[derive(Clone, Debug)]
/// Redirect destinations for a checkout flow, derived from the caller's
/// validated Origin header (or the configured fallback).
pub struct Redirects {
    pub success: String,
    pub cancel: String,
    pub error: String,
    /// Where the wallet processor sends the donor back to finish a one-time
    /// order; points at the capture endpoint.
    pub capture: String,
}

impl Redirects {
    pub fn from_origin(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Redirects {
            success: format!("{origin}/donate?success=true"),
            cancel: format!("{origin}/donate"),
            error: format!("{origin}/donate?error=true"),
            capture: format!("{origin}/api/donations/capture"),
        }
    }
}
