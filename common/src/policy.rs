//! Pure validation and normalization of donation input.
//!
//! Invalid currencies and frequencies are silently coerced to their
//! defaults rather than rejected; only the amount can fail validation.

use crate::{
    donation::{Donation, Donor},
    env_config::DonationPolicy,
    error::{AppError, Res},
};

/// The six supported donation currencies. Anything else coerces to [`Currency::Usd`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Currency {
    Gbp,
    Usd,
    Aud,
    Eur,
    Nzd,
    Cad,
}

impl Currency {
    /// Membership check against the allow-list; non-members (including
    /// absent input) fall back to the default currency. Never errors.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("gbp") => Currency::Gbp,
            Some("usd") => Currency::Usd,
            Some("aud") => Currency::Aud,
            Some("eur") => Currency::Eur,
            Some("nzd") => Currency::Nzd,
            Some("cad") => Currency::Cad,
            _ => Currency::Usd,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Gbp => "gbp",
            Currency::Usd => "usd",
            Currency::Aud => "aud",
            Currency::Eur => "eur",
            Currency::Nzd => "nzd",
            Currency::Cad => "cad",
        }
    }

    pub fn upper_code(&self) -> String {
        self.code().to_uppercase()
    }

    /// Display symbol used in one-time line-item descriptions.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Gbp => "£",
            Currency::Usd => "$",
            Currency::Aud => "AU$",
            Currency::Eur => "€",
            Currency::Nzd => "NZ$",
            Currency::Cad => "CA$",
        }
    }
}

/// Recurrence tier of a donation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Frequency {
    OneTime,
    Weekly,
    Monthly,
    Annual,
}

impl Frequency {
    /// Unrecognized values (including absent input) fall back to monthly.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("one-time") => Frequency::OneTime,
            Some("weekly") => Frequency::Weekly,
            Some("monthly") => Frequency::Monthly,
            Some("annual") => Frequency::Annual,
            _ => Frequency::Monthly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::OneTime => "one-time",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Annual => "annual",
        }
    }

    /// Human label used in catalog product and plan names.
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::OneTime => "One-time",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Annual => "Annual",
        }
    }

    pub fn is_one_time(&self) -> bool {
        matches!(self, Frequency::OneTime)
    }

    /// Billing interval for recurring frequencies; None for one-time.
    pub fn interval(&self) -> Option<Interval> {
        match self {
            Frequency::OneTime => None,
            Frequency::Weekly => Some(Interval::Week),
            Frequency::Monthly => Some(Interval::Month),
            Frequency::Annual => Some(Interval::Year),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interval {
    Week,
    Month,
    Year,
}

impl Interval {
    /// Interval unit string in the wallet processor's wire format.
    pub fn wallet_unit(&self) -> &'static str {
        match self {
            Interval::Week => "WEEK",
            Interval::Month => "MONTH",
            Interval::Year => "YEAR",
        }
    }
}

/// Normalizes raw form input into a canonical [`Donation`].
///
/// Currency and frequency coerce silently; the amount is the only field that
/// can reject, with reason code "invalid_amount". A zero amount passes only
/// when the policy explicitly allows the request-only submission.
pub fn normalize(
    amount: Option<f64>,
    currency: Option<&str>,
    frequency: Option<&str>,
    donor: Donor,
    note: Option<String>,
    policy: &DonationPolicy,
) -> Res<Donation> {
    let amount = amount.unwrap_or(0.0);

    let zero_allowed = policy.allow_zero && amount == 0.0;
    if !zero_allowed && (!amount.is_finite() || amount < policy.min_amount) {
        return Err(AppError::Validation("invalid_amount".to_string()));
    }

    Ok(Donation {
        amount,
        currency: Currency::parse(currency),
        frequency: Frequency::parse(frequency),
        donor,
        note: note.filter(|n| !n.trim().is_empty()),
    })
}
