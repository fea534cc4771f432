use chrono::{DateTime, Local};
use thiserror::Error;

/// The account lacks something the run cannot do without.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no electricity agreement found")]
    NoAgreement,

    #[error("no tariff code found in the electricity agreements")]
    NoTariffCode,

    #[error("no product code found in the electricity agreements")]
    NoProductCode,

    #[error("no smart meter device found")]
    NoDevice,

    #[error("no standing charge found in the electricity agreements")]
    NoStandingCharge,
}

#[derive(Debug, Error)]
#[error("found no supported tariff for `{0}`")]
pub struct UnsupportedTariffError(pub String);

/// A link, field or region is missing from the product catalog.
#[derive(Debug, Error)]
#[error("`{field}` not found")]
pub struct RateNotFoundError {
    pub field: String,
}

impl RateNotFoundError {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

#[derive(Debug, Error)]
#[error("no unit rate covers the reading at {read_at}")]
pub struct NoMatchingRateError {
    pub read_at: DateTime<Local>,
}

#[derive(Debug, Error)]
#[error("no in-progress enrolment and no post-enrolment stage completed today")]
pub struct NoEnrolmentFoundError;
