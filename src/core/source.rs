//! External collaborators of the comparison and the switch.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    core::{account::AccountSnapshot, rates::RateSchedule, tariff::Tariff},
    prelude::*,
};

#[async_trait]
pub trait AccountSource: Sync {
    /// Fetch the account's current tariff and the consumption on the specified day.
    async fn fetch_snapshot(&self, on: NaiveDate) -> Result<AccountSnapshot>;

    /// Fetch the start dates of the account's electricity agreements.
    async fn fetch_agreement_start_dates(&self) -> Result<Vec<NaiveDate>>;
}

#[async_trait]
pub trait RateSource: Sync {
    /// Fetch the tariff's standing charge and unit rates in the region on the specified day.
    async fn fetch_rates(
        &self,
        tariff: &Tariff,
        region_code: char,
        on: NaiveDate,
    ) -> Result<RateSchedule>;
}

/// Product enrolment as tracked by the supplier.
#[derive(Clone, Debug)]
pub struct Enrolment {
    pub id: String,
    pub status: EnrolmentStatus,
    pub product_code: Option<String>,
    pub stages: Vec<EnrolmentStage>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrolmentStatus {
    InProgress,
    Completed,

    #[serde(other)]
    Other,
}

#[derive(Clone, Debug)]
pub struct EnrolmentStage {
    pub name: String,
    pub status: EnrolmentStatus,

    /// Last update date of every step.
    pub step_dates: Vec<NaiveDate>,
}

/// Terms and conditions version, `major.minor`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
#[display("{major}.{minor}")]
pub struct TermsVersion {
    pub major: u32,
    pub minor: u32,
}

impl Default for TermsVersion {
    fn default() -> Self {
        Self { major: 1, minor: 0 }
    }
}

impl TermsVersion {
    /// Parse the leading `major.minor` parts, falling back to the default version.
    ///
    /// Any further parts, like the patch in `2.1.0`, are ignored.
    #[must_use]
    pub fn parse_or_default(version: Option<&str>) -> Self {
        version
            .and_then(|version| {
                let mut parts = version.split('.');
                let major = parts.next()?.trim().parse().ok()?;
                let minor = parts.next()?.trim().parse().ok()?;
                Some(Self { major, minor })
            })
            .unwrap_or_default()
    }
}

#[async_trait]
pub trait Enrolments: Sync {
    async fn list_enrolments(&self) -> Result<Vec<Enrolment>>;

    async fn get_terms_version(&self, product_code: &str) -> Result<TermsVersion>;

    async fn accept_terms(&self, enrolment_id: &str, version: TermsVersion) -> Result;
}

/// Opaque sign-up workflow that moves the account onto another tariff.
#[async_trait]
pub trait SwitchInitiator: Sync {
    async fn initiate(&self, tariff: &Tariff) -> Result;
}

/// Fire-and-forget sink for human-readable messages.
#[async_trait]
pub trait Notifier: Sync {
    async fn notify(&self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_terms_version() {
        assert_eq!(
            TermsVersion::parse_or_default(Some("2.3")),
            TermsVersion { major: 2, minor: 3 },
        );
        assert_eq!(
            TermsVersion::parse_or_default(Some("2.1.0")),
            TermsVersion { major: 2, minor: 1 },
        );
        assert_eq!(TermsVersion::parse_or_default(None), TermsVersion { major: 1, minor: 0 });
        assert_eq!(TermsVersion::parse_or_default(Some("3")), TermsVersion::default());
        assert_eq!(TermsVersion::parse_or_default(Some("3.x")), TermsVersion::default());
        assert_eq!(TermsVersion::parse_or_default(Some("v2")), TermsVersion::default());
        assert_eq!(TermsVersion::default().to_string(), "1.0");
    }
}
