use chrono::{DateTime, Local};
use serde::Deserialize;

use crate::quantity::{cost::Cost, rate::KilowattHourRate};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "DIRECT_DEBIT")]
    DirectDebit,

    #[serde(rename = "NON_DIRECT_DEBIT")]
    NonDirectDebit,

    #[serde(other)]
    Other,
}

/// Unit rate valid within `[valid_from, valid_to)`.
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct RateInterval {
    pub valid_from: DateTime<Local>,

    /// Open-ended rates (like Flexible Octopus) stay valid until the end of time.
    pub valid_to: Option<DateTime<Local>>,

    #[serde(rename = "value_inc_vat")]
    pub unit_rate: KilowattHourRate,

    pub payment_method: Option<PaymentMethod>,
}

impl RateInterval {
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Local>) -> bool {
        self.valid_from <= timestamp && self.valid_to.is_none_or(|valid_to| timestamp < valid_to)
    }

    /// Rates that do not depend on the payment method, or the direct debit ones.
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        matches!(self.payment_method, None | Some(PaymentMethod::DirectDebit))
    }
}

/// Tariff prices for a single region and day.
#[derive(Debug)]
pub struct RateSchedule {
    pub standing_charge: Cost,

    /// Sorted by [`RateInterval::valid_from`].
    intervals: Vec<RateInterval>,
}

impl RateSchedule {
    pub fn new(standing_charge: Cost, mut intervals: Vec<RateInterval>) -> Self {
        // Stable, so the API order breaks ties between the equal starts:
        intervals.sort_by_key(|interval| interval.valid_from);
        Self { standing_charge, intervals }
    }

    #[must_use]
    pub fn intervals(&self) -> &[RateInterval] {
        &self.intervals
    }

    /// Find the chronologically first applicable rate covering the timestamp.
    #[must_use]
    pub fn find(&self, timestamp: DateTime<Local>) -> Option<&RateInterval> {
        self.intervals
            .iter()
            .find(|interval| interval.is_applicable() && interval.contains(timestamp))
    }
}
