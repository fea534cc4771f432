use chrono::{DateTime, Local};

use crate::{
    core::tariff::Tariff,
    quantity::{cost::Cost, energy::KilowattHours},
};

/// Smart meter reading for a single interval.
#[derive(Copy, Clone, Debug)]
pub struct ConsumptionInterval {
    /// Interval end.
    pub read_at: DateTime<Local>,

    pub energy: KilowattHours,

    /// Cost under the current tariff, when the meter reports it.
    pub cost: Option<Cost>,
}

/// The account's state, fetched fresh for every run.
#[derive(Clone, Debug)]
pub struct AccountSnapshot {
    pub tariff: &'static Tariff,

    /// Daily standing charge of the current tariff.
    pub standing_charge: Cost,

    pub region_code: char,
    pub product_code: String,

    /// Today's readings, in chronological order.
    pub consumption: Vec<ConsumptionInterval>,
}

impl AccountSnapshot {
    pub fn total_consumption(&self) -> KilowattHours {
        self.consumption.iter().map(|interval| interval.energy).sum()
    }

    /// Consumption cost as billed by the current tariff, missing costs count as zero.
    pub fn actual_consumption_cost(&self) -> Cost {
        self.consumption.iter().filter_map(|interval| interval.cost).sum()
    }
}
