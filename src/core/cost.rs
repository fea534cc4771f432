use crate::{
    core::{
        account::{AccountSnapshot, ConsumptionInterval},
        error::NoMatchingRateError,
        rates::RateSchedule,
        tariff::Tariff,
    },
    quantity::{cost::Cost, energy::KilowattHours},
};

/// Decimal places every per-interval cost is rounded to.
const COST_DECIMALS: i32 = 4;

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct CostBreakdown {
    pub tariff: &'static Tariff,
    pub consumption: KilowattHours,
    pub standing_charge: Cost,
    pub consumption_cost: Cost,
}

impl CostBreakdown {
    /// Today's actual bill on the current tariff, as reported by the meter.
    pub fn actual(snapshot: &AccountSnapshot) -> Self {
        Self {
            tariff: snapshot.tariff,
            consumption: snapshot.total_consumption(),
            standing_charge: snapshot.standing_charge,
            consumption_cost: snapshot.actual_consumption_cost(),
        }
    }

    /// Price the consumption with another tariff's schedule.
    ///
    /// Each interval is priced by the rate covering its end, and rounded on its own.
    pub fn compute(
        tariff: &'static Tariff,
        consumption: &[ConsumptionInterval],
        schedule: &RateSchedule,
    ) -> Result<Self, NoMatchingRateError> {
        let mut energy = KilowattHours::ZERO;
        let mut consumption_cost = Cost::ZERO;
        for interval in consumption {
            let rate = schedule
                .find(interval.read_at)
                .ok_or(NoMatchingRateError { read_at: interval.read_at })?;
            energy += interval.energy;
            consumption_cost += (interval.energy * rate.unit_rate).round_to(COST_DECIMALS);
        }
        Ok(Self {
            tariff,
            consumption: energy,
            standing_charge: schedule.standing_charge,
            consumption_cost,
        })
    }

    pub fn total(&self) -> Cost {
        self.consumption_cost + self.standing_charge
    }
}
