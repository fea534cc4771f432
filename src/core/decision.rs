use bon::Builder;
use chrono::NaiveDate;
use itertools::Itertools;

use crate::{
    core::{
        account::AccountSnapshot,
        cost::CostBreakdown,
        source::RateSource,
        tariff::Tariff,
    },
    prelude::*,
    quantity::cost::Cost,
};

/// Candidate tariff with its hypothetical cost, unknown when its rates could not be priced.
#[derive(Copy, Clone, Debug)]
pub struct Candidate {
    pub tariff: &'static Tariff,
    pub breakdown: Option<CostBreakdown>,
}

/// Today's consumption priced under the current tariff and every candidate.
#[must_use]
#[derive(Debug)]
pub struct Comparison {
    pub current: CostBreakdown,

    /// In the registry order, without the current tariff.
    pub candidates: Vec<Candidate>,
}

impl Comparison {
    /// Human-readable cost report, one line per tariff.
    #[must_use]
    pub fn summary(&self) -> String {
        let header = [
            format!("Total consumption today: {}", self.current.consumption),
            format!(
                "Current tariff {}: {}",
                self.current.tariff,
                Self::format_breakdown(&self.current),
            ),
        ];
        let candidates = self.candidates.iter().map(|candidate| match &candidate.breakdown {
            Some(breakdown) => format!(
                "Potential cost on {}: {}",
                candidate.tariff,
                Self::format_breakdown(breakdown),
            ),
            None => format!("No cost for {}", candidate.tariff),
        });
        let mut summary = header.into_iter().chain(candidates).join("\n");
        summary.push('\n');
        summary
    }

    fn format_breakdown(breakdown: &CostBreakdown) -> String {
        format!(
            "{} ({} con + {} s/c)",
            breakdown.total(),
            breakdown.consumption_cost,
            breakdown.standing_charge,
        )
    }
}

#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Decision {
    pub current: CostBreakdown,
    pub winner: CostBreakdown,

    /// Current total minus the winner's total.
    pub savings: Cost,

    pub threshold: Cost,
    pub should_switch: bool,
}

impl Decision {
    #[must_use]
    pub fn is_already_cheapest(&self) -> bool {
        self.winner.tariff == self.current.tariff
    }

    #[must_use]
    pub fn message(&self) -> String {
        if self.is_already_cheapest() {
            format!(
                "You are already on the cheapest tariff: {} at {}",
                self.winner.tariff,
                self.winner.total(),
            )
        } else if self.should_switch {
            format!("Initiating switch to {}, saving {}", self.winner.tariff, self.savings)
        } else {
            format!(
                "Not switching today: {} would only save {} (threshold {})",
                self.winner.tariff, self.savings, self.threshold,
            )
        }
    }
}

#[derive(Builder)]
pub struct DecisionEngine<'a> {
    rate_source: &'a dyn RateSource,

    /// Minimal saving that justifies a switch, it absorbs the rounding noise.
    switch_threshold: Cost,

    /// Day, which consumption is compared.
    on: NaiveDate,
}

impl DecisionEngine<'_> {
    /// Price the snapshot's consumption under each candidate.
    ///
    /// A candidate that fails to fetch or price gets an unknown cost, and the comparison goes on.
    #[instrument(skip_all, fields(current = snapshot.tariff.id, n_candidates = tariffs.len()))]
    pub async fn compare(
        &self,
        snapshot: &AccountSnapshot,
        tariffs: &[&'static Tariff],
    ) -> Comparison {
        let current = CostBreakdown::actual(snapshot);
        info!(total = ?current.total(), "current tariff");

        let mut candidates = Vec::with_capacity(tariffs.len());
        for &tariff in tariffs.iter().filter(|tariff| **tariff != snapshot.tariff) {
            let breakdown = match self.price(snapshot, tariff).await {
                Ok(breakdown) => {
                    info!(tariff = tariff.id, total = ?breakdown.total(), "priced");
                    Some(breakdown)
                }
                Err(error) => {
                    warn!(tariff = tariff.id, "failed to price: {error:#}");
                    None
                }
            };
            candidates.push(Candidate { tariff, breakdown });
        }

        Comparison { current, candidates }
    }

    async fn price(
        &self,
        snapshot: &AccountSnapshot,
        tariff: &'static Tariff,
    ) -> Result<CostBreakdown> {
        let schedule = self
            .rate_source
            .fetch_rates(tariff, snapshot.region_code, self.on)
            .await
            .with_context(|| format!("failed to fetch the rates of {tariff}"))?;
        Ok(CostBreakdown::compute(tariff, &snapshot.consumption, &schedule)?)
    }

    /// Pick the cheapest of the current tariff and the switchable candidates with a known cost.
    ///
    /// The current tariff wins the ties, and so does the earlier candidate.
    pub fn decide(&self, comparison: &Comparison) -> Decision {
        let winner = comparison
            .candidates
            .iter()
            .filter(|candidate| candidate.tariff.is_switchable)
            .filter_map(|candidate| candidate.breakdown)
            .fold(comparison.current, |winner, breakdown| {
                if breakdown.total() < winner.total() { breakdown } else { winner }
            });
        let savings = comparison.current.total() - winner.total();
        let should_switch =
            winner.tariff != comparison.current.tariff && savings > self.switch_threshold;
        info!(winner = winner.tariff.id, ?savings, should_switch, "decided");
        Decision {
            current: comparison.current,
            winner,
            savings,
            threshold: self.switch_threshold,
            should_switch,
        }
    }
}
