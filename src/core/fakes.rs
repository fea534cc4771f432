//! In-memory collaborators for the tests.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{Local, NaiveDate, TimeDelta, TimeZone};

use crate::{
    core::{
        account::{AccountSnapshot, ConsumptionInterval},
        error::LookupError,
        rates::{RateInterval, RateSchedule},
        source::{
            AccountSource,
            Enrolment,
            Enrolments,
            Notifier,
            RateSource,
            SwitchInitiator,
            TermsVersion,
        },
        tariff::{self, Tariff},
    },
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours, rate::KilowattHourRate},
};

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

/// One kilowatt-hour at noon on the current tariff, costing `current_cost` pence.
pub fn snapshot(current_id: &str, current_cost: f64) -> AccountSnapshot {
    AccountSnapshot {
        tariff: tariff::find_by_id(current_id).unwrap(),
        standing_charge: Cost::ZERO,
        region_code: 'C',
        product_code: "AGILE-24-10-01".to_owned(),
        consumption: vec![ConsumptionInterval {
            read_at: Local.with_ymd_and_hms(2025, 3, 14, 12, 30, 0).unwrap(),
            energy: KilowattHours::from(1.0),
            cost: Some(Cost::from_pence(current_cost)),
        }],
    }
}

#[derive(Default)]
pub struct FakeInitiator {
    pub is_failing: bool,
    pub n_calls: AtomicUsize,
}

#[async_trait]
impl SwitchInitiator for FakeInitiator {
    async fn initiate(&self, _tariff: &Tariff) -> Result {
        self.n_calls.fetch_add(1, Ordering::Relaxed);
        ensure!(!self.is_failing, "sign-up page is down");
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeEnrolments {
    pub enrolments: Vec<Enrolment>,
    pub terms_version: TermsVersion,
    pub n_list_calls: AtomicUsize,
    pub accepted: Mutex<Vec<(String, TermsVersion)>>,
}

impl FakeEnrolments {
    pub fn n_accepted(&self) -> usize {
        self.accepted.lock().unwrap().len()
    }
}

#[async_trait]
impl Enrolments for FakeEnrolments {
    async fn list_enrolments(&self) -> Result<Vec<Enrolment>> {
        self.n_list_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.enrolments.clone())
    }

    async fn get_terms_version(&self, _product_code: &str) -> Result<TermsVersion> {
        Ok(self.terms_version)
    }

    async fn accept_terms(&self, enrolment_id: &str, version: TermsVersion) -> Result {
        self.accepted.lock().unwrap().push((enrolment_id.to_owned(), version));
        Ok(())
    }
}

/// Account without a snapshot fails the lookup like an account without agreements.
#[derive(Default)]
pub struct FakeAccounts {
    pub snapshot: Option<AccountSnapshot>,
    pub start_dates: Vec<NaiveDate>,
}

#[async_trait]
impl AccountSource for FakeAccounts {
    async fn fetch_snapshot(&self, _on: NaiveDate) -> Result<AccountSnapshot> {
        Ok(self.snapshot.clone().ok_or(LookupError::NoAgreement)?)
    }

    async fn fetch_agreement_start_dates(&self) -> Result<Vec<NaiveDate>> {
        Ok(self.start_dates.clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<String>>);

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_owned());
    }
}

/// Flat unit rates per tariff, valid from the day's midnight. A missing tariff fails.
#[derive(Default)]
pub struct FlatRates {
    rates: Vec<(&'static str, f64)>,

    /// Tariffs whose rates end at 6 AM and leave the later readings uncovered.
    short_ids: Vec<&'static str>,

    pub n_calls: AtomicUsize,
}

impl FlatRates {
    pub fn new(rates: &[(&'static str, f64)]) -> Self {
        Self { rates: rates.to_vec(), ..Self::default() }
    }

    pub fn with_short(mut self, ids: &[&'static str]) -> Self {
        self.short_ids = ids.to_vec();
        self
    }
}

#[async_trait]
impl RateSource for FlatRates {
    async fn fetch_rates(
        &self,
        tariff: &Tariff,
        _region_code: char,
        on: NaiveDate,
    ) -> Result<RateSchedule> {
        self.n_calls.fetch_add(1, Ordering::Relaxed);
        let (_, pence) = self
            .rates
            .iter()
            .find(|(id, _)| *id == tariff.id)
            .with_context(|| format!("no rates for {tariff}"))?;
        let valid_from = on.and_hms_opt(0, 0, 0).unwrap().and_local_timezone(Local).unwrap();
        let valid_to = self
            .short_ids
            .contains(&tariff.id)
            .then(|| valid_from + TimeDelta::hours(6));
        Ok(RateSchedule::new(
            Cost::ZERO,
            vec![RateInterval {
                valid_from,
                valid_to,
                unit_rate: KilowattHourRate::from(*pence),
                payment_method: None,
            }],
        ))
    }
}
