use std::time::Duration;

use bon::Builder;
use chrono::{Local, NaiveDate};
use clap::Parser;
use reqwest::Url;
use tokio::time::timeout;

use crate::{
    api::{octopus, switch},
    cli::{account::AccountArgs, notification::NotificationArgs},
    core::{
        decision::DecisionEngine,
        source::{AccountSource, Enrolments, Notifier, RateSource, SwitchInitiator},
        switch::{SwitchOrchestrator, SwitchOutcome, SwitchState},
        tariff::Candidates,
    },
    prelude::*,
    quantity::cost::Cost,
    tables::build_comparison_table,
};

#[derive(Parser)]
pub struct CompareArgs {
    #[clap(flatten)]
    account: AccountArgs,

    /// Tariffs to compare the current one with.
    #[clap(
        long = "tariffs",
        env = "TARIFFS",
        value_delimiter = ',',
        num_args = 1..,
        default_value = "go,agile,flexible"
    )]
    tariffs: Vec<String>,

    /// Compare and report, but do not switch.
    #[clap(long = "dry-run", env = "DRY_RUN")]
    is_dry_run: bool,

    /// Minimal saving in pence that justifies a switch.
    #[clap(long = "switch-threshold-pence", env = "SWITCH_THRESHOLD_PENCE", default_value = "2")]
    switch_threshold: Cost,

    /// Time the supplier needs to generate the new agreement after the switch request.
    #[clap(long = "grace-period", env = "SWITCH_GRACE_PERIOD", default_value = "1min")]
    grace_period: humantime::Duration,

    /// Give up the whole run after this long.
    #[clap(long = "timeout", env = "RUN_TIMEOUT", default_value = "15min")]
    timeout: humantime::Duration,

    /// Sign-up automation webhook, required unless in dry run.
    #[clap(long = "switch-webhook-url", env = "SWITCH_WEBHOOK_URL")]
    switch_webhook_url: Option<Url>,

    #[clap(flatten)]
    notification: NotificationArgs,
}

impl CompareArgs {
    /// Connect to the account and run the comparison, reporting every fatal error to the notifier.
    pub async fn run(self) -> Result {
        let notifier = self.notification.webhooks()?;
        let (api, initiator) = match self.connect().await {
            Ok(collaborators) => collaborators,
            Err(error) => {
                notifier.notify(&format!("{error:?}")).await;
                return Err(error);
            }
        };
        Run::builder()
            .accounts(&api)
            .rate_source(&api)
            .enrolments(&api)
            .initiator(&initiator)
            .notifier(&notifier)
            .tariffs(&self.tariffs)
            .is_dry_run(self.is_dry_run)
            .switch_threshold(self.switch_threshold)
            .grace_period(self.grace_period.into())
            .timeout(self.timeout.into())
            .today(Local::now().date_naive())
            .build()
            .run()
            .await
    }

    #[instrument(skip_all, fields(account_number = %self.account.account_number))]
    async fn connect(&self) -> Result<(octopus::Api, switch::Webhook)> {
        ensure!(
            self.is_dry_run || self.switch_webhook_url.is_some(),
            "`--switch-webhook-url` is required unless in dry run",
        );
        let mut api = octopus::Api::try_new(
            self.account.octopus.base_url.clone(),
            self.account.account_number.clone(),
        )?;
        api.authenticate(&self.account.api_key).await?;
        let initiator = switch::Webhook::try_new(
            self.switch_webhook_url.clone(),
            self.account.account_number.clone(),
        )?;
        Ok((api, initiator))
    }
}

/// Single comparison and switch run over the collaborators.
#[derive(Builder)]
struct Run<'a> {
    accounts: &'a dyn AccountSource,
    rate_source: &'a dyn RateSource,
    enrolments: &'a dyn Enrolments,
    initiator: &'a dyn SwitchInitiator,
    notifier: &'a dyn Notifier,

    /// Configured candidate identifiers.
    tariffs: &'a [String],

    is_dry_run: bool,
    switch_threshold: Cost,
    grace_period: Duration,

    /// The whole run gives up after this long.
    timeout: Duration,

    today: NaiveDate,
}

impl Run<'_> {
    /// Compare and switch within the timeout.
    ///
    /// A failed switch step, a fatal error and the timeout are all notified and end in an error.
    async fn run(&self) -> Result {
        let mut state = SwitchState::Idle;
        let result = timeout(self.timeout, self.compare_and_switch(&mut state)).await;
        match result {
            Ok(Ok(SwitchOutcome::FailedAt { step, reason })) => {
                let message = format!("Switch failed at {step}: {reason}");
                self.notifier.notify(&message).await;
                bail!(message);
            }
            Ok(Ok(outcome)) => {
                info!(?outcome, "finished");
                Ok(())
            }
            Ok(Err(error)) => {
                self.notifier.notify(&format!("{error:?}")).await;
                Err(error)
            }
            Err(_) => {
                let outcome = SwitchOutcome::from(state);
                let message = format!(
                    "Timed out after {}, last state: {outcome:?}",
                    humantime::format_duration(self.timeout),
                );
                self.notifier.notify(&message).await;
                bail!(message);
            }
        }
    }

    #[instrument(skip_all, fields(is_dry_run = self.is_dry_run, on = %self.today))]
    async fn compare_and_switch(&self, state: &mut SwitchState) -> Result<SwitchOutcome> {
        let welcome_prefix = if self.is_dry_run { "DRY RUN: " } else { "" };
        self.notifier
            .notify(&format!("{welcome_prefix}Octohop on. Starting comparison of today's costs..."))
            .await;

        let candidates = Candidates::resolve(self.tariffs);
        for id in &candidates.unknown_ids {
            warn!(%id, "unknown tariff");
            self.notifier.notify(&format!("Warning: No tariff found for ID '{id}'")).await;
        }

        let snapshot = self
            .accounts
            .fetch_snapshot(self.today)
            .await
            .context("failed to fetch the account snapshot")?;

        let engine = DecisionEngine::builder()
            .rate_source(self.rate_source)
            .switch_threshold(self.switch_threshold)
            .on(self.today)
            .build();
        let comparison = engine.compare(&snapshot, &candidates.tariffs).await;
        let summary = comparison.summary();
        let decision = engine.decide(&comparison);
        println!("{}", build_comparison_table(&comparison, &decision));
        self.notifier.notify(&format!("{summary}\n{}", decision.message())).await;

        if !decision.should_switch {
            return Ok(SwitchOutcome::NotAttempted);
        }

        let outcome = SwitchOrchestrator::builder()
            .initiator(self.initiator)
            .enrolments(self.enrolments)
            .accounts(self.accounts)
            .notifier(self.notifier)
            .grace_period(self.grace_period)
            .is_dry_run(self.is_dry_run)
            .today(self.today)
            .fallback_product_code(snapshot.product_code.as_str())
            .build()
            .run(decision.winner.tariff, state)
            .await;
        Ok(outcome)
    }
}
