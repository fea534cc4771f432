use std::time::Duration;

use bon::Builder;
use chrono::NaiveDate;
use tokio::time::sleep;

use crate::{
    core::{
        error::NoEnrolmentFoundError,
        source::{
            AccountSource,
            Enrolment,
            EnrolmentStatus,
            Enrolments,
            Notifier,
            SwitchInitiator,
        },
        tariff::Tariff,
    },
    prelude::*,
};

const POST_ENROLMENT_STAGE: &str = "post-enrolment";

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum SwitchStep {
    #[display("switch initiation")]
    Initiation,

    #[display("agreement acceptance")]
    Acceptance,

    #[display("agreement verification")]
    Verification,
}

/// Progress of the switch workflow.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SwitchState {
    Idle,
    Initiated,
    AgreementPending,
    AgreementAccepted,
    Verified,
    Failed { step: SwitchStep, reason: String },
}

#[must_use]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SwitchOutcome {
    NotAttempted,
    DryRunSkipped,

    /// The sign-up went through, but the agreement was not accepted (yet).
    Initiated,

    /// The agreement is accepted, but the new agreement could not be verified.
    AgreementAccepted,

    Verified,
    FailedAt { step: SwitchStep, reason: String },
}

impl From<SwitchState> for SwitchOutcome {
    fn from(state: SwitchState) -> Self {
        match state {
            SwitchState::Idle => Self::NotAttempted,
            SwitchState::Initiated | SwitchState::AgreementPending => Self::Initiated,
            SwitchState::AgreementAccepted => Self::AgreementAccepted,
            SwitchState::Verified => Self::Verified,
            SwitchState::Failed { step, reason } => Self::FailedAt { step, reason },
        }
    }
}

/// Drives the account from its current tariff to the target one.
///
/// None of the steps can be undone, so there is no retry: a failed step ends the workflow.
#[derive(Builder)]
pub struct SwitchOrchestrator<'a> {
    initiator: &'a dyn SwitchInitiator,
    enrolments: &'a dyn Enrolments,
    accounts: &'a dyn AccountSource,
    notifier: &'a dyn Notifier,

    /// Time the supplier needs to generate the pending agreement.
    grace_period: Duration,

    /// Stop before contacting the sign-up service.
    is_dry_run: bool,

    today: NaiveDate,

    /// Product to look the terms up for, when the enrolment does not tell.
    #[builder(into)]
    fallback_product_code: String,
}

impl SwitchOrchestrator<'_> {
    /// Run the workflow from the given state until it finishes.
    ///
    /// The state is updated after every transition, so that it still tells how far the workflow
    /// went if the caller abandons the future.
    #[instrument(skip_all, fields(tariff = target.id))]
    pub async fn run(&self, target: &'static Tariff, state: &mut SwitchState) -> SwitchOutcome {
        if self.is_dry_run {
            info!("dry run, skipping the switch");
            self.notifier.notify("DRY RUN: Not going through with switch today.").await;
            return SwitchOutcome::DryRunSkipped;
        }
        loop {
            let Some(next_state) = self.advance(target, state).await else {
                break;
            };
            info!(?next_state, "transitioned");
            *state = next_state;
        }
        SwitchOutcome::from(state.clone())
    }

    async fn advance(&self, target: &'static Tariff, state: &SwitchState) -> Option<SwitchState> {
        match state {
            SwitchState::Idle => Some(match self.initiator.initiate(target).await {
                Ok(()) => {
                    self.notifier.notify("Tariff switch requested successfully.").await;
                    SwitchState::Initiated
                }
                Err(error) => Self::fail(SwitchStep::Initiation, &error),
            }),

            SwitchState::Initiated => {
                info!(grace_period = ?self.grace_period, "waiting for the agreement…");
                sleep(self.grace_period).await;
                Some(SwitchState::AgreementPending)
            }

            SwitchState::AgreementPending => Some(match self.accept(target).await {
                Ok(()) => SwitchState::AgreementAccepted,
                Err(error) => Self::fail(SwitchStep::Acceptance, &error),
            }),

            SwitchState::AgreementAccepted => match self.verify().await {
                Ok(true) => {
                    self.notifier
                        .notify("Verified new agreement successfully. Process finished.")
                        .await;
                    Some(SwitchState::Verified)
                }
                Ok(false) => {
                    self.notifier
                        .notify("Unable to verify the new agreement. Please check manually.")
                        .await;
                    None
                }
                Err(error) => Some(Self::fail(SwitchStep::Verification, &error)),
            },

            SwitchState::Verified | SwitchState::Failed { .. } => None,
        }
    }

    #[instrument(skip_all)]
    async fn accept(&self, target: &'static Tariff) -> Result {
        let enrolments =
            self.enrolments.list_enrolments().await.context("failed to list the enrolments")?;
        info!(n_enrolments = enrolments.len(), "fetched");

        if let Some(enrolment) = find_in_progress(&enrolments, target) {
            let product_code =
                enrolment.product_code.as_deref().unwrap_or(&self.fallback_product_code);
            let version = self
                .enrolments
                .get_terms_version(product_code)
                .await
                .with_context(|| format!("failed to get the terms version for `{product_code}`"))?;
            info!(enrolment_id = %enrolment.id, %version, "accepting…");
            self.enrolments
                .accept_terms(&enrolment.id, version)
                .await
                .with_context(|| format!("failed to accept the enrolment `{}`", enrolment.id))?;
            self.notifier.notify("Accepted agreement. Switch successful.").await;
        } else if is_post_enrolment_completed_on(&enrolments, self.today) {
            info!("post-enrolment is already completed");
            self.notifier
                .notify("Post-enrolment automatically completed with today's date.")
                .await;
        } else {
            bail!(NoEnrolmentFoundError);
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn verify(&self) -> Result<bool> {
        let start_dates = self
            .accounts
            .fetch_agreement_start_dates()
            .await
            .context("failed to fetch the agreements")?;
        let is_verified = start_dates.contains(&self.today);
        info!(?start_dates, is_verified);
        Ok(is_verified)
    }

    fn fail(step: SwitchStep, error: &Error) -> SwitchState {
        error!(%step, "failed: {error:#}");
        SwitchState::Failed { step, reason: format!("{error:#}") }
    }
}

/// Find the in-progress enrolment onto the target tariff.
///
/// Enrolments that do not tell their product are taken as the target's.
fn find_in_progress<'e>(enrolments: &'e [Enrolment], target: &Tariff) -> Option<&'e Enrolment> {
    enrolments.iter().find(|enrolment| {
        enrolment.status == EnrolmentStatus::InProgress
            && enrolment
                .product_code
                .as_deref()
                .is_none_or(|product_code| target.matches_product_code(product_code))
    })
}

/// Sometimes the enrolment skips the in-progress state and gets accepted on its own.
fn is_post_enrolment_completed_on(enrolments: &[Enrolment], on: NaiveDate) -> bool {
    enrolments
        .iter()
        .flat_map(|enrolment| &enrolment.stages)
        .filter(|stage| stage.name == POST_ENROLMENT_STAGE)
        .filter(|stage| stage.status == EnrolmentStatus::Completed)
        .any(|stage| stage.step_dates.contains(&on))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tokio::time::timeout;

    use super::*;
    use crate::core::{
        fakes::{FakeAccounts, FakeEnrolments, FakeInitiator, RecordingNotifier, today},
        source::{EnrolmentStage, TermsVersion},
        tariff,
    };

    fn enrolment(id: &str, status: EnrolmentStatus, product_code: Option<&str>) -> Enrolment {
        Enrolment {
            id: id.to_owned(),
            status,
            product_code: product_code.map(ToOwned::to_owned),
            stages: Vec::new(),
        }
    }

    struct Fixture {
        initiator: FakeInitiator,
        enrolments: FakeEnrolments,
        accounts: FakeAccounts,
        notifier: RecordingNotifier,
    }

    impl Fixture {
        fn new(enrolments: Vec<Enrolment>, start_dates: Vec<NaiveDate>) -> Self {
            Self {
                initiator: FakeInitiator::default(),
                enrolments: FakeEnrolments {
                    enrolments,
                    terms_version: TermsVersion { major: 2, minor: 1 },
                    ..FakeEnrolments::default()
                },
                accounts: FakeAccounts { snapshot: None, start_dates },
                notifier: RecordingNotifier::default(),
            }
        }

        fn orchestrator(
            &self,
            is_dry_run: bool,
            grace_period: Duration,
        ) -> SwitchOrchestrator<'_> {
            SwitchOrchestrator::builder()
                .initiator(&self.initiator)
                .enrolments(&self.enrolments)
                .accounts(&self.accounts)
                .notifier(&self.notifier)
                .grace_period(grace_period)
                .is_dry_run(is_dry_run)
                .today(today())
                .fallback_product_code("AGILE-24-10-01")
                .build()
        }

        async fn run(&self, is_dry_run: bool) -> (SwitchOutcome, SwitchState) {
            let target = tariff::find_by_id("go").unwrap();
            let mut state = SwitchState::Idle;
            let outcome =
                self.orchestrator(is_dry_run, Duration::ZERO).run(target, &mut state).await;
            (outcome, state)
        }

        fn n_accepted(&self) -> usize {
            self.enrolments.n_accepted()
        }
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_external_calls() {
        let fixture = Fixture::new(
            vec![enrolment("1", EnrolmentStatus::InProgress, None)],
            vec![today()],
        );
        let (outcome, state) = fixture.run(true).await;
        assert_eq!(outcome, SwitchOutcome::DryRunSkipped);
        assert_eq!(state, SwitchState::Idle);
        assert_eq!(fixture.initiator.n_calls.load(Ordering::Relaxed), 0);
        assert_eq!(fixture.enrolments.n_list_calls.load(Ordering::Relaxed), 0);
        assert_eq!(fixture.n_accepted(), 0);
    }

    #[tokio::test]
    async fn test_switch_verified() {
        let fixture = Fixture::new(
            vec![
                enrolment("old", EnrolmentStatus::Completed, Some("GO-VAR-22-10-14")),
                enrolment("other", EnrolmentStatus::InProgress, Some("COSY-22-12-08")),
                enrolment("new", EnrolmentStatus::InProgress, Some("GO-VAR-22-10-14")),
            ],
            vec![NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), today()],
        );
        let (outcome, state) = fixture.run(false).await;
        assert_eq!(outcome, SwitchOutcome::Verified);
        assert_eq!(state, SwitchState::Verified);
        assert_eq!(
            *fixture.enrolments.accepted.lock().unwrap(),
            [("new".to_owned(), TermsVersion { major: 2, minor: 1 })],
        );
    }

    #[tokio::test]
    async fn test_auto_accepted_post_enrolment() {
        let mut completed = enrolment("1", EnrolmentStatus::Completed, None);
        completed.stages.push(EnrolmentStage {
            name: POST_ENROLMENT_STAGE.to_owned(),
            status: EnrolmentStatus::Completed,
            step_dates: vec![NaiveDate::from_ymd_opt(2025, 3, 13).unwrap(), today()],
        });
        let fixture = Fixture::new(vec![completed], vec![today()]);
        let (outcome, _) = fixture.run(false).await;
        assert_eq!(outcome, SwitchOutcome::Verified);
        assert_eq!(fixture.n_accepted(), 0);
        assert!(
            fixture
                .notifier
                .messages()
                .iter()
                .any(|message| message.starts_with("Post-enrolment automatically completed"))
        );
    }

    #[tokio::test]
    async fn test_no_enrolment_fails_acceptance() {
        let mut stale = enrolment("1", EnrolmentStatus::Completed, None);
        stale.stages.push(EnrolmentStage {
            name: POST_ENROLMENT_STAGE.to_owned(),
            status: EnrolmentStatus::Completed,
            step_dates: vec![NaiveDate::from_ymd_opt(2025, 3, 13).unwrap()],
        });
        let fixture = Fixture::new(vec![stale], vec![today()]);
        let (outcome, state) = fixture.run(false).await;
        let SwitchOutcome::FailedAt { step, reason } = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(step, SwitchStep::Acceptance);
        assert!(reason.contains("no in-progress enrolment"), "{reason}");
        assert!(matches!(state, SwitchState::Failed { step: SwitchStep::Acceptance, .. }));
    }

    #[tokio::test]
    async fn test_unverified_agreement_is_soft_failure() {
        let fixture = Fixture::new(
            vec![enrolment("1", EnrolmentStatus::InProgress, None)],
            vec![NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()],
        );
        let (outcome, state) = fixture.run(false).await;
        assert_eq!(outcome, SwitchOutcome::AgreementAccepted);
        assert_eq!(state, SwitchState::AgreementAccepted);
        assert!(fixture.notifier.messages().last().unwrap().contains("check manually"));
    }

    #[tokio::test]
    async fn test_initiation_failure_stops_workflow() {
        let mut fixture = Fixture::new(Vec::new(), Vec::new());
        fixture.initiator.is_failing = true;
        let (outcome, _) = fixture.run(false).await;
        assert!(matches!(outcome, SwitchOutcome::FailedAt { step: SwitchStep::Initiation, .. }));
        assert_eq!(fixture.enrolments.n_list_calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_abandoned_run_keeps_progress() {
        let fixture = Fixture::new(Vec::new(), Vec::new());
        let target = tariff::find_by_id("go").unwrap();
        let orchestrator = fixture.orchestrator(false, Duration::from_secs(3600));
        let mut state = SwitchState::Idle;
        let result = timeout(Duration::from_millis(50), orchestrator.run(target, &mut state)).await;
        assert!(result.is_err());
        assert_eq!(SwitchOutcome::from(state), SwitchOutcome::Initiated);
        assert_eq!(fixture.enrolments.n_list_calls.load(Ordering::Relaxed), 0);
    }
}
