//! The run loop: fetch, diff, reconcile, notify, commit

use crate::escalation::EscalationPolicy;
use crate::models::{Baseline, ComparisonKey, Config, DiffOutcome, RunState};
use crate::notify::Notifier;
use crate::reconciler::{reconcile, Decision};
use crate::services::{MailTransport, SnapshotSource};
use crate::state::StateStore;
use anyhow::{Context, Result};

/// One monitored ledger: the collaborators, the state store, and the
/// escalation policy.
///
/// Runs are serialized by the caller (the scheduler or CLI is the only entry
/// point); no two runs may execute concurrently against the same state file.
/// That is a documented constraint, not an enforced lock.
pub struct Checker<'a, S: SnapshotSource, M: MailTransport> {
    source: &'a S,
    notifier: Notifier<'a, M>,
    store: StateStore,
    policy: EscalationPolicy,
}

impl<'a, S: SnapshotSource, M: MailTransport> Checker<'a, S, M> {
    pub fn new(config: &'a Config, source: &'a S, transport: &'a M) -> Self {
        Self {
            source,
            notifier: Notifier::new(transport, config),
            store: StateStore::new(&config.checker.state_path),
            policy: EscalationPolicy::new(config.checker.escalation_thresholds.clone()),
        }
    }

    /// Run one check, routing any failure through the escalation policy.
    ///
    /// An `Err` from here means state bookkeeping itself failed; check
    /// failures are absorbed by the policy and reported by email.
    pub fn run(&self) -> Result<()> {
        let mut state = self.store.load();

        match self.run_once(&mut state) {
            Ok(()) => self.policy.record_success(&mut state, &self.store),
            Err(err) => self
                .policy
                .record_failure(&err, &mut state, &self.store, &self.notifier),
        }
    }

    /// The fetch → diff → reconcile → notify pipeline.
    ///
    /// Each phase boundary below is a cooperative checkpoint; cancellation
    /// could be added there without restructuring the loop.
    fn run_once(&self, state: &mut RunState) -> Result<()> {
        tracing::info!("phase: fetch");
        let artifacts = self
            .source
            .fetch()
            .context("failed to fetch the ledger document")?;

        tracing::info!("phase: convert and diff");
        let outcome = self
            .source
            .diff(&artifacts)
            .context("failed to diff the ledger")?;

        tracing::info!("phase: reconcile");
        match reconcile(&outcome, state) {
            Decision::NoChange => {
                tracing::info!("no material change; discarding the re-fetched artifacts");
                let sheet_id = match &outcome {
                    DiffOutcome::Changes(diff) => Some(diff.sheet_id.as_str()),
                    DiffOutcome::NoDifference => None,
                };
                self.source
                    .discard(&artifacts, sheet_id)
                    .context("failed to discard artifacts")?;
            }
            Decision::Changed(diff) => {
                tracing::info!("phase: notify");
                let prior = state.baseline.clone();
                let sent = self
                    .notifier
                    .notify_change(&diff, &artifacts, prior.as_ref(), state)
                    .context("failed to send the change notification")?;

                // The previous change's sheet is superseded; hiding it is
                // cosmetic, so a failure here is not a failed run.
                if let Some(prior) = &prior {
                    if let Err(e) = self.source.hide_sheet(&prior.diff.sheet_id) {
                        tracing::warn!("failed to hide the superseded sheet: {}", e);
                    }
                }

                tracing::info!("phase: commit new baseline");
                state.last_change_notification = Some(sent.message_id);
                state.pending_notified_reference = Some(sent.thread_reference);
                state.baseline = Some(Baseline {
                    key: ComparisonKey::of(&diff),
                    diff,
                    artifacts,
                });
                self.store.commit(state)?;
            }
        }

        Ok(())
    }
}
