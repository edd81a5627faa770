//! Tiered failure escalation
//!
//! Counts consecutive failed runs and alerts at the configured thresholds.
//! Failures accumulate silently between thresholds, and beyond the top one
//! nothing more is sent until a check succeeds. The policy is independent of
//! the reconciler: any run failure lands here.

use crate::models::RunState;
use crate::notify::Notifier;
use crate::services::MailTransport;
use crate::state::StateStore;
use anyhow::Result;

/// Ascending consecutive-failure counts that trigger an alert.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    thresholds: Vec<u32>,
}

impl EscalationPolicy {
    pub fn new(mut thresholds: Vec<u32>) -> Self {
        thresholds.sort_unstable();
        thresholds.dedup();
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }

    /// Whether a streak of exactly `count` consecutive failures fires an
    /// alert.
    pub fn fires_at(&self, count: usize) -> bool {
        self.thresholds.iter().any(|&t| t as usize == count)
    }

    /// Record a failed run: append the cause to the log, commit, and alert
    /// when the streak hits a threshold.
    ///
    /// An alert that cannot be sent is logged and swallowed; it must not
    /// crash the process or lose the recorded failure.
    pub fn record_failure<M: MailTransport>(
        &self,
        cause: &anyhow::Error,
        state: &mut RunState,
        store: &StateStore,
        notifier: &Notifier<'_, M>,
    ) -> Result<()> {
        state.record_failure(format!("{:?}", cause));
        store.commit(state)?;

        let count = state.consecutive_failures();
        tracing::error!("check failed ({} consecutive): {:#}", count, cause);

        if !self.fires_at(count) {
            return Ok(());
        }

        match notifier.notify_failure(state, &self.thresholds) {
            Ok(message_id) => {
                state.last_error_notification = Some(message_id);
                store.commit(state)?;
            }
            Err(e) => {
                tracing::warn!("failed to send the escalation alert: {}", e);
            }
        }

        Ok(())
    }

    /// Record a successful run: clear the streak and stamp the success time.
    pub fn record_success(&self, state: &mut RunState, store: &StateStore) -> Result<()> {
        state.mark_success();
        store.commit(state)
    }
}
