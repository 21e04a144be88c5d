//! Periodic reminder evaluation.
//!
//! # Responsibility
//! - Scan the note store on a fixed interval and fire newly-due reminders.
//! - Record every fired reminder so later ticks skip it.
//!
//! # Invariants
//! - A note is notified at most once: `mark_fired` follows every `notify`,
//!   whatever the delivery outcome.
//! - A tick with nothing due performs no write.
//! - The first tick runs one full interval after start.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::model::note::{Note, NoteId};
use crate::reminder::notifier::Notifier;
use crate::repo::kv_repo::KvRepository;
use crate::service::note_store::NoteStore;
use log::{debug, error, info};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Default pause between two evaluation passes.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10);
const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(1);

/// Summary of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Notes notified and recorded as fired during this pass.
    pub fired: Vec<NoteId>,
    /// Notes notified whose fired flag could not be persisted.
    pub mark_failures: usize,
}

/// Fixed-interval reminder scheduler.
pub struct ReminderScheduler {
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ReminderScheduler {
    /// Creates a scheduler with the default 10 second interval.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Creates a scheduler ticking at the configured `check_interval`.
    pub fn from_config(clock: Arc<dyn Clock>, config: &CoreConfig) -> Self {
        Self::new(clock).with_interval(config.check_interval)
    }

    /// Overrides the evaluation interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_CHECK_INTERVAL);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one evaluation pass.
    pub fn tick<R: KvRepository>(
        &self,
        store: &mut NoteStore<R>,
        notifier: &dyn Notifier,
    ) -> TickReport {
        let now = self.clock.now();
        let due: Vec<Note> = store
            .list()
            .into_iter()
            .filter(|note| note.is_due(now))
            .collect();

        let mut report = TickReport::default();
        for note in due {
            let delivery = notifier.notify(note.text.as_str());
            debug!(
                "event=reminder_due module=scheduler status=notified note_id={} delivery={:?}",
                note.id, delivery
            );

            match store.mark_fired(note.id) {
                Ok(_) => report.fired.push(note.id),
                Err(err) => {
                    report.mark_failures += 1;
                    error!(
                        "event=reminder_mark_fired module=scheduler status=error note_id={} error={}",
                        note.id, err
                    );
                }
            }
        }

        if !report.fired.is_empty() || report.mark_failures > 0 {
            info!(
                "event=reminder_tick module=scheduler status=ok fired={} mark_failures={}",
                report.fired.len(),
                report.mark_failures
            );
        }
        report
    }

    /// Ticks every interval until `shutdown` resolves.
    ///
    /// Long-running hosts (the `remindnote watch` command) drive this loop;
    /// hosts with their own timer call [`Self::tick`] instead.
    ///
    /// Returns the number of completed ticks. Ticks missed while the host
    /// was suspended are delayed rather than replayed in a burst.
    pub async fn run_until<R, F>(
        &self,
        store: &mut NoteStore<R>,
        notifier: &dyn Notifier,
        shutdown: F,
    ) -> u64
    where
        R: KvRepository,
        F: Future<Output = ()>,
    {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "event=scheduler_start module=scheduler status=ok interval_ms={}",
            self.interval.as_millis()
        );
        let mut ticks = 0_u64;
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.tick(store, notifier);
                    ticks += 1;
                }
            }
        }
        info!("event=scheduler_stop module=scheduler status=ok ticks={ticks}");
        ticks
    }
}
