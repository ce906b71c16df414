//! [`KickStart`] – fixed-point driver for [`Spark`]s.
//!
//! Sparks may depend on services registered by other sparks, and the order
//! in which they are plugged in is not known ahead of time.  Instead of
//! building a dependency graph, [`KickStart::kick`] sweeps every unfinished
//! spark repeatedly until either all of them are [`SparkState::Full`] or a
//! whole sweep passes without any spark advancing.
//!
//! # Termination
//!
//! A spark's recorded state only ever moves forward (`Blank → Partial →
//! Full`).  A spark reporting a lower state than before keeps its previous
//! one.  Every productive sweep therefore advances at least one spark by one
//! step, which bounds a kick at `2 × sparks + 1` sweeps.
//!
//! Sparks that never complete are reported in [`KickReport::failed`].  This
//! is not an error: the services they would have published simply stay
//! absent, and consumers must cope with `get` returning `None`.

use std::collections::BTreeSet;

use hearth_core::ServiceCore;
use hearth_types::{HearthError, SparkState};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::spark::Spark;

/// Outcome of a [`KickStart::kick`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KickReport {
    /// Every spark that has reached [`SparkState::Full`], across all kicks of
    /// this coordinator.
    pub fully_initialized: BTreeSet<String>,
    /// Sparks still short of [`SparkState::Full`].
    pub failed: BTreeSet<String>,
    /// The subset of `failed` that got as far as [`SparkState::Partial`].
    pub partial: BTreeSet<String>,
    /// Number of sweeps this kick performed.
    pub sweeps: usize,
}

impl KickReport {
    /// `true` when no spark was left behind.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turn a report with failures into [`HearthError::InitializerStalled`].
    pub fn into_result(self) -> Result<Self, HearthError> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(HearthError::InitializerStalled(
                self.failed.into_iter().collect(),
            ))
        }
    }
}

struct Entry {
    spark: Box<dyn Spark>,
    state: SparkState,
}

/// Bootstrap coordinator.
///
/// # Example
///
/// ```
/// use hearth_bootstrap::{KickStart, ServiceSpark};
/// use hearth_core::ServiceCore;
/// use hearth_types::BasicService;
///
/// let mut kickstart = KickStart::new();
/// // Plugged in "backwards": y depends on x.
/// kickstart.add_spark(Box::new(
///     ServiceSpark::new("y", |_, _| Some(BasicService::handle("y", "needs x"))).requires(["x"]),
/// ));
/// kickstart.add_spark(Box::new(ServiceSpark::new("x", |_, _| {
///     Some(BasicService::handle("x", "standalone"))
/// })));
///
/// let mut core = ServiceCore::new();
/// let report = kickstart.kick(&mut core, &mut Vec::new());
/// assert!(report.is_complete());
/// assert_eq!(report.sweeps, 2);
/// ```
#[derive(Default)]
pub struct KickStart {
    // Sparks not yet full, in the order they were added.
    pending: Vec<Entry>,
    completed: BTreeSet<String>,
}

impl KickStart {
    /// Create a coordinator with no sparks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `spark` for the next [`kick`][Self::kick].
    pub fn add_spark(&mut self, spark: Box<dyn Spark>) {
        debug!(spark = %spark.name(), "spark added");
        self.pending.push(Entry {
            spark,
            state: SparkState::Blank,
        });
    }

    /// Names of the sparks that are not yet full, in insertion order.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|entry| entry.spark.name())
    }

    /// Names of every spark that has completed so far.
    pub fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }

    /// Drive every pending spark to completion, or until no more progress
    /// can be made.
    ///
    /// May be called again later: unfinished sparks stay queued, and sparks
    /// added in between are swept along with them.
    #[instrument(name = "kick", skip_all, fields(sparks = self.pending.len()))]
    pub fn kick(&mut self, core: &mut ServiceCore, args: &mut Vec<String>) -> KickReport {
        let mut sweeps = 0;

        while !self.pending.is_empty() {
            sweeps += 1;
            let mut progressed = false;

            for entry in &mut self.pending {
                let before = entry.state;
                let after = entry.spark.try_initialize_more(core, args);
                debug!(
                    spark = %entry.spark.name(),
                    sweep = sweeps,
                    %before,
                    %after,
                    "spark invoked"
                );
                if after < before {
                    warn!(
                        spark = %entry.spark.name(),
                        %before,
                        %after,
                        "spark reported a regressed state; keeping the previous one"
                    );
                } else if after > before {
                    entry.state = after;
                    progressed = true;
                }
            }

            let completed = &mut self.completed;
            self.pending.retain(|entry| {
                if entry.state == SparkState::Full {
                    info!(spark = %entry.spark.name(), "spark fully initialized");
                    completed.insert(entry.spark.name().to_string());
                    false
                } else {
                    true
                }
            });

            info!(
                sweep = sweeps,
                remaining = self.pending.len(),
                services = core.len(),
                "bootstrap sweep finished"
            );

            if !progressed {
                break;
            }
        }

        let report = self.report(sweeps);
        if !report.is_complete() {
            warn!(
                failed = ?report.failed,
                partial = ?report.partial,
                "bootstrap stalled; some services will be unavailable"
            );
        }
        report
    }

    fn report(&self, sweeps: usize) -> KickReport {
        let mut report = KickReport {
            fully_initialized: self.completed.clone(),
            sweeps,
            ..KickReport::default()
        };
        for entry in &self.pending {
            let name = entry.spark.name().to_string();
            if entry.state == SparkState::Partial {
                report.partial.insert(name.clone());
            }
            report.failed.insert(name);
        }
        report
    }
}

impl std::fmt::Debug for KickStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KickStart")
            .field("pending", &self.pending().collect::<Vec<_>>())
            .field("completed", &self.completed)
            .finish()
    }
}
