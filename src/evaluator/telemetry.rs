//! Query telemetry: a tree of timed evaluation phases
//!
//! A [`PhaseScope`] opens a phase and closes it on [`PhaseScope::complete`].
//! Scopes opened while another one is open become its children. A scope
//! dropped without completion is discarded and logged at debug level, so
//! an early `?` return never leaves a half-measured phase in the result.
//!
//! When telemetry is not requested the recorder is disabled and every call
//! is a no-op.

use std::cell::RefCell;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Evaluation phases that can be measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryPhase {
    Filter,
    Order,
    Fetch,
    Hierarchy,
    FacetSummary,
    Histogram,
    Paging,
}

impl QueryPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryPhase::Filter => "filter",
            QueryPhase::Order => "order",
            QueryPhase::Fetch => "fetch",
            QueryPhase::Hierarchy => "hierarchy",
            QueryPhase::FacetSummary => "facetSummary",
            QueryPhase::Histogram => "histogram",
            QueryPhase::Paging => "paging",
        }
    }
}

/// One measured phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTelemetry {
    pub phase: QueryPhase,
    pub start: DateTime<Utc>,
    pub elapsed_ns: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<PhaseTelemetry>,
}

/// Telemetry of one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTelemetry {
    pub start: DateTime<Utc>,
    pub elapsed_ns: u64,
    pub phases: Vec<PhaseTelemetry>,
}

struct OpenPhase {
    phase: QueryPhase,
    start: DateTime<Utc>,
    started: Instant,
    steps: Vec<PhaseTelemetry>,
}

struct Frames {
    start: DateTime<Utc>,
    started: Instant,
    open: Vec<OpenPhase>,
    closed: Vec<PhaseTelemetry>,
}

/// Collects phase timings of one evaluation
pub struct TelemetryRecorder {
    frames: Option<RefCell<Frames>>,
}

impl TelemetryRecorder {
    pub fn new(enabled: bool) -> Self {
        let frames = enabled.then(|| {
            RefCell::new(Frames {
                start: Utc::now(),
                started: Instant::now(),
                open: Vec::new(),
                closed: Vec::new(),
            })
        });
        Self { frames }
    }

    pub fn is_enabled(&self) -> bool {
        self.frames.is_some()
    }

    /// Open a phase nested under the innermost open one
    pub fn begin(&self, phase: QueryPhase) -> PhaseScope<'_> {
        if let Some(frames) = &self.frames {
            frames.borrow_mut().open.push(OpenPhase {
                phase,
                start: Utc::now(),
                started: Instant::now(),
                steps: Vec::new(),
            });
        }
        PhaseScope {
            recorder: self,
            phase,
            completed: false,
        }
    }

    /// Telemetry collected so far, `None` when disabled
    pub fn finish(self) -> Option<QueryTelemetry> {
        let mut frames = self.frames?.into_inner();
        // Scopes still open at this point were leaked; close them as measured.
        while !frames.open.is_empty() {
            close(&mut frames);
        }
        Some(QueryTelemetry {
            start: frames.start,
            elapsed_ns: elapsed_ns(frames.started),
            phases: frames.closed,
        })
    }

    fn close(&self, keep: bool) {
        let Some(frames) = &self.frames else {
            return;
        };
        let mut frames = frames.borrow_mut();
        if keep {
            close(&mut frames);
        } else {
            frames.open.pop();
        }
    }
}

fn close(frames: &mut Frames) {
    let Some(open) = frames.open.pop() else {
        return;
    };
    let measured = PhaseTelemetry {
        phase: open.phase,
        start: open.start,
        elapsed_ns: elapsed_ns(open.started),
        steps: open.steps,
    };
    match frames.open.last_mut() {
        Some(parent) => parent.steps.push(measured),
        None => frames.closed.push(measured),
    }
}

fn elapsed_ns(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

/// An open phase; complete it to keep its timing
pub struct PhaseScope<'r> {
    recorder: &'r TelemetryRecorder,
    phase: QueryPhase,
    completed: bool,
}

impl PhaseScope<'_> {
    pub fn complete(mut self) {
        self.completed = true;
        self.recorder.close(true);
    }
}

impl Drop for PhaseScope<'_> {
    fn drop(&mut self) {
        if !self.completed {
            if self.recorder.is_enabled() {
                tracing::debug!(phase = self.phase.as_str(), "telemetry phase dropped without completion");
            }
            self.recorder.close(false);
        }
    }
}
