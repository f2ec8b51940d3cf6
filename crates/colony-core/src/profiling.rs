//! Profiling and diagnostic instrumentation for the economy engine.
//!
//! - [`StageProfile`] captures per-stage timing from the most recent step.
//!   The engine only fills it in when the `profiling` feature is enabled.
//! - [`BusinessDiagnostic`] explains why a business is idle or running.
//!   Always available.

use std::time::Duration;

use crate::fixed::{Fixed64, Ticks};
use crate::id::{BusinessId, JobId};
use crate::scheduler::JobBlock;
use crate::world::ActiveJob;

/// Per-stage timing from the most recent step.
#[derive(Debug, Clone, Default)]
pub struct StageProfile {
    pub spawn: Duration,
    pub feed: Duration,
    pub tech: Duration,
    pub procurement: Duration,
    pub jobs: Duration,
    pub bridge: Duration,
    pub export: Duration,
    pub haulers: Duration,
    pub propagation: Duration,
    pub bookkeeping: Duration,
    pub total: Duration,
    pub tick: Ticks,
}

impl StageProfile {
    /// Name and duration of the slowest stage.
    pub fn bottleneck_stage(&self) -> (&'static str, Duration) {
        let stages = [
            ("spawn", self.spawn),
            ("feed", self.feed),
            ("tech", self.tech),
            ("procurement", self.procurement),
            ("jobs", self.jobs),
            ("bridge", self.bridge),
            ("export", self.export),
            ("haulers", self.haulers),
            ("propagation", self.propagation),
            ("bookkeeping", self.bookkeeping),
        ];
        stages
            .into_iter()
            .fold(("spawn", Duration::ZERO), |best, stage| if stage.1 > best.1 { stage } else { best })
    }
}

/// Snapshot of a business's scheduling state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessDiagnostic {
    pub business: BusinessId,
    pub active_job: Option<ActiveJob>,
    pub last_job_tick: Ticks,
    pub next_job_tick: Ticks,
    pub credits: Fixed64,
    /// Each allowed job with the first filter it fails, if any.
    pub candidates: Vec<(JobId, Result<(), JobBlock>)>,
}

impl BusinessDiagnostic {
    /// Jobs that would pass the candidate filter right now.
    pub fn ready_jobs(&self) -> impl Iterator<Item = JobId> + '_ {
        self.candidates
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(job, _)| *job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_zero() {
        let p = StageProfile::default();
        assert_eq!(p.total, Duration::ZERO);
        assert_eq!(p.bottleneck_stage(), ("spawn", Duration::ZERO));
    }

    #[test]
    fn bottleneck_picks_slowest() {
        let p = StageProfile {
            jobs: Duration::from_micros(40),
            haulers: Duration::from_micros(90),
            bridge: Duration::from_micros(10),
            ..StageProfile::default()
        };
        assert_eq!(p.bottleneck_stage(), ("haulers", Duration::from_micros(90)));
    }
}
