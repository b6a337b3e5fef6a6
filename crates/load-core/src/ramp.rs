use crate::config::{RampConfig, RampStage};

/// Ramp planner: stages are applied strictly in order, each moving the
/// virtual-user count linearly from the previous target to its own, using
/// integer milliseconds only.
#[derive(Debug, Clone)]
pub struct RampPlanner {
    start_vus: u64,
    stages: Vec<RampStage>,
}

impl RampPlanner {
    pub fn new(config: RampConfig, start_vus: u64) -> Self {
        Self {
            start_vus,
            stages: config.stages,
        }
    }

    pub fn stages(&self) -> &[RampStage] {
        &self.stages
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.stages
            .iter()
            .fold(0u64, |total, s| total.saturating_add(s.duration_ms))
    }

    /// Highest virtual-user count the plan ever asks for.
    pub fn peak_vus(&self) -> u64 {
        self.stages
            .iter()
            .map(|s| s.target)
            .fold(self.start_vus, u64::max)
    }

    /// Target number of virtual users at `elapsed_ms`, or `None` once the
    /// last stage has finished.
    pub fn target_vus(&self, elapsed_ms: u64) -> Option<u64> {
        let mut from = self.start_vus;
        let mut stage_start_ms = 0u64;
        for stage in &self.stages {
            let stage_end_ms = stage_start_ms.saturating_add(stage.duration_ms);
            if elapsed_ms < stage_end_ms {
                let offset = elapsed_ms - stage_start_ms;
                return Some(interpolate(from, stage.target, offset, stage.duration_ms));
            }
            from = stage.target;
            stage_start_ms = stage_end_ms;
        }
        None
    }
}

fn interpolate(from: u64, to: u64, offset_ms: u64, duration_ms: u64) -> u64 {
    // duration_ms > offset_ms >= 0 here, so the division is safe
    let offset = offset_ms as u128;
    let duration = duration_ms as u128;
    if to >= from {
        from + (((to - from) as u128 * offset) / duration) as u64
    } else {
        from - (((from - to) as u128 * offset) / duration) as u64
    }
}
