use std::ops::ControlFlow;
use std::time::Duration;

use runtime::AnimationPhase;
use tokio::time::MissedTickBehavior;

/// Free-running animation clock.
///
/// Advances an [`AnimationPhase`] once per period, independent of data
/// fetches. Consumers restyle existing overlays from the phase; nothing is
/// ever recreated.
#[derive(Debug, Clone)]
pub struct PulseAnimator {
    phase: AnimationPhase,
    period: Duration,
}

impl PulseAnimator {
    pub fn new(period: Duration, modulus: u32) -> Self {
        Self {
            phase: AnimationPhase::new(modulus),
            period,
        }
    }

    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn tick(&mut self) -> AnimationPhase {
        self.phase = self.phase.next();
        self.phase
    }

    /// Ticks every period until `on_tick` breaks.
    pub async fn run<F>(mut self, mut on_tick: F)
    where
        F: FnMut(AnimationPhase) -> ControlFlow<()>,
    {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let phase = self.tick();
            if on_tick(phase).is_break() {
                break;
            }
        }
    }
}
