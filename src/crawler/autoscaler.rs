//! Control loop that sizes the worker pool toward a target crawl rate
//!
//! Each cycle samples the fetch metrics and asks [`plan`] what to do:
//! - inside the hysteresis band around the target, nothing
//! - below it, grow by at most two workers, in proportion to the shortfall
//! - above it, retire exactly one worker
//!
//! The pool never drops below `min-workers` nor grows past `max-workers`.

use crate::config::AutoscaleConfig;
use crate::crawler::metrics::{FetchMetrics, MetricsSample};
use crate::crawler::pool::WorkerPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Workers added in one cycle at most
const MAX_GROWTH_PER_CYCLE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    Hold,
    Grow(usize),
    Shrink,
}

/// Decides the next pool adjustment from one metrics sample
pub fn plan(
    sample: &MetricsSample,
    active: usize,
    elapsed: Duration,
    config: &AutoscaleConfig,
) -> ScaleDecision {
    if active < config.min_workers {
        return ScaleDecision::Grow(config.min_workers - active);
    }

    let throughput = sample.throughput(elapsed);
    let target = config.target_rate;

    if throughput < target * (1.0 - config.band) {
        if active >= config.max_workers {
            return ScaleDecision::Hold;
        }
        let sustainable = (throughput * active as f64 / target).round() as usize;
        let shortfall = active.saturating_sub(sustainable);
        let room = (config.max_workers - active).min(MAX_GROWTH_PER_CYCLE);
        return ScaleDecision::Grow(shortfall.clamp(1, room));
    }

    if throughput > target * (1.0 + config.band) && active > config.min_workers {
        return ScaleDecision::Shrink;
    }

    ScaleDecision::Hold
}

pub struct Autoscaler {
    pool: WorkerPool,
    metrics: Arc<FetchMetrics>,
    config: AutoscaleConfig,
}

impl Autoscaler {
    pub fn new(pool: WorkerPool, metrics: Arc<FetchMetrics>, config: AutoscaleConfig) -> Self {
        Self {
            pool,
            metrics,
            config,
        }
    }

    /// Runs cycles every `interval-ms` until `token` is cancelled
    ///
    /// Returns the pool so the caller can shut it down.
    pub async fn run(mut self, token: CancellationToken) -> WorkerPool {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;
        let mut last = Instant::now();

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let now = Instant::now();
            self.cycle(now - last);
            last = now;
        }

        self.pool
    }

    /// Samples, plans and applies one adjustment
    pub fn cycle(&mut self, elapsed: Duration) -> ScaleDecision {
        let lost = self.pool.reap();
        let sample = self.metrics.sample();
        let active = self.pool.active();
        let decision = plan(&sample, active, elapsed, &self.config);

        tracing::info!(
            "Throughput {:.2} req/s (target {:.2}), avg latency {:?}, {} workers",
            sample.throughput(elapsed),
            self.config.target_rate,
            sample.avg_latency.unwrap_or_default(),
            active
        );

        match decision {
            ScaleDecision::Grow(count) => {
                self.pool.spawn(count);
                tracing::info!("Scaling up by {} to {} workers", count, self.pool.active());
            }
            ScaleDecision::Shrink => {
                self.pool.retire_one();
                tracing::info!("Scaling down to {} workers", self.pool.active());
            }
            ScaleDecision::Hold if lost > 0 => {
                tracing::warn!("{} workers lost, pool at {}", lost, active);
            }
            ScaleDecision::Hold => {}
        }

        decision
    }

    pub fn active(&self) -> usize {
        self.pool.active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AutoscaleConfig {
        AutoscaleConfig {
            min_workers: 2,
            max_workers: 10,
            target_rate: 10.0,
            interval_ms: 5000,
            band: 0.2,
        }
    }

    fn sample(completed: u64) -> MetricsSample {
        MetricsSample {
            completed,
            avg_latency: None,
        }
    }

    const FIVE_SECS: Duration = Duration::from_secs(5);

    #[test]
    fn test_within_band_holds() {
        // 45 requests in 5s is 9 req/s, inside 8..=12
        assert_eq!(plan(&sample(45), 4, FIVE_SECS, &config()), ScaleDecision::Hold);
        assert_eq!(plan(&sample(55), 4, FIVE_SECS, &config()), ScaleDecision::Hold);
    }

    #[test]
    fn test_below_target_grows_at_most_two() {
        assert_eq!(plan(&sample(0), 4, FIVE_SECS, &config()), ScaleDecision::Grow(2));
    }

    #[test]
    fn test_growth_proportional_to_shortfall() {
        // 7 req/s with 4 workers: round(7 * 4 / 10) = 3, shortfall 1
        assert_eq!(plan(&sample(35), 4, FIVE_SECS, &config()), ScaleDecision::Grow(1));
    }

    #[test]
    fn test_growth_respects_max() {
        assert_eq!(plan(&sample(0), 9, FIVE_SECS, &config()), ScaleDecision::Grow(1));
        assert_eq!(plan(&sample(0), 10, FIVE_SECS, &config()), ScaleDecision::Hold);
    }

    #[test]
    fn test_above_target_shrinks_one() {
        assert_eq!(plan(&sample(100), 5, FIVE_SECS, &config()), ScaleDecision::Shrink);
        // Never below min
        assert_eq!(plan(&sample(100), 2, FIVE_SECS, &config()), ScaleDecision::Hold);
    }

    #[test]
    fn test_below_min_tops_up() {
        assert_eq!(plan(&sample(100), 0, FIVE_SECS, &config()), ScaleDecision::Grow(2));
    }
}
