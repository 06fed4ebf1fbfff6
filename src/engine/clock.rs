//! Time sources for the simulator.
//!
//! Phases never sleep directly; they await ticks from a [`Ticker`] handed out
//! by a [`Clock`]. The production clock wraps `tokio::time::interval`, so tests
//! running on a paused runtime advance deterministically.

use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// A recurring tick source.
pub trait Ticker: Send {
    /// Resolve at the next tick. An error aborts the running test.
    fn tick(&mut self) -> BoxFuture<'_, Result<()>>;
}

pub trait Clock: Send + Sync {
    fn ticker(&self, period: Duration) -> Box<dyn Ticker>;
    fn now_utc(&self) -> OffsetDateTime;
}

/// Tokio-backed clock used by every presentation mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn ticker(&self, period: Duration) -> Box<dyn Ticker> {
        // First tick one full period after creation, like a browser interval.
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Box::new(IntervalTicker { interval })
    }

    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

struct IntervalTicker {
    interval: Interval,
}

impl Ticker for IntervalTicker {
    fn tick(&mut self) -> BoxFuture<'_, Result<()>> {
        self.interval.tick().map(|_| Ok(())).boxed()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Tokio clock whose tickers start failing after a fixed number of ticks.
    /// The tick budget is shared by every ticker handed out.
    pub(crate) struct FailingClock {
        remaining: Arc<AtomicU64>,
    }

    impl FailingClock {
        pub(crate) fn after_ticks(ticks: u64) -> Self {
            Self {
                remaining: Arc::new(AtomicU64::new(ticks)),
            }
        }
    }

    impl Clock for FailingClock {
        fn ticker(&self, period: Duration) -> Box<dyn Ticker> {
            Box::new(FailingTicker {
                inner: TokioClock.ticker(period),
                remaining: self.remaining.clone(),
            })
        }

        fn now_utc(&self) -> OffsetDateTime {
            OffsetDateTime::now_utc()
        }
    }

    struct FailingTicker {
        inner: Box<dyn Ticker>,
        remaining: Arc<AtomicU64>,
    }

    impl Ticker for FailingTicker {
        fn tick(&mut self) -> BoxFuture<'_, Result<()>> {
            async move {
                self.inner.tick().await?;
                let left = self.remaining.load(Ordering::SeqCst);
                if left == 0 {
                    anyhow::bail!("ticker stopped");
                }
                self.remaining.store(left - 1, Ordering::SeqCst);
                Ok(())
            }
            .boxed()
        }
    }
}
