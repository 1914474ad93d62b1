//! Ping/pong liveness for duplex connections.
//!
//! A session pings every `ping_period` (nine tenths of `pong_wait`). Each
//! pong pushes the read deadline to `now + pong_wait`; when the deadline
//! passes with no pong the read side reports the connection as expired.
//! Every write is bounded by `write_wait`.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Liveness timings for one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Liveness {
    pong_wait: Duration,
    write_wait: Duration,
}

impl Liveness {
    /// Timings from a pong wait and a write wait.
    pub fn new(pong_wait: Duration, write_wait: Duration) -> Self {
        Self {
            pong_wait,
            write_wait,
        }
    }

    /// Deadline applied to each write.
    pub fn write_wait(&self) -> Duration {
        self.write_wait
    }

    /// Interval between pings.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait * 9 / 10
    }

    /// A ticker whose first tick is one period from now.
    pub fn ping_ticker(&self) -> Interval {
        let period = self.ping_period().max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// A read deadline starting now.
    pub fn read_deadline(&self) -> ReadDeadline {
        ReadDeadline::new(self.pong_wait)
    }
}

/// Moving read deadline.
#[derive(Clone, Copy, Debug)]
pub struct ReadDeadline {
    window: Duration,
    at: Instant,
}

impl ReadDeadline {
    /// Deadline `window` from now.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            at: Instant::now() + window,
        }
    }

    /// Push the deadline to `now + window`.
    pub fn refresh(&mut self) {
        self.at = Instant::now() + self.window;
    }

    /// When reads give up.
    pub fn at(&self) -> Instant {
        self.at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn liveness() -> Liveness {
        Liveness::new(Duration::from_secs(30), Duration::from_secs(10))
    }

    #[test]
    fn ping_period_default() {
        assert_eq!(liveness().ping_period(), Duration::from_secs(27));
    }

    #[test]
    fn ping_period_is_shorter_than_pong_wait() {
        let l = Liveness::new(Duration::from_millis(500), Duration::from_millis(100));
        assert!(l.ping_period() < Duration::from_millis(500));
        assert_eq!(l.ping_period(), Duration::from_millis(450));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_one_window_out() {
        let start = Instant::now();
        let deadline = liveness().read_deadline();
        assert_eq!(deadline.at() - start, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_extends_deadline() {
        let mut deadline = liveness().read_deadline();
        tokio::time::advance(Duration::from_secs(20)).await;
        deadline.refresh();
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(deadline.at() > Instant::now());
        assert_eq!(deadline.at() - Instant::now(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_first_tick_is_one_period_out() {
        let mut ticker = liveness().ping_ticker();
        let start = Instant::now();
        let _ = ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(27));
        let _ = ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(54));
    }
}
