//! Token-bucket rate limiting per upstream scope.
//!
//! `acquire` never rejects: when the bucket is empty the caller sleeps until
//! one token has refilled and tries again.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// The rate-limiting unit: one upstream host or host family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Espn,
    Kalshi,
    PolymarketGamma,
    PolymarketClob,
    Fpl,
    Understat,
    Transfermarkt,
    F1,
    News,
    OpenFootball,
}

impl Scope {
    pub const ALL: [Scope; 10] = [
        Scope::Espn,
        Scope::Kalshi,
        Scope::PolymarketGamma,
        Scope::PolymarketClob,
        Scope::Fpl,
        Scope::Understat,
        Scope::Transfermarkt,
        Scope::F1,
        Scope::News,
        Scope::OpenFootball,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Espn => "espn",
            Scope::Kalshi => "kalshi",
            Scope::PolymarketGamma => "polymarket_gamma",
            Scope::PolymarketClob => "polymarket_clob",
            Scope::Fpl => "fpl",
            Scope::Understat => "understat",
            Scope::Transfermarkt => "transfermarkt",
            Scope::F1 => "f1",
            Scope::News => "news",
            Scope::OpenFootball => "openfootball",
        }
    }

    /// Provider budgets observed to stay clear of throttling.
    pub fn default_budget(&self) -> RateBudget {
        match self {
            Scope::Espn => RateBudget::new(2.0, 2.0),
            Scope::Kalshi => RateBudget::new(10.0, 10.0),
            // Gamma allows 300 req/10s on /markets.
            Scope::PolymarketGamma => RateBudget::new(25.0, 25.0),
            // CLOB allows 1500 req/10s on price endpoints.
            Scope::PolymarketClob => RateBudget::new(50.0, 50.0),
            Scope::Fpl => RateBudget::new(5.0, 1.0),
            Scope::Understat => RateBudget::new(2.0, 1.0),
            Scope::Transfermarkt => RateBudget::new(2.0, 2.0 / 60.0),
            Scope::F1 => RateBudget::new(4.0, 4.0),
            Scope::News => RateBudget::new(5.0, 5.0),
            Scope::OpenFootball => RateBudget::new(5.0, 5.0),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket capacity and refill rate in tokens per second.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RateBudget {
    pub capacity: f64,
    pub refill_per_sec: f64,
}

impl RateBudget {
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// A full bucket. Capacity is at least one token and the refill rate is
    /// kept positive so `acquire` always terminates.
    pub fn new(budget: RateBudget) -> Self {
        let capacity = budget.capacity.max(1.0);
        Self {
            capacity,
            refill_per_sec: budget.refill_per_sec.max(1e-3),
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Wait for a token and consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                bucket.last_refill = now;
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.refill_per_sec)
            };
            debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, sleeping");
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available (after refill), for diagnostics.
    pub async fn available(&self) -> f64 {
        let bucket = self.bucket.lock().await;
        let elapsed = Instant::now().duration_since(bucket.last_refill).as_secs_f64();
        (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity)
    }
}

/// One limiter per scope, shared by every request in the process.
#[derive(Debug)]
pub struct RateLimiters {
    limiters: HashMap<Scope, Arc<RateLimiter>>,
}

impl RateLimiters {
    /// Limiters for every scope, using `overrides` where given and the
    /// provider defaults otherwise.
    pub fn new(overrides: &HashMap<String, RateBudget>) -> Self {
        let limiters = Scope::ALL
            .iter()
            .map(|scope| {
                let budget = overrides
                    .get(scope.as_str())
                    .copied()
                    .unwrap_or_else(|| scope.default_budget());
                (*scope, Arc::new(RateLimiter::new(budget)))
            })
            .collect();
        Self { limiters }
    }

    pub fn get(&self, scope: Scope) -> Option<Arc<RateLimiter>> {
        self.limiters.get(&scope).cloned()
    }

    pub async fn acquire(&self, scope: Scope) {
        if let Some(limiter) = self.limiters.get(&scope) {
            limiter.acquire().await;
        }
    }
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_capacity_is_immediate() {
        let limiter = RateLimiter::new(RateBudget::new(3.0, 1.0));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_bucket_delays_instead_of_rejecting() {
        let limiter = RateLimiter::new(RateBudget::new(1.0, 2.0));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        // One token at 2 tokens/s takes 500ms to refill.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(600), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_is_capped_at_capacity() {
        let limiter = RateLimiter::new(RateBudget::new(2.0, 1.0));
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!((limiter.available().await - 2.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquires_are_all_admitted() {
        let limiter = Arc::new(RateLimiter::new(RateBudget::new(1.0, 10.0)));
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let l = Arc::clone(&limiter);
                tokio::spawn(async move { l.acquire().await })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
    }

    #[test]
    fn test_registry_covers_every_scope() {
        let limiters = RateLimiters::default();
        for scope in Scope::ALL {
            assert!(limiters.get(scope).is_some(), "missing limiter for {scope}");
        }
    }

    #[test]
    fn test_registry_applies_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("espn".to_string(), RateBudget::new(7.0, 7.0));
        let limiters = RateLimiters::new(&overrides);
        let espn = limiters.get(Scope::Espn).unwrap();
        assert!((espn.capacity - 7.0).abs() < 1e-9);
    }
}
