use crate::config::RateLimitSettings;
use anyhow::{Result, anyhow};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use tracing::debug;

/// Blocking token bucket shared by every outbound catalog request
pub struct BlockingRateLimiter {
    limiter: DefaultDirectRateLimiter,
    clock: DefaultClock,
}

impl BlockingRateLimiter {
    /// Allow `calls` requests per `period`, refilled one cell at a time
    pub fn new(settings: RateLimitSettings) -> Result<Self> {
        let quota = quota_for(settings)?;
        Ok(Self {
            limiter: RateLimiter::direct(quota),
            clock: DefaultClock::default(),
        })
    }

    /// Block the current thread until the next request may be sent
    pub fn wait(&self) {
        while let Err(not_until) = self.limiter.check() {
            let delay = not_until.wait_time_from(self.clock.now());
            debug!("Rate limit reached, sleeping for {:?}", delay);
            std::thread::sleep(delay);
        }
    }
}

fn quota_for(settings: RateLimitSettings) -> Result<Quota> {
    let burst = NonZeroU32::new(settings.calls)
        .ok_or_else(|| anyhow!("Rate limit must allow at least one call"))?;
    let replenish = settings.period / settings.calls;
    Quota::with_period(replenish)
        .map(|quota| quota.allow_burst(burst))
        .ok_or_else(|| anyhow!("Rate limit period must be longer than zero"))
}
