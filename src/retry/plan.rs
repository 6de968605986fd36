use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

use crate::errors::Error;

/// Strategy for adding randomness to delay calculations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterStrategy {
    /// Exact exponential delays.
    #[default]
    None,
    Full,
    Decorrelated,
}

/// Retry/backoff rules for one logical request.
///
/// The plan is stateless: the caller owns the attempt counter and asks the
/// plan whether another send is allowed and how long to wait before it.
#[derive(Clone, Debug)]
pub struct RetryPlan {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Option<Duration>,
    pub jitter: JitterStrategy,
}

impl RetryPlan {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: None,
            jitter: JitterStrategy::None,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Option<Duration>) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay before the `retry`-th resend (1-indexed): `base_delay * 2^(retry - 1)`.
    pub fn delay_for_retry(&self, retry: u32, rng: &mut impl Rng) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        let mut delay = self.base_delay.checked_mul(factor).unwrap_or(Duration::MAX);
        if let Some(max_delay) = self.max_delay {
            delay = delay.min(max_delay);
        }
        match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => scale(delay, rng.gen_range(0.0..1.0)),
            JitterStrategy::Decorrelated => scale(delay, rng.gen_range(0.5..1.5)),
        }
    }
}

fn scale(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

impl FromStr for JitterStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(JitterStrategy::None),
            "full" => Ok(JitterStrategy::Full),
            "decorrelated" => Ok(JitterStrategy::Decorrelated),
            other => Err(Error::Config(format!(
                "Unknown jitter strategy '{}'; expected 'none', 'full' or 'decorrelated'",
                other
            ))),
        }
    }
}
