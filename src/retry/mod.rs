mod outcome;
mod plan;
mod sleep;

pub use outcome::RetryOutcome;
pub use plan::{JitterStrategy, RetryPlan};
pub use sleep::{SleepFuture, Sleeper, TokioSleeper};
