mod attempt;
mod job;
mod run;

pub use attempt::{ApplicationAttempt, AttemptOutcome};
pub use job::{ApplicationType, GeneratedContent, Job, JobStatus, RetryPolicy};
pub use run::{Run, RunCounters, RunStatus};
