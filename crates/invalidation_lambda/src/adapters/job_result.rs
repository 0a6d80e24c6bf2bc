use invalidation_core::contract::JobFailure;

/// Signals the outcome of a pipeline job back to the orchestrator.
pub trait JobResultReporter {
    fn put_job_success(&self, job_id: &str) -> Result<(), String>;
    fn put_job_failure(&self, failure: &JobFailure) -> Result<(), String>;
}
