use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path pattern matching every object of a distribution.
pub const INVALIDATE_ALL_PATHS: &str = "/*";
/// CodePipeline rejects failure messages longer than this.
pub const MAX_FAILURE_MESSAGE_CHARS: usize = 5_000;
pub const JOB_SUCCEEDED_STATUS: &str = "job_succeeded";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobEvent {
    #[serde(rename = "CodePipeline.job")]
    pub job: PipelineJob,
}

/// JSON pointer to the action's user parameter inside `CodePipeline.job.data`.
const USER_PARAMETERS_POINTER: &str = "/actionConfiguration/configuration/UserParameters";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineJob {
    pub id: String,
    /// Kept as raw JSON so a malformed action configuration is reported
    /// against the job instead of discarding its id.
    #[serde(default)]
    pub data: Value,
}

impl JobEvent {
    pub fn job_id(&self) -> &str {
        &self.job.id
    }

    /// Name of the CloudFormation export holding the distribution id.
    ///
    /// The value is matched verbatim against export names, so surrounding
    /// whitespace is preserved; only a missing, blank or non-string parameter
    /// is rejected.
    pub fn target_export_name(&self) -> Result<&str, ValidationError> {
        match self.job.data.pointer(USER_PARAMETERS_POINTER) {
            Some(Value::String(name)) if !name.trim().is_empty() => Ok(name.as_str()),
            None | Some(Value::Null) | Some(Value::String(_)) => Err(ValidationError::new(
                "UserParameters must name the CloudFormation export holding the distribution id",
            )),
            Some(other) => Err(ValidationError::new(format!(
                "UserParameters must be a string naming a CloudFormation export, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportRecord {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportPage {
    pub exports: Vec<ExportRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvalidationRequest {
    pub distribution_id: String,
    pub caller_reference: String,
    pub paths: Vec<String>,
}

impl InvalidationRequest {
    /// Invalidates every cached object of `distribution_id`.
    pub fn for_all_paths(
        distribution_id: impl Into<String>,
        caller_reference: impl Into<String>,
    ) -> Self {
        Self {
            distribution_id: distribution_id.into(),
            caller_reference: caller_reference.into(),
            paths: vec![INVALIDATE_ALL_PATHS.to_string()],
        }
    }

    pub fn quantity(&self) -> i32 {
        self.paths.len() as i32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvalidationReceipt {
    pub invalidation_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobFailure {
    pub job_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_execution_id: Option<String>,
}

impl JobFailure {
    pub fn new(
        job_id: impl Into<String>,
        message: &str,
        external_execution_id: Option<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            message: truncate_failure_message(message),
            external_execution_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvalidationSuccessResponse {
    pub status: String,
    pub job_id: String,
    pub export_name: String,
    pub distribution_id: String,
    pub invalidation_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn parse_job_event(event: Value) -> Result<JobEvent, ValidationError> {
    if !event.is_object() {
        return Err(ValidationError::new("Job event must be a JSON object"));
    }

    let parsed: JobEvent = serde_json::from_value(event)
        .map_err(|error| ValidationError::new(format!("Malformed pipeline job event: {error}")))?;

    if parsed.job.id.trim().is_empty() {
        return Err(ValidationError::new("CodePipeline.job.id cannot be empty"));
    }

    Ok(parsed)
}

pub fn truncate_failure_message(message: &str) -> String {
    match message.char_indices().nth(MAX_FAILURE_MESSAGE_CHARS) {
        Some((byte_index, _)) => message[..byte_index].to_string(),
        None => message.to_string(),
    }
}
