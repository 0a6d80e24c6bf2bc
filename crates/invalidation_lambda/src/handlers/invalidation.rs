use invalidation_core::contract::{
    parse_job_event, InvalidationRequest, InvalidationSuccessResponse, JobEvent, JobFailure,
    ValidationError, JOB_SUCCEEDED_STATUS,
};
use invalidation_core::export_lookup::{lookup_export, ExportLookup};
use serde_json::{json, Value};

use crate::adapters::export_registry::ExportRegistry;
use crate::adapters::invalidation::InvalidationService;
use crate::adapters::job_result::JobResultReporter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationHandlerConfig {
    /// Invocation timestamp; doubles as the invalidation caller reference.
    pub event_time: String,
    pub request_id: Option<String>,
    pub follow_export_pages: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationError {
    InvalidEvent(String),
    ExportLookup(String),
    ExportNotFound {
        export_name: String,
        exports_scanned: usize,
        truncated: bool,
    },
    InvalidationRejected(String),
    JobReport(String),
}

impl InvalidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEvent(_) => "invalid_event",
            Self::ExportLookup(_) => "export_lookup_failed",
            Self::ExportNotFound { .. } => "export_not_found",
            Self::InvalidationRejected(_) => "invalidation_rejected",
            Self::JobReport(_) => "job_report_failed",
        }
    }
}

impl std::fmt::Display for InvalidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEvent(message) => write!(f, "invalid pipeline job event: {message}"),
            Self::ExportLookup(message) => write!(f, "failed to list exports: {message}"),
            Self::ExportNotFound {
                export_name,
                exports_scanned,
                truncated,
            } => {
                write!(
                    f,
                    "no CloudFormation export named '{export_name}' (scanned {exports_scanned} exports)"
                )?;
                if *truncated {
                    f.write_str("; the export listing was truncated and further pages were not read")?;
                }
                Ok(())
            }
            Self::InvalidationRejected(message) => {
                write!(f, "failed to create invalidation: {message}")
            }
            Self::JobReport(message) => write!(f, "failed to report job success: {message}"),
        }
    }
}

impl std::error::Error for InvalidationError {}

impl From<ValidationError> for InvalidationError {
    fn from(error: ValidationError) -> Self {
        Self::InvalidEvent(error.message().to_string())
    }
}

/// Resolves the distribution named by the job, invalidates `/*` on it and
/// signals the job outcome to the pipeline.
///
/// Once the job id is known every failure is also reported to the pipeline as
/// a job failure before being returned.
pub fn handle_job_event(
    event: Value,
    config: &InvalidationHandlerConfig,
    registry: &impl ExportRegistry,
    invalidations: &impl InvalidationService,
    reporter: &impl JobResultReporter,
) -> Result<InvalidationSuccessResponse, InvalidationError> {
    log_handler_info(
        "event_received",
        json!({
            "request_id": config.request_id.clone(),
            "event": redact_event(&event),
        }),
    );

    let job_event = match parse_job_event(event) {
        Ok(value) => value,
        Err(error) => {
            let error = InvalidationError::from(error);
            log_handler_error(
                "job_failed",
                json!({
                    "request_id": config.request_id.clone(),
                    "error_code": error.error_code(),
                    "error": error.to_string(),
                }),
            );
            return Err(error);
        }
    };

    match invalidate_distribution(&job_event, config, registry, invalidations, reporter) {
        Ok(response) => Ok(response),
        Err(error) => {
            report_failure(job_event.job_id(), &error, config, reporter);
            Err(error)
        }
    }
}

fn invalidate_distribution(
    job_event: &JobEvent,
    config: &InvalidationHandlerConfig,
    registry: &impl ExportRegistry,
    invalidations: &impl InvalidationService,
    reporter: &impl JobResultReporter,
) -> Result<InvalidationSuccessResponse, InvalidationError> {
    let job_id = job_event.job_id();
    let export_name = job_event.target_export_name()?;

    let lookup = lookup_export(export_name, config.follow_export_pages, |next_token| {
        let page = registry.list_exports(next_token)?;
        log_handler_info(
            "export_page_fetched",
            json!({
                "job_id": job_id,
                "exports": page.exports.len(),
                "has_next_page": page.next_token.is_some(),
            }),
        );
        Ok(page)
    })
    .map_err(InvalidationError::ExportLookup)?;

    let distribution_id = match lookup {
        ExportLookup::Found { record, pages_read } => {
            log_handler_info(
                "distribution_resolved",
                json!({
                    "job_id": job_id,
                    "export_name": export_name,
                    "distribution_id": record.value.clone(),
                    "pages_read": pages_read,
                }),
            );
            record.value
        }
        ExportLookup::Missing {
            exports_scanned,
            truncated,
        } => {
            return Err(InvalidationError::ExportNotFound {
                export_name: export_name.to_string(),
                exports_scanned,
                truncated,
            });
        }
    };

    let request = InvalidationRequest::for_all_paths(&distribution_id, &config.event_time);
    let receipt = invalidations
        .create_invalidation(&request)
        .map_err(InvalidationError::InvalidationRejected)?;
    log_handler_info(
        "invalidation_created",
        json!({
            "job_id": job_id,
            "distribution_id": distribution_id.clone(),
            "caller_reference": request.caller_reference.clone(),
            "receipt": receipt.clone(),
        }),
    );

    reporter
        .put_job_success(job_id)
        .map_err(InvalidationError::JobReport)?;
    log_handler_info("job_success_reported", json!({ "job_id": job_id }));

    Ok(InvalidationSuccessResponse {
        status: JOB_SUCCEEDED_STATUS.to_string(),
        job_id: job_id.to_string(),
        export_name: export_name.to_string(),
        distribution_id,
        invalidation_id: receipt.invalidation_id,
    })
}

fn report_failure(
    job_id: &str,
    error: &InvalidationError,
    config: &InvalidationHandlerConfig,
    reporter: &impl JobResultReporter,
) {
    log_handler_error(
        "job_failed",
        json!({
            "job_id": job_id,
            "request_id": config.request_id.clone(),
            "error_code": error.error_code(),
            "error": error.to_string(),
        }),
    );

    let failure = JobFailure::new(job_id, &error.to_string(), config.request_id.clone());
    match reporter.put_job_failure(&failure) {
        Ok(()) => log_handler_info("job_failure_reported", json!({ "job_id": job_id })),
        Err(report_error) => log_handler_error(
            "job_failure_report_failed",
            json!({
                "job_id": job_id,
                "error": report_error,
            }),
        ),
    }
}

/// Drops the temporary artifact-store credentials CodePipeline embeds in
/// every job event.
fn redact_event(event: &Value) -> Value {
    let mut redacted = event.clone();
    if let Some(data) = redacted
        .get_mut("CodePipeline.job")
        .and_then(|job| job.get_mut("data"))
        .and_then(Value::as_object_mut)
    {
        if data.contains_key("artifactCredentials") {
            data.insert("artifactCredentials".to_string(), json!("[redacted]"));
        }
    }
    redacted
}

fn log_handler_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "invalidation_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_handler_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "invalidation_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
