#![allow(dead_code)]

use std::sync::Mutex;

use invalidation_core::contract::{
    ExportPage, ExportRecord, InvalidationReceipt, InvalidationRequest, JobFailure,
};
use invalidation_lambda::adapters::export_registry::ExportRegistry;
use invalidation_lambda::adapters::invalidation::InvalidationService;
use invalidation_lambda::adapters::job_result::JobResultReporter;
use invalidation_lambda::handlers::invalidation::InvalidationHandlerConfig;
use serde_json::{json, Value};

pub fn export(name: &str, value: &str) -> ExportRecord {
    ExportRecord {
        name: name.to_string(),
        value: value.to_string(),
    }
}

pub fn pipeline_event(job_id: &str, user_parameters: &str) -> Value {
    json!({
        "CodePipeline.job": {
            "id": job_id,
            "accountId": "111111111111",
            "data": {
                "actionConfiguration": {
                    "configuration": {
                        "FunctionName": "createInvalidation",
                        "UserParameters": user_parameters
                    }
                },
                "inputArtifacts": [],
                "outputArtifacts": []
            }
        }
    })
}

pub fn handler_config(follow_export_pages: bool) -> InvalidationHandlerConfig {
    InvalidationHandlerConfig {
        event_time: "2026-10-19T08:00:00.000Z".to_string(),
        request_id: Some("c6af9ac6-7b61-11e6-9a41-93e812345678".to_string()),
        follow_export_pages,
    }
}

/// Serves pages in order: page `n` is returned for token `page-n`.
pub struct PagedRegistry {
    pages: Vec<Vec<ExportRecord>>,
    requested_tokens: Mutex<Vec<Option<String>>>,
    failure: Option<String>,
}

impl PagedRegistry {
    pub fn new(pages: Vec<Vec<ExportRecord>>) -> Self {
        Self {
            pages,
            requested_tokens: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            pages: Vec::new(),
            requested_tokens: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn requested_tokens(&self) -> Vec<Option<String>> {
        self.requested_tokens.lock().expect("poisoned mutex").clone()
    }
}

impl ExportRegistry for PagedRegistry {
    fn list_exports(&self, next_token: Option<&str>) -> Result<ExportPage, String> {
        self.requested_tokens
            .lock()
            .expect("poisoned mutex")
            .push(next_token.map(str::to_string));
        if let Some(message) = &self.failure {
            return Err(message.clone());
        }

        let index = match next_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|value| value.parse::<usize>().ok())
                .ok_or_else(|| format!("unknown token {token}"))?,
        };
        let exports = self.pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));

        Ok(ExportPage {
            exports,
            next_token,
        })
    }
}

pub struct RecordingInvalidations {
    requests: Mutex<Vec<InvalidationRequest>>,
    failure: Option<String>,
}

impl RecordingInvalidations {
    pub fn accepting() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn requests(&self) -> Vec<InvalidationRequest> {
        self.requests.lock().expect("poisoned mutex").clone()
    }
}

impl InvalidationService for RecordingInvalidations {
    fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<InvalidationReceipt, String> {
        self.requests
            .lock()
            .expect("poisoned mutex")
            .push(request.clone());
        if let Some(message) = &self.failure {
            return Err(message.clone());
        }

        Ok(InvalidationReceipt {
            invalidation_id: "I2J0I21PCUYOIK".to_string(),
            status: "InProgress".to_string(),
            location: Some(format!(
                "https://cloudfront.amazonaws.com/2020-05-31/distribution/{}/invalidation/I2J0I21PCUYOIK",
                request.distribution_id
            )),
        })
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    successes: Mutex<Vec<String>>,
    failures: Mutex<Vec<JobFailure>>,
}

impl RecordingReporter {
    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().expect("poisoned mutex").clone()
    }

    pub fn failures(&self) -> Vec<JobFailure> {
        self.failures.lock().expect("poisoned mutex").clone()
    }
}

impl JobResultReporter for RecordingReporter {
    fn put_job_success(&self, job_id: &str) -> Result<(), String> {
        self.successes
            .lock()
            .expect("poisoned mutex")
            .push(job_id.to_string());
        Ok(())
    }

    fn put_job_failure(&self, failure: &JobFailure) -> Result<(), String> {
        self.failures
            .lock()
            .expect("poisoned mutex")
            .push(failure.clone());
        Ok(())
    }
}
