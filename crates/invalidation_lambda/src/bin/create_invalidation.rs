use aws_sdk_cloudformation::operation::list_exports::ListExportsOutput;
use aws_sdk_cloudfront::operation::create_invalidation::CreateInvalidationOutput;
use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};
use aws_sdk_codepipeline::types::{FailureDetails, FailureType};
use chrono::{SecondsFormat, Utc};
use invalidation_core::contract::{
    ExportPage, ExportRecord, InvalidationReceipt, InvalidationRequest, JobFailure,
};
use invalidation_lambda::adapters::export_registry::ExportRegistry;
use invalidation_lambda::adapters::invalidation::InvalidationService;
use invalidation_lambda::adapters::job_result::JobResultReporter;
use invalidation_lambda::handlers::invalidation::{handle_job_event, InvalidationHandlerConfig};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct CloudFormationExportRegistry {
    client: aws_sdk_cloudformation::Client,
}

impl ExportRegistry for CloudFormationExportRegistry {
    fn list_exports(&self, next_token: Option<&str>) -> Result<ExportPage, String> {
        let client = self.client.clone();
        let token = next_token.map(str::to_string);

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .list_exports()
                    .set_next_token(token)
                    .send()
                    .await
                    .map(|output| export_page(&output))
                    .map_err(|error| {
                        format!(
                            "cloudformation ListExports failed: {}",
                            aws_sdk_cloudformation::error::DisplayErrorContext(&error)
                        )
                    })
            })
        })
    }
}

fn export_page(output: &ListExportsOutput) -> ExportPage {
    let exports = output
        .exports()
        .iter()
        .filter_map(|export| {
            Some(ExportRecord {
                name: export.name()?.to_string(),
                value: export.value()?.to_string(),
            })
        })
        .collect();

    ExportPage {
        exports,
        next_token: output.next_token().map(str::to_string),
    }
}

struct CloudFrontInvalidationService {
    client: aws_sdk_cloudfront::Client,
}

impl InvalidationService for CloudFrontInvalidationService {
    fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> Result<InvalidationReceipt, String> {
        let batch = InvalidationBatch::builder()
            .paths(invalidation_paths(request)?)
            .caller_reference(request.caller_reference.clone())
            .build()
            .map_err(|error| format!("invalid invalidation batch: {error}"))?;
        let distribution_id = request.distribution_id.clone();
        let client = self.client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .create_invalidation()
                    .distribution_id(distribution_id)
                    .invalidation_batch(batch)
                    .send()
                    .await
                    .map_err(|error| {
                        format!(
                            "cloudfront CreateInvalidation failed: {}",
                            aws_sdk_cloudfront::error::DisplayErrorContext(&error)
                        )
                    })
                    .and_then(|output| invalidation_receipt(&output))
            })
        })
    }
}

fn invalidation_paths(request: &InvalidationRequest) -> Result<Paths, String> {
    Paths::builder()
        .quantity(request.quantity())
        .set_items(Some(request.paths.clone()))
        .build()
        .map_err(|error| format!("invalid invalidation paths: {error}"))
}

fn invalidation_receipt(
    output: &CreateInvalidationOutput,
) -> Result<InvalidationReceipt, String> {
    let invalidation = output
        .invalidation()
        .ok_or_else(|| "cloudfront CreateInvalidation returned no invalidation".to_string())?;

    Ok(InvalidationReceipt {
        invalidation_id: invalidation.id().to_string(),
        status: invalidation.status().to_string(),
        location: output.location().map(str::to_string),
    })
}

struct CodePipelineJobReporter {
    client: aws_sdk_codepipeline::Client,
}

impl JobResultReporter for CodePipelineJobReporter {
    fn put_job_success(&self, job_id: &str) -> Result<(), String> {
        let client = self.client.clone();
        let job_id = job_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_job_success_result()
                    .job_id(job_id)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| {
                        format!(
                            "codepipeline PutJobSuccessResult failed: {}",
                            aws_sdk_codepipeline::error::DisplayErrorContext(&error)
                        )
                    })
            })
        })
    }

    fn put_job_failure(&self, failure: &JobFailure) -> Result<(), String> {
        let details = failure_details(failure)?;
        let client = self.client.clone();
        let job_id = failure.job_id.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_job_failure_result()
                    .job_id(job_id)
                    .failure_details(details)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| {
                        format!(
                            "codepipeline PutJobFailureResult failed: {}",
                            aws_sdk_codepipeline::error::DisplayErrorContext(&error)
                        )
                    })
            })
        })
    }
}

fn failure_details(failure: &JobFailure) -> Result<FailureDetails, String> {
    FailureDetails::builder()
        .r#type(FailureType::JobFailed)
        .message(failure.message.clone())
        .set_external_execution_id(failure.external_execution_id.clone())
        .build()
        .map_err(|error| format!("invalid job failure details: {error}"))
}

struct RuntimeDependencies {
    follow_export_pages: bool,
    registry: CloudFormationExportRegistry,
    invalidations: CloudFrontInvalidationService,
    reporter: CodePipelineJobReporter,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<Value, Error> {
    let request_id = Some(event.context.request_id.clone()).filter(|id| !id.is_empty());
    let config = InvalidationHandlerConfig {
        event_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        request_id,
        follow_export_pages: deps.follow_export_pages,
    };

    let response = handle_job_event(
        event.payload,
        &config,
        &deps.registry,
        &deps.invalidations,
        &deps.reporter,
    )
    .map_err(Error::from)?;

    serde_json::to_value(response)
        .map_err(|error| Error::from(format!("failed to serialize handler response: {error}")))
}

fn parse_flag(name: &str, raw: Option<&str>, default: bool) -> Result<bool, Error> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(default);
    };

    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(Error::from(format!(
            "{name} must be one of true/false, 1/0 or yes/no, got '{value}'"
        ))),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let follow_export_pages = parse_flag(
        "FOLLOW_EXPORT_PAGES",
        std::env::var("FOLLOW_EXPORT_PAGES").ok().as_deref(),
        true,
    )?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let deps = RuntimeDependencies {
        follow_export_pages,
        registry: CloudFormationExportRegistry {
            client: aws_sdk_cloudformation::Client::new(&aws_config),
        },
        invalidations: CloudFrontInvalidationService {
            client: aws_sdk_cloudfront::Client::new(&aws_config),
        },
        reporter: CodePipelineJobReporter {
            client: aws_sdk_codepipeline::Client::new(&aws_config),
        },
    };

    let deps = &deps;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, deps).await
    }))
    .await
}
