//! AWS JSON protocol invoker over HTTP
//!
//! Requests are posted unsigned to the service endpoint with the operation in
//! the `X-Amz-Target` header. Error responses are turned into
//! [`OperationResponse::Error`] so that `error` acceptors can match their code.
//! Services of other protocols (`query`, `ec2`, `rest-*`) are refused when
//! connecting.

use std::sync::Arc;

use async_trait::async_trait;
use aws_waiter_engine::{
    OperationInvoker, OperationResponse, Parameters, ServiceMetadata, WaiterError,
};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::caller::{ConnectionSettings, Connector};
use crate::errors::CliError;

const TARGET_HEADER: &str = "X-Amz-Target";
const ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";
const DEFAULT_JSON_VERSION: &str = "1.0";
const JSON_PROTOCOL: &str = "json";

/// The endpoint requests for `metadata` are sent to
pub fn resolve_endpoint(
    metadata: &ServiceMetadata,
    settings: &ConnectionSettings,
) -> Result<String, CliError> {
    if let Some(endpoint_url) = &settings.endpoint_url {
        return Ok(endpoint_url.clone());
    }
    let region = settings.region.as_deref().ok_or_else(|| {
        CliError::usage("You must specify a region. Use --region or set AWS_REGION.")
    })?;
    Ok(format!(
        "https://{}.{}.amazonaws.com",
        metadata.endpoint_prefix, region
    ))
}

/// Connects waiters through [`HttpJsonInvoker`]
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    fn connect(
        &self,
        metadata: &ServiceMetadata,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn OperationInvoker>, CliError> {
        Ok(Arc::new(HttpJsonInvoker::new(metadata, settings)?))
    }
}

#[derive(Debug, Clone)]
pub struct HttpJsonInvoker {
    client: reqwest::Client,
    endpoint: String,
    target_prefix: String,
    content_type: String,
}

impl HttpJsonInvoker {
    /// Fails for services that do not speak the JSON protocol.
    pub fn new(metadata: &ServiceMetadata, settings: &ConnectionSettings) -> Result<Self, CliError> {
        if let Some(protocol) = metadata.protocol.as_deref().filter(|p| *p != JSON_PROTOCOL) {
            return Err(CliError::UnsupportedProtocol {
                service: metadata.endpoint_prefix.clone(),
                protocol: protocol.to_string(),
            });
        }
        let endpoint = resolve_endpoint(metadata, settings)?;
        if !settings.verify_tls {
            log::warn!("TLS certificate verification is disabled for {}", endpoint);
        }
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!settings.verify_tls)
            .user_agent(concat!("aws-waiter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            target_prefix: metadata
                .target_prefix
                .clone()
                .unwrap_or_else(|| metadata.endpoint_prefix.clone()),
            content_type: format!(
                "application/x-amz-json-{}",
                metadata.json_version.as_deref().unwrap_or(DEFAULT_JSON_VERSION)
            ),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Extract the error code and message of an error response
///
/// The code comes from the `x-amzn-ErrorType` header, then the `__type` or
/// `code` body fields, and falls back to the HTTP status.
fn parse_error(error_type: Option<&str>, body: &Value, status: u16) -> (String, String) {
    let field = |name: &str| body.get(name).and_then(Value::as_str);

    let code = error_type
        .map(|header| header.split(':').next().unwrap_or(header))
        .or_else(|| field("__type"))
        .or_else(|| field("code"))
        .or_else(|| field("Code"))
        .map(|code| code.rsplit('#').next().unwrap_or(code).to_string())
        .unwrap_or_else(|| status.to_string());

    let message = field("message")
        .or_else(|| field("Message"))
        .unwrap_or_default()
        .to_string();

    (code, message)
}

#[async_trait]
impl OperationInvoker for HttpJsonInvoker {
    async fn invoke(
        &self,
        operation: &str,
        parameters: &Parameters,
    ) -> aws_waiter_engine::Result<OperationResponse> {
        log::debug!("POST {} {}.{}", self.endpoint, self.target_prefix, operation);

        let response = self
            .client
            .post(&self.endpoint)
            .header(TARGET_HEADER, format!("{}.{}", self.target_prefix, operation))
            .header(CONTENT_TYPE, &self.content_type)
            .json(parameters)
            .send()
            .await
            .map_err(|e| WaiterError::invocation(operation, e.to_string()))?;

        let status = response.status();
        let error_type = response
            .headers()
            .get(ERROR_TYPE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| WaiterError::invocation(operation, e.to_string()))?;

        log::debug!("{} responded with {}", operation, status);

        if status.is_success() {
            let payload = if body.is_empty() {
                Value::Object(Parameters::new())
            } else {
                serde_json::from_slice(&body).map_err(|e| {
                    WaiterError::invocation(operation, format!("malformed response body: {e}"))
                })?
            };
            return Ok(OperationResponse::payload(payload).with_status(status.as_u16()));
        }

        let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        let (code, message) = parse_error(error_type.as_deref(), &body, status.as_u16());
        Ok(OperationResponse::error(code, message).with_status(status.as_u16()))
    }
}
