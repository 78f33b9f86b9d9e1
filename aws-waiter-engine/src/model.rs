//! AWS SDK Waiter model parser
//!
//! This module parses `waiters-2.json` documents (as shipped by botocore) into an
//! immutable [`WaiterModel`]: a mapping from waiter name to a validated
//! [`WaiterConfig`]. Validation happens eagerly, so a model that parses is one
//! every waiter of which can be run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, WaiterError};
use crate::providers::{ModelKind, ModelProvider};
use crate::query;

/// The only waiter document version this engine understands
pub const SUPPORTED_WAITER_VERSION: u64 = 2;

/// Raw acceptor entry as written in waiters-2.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AcceptorEntry {
    pub(crate) state: AcceptorState,
    pub(crate) matcher: MatcherKind,
    pub(crate) expected: Value,
    #[serde(default)]
    pub(crate) argument: Option<String>,
}

/// Raw waiter entry as written in waiters-2.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WaiterEntry {
    /// AWS operation that this waiter polls (PascalCase, e.g., "DescribeInstances")
    pub(crate) operation: String,
    pub(crate) delay: i64,
    pub(crate) max_attempts: i64,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) acceptors: Vec<AcceptorEntry>,
}

/// Complete waiters description for a service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WaitersDescription {
    pub(crate) version: u64,
    pub(crate) waiters: BTreeMap<String, WaiterEntry>,
}

/// State an acceptor transitions the waiter into when it matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptorState {
    Success,
    Failure,
    /// Terminal failure reported as an error condition
    Error,
    /// Keep polling; the response is expected while the resource settles
    Retry,
}

/// Comparison strategy of an acceptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatcherKind {
    Error,
    Status,
    Path,
    PathAll,
    PathAny,
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Status => "status",
            Self::Path => "path",
            Self::PathAll => "pathAll",
            Self::PathAny => "pathAny",
        };
        f.write_str(name)
    }
}

/// What an `error` matcher expects to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorExpectation {
    /// A specific service error code
    Code(String),
    /// Any error response (`"expected": true`)
    AnyError,
    /// A response that is not an error (`"expected": false`)
    NoError,
}

impl ErrorExpectation {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Code(code) => Value::String(code.clone()),
            Self::AnyError => Value::Bool(true),
            Self::NoError => Value::Bool(false),
        }
    }
}

impl fmt::Display for ErrorExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => f.write_str(code),
            Self::AnyError => f.write_str("an error"),
            Self::NoError => f.write_str("no error"),
        }
    }
}

/// A validated matcher together with its expected value
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Error(ErrorExpectation),
    Status(u16),
    Path { argument: String, expected: Value },
    PathAll { argument: String, expected: Value },
    PathAny { argument: String, expected: Value },
}

impl Matcher {
    pub fn kind(&self) -> MatcherKind {
        match self {
            Self::Error(_) => MatcherKind::Error,
            Self::Status(_) => MatcherKind::Status,
            Self::Path { .. } => MatcherKind::Path,
            Self::PathAll { .. } => MatcherKind::PathAll,
            Self::PathAny { .. } => MatcherKind::PathAny,
        }
    }

    pub fn expected(&self) -> Value {
        match self {
            Self::Error(expectation) => expectation.to_value(),
            Self::Status(code) => Value::from(*code),
            Self::Path { expected, .. }
            | Self::PathAll { expected, .. }
            | Self::PathAny { expected, .. } => expected.clone(),
        }
    }

    /// The query expression, for path matchers only
    pub fn argument(&self) -> Option<&str> {
        match self {
            Self::Error(_) | Self::Status(_) => None,
            Self::Path { argument, .. }
            | Self::PathAll { argument, .. }
            | Self::PathAny { argument, .. } => Some(argument),
        }
    }
}

/// One rule of a waiter
#[derive(Debug, Clone, PartialEq)]
pub struct Acceptor {
    pub state: AcceptorState,
    pub matcher: Matcher,
}

impl Acceptor {
    pub fn new(state: AcceptorState, matcher: Matcher) -> Self {
        Self { state, matcher }
    }
}

/// A validated waiter declaration
#[derive(Debug, Clone, PartialEq)]
pub struct WaiterConfig {
    pub name: String,
    /// Operation polled by this waiter (PascalCase)
    pub operation: String,
    pub delay_seconds: u64,
    /// Always at least 1
    pub max_attempts: u32,
    pub description: Option<String>,
    /// Evaluated in declaration order; the first match wins
    pub acceptors: Vec<Acceptor>,
}

/// Immutable registry of the waiters declared for one service version
#[derive(Debug, Clone)]
pub struct WaiterModel {
    version: u64,
    waiters: BTreeMap<String, Arc<WaiterConfig>>,
}

impl WaiterModel {
    /// Parse a waiters-2.json document from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let description: WaitersDescription = serde_json::from_slice(bytes)?;
        Self::from_description(description)
    }

    /// Parse a waiters-2.json document that has already been read as JSON.
    pub fn from_value(value: Value) -> Result<Self> {
        let description: WaitersDescription = serde_json::from_value(value)?;
        Self::from_description(description)
    }

    fn from_description(description: WaitersDescription) -> Result<Self> {
        if description.version != SUPPORTED_WAITER_VERSION {
            return Err(WaiterError::UnsupportedVersion(description.version));
        }

        let waiters = description
            .waiters
            .into_iter()
            .map(|(name, entry)| {
                let config = validate_waiter(&name, entry)?;
                Ok((name, Arc::new(config)))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            version: description.version,
            waiters,
        })
    }

    /// Load the waiter model of `service`/`api_version` from `provider`.
    ///
    /// Returns `Ok(None)` when the provider has no waiter data for the service,
    /// which callers treat as "this service has no waiters".
    pub fn load(
        provider: &dyn ModelProvider,
        service: &str,
        api_version: &str,
    ) -> Result<Option<Self>> {
        match provider.load(service, api_version, ModelKind::Waiters) {
            Ok(bytes) => {
                let model = Self::from_slice(&bytes)?;
                log::debug!(
                    "Loaded {} waiter(s) for {}/{}",
                    model.len(),
                    service,
                    api_version
                );
                Ok(Some(model))
            }
            Err(e) if e.is_data_not_found() => {
                log::debug!("No waiter model for {}/{}", service, api_version);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Declared waiter names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.waiters.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<Arc<WaiterConfig>> {
        self.waiters
            .get(name)
            .cloned()
            .ok_or_else(|| WaiterError::WaiterNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

fn validate_waiter(name: &str, entry: WaiterEntry) -> Result<WaiterConfig> {
    if entry.operation.is_empty() {
        return Err(WaiterError::invalid_waiter(name, "operation must not be empty"));
    }

    let delay_seconds = u64::try_from(entry.delay).map_err(|_| {
        WaiterError::invalid_waiter(name, format!("delay must be >= 0, got {}", entry.delay))
    })?;

    let max_attempts = u32::try_from(entry.max_attempts)
        .ok()
        .filter(|attempts| *attempts >= 1)
        .ok_or_else(|| {
            WaiterError::invalid_waiter(
                name,
                format!("maxAttempts must be >= 1, got {}", entry.max_attempts),
            )
        })?;

    let acceptors = entry
        .acceptors
        .into_iter()
        .enumerate()
        .map(|(index, acceptor)| validate_acceptor(name, index, acceptor))
        .collect::<Result<Vec<_>>>()?;

    Ok(WaiterConfig {
        name: name.to_string(),
        operation: entry.operation,
        delay_seconds,
        max_attempts,
        description: entry.description.filter(|d| !d.is_empty()),
        acceptors,
    })
}

fn validate_acceptor(waiter: &str, index: usize, entry: AcceptorEntry) -> Result<Acceptor> {
    let invalid = |reason: String| {
        WaiterError::invalid_waiter(waiter, format!("acceptor {index} ({}): {reason}", entry.matcher))
    };

    let matcher = match entry.matcher {
        MatcherKind::Error | MatcherKind::Status if entry.argument.is_some() => {
            return Err(invalid("argument is only allowed on path matchers".to_string()));
        }
        MatcherKind::Error => match &entry.expected {
            Value::String(code) => Matcher::Error(ErrorExpectation::Code(code.clone())),
            Value::Bool(true) => Matcher::Error(ErrorExpectation::AnyError),
            Value::Bool(false) => Matcher::Error(ErrorExpectation::NoError),
            other => {
                return Err(invalid(format!(
                    "expected must be an error code or a boolean, got {other}"
                )))
            }
        },
        MatcherKind::Status => {
            let code = entry
                .expected
                .as_u64()
                .filter(|code| (100..=599).contains(code))
                .and_then(|code| u16::try_from(code).ok())
                .ok_or_else(|| {
                    invalid(format!(
                        "expected must be an HTTP status code, got {}",
                        entry.expected
                    ))
                })?;
            Matcher::Status(code)
        }
        MatcherKind::Path | MatcherKind::PathAll | MatcherKind::PathAny => {
            let argument = entry
                .argument
                .clone()
                .filter(|argument| !argument.is_empty())
                .ok_or_else(|| invalid("argument is required".to_string()))?;
            query::validate(&argument)?;
            let expected = entry.expected.clone();
            match entry.matcher {
                MatcherKind::Path => Matcher::Path { argument, expected },
                MatcherKind::PathAll => Matcher::PathAll { argument, expected },
                _ => Matcher::PathAny { argument, expected },
            }
        }
    };

    Ok(Acceptor::new(entry.state, matcher))
}
