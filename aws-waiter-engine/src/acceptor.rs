//! Acceptor evaluation
//!
//! Given one operation response and a waiter's ordered acceptor list, decide
//! which acceptor (if any) matches. Acceptors are tried strictly in declaration
//! order and the first match wins, whatever its state.

use std::fmt;

use serde_json::Value;

use crate::errors::Result;
use crate::model::{Acceptor, ErrorExpectation, Matcher, MatcherKind};
use crate::query::{self, display_value, values_equal};

/// Typed error returned by a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub code: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "An error occurred ({})", self.code)
        } else {
            write!(f, "An error occurred ({}): {}", self.code, self.message)
        }
    }
}

/// One response of the polled operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResponse {
    Payload { status_code: u16, body: Value },
    Error {
        status_code: Option<u16>,
        error: ServiceError,
    },
}

impl OperationResponse {
    /// A successful response with status 200
    pub fn payload(body: Value) -> Self {
        Self::Payload {
            status_code: 200,
            body,
        }
    }

    /// An error response without a known status code
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            status_code: None,
            error: ServiceError::new(code, message),
        }
    }

    #[must_use]
    pub fn with_status(self, code: u16) -> Self {
        match self {
            Self::Payload { body, .. } => Self::Payload {
                status_code: code,
                body,
            },
            Self::Error { error, .. } => Self::Error {
                status_code: Some(code),
                error,
            },
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Payload { status_code, .. } => Some(*status_code),
            Self::Error { status_code, .. } => *status_code,
        }
    }
}

/// What a matching acceptor saw: matcher kind, expected and actual values
#[derive(Debug, Clone, PartialEq)]
pub struct MatchContext {
    pub matcher: MatcherKind,
    pub argument: Option<String>,
    pub expected: Value,
    pub actual: Value,
}

impl fmt::Display for MatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(argument) => write!(
                f,
                "For expression \"{}\" the {} matcher expected {}, got {}",
                argument,
                self.matcher,
                display_value(&self.expected),
                display_value(&self.actual)
            ),
            None => write!(
                f,
                "The {} matcher expected {}, got {}",
                self.matcher,
                display_value(&self.expected),
                display_value(&self.actual)
            ),
        }
    }
}

/// Result of evaluating one response
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation<'a> {
    Matched {
        acceptor: &'a Acceptor,
        context: MatchContext,
    },
    /// Nothing matched a successful response; poll again if attempts remain
    NoMatch,
    /// Nothing matched an error response; this ends the wait
    UnexpectedError(ServiceError),
}

/// Evaluate `acceptors` in order against `response`.
pub fn evaluate<'a>(acceptors: &'a [Acceptor], response: &OperationResponse) -> Result<Evaluation<'a>> {
    for acceptor in acceptors {
        if let Some(context) = match_acceptor(&acceptor.matcher, response)? {
            return Ok(Evaluation::Matched { acceptor, context });
        }
    }

    Ok(match response {
        OperationResponse::Payload { .. } => Evaluation::NoMatch,
        OperationResponse::Error { error, .. } => Evaluation::UnexpectedError(error.clone()),
    })
}

fn match_acceptor(matcher: &Matcher, response: &OperationResponse) -> Result<Option<MatchContext>> {
    match matcher {
        Matcher::Error(expectation) => Ok(match_error(expectation, response)),
        Matcher::Status(expected) => Ok(match_status(*expected, response)),
        Matcher::Path { argument, expected } => match_path(argument, expected, response),
        Matcher::PathAll { argument, expected } => match_path_all(argument, expected, response),
        Matcher::PathAny { argument, expected } => match_path_any(argument, expected, response),
    }
}

fn match_error(expectation: &ErrorExpectation, response: &OperationResponse) -> Option<MatchContext> {
    let actual = match response {
        OperationResponse::Error { error, .. } => Some(&error.code),
        OperationResponse::Payload { .. } => None,
    };

    let matched = match (expectation, actual) {
        (ErrorExpectation::Code(expected), Some(code)) => expected == code,
        (ErrorExpectation::AnyError, Some(_)) | (ErrorExpectation::NoError, None) => true,
        _ => false,
    };

    matched.then(|| MatchContext {
        matcher: MatcherKind::Error,
        argument: None,
        expected: expectation.to_value(),
        actual: actual.map_or(Value::Null, |code| Value::String(code.clone())),
    })
}

fn match_status(expected: u16, response: &OperationResponse) -> Option<MatchContext> {
    let actual = response.status_code()?;
    (actual == expected).then(|| MatchContext {
        matcher: MatcherKind::Status,
        argument: None,
        expected: Value::from(expected),
        actual: Value::from(actual),
    })
}

/// Run the query for a path matcher; error responses never match path matchers.
fn search_payload(argument: &str, response: &OperationResponse) -> Result<Option<Value>> {
    match response {
        OperationResponse::Payload { body, .. } => query::search(argument, body).map(Some),
        OperationResponse::Error { .. } => Ok(None),
    }
}

fn path_context(kind: MatcherKind, argument: &str, expected: &Value, actual: Value) -> MatchContext {
    MatchContext {
        matcher: kind,
        argument: Some(argument.to_string()),
        expected: expected.clone(),
        actual,
    }
}

fn match_path(argument: &str, expected: &Value, response: &OperationResponse) -> Result<Option<MatchContext>> {
    let Some(actual) = search_payload(argument, response)? else {
        return Ok(None);
    };
    Ok(values_equal(&actual, expected).then(|| path_context(MatcherKind::Path, argument, expected, actual)))
}

fn match_path_all(argument: &str, expected: &Value, response: &OperationResponse) -> Result<Option<MatchContext>> {
    let Some(actual) = search_payload(argument, response)? else {
        return Ok(None);
    };
    let matched = match &actual {
        Value::Array(items) => !items.is_empty() && items.iter().all(|item| values_equal(item, expected)),
        _ => false,
    };
    Ok(matched.then(|| path_context(MatcherKind::PathAll, argument, expected, actual)))
}

fn match_path_any(argument: &str, expected: &Value, response: &OperationResponse) -> Result<Option<MatchContext>> {
    let Some(actual) = search_payload(argument, response)? else {
        return Ok(None);
    };
    let matched = match &actual {
        Value::Array(items) => items.iter().any(|item| values_equal(item, expected)),
        _ => false,
    };
    Ok(matched.then(|| path_context(MatcherKind::PathAny, argument, expected, actual)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AcceptorState;
    use proptest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    fn path(kind: MatcherKind, argument: &str, expected: Value) -> Matcher {
        let argument = argument.to_string();
        match kind {
            MatcherKind::Path => Matcher::Path { argument, expected },
            MatcherKind::PathAll => Matcher::PathAll { argument, expected },
            MatcherKind::PathAny => Matcher::PathAny { argument, expected },
            other => panic!("{other} is not a path matcher"),
        }
    }

    fn success(matcher: Matcher) -> Acceptor {
        Acceptor::new(AcceptorState::Success, matcher)
    }

    fn matched_state(acceptors: &[Acceptor], response: &OperationResponse) -> Option<AcceptorState> {
        match evaluate(acceptors, response).unwrap() {
            Evaluation::Matched { acceptor, .. } => Some(acceptor.state),
            _ => None,
        }
    }

    #[test]
    fn test_status_matcher() {
        let acceptors = [success(Matcher::Status(200))];
        let response = OperationResponse::payload(json!({}));
        match evaluate(&acceptors, &response).unwrap() {
            Evaluation::Matched { acceptor, context } => {
                assert_eq!(acceptor.state, AcceptorState::Success);
                assert_eq!(context.matcher, MatcherKind::Status);
                assert_eq!(context.actual, json!(200));
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_status_matcher_applies_to_error_responses() {
        let acceptors = [success(Matcher::Status(404))];
        let response = OperationResponse::error("NotFound", "").with_status(404);
        assert_eq!(matched_state(&acceptors, &response), Some(AcceptorState::Success));
    }

    #[test]
    fn test_error_matcher_reflects_configured_state() {
        let acceptors = [Acceptor::new(
            AcceptorState::Failure,
            Matcher::Error(ErrorExpectation::Code("MyException".to_string())),
        )];
        let response = OperationResponse::error("MyException", "boom");
        match evaluate(&acceptors, &response).unwrap() {
            Evaluation::Matched { acceptor, context } => {
                assert_eq!(acceptor.state, AcceptorState::Failure);
                assert_eq!(context.expected, json!("MyException"));
                assert_eq!(context.actual, json!("MyException"));
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_unmatched_error_is_unexpected() {
        let acceptors = [Acceptor::new(
            AcceptorState::Retry,
            Matcher::Error(ErrorExpectation::Code("InvalidInstanceID.NotFound".to_string())),
        )];
        let response = OperationResponse::error("Throttling", "Rate exceeded");
        assert_eq!(
            evaluate(&acceptors, &response).unwrap(),
            Evaluation::UnexpectedError(ServiceError::new("Throttling", "Rate exceeded"))
        );
    }

    #[test]
    fn test_boolean_error_expectations() {
        let any = [success(Matcher::Error(ErrorExpectation::AnyError))];
        let none = [success(Matcher::Error(ErrorExpectation::NoError))];
        let error = OperationResponse::error("Anything", "");
        let payload = OperationResponse::payload(json!({}));

        assert_eq!(matched_state(&any, &error), Some(AcceptorState::Success));
        assert_eq!(matched_state(&any, &payload), None);
        assert_eq!(matched_state(&none, &payload), Some(AcceptorState::Success));
        assert!(matches!(evaluate(&none, &error).unwrap(), Evaluation::UnexpectedError(_)));
    }

    #[test]
    fn test_path_matcher() {
        let acceptors = [success(path(MatcherKind::Path, "State.Name", json!("running")))];
        let running = OperationResponse::payload(json!({"State": {"Name": "running"}}));
        let stopped = OperationResponse::payload(json!({"State": {"Name": "stopped"}}));

        assert_eq!(matched_state(&acceptors, &running), Some(AcceptorState::Success));
        assert_eq!(evaluate(&acceptors, &stopped).unwrap(), Evaluation::NoMatch);
    }

    #[test]
    fn test_path_matchers_ignore_error_responses() {
        let acceptors = [success(path(MatcherKind::Path, "State.Name", json!("running")))];
        let response = OperationResponse::error("ResourceNotFound", "");
        assert!(matches!(
            evaluate(&acceptors, &response).unwrap(),
            Evaluation::UnexpectedError(_)
        ));
    }

    #[rstest]
    #[case::all_equal(MatcherKind::PathAll, json!(["running", "running"]), true)]
    #[case::one_differs(MatcherKind::PathAll, json!(["running", "pending"]), false)]
    #[case::all_empty(MatcherKind::PathAll, json!([]), false)]
    #[case::any_one_equal(MatcherKind::PathAny, json!(["pending", "running"]), true)]
    #[case::any_none_equal(MatcherKind::PathAny, json!(["pending", "stopped"]), false)]
    #[case::any_empty(MatcherKind::PathAny, json!([]), false)]
    fn test_list_matchers(#[case] kind: MatcherKind, #[case] names: Value, #[case] matches: bool) {
        let instances: Vec<Value> = names
            .as_array()
            .unwrap()
            .iter()
            .map(|name| json!({"State": {"Name": name}}))
            .collect();
        let response = OperationResponse::payload(json!({"Instances": instances}));
        let acceptors = [success(path(kind, "Instances[].State.Name", json!("running")))];

        assert_eq!(matched_state(&acceptors, &response).is_some(), matches);
    }

    #[test]
    fn test_list_matchers_require_a_list() {
        let response = OperationResponse::payload(json!({"State": {"Name": "running"}}));
        let all = [success(path(MatcherKind::PathAll, "State.Name", json!("running")))];
        let any = [success(path(MatcherKind::PathAny, "State.Name", json!("running")))];
        assert_eq!(matched_state(&all, &response), None);
        assert_eq!(matched_state(&any, &response), None);
    }

    #[test]
    fn test_first_declared_acceptor_wins() {
        let response = OperationResponse::payload(json!({"State": {"Name": "running"}}));
        let acceptors = [
            Acceptor::new(
                AcceptorState::Failure,
                path(MatcherKind::Path, "State.Name", json!("running")),
            ),
            success(Matcher::Status(200)),
        ];
        assert_eq!(matched_state(&acceptors, &response), Some(AcceptorState::Failure));
    }

    #[test]
    fn test_end_to_end_instance_describe_payload() {
        let response = OperationResponse::payload(json!({
            "Reservations": [{"Instances": [{"State": {"Name": "running"}}]}]
        }));
        let by_path = [success(path(
            MatcherKind::Path,
            "Reservations[0].Instances[0].State.Name",
            json!("running"),
        ))];
        let by_any = [success(path(
            MatcherKind::PathAny,
            "Reservations[].Instances[].State.Name",
            json!("running"),
        ))];
        assert_eq!(matched_state(&by_path, &response), Some(AcceptorState::Success));
        assert_eq!(matched_state(&by_any, &response), Some(AcceptorState::Success));
    }

    #[test]
    fn test_match_context_display() {
        let context = MatchContext {
            matcher: MatcherKind::PathAny,
            argument: Some("Reservations[].Instances[].State.Name".to_string()),
            expected: json!("terminated"),
            actual: json!(["terminated"]),
        };
        assert_eq!(
            context.to_string(),
            "For expression \"Reservations[].Instances[].State.Name\" the pathAny matcher expected terminated, got [\"terminated\"]"
        );
    }

    proptest! {
        /// Whatever the status, when two status acceptors both match, the one
        /// declared first decides the state.
        #[test]
        fn prop_declaration_order_decides(status in 100u16..600, first_fails in any::<bool>()) {
            let (first, second) = if first_fails {
                (AcceptorState::Failure, AcceptorState::Success)
            } else {
                (AcceptorState::Success, AcceptorState::Failure)
            };
            let acceptors = [
                Acceptor::new(first, Matcher::Status(status)),
                Acceptor::new(second, Matcher::Status(status)),
            ];
            let response = OperationResponse::payload(json!({})).with_status(status);
            prop_assert_eq!(matched_state(&acceptors, &response), Some(first));
        }
    }
}
