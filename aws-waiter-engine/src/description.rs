//! One-sentence help text for waiters

use crate::model::{AcceptorState, Matcher, WaiterConfig};
use crate::naming::to_cli_name;
use crate::query::display_value;

/// Describe what waiting on `config` means.
///
/// An explicit description wins. Otherwise the sentence is built from the
/// first `success` acceptor and the polled operation's command-line name.
pub fn build_waiter_state_description(config: &WaiterConfig) -> String {
    if let Some(description) = &config.description {
        return description.clone();
    }

    let operation = to_cli_name(&config.operation);
    let Some(acceptor) = config
        .acceptors
        .iter()
        .find(|acceptor| acceptor.state == AcceptorState::Success)
    else {
        return format!("Wait until a terminal state is reached when polling with `{operation}`.");
    };

    let condition = match &acceptor.matcher {
        Matcher::Error(expectation) => format!("{expectation} is thrown"),
        Matcher::Status(code) => format!("{code} response is received"),
        Matcher::Path { argument, expected } => {
            format!("JMESPath query {argument} returns {}", display_value(expected))
        }
        Matcher::PathAll { argument, expected } => format!(
            "JMESPath query {argument} returns {} for all elements",
            display_value(expected)
        ),
        Matcher::PathAny { argument, expected } => format!(
            "JMESPath query {argument} returns {} for any element",
            display_value(expected)
        ),
    };

    format!("Wait until {condition} when polling with `{operation}`.")
}
