//! Operation parameters on the command line
//!
//! Each member of the polled operation's input shape becomes one flag named
//! after the member in kebab case. Scalars take one value, string lists take
//! several, and complex values are given as JSON.

use aws_waiter_engine::{ParameterKind, ParameterSpec, Parameters};
use clap::{value_parser, Arg, ArgAction, ArgMatches};
use serde_json::{Number, Value};

use crate::errors::CliError;

/// Prefix of the flag that sets a boolean parameter to `false`
const NEGATION_PREFIX: &str = "no-";

fn negated_id(spec: &ParameterSpec) -> String {
    format!("{NEGATION_PREFIX}{}", spec.cli_name)
}

/// Appended to a parameter flag that would shadow a global flag
const SHADOWED_SUFFIX: &str = "-param";

fn flag_names(spec: &ParameterSpec) -> Vec<String> {
    match spec.kind {
        ParameterKind::Boolean => vec![spec.cli_name.clone(), negated_id(spec)],
        _ => vec![spec.cli_name.clone()],
    }
}

/// Rename parameter flags that collide with one of `reserved`.
///
/// A `Region` member becomes `--region-param`, leaving `--region` to select
/// the endpoint. The member name sent in the request is unchanged.
pub fn avoid_reserved_flags(specs: &mut [ParameterSpec], reserved: &[String]) {
    for spec in specs.iter_mut() {
        while flag_names(spec).iter().any(|name| reserved.contains(name)) {
            let renamed = format!("{}{SHADOWED_SUFFIX}", spec.cli_name);
            log::debug!(
                "Parameter {} is available as --{} since --{} is a global flag",
                spec.member_name,
                renamed,
                spec.cli_name
            );
            spec.cli_name = renamed;
        }
    }
}

fn help_text(spec: &ParameterSpec) -> String {
    match &spec.documentation {
        Some(documentation) => format!("({}) {}", spec.kind, documentation.trim()),
        None => format!("({})", spec.kind),
    }
}

/// The clap arguments accepting `spec`
pub fn parameter_args(spec: &ParameterSpec) -> Vec<Arg> {
    let arg = Arg::new(spec.cli_name.clone())
        .long(spec.cli_name.clone())
        .help(help_text(spec));

    match spec.kind {
        ParameterKind::Boolean => vec![
            arg.action(ArgAction::SetTrue),
            Arg::new(negated_id(spec))
                .long(negated_id(spec))
                .action(ArgAction::SetTrue)
                .conflicts_with(spec.cli_name.clone())
                .help(format!("Send {} as false", spec.member_name)),
        ],
        ParameterKind::String | ParameterKind::Timestamp => vec![arg
            .required(spec.required)
            .value_name("VALUE")
            .value_parser(value_parser!(String))],
        ParameterKind::Integer => vec![arg
            .required(spec.required)
            .value_name("INTEGER")
            .value_parser(value_parser!(i64))],
        ParameterKind::Double => vec![arg
            .required(spec.required)
            .value_name("DOUBLE")
            .value_parser(value_parser!(f64))],
        ParameterKind::StringList => vec![arg
            .required(spec.required)
            .value_name("VALUE")
            .num_args(1..)
            .action(ArgAction::Append)
            .value_parser(value_parser!(String))],
        ParameterKind::List => vec![arg
            .required(spec.required)
            .value_name("JSON")
            .num_args(1..)
            .action(ArgAction::Append)
            .value_parser(value_parser!(String))],
        ParameterKind::Structure | ParameterKind::Map => vec![arg
            .required(spec.required)
            .value_name("JSON")
            .value_parser(value_parser!(String))],
    }
}

fn lookup<'m, T>(matches: &'m ArgMatches, id: &str) -> Result<Option<&'m T>, CliError>
where
    T: std::any::Any + Clone + Send + Sync + 'static,
{
    matches
        .try_get_one::<T>(id)
        .map_err(|e| CliError::usage(format!("Error reading parameter '--{id}': {e}")))
}

fn lookup_many<'m>(
    matches: &'m ArgMatches,
    id: &str,
) -> Result<Option<Vec<&'m String>>, CliError> {
    Ok(matches
        .try_get_many::<String>(id)
        .map_err(|e| CliError::usage(format!("Error reading parameter '--{id}': {e}")))?
        .map(Iterator::collect))
}

fn parse_json(spec: &ParameterSpec, raw: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw).map_err(|e| {
        CliError::usage(format!(
            "Error parsing parameter '--{}': Invalid JSON: {}\nJSON received: {}",
            spec.cli_name, e, raw
        ))
    })
}

fn parameter_value(spec: &ParameterSpec, matches: &ArgMatches) -> Result<Option<Value>, CliError> {
    let id = spec.cli_name.as_str();
    let value = match spec.kind {
        ParameterKind::Boolean => {
            if matches.get_flag(id) {
                Some(Value::Bool(true))
            } else if matches.get_flag(&negated_id(spec)) {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
        ParameterKind::String | ParameterKind::Timestamp => {
            lookup::<String>(matches, id)?.map(|s| Value::String(s.clone()))
        }
        ParameterKind::Integer => lookup::<i64>(matches, id)?.map(|n| Value::from(*n)),
        ParameterKind::Double => match lookup::<f64>(matches, id)? {
            Some(n) => Some(Value::Number(Number::from_f64(*n).ok_or_else(|| {
                CliError::usage(format!("Invalid value for '--{id}': {n} is not a finite number"))
            })?)),
            None => None,
        },
        ParameterKind::StringList => lookup_many(matches, id)?.map(|values| {
            Value::Array(values.into_iter().cloned().map(Value::String).collect())
        }),
        ParameterKind::List => match lookup_many(matches, id)? {
            // One JSON array is the whole list; otherwise each value is an element
            Some(raw) if raw.len() == 1 => match parse_json(spec, raw[0])? {
                Value::Array(items) => Some(Value::Array(items)),
                item => Some(Value::Array(vec![item])),
            },
            Some(raw) => Some(Value::Array(
                raw.into_iter()
                    .map(|r| parse_json(spec, r))
                    .collect::<Result<_, _>>()?,
            )),
            None => None,
        },
        ParameterKind::Structure | ParameterKind::Map => match lookup::<String>(matches, id)? {
            Some(raw) => match parse_json(spec, raw)? {
                object @ Value::Object(_) => Some(object),
                other => {
                    return Err(CliError::usage(format!(
                        "Error parsing parameter '--{id}': expected a JSON object, got {other}"
                    )))
                }
            },
            None => None,
        },
    };
    Ok(value)
}

/// Collect the request parameters given on the command line.
///
/// Parameters that were not given are left out of the request.
pub fn parameters_from_matches(
    specs: &[ParameterSpec],
    matches: &ArgMatches,
) -> Result<Parameters, CliError> {
    let mut parameters = Parameters::new();
    for spec in specs {
        if let Some(value) = parameter_value(spec, matches)? {
            parameters.insert(spec.member_name.clone(), value);
        }
    }
    Ok(parameters)
}
