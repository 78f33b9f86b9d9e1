//! Reduced botocore service model
//!
//! Only what a waiter command needs is modelled: service metadata for endpoint
//! construction, and each operation's input shape so that a generated command
//! can accept and forward exactly the operation's parameters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, WaiterError};
use crate::naming::to_cli_name;
use crate::providers::{ModelKind, ModelProvider};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    pub api_version: String,
    /// Host prefix of the regional endpoint, e.g. `dynamodb`
    pub endpoint_prefix: String,
    #[serde(default)]
    pub service_id: Option<String>,
    /// Wire protocol, e.g. `json`, `query` or `ec2`
    #[serde(default)]
    pub protocol: Option<String>,
    /// Prefix of the `X-Amz-Target` header for JSON protocol services
    #[serde(default)]
    pub target_prefix: Option<String>,
    #[serde(default)]
    pub json_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeRef {
    pub shape: String,
    #[serde(default)]
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Structure,
    List,
    Map,
    String,
    Integer,
    Long,
    Double,
    Float,
    Boolean,
    Timestamp,
    Blob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub shape_type: ShapeType,
    #[serde(default)]
    pub members: BTreeMap<String, ShapeRef>,
    #[serde(default)]
    pub required: Vec<String>,
    /// Element shape of a list
    #[serde(default)]
    pub member: Option<ShapeRef>,
    #[serde(default)]
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDefinition {
    #[serde(default)]
    pub input: Option<ShapeRef>,
    #[serde(default)]
    pub documentation: Option<String>,
}

/// How a parameter is accepted on the command line and forwarded to the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    String,
    Integer,
    Double,
    Boolean,
    Timestamp,
    /// A list of scalar strings, given as separate values
    StringList,
    /// A list of complex values, given as JSON
    List,
    Structure,
    Map,
}

impl ParameterKind {
    /// Type label used in help output
    pub fn type_label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::StringList | Self::List => "list",
            Self::Structure => "structure",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_label())
    }
}

/// One member of an operation's input shape, resolved for the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Member name as sent on the wire, e.g. `InstanceIds`
    pub member_name: String,
    /// Flag name without dashes, e.g. `instance-ids`
    pub cli_name: String,
    pub kind: ParameterKind,
    pub required: bool,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceModel {
    pub metadata: ServiceMetadata,
    pub operations: BTreeMap<String, OperationDefinition>,
    #[serde(default)]
    pub shapes: BTreeMap<String, Shape>,
}

impl ServiceModel {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Load the service model of `service`/`api_version` from `provider`.
    ///
    /// Unlike waiter models, a missing service model is an error: a waiter has
    /// nothing to poll without it.
    pub fn load(provider: &dyn ModelProvider, service: &str, api_version: &str) -> Result<Self> {
        let bytes = provider.load(service, api_version, ModelKind::Service)?;
        Self::from_slice(&bytes)
    }

    pub fn operation(&self, name: &str) -> Result<&OperationDefinition> {
        self.operations
            .get(name)
            .ok_or_else(|| WaiterError::OperationNotFound(name.to_string()))
    }

    fn shape(&self, name: &str) -> Result<&Shape> {
        self.shapes
            .get(name)
            .ok_or_else(|| WaiterError::InvalidServiceModel(format!("unknown shape {name}")))
    }

    /// Resolve the input members of `operation` into parameter specs.
    pub fn input_parameters(&self, operation: &str) -> Result<Vec<ParameterSpec>> {
        let Some(input) = &self.operation(operation)?.input else {
            return Ok(Vec::new());
        };

        let shape = self.shape(&input.shape)?;
        if shape.shape_type != ShapeType::Structure {
            return Err(WaiterError::InvalidServiceModel(format!(
                "input shape {} of {} is not a structure",
                input.shape, operation
            )));
        }

        shape
            .members
            .iter()
            .map(|(member_name, member)| {
                let kind = self.parameter_kind(self.shape(&member.shape)?)?;
                Ok(ParameterSpec {
                    member_name: member_name.clone(),
                    cli_name: to_cli_name(member_name),
                    kind,
                    required: shape.required.contains(member_name),
                    documentation: member
                        .documentation
                        .clone()
                        .or_else(|| self.shapes.get(&member.shape).and_then(|s| s.documentation.clone())),
                })
            })
            .collect()
    }

    fn parameter_kind(&self, shape: &Shape) -> Result<ParameterKind> {
        Ok(match shape.shape_type {
            ShapeType::String | ShapeType::Blob => ParameterKind::String,
            ShapeType::Integer | ShapeType::Long => ParameterKind::Integer,
            ShapeType::Double | ShapeType::Float => ParameterKind::Double,
            ShapeType::Boolean => ParameterKind::Boolean,
            ShapeType::Timestamp => ParameterKind::Timestamp,
            ShapeType::Structure => ParameterKind::Structure,
            ShapeType::Map => ParameterKind::Map,
            ShapeType::List => {
                let member = shape.member.as_ref().ok_or_else(|| {
                    WaiterError::InvalidServiceModel("list shape without member".to_string())
                })?;
                match self.shape(&member.shape)?.shape_type {
                    ShapeType::String => ParameterKind::StringList,
                    _ => ParameterKind::List,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn describe_instances_model() -> ServiceModel {
        serde_json::from_value(json!({
            "metadata": {
                "apiVersion": "2016-11-15",
                "endpointPrefix": "ec2",
                "serviceId": "EC2"
            },
            "operations": {
                "DescribeInstances": {"input": {"shape": "DescribeInstancesRequest"}},
                "DescribeAccountAttributes": {}
            },
            "shapes": {
                "DescribeInstancesRequest": {
                    "type": "structure",
                    "members": {
                        "Filters": {"shape": "FilterList", "documentation": "The filters."},
                        "InstanceIds": {"shape": "InstanceIdStringList"},
                        "DryRun": {"shape": "Boolean"},
                        "MaxResults": {"shape": "Integer"},
                        "NextToken": {"shape": "String"}
                    },
                    "required": ["InstanceIds"]
                },
                "FilterList": {"type": "list", "member": {"shape": "Filter"}},
                "Filter": {"type": "structure", "members": {"Name": {"shape": "String"}}},
                "InstanceIdStringList": {"type": "list", "member": {"shape": "String"}},
                "Boolean": {"type": "boolean"},
                "Integer": {"type": "integer"},
                "String": {"type": "string"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_input_parameters_resolve_kinds() {
        let model = describe_instances_model();
        let params = model.input_parameters("DescribeInstances").unwrap();
        let by_name: BTreeMap<&str, &ParameterSpec> =
            params.iter().map(|p| (p.cli_name.as_str(), p)).collect();

        assert_eq!(params.len(), 5);
        assert_eq!(by_name["filters"].kind, ParameterKind::List);
        assert_eq!(by_name["filters"].documentation.as_deref(), Some("The filters."));
        assert_eq!(by_name["instance-ids"].kind, ParameterKind::StringList);
        assert_eq!(by_name["instance-ids"].member_name, "InstanceIds");
        assert!(by_name["instance-ids"].required);
        assert_eq!(by_name["dry-run"].kind, ParameterKind::Boolean);
        assert_eq!(by_name["max-results"].kind, ParameterKind::Integer);
        assert!(!by_name["next-token"].required);
    }

    #[test]
    fn test_operation_without_input_has_no_parameters() {
        let model = describe_instances_model();
        assert!(model
            .input_parameters("DescribeAccountAttributes")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unknown_operation_fails() {
        let model = describe_instances_model();
        let error = model.input_parameters("DescribeNothing").unwrap_err();
        assert!(matches!(error, WaiterError::OperationNotFound(ref op) if op == "DescribeNothing"));
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(ParameterKind::StringList.type_label(), "list");
        assert_eq!(ParameterKind::List.to_string(), "list");
        assert_eq!(ParameterKind::String.type_label(), "string");
    }
}
