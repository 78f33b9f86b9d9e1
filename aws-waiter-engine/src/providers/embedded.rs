//! Embedded AWS service and waiter definitions
//!
//! This module provides access to the service definitions bundled with the
//! binary at compile time. The service definitions have been reduced to the
//! operations and input shapes the bundled waiters poll.

use std::collections::{BTreeMap, BTreeSet};

use rust_embed::RustEmbed;

use super::{ModelKind, ModelProvider};
use crate::errors::{Result, WaiterError};

/// Embedded service definitions with compression
#[derive(RustEmbed)]
#[folder = "resources/models"]
#[include = "*.json"]
struct BundledModels;

/// Provider serving the data embedded in the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedModelProvider;

impl ModelProvider for EmbeddedModelProvider {
    fn load(&self, service: &str, api_version: &str, kind: ModelKind) -> Result<Vec<u8>> {
        let path = format!("{}/{}/{}", service, api_version, kind.file_name());
        BundledModels::get(&path)
            .map(|file| file.data.to_vec())
            .ok_or_else(|| WaiterError::data_not_found(service, api_version, kind.file_name()))
    }

    fn available_services(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut service_versions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut file_count = 0;

        for file_path in BundledModels::iter() {
            file_count += 1;
            let path_parts: Vec<&str> = file_path.split('/').collect();
            if path_parts.len() >= 3 {
                service_versions
                    .entry(path_parts[0].to_string())
                    .or_default()
                    .insert(path_parts[1].to_string());
            }
        }

        log::debug!(
            "Embedded data: {} files, {} services",
            file_count,
            service_versions.len()
        );

        Ok(service_versions
            .into_iter()
            .map(|(service, versions)| (service, versions.into_iter().collect()))
            .collect())
    }
}
