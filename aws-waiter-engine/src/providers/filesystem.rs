//! Native filesystem provider
//!
//! Serves documents laid out as `<root>/<service>/<api-version>/<file>`, the same
//! layout as the embedded data and botocore's data directory.
//!
//! Reads are blocking. Models are loaded while the command tree is built,
//! before the first await.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{ModelKind, ModelProvider};
use crate::errors::{Result, WaiterError};

#[derive(Debug, Clone)]
pub struct FileSystemModelProvider {
    root: PathBuf,
}

impl FileSystemModelProvider {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// List subdirectory names of `dir`, sorted. A missing directory is empty.
fn list_directories(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(WaiterError::file_system("read directory", dir, e)),
    };

    let mut directories = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| WaiterError::file_system("read directory entry", dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                directories.push(name.to_string());
            }
        }
    }

    // Sort directories for consistent ordering
    directories.sort();
    Ok(directories)
}

impl ModelProvider for FileSystemModelProvider {
    fn load(&self, service: &str, api_version: &str, kind: ModelKind) -> Result<Vec<u8>> {
        let path = self
            .root
            .join(service)
            .join(api_version)
            .join(kind.file_name());
        match fs::read(&path) {
            Ok(bytes) => {
                log::debug!("Loaded {}", path.display());
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(WaiterError::data_not_found(
                service,
                api_version,
                kind.file_name(),
            )),
            Err(e) => Err(WaiterError::file_system("read", &path, e)),
        }
    }

    fn available_services(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut services = BTreeMap::new();
        for service in list_directories(&self.root)? {
            let versions = list_directories(&self.root.join(&service))?;
            if !versions.is_empty() {
                services.insert(service, versions);
            }
        }
        Ok(services)
    }
}
