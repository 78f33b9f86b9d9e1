//! Sources of declarative service data
//!
//! A provider serves the raw `service-2.json` and `waiters-2.json` documents of a
//! service version. Providers report missing data as
//! [`WaiterError::DataNotFound`](crate::WaiterError::DataNotFound) so that callers
//! can distinguish "nothing published" from a broken document.

use std::collections::BTreeMap;

use crate::errors::{Result, WaiterError};

// Compile-time embedded data
pub mod embedded;

// Native filesystem provider implementation
pub mod filesystem;

pub use embedded::EmbeddedModelProvider;
pub use filesystem::FileSystemModelProvider;

/// Kind of document a provider is asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Service,
    Waiters,
}

impl ModelKind {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Service => "service-2.json",
            Self::Waiters => "waiters-2.json",
        }
    }
}

/// A source of service and waiter documents keyed by (service, api version)
pub trait ModelProvider: Send + Sync {
    /// Read one document. Missing data is reported as `DataNotFound`.
    fn load(&self, service: &str, api_version: &str, kind: ModelKind) -> Result<Vec<u8>>;

    /// Every service this provider knows about, with its api versions sorted ascending
    fn available_services(&self) -> Result<BTreeMap<String, Vec<String>>>;

    /// The most recent api version of `service`, if known
    fn latest_version(&self, service: &str) -> Result<Option<String>> {
        Ok(self
            .available_services()?
            .remove(service)
            .and_then(|mut versions| versions.pop()))
    }
}

/// Consults several providers in order; the first that has the data wins.
///
/// This mirrors a loader search path: user supplied data directories are put in
/// front of the embedded data so they can override or extend it.
pub struct ChainedModelProvider {
    providers: Vec<Box<dyn ModelProvider>>,
}

impl ChainedModelProvider {
    pub fn new(providers: Vec<Box<dyn ModelProvider>>) -> Self {
        Self { providers }
    }
}

impl ModelProvider for ChainedModelProvider {
    fn load(&self, service: &str, api_version: &str, kind: ModelKind) -> Result<Vec<u8>> {
        for provider in &self.providers {
            match provider.load(service, api_version, kind) {
                Err(e) if e.is_data_not_found() => continue,
                other => return other,
            }
        }
        Err(WaiterError::data_not_found(
            service,
            api_version,
            kind.file_name(),
        ))
    }

    fn available_services(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for provider in &self.providers {
            for (service, versions) in provider.available_services()? {
                let entry = merged.entry(service).or_default();
                entry.extend(versions);
                entry.sort();
                entry.dedup();
            }
        }
        Ok(merged)
    }
}
