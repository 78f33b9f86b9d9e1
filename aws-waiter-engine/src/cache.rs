//! Per-build model cache
//!
//! A [`ModelCache`] is owned by whoever builds a command table. It loads each
//! service and waiter model at most once for the lifetime of the build and
//! hands out shared, read-only references.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::Result;
use crate::model::WaiterModel;
use crate::providers::ModelProvider;
use crate::service_model::ServiceModel;

type ModelKey = (String, String);

pub struct ModelCache<'p> {
    provider: &'p dyn ModelProvider,
    service_models: HashMap<ModelKey, Arc<ServiceModel>>,
    // `None` records that the service publishes no waiters
    waiter_models: HashMap<ModelKey, Option<Arc<WaiterModel>>>,
}

impl<'p> ModelCache<'p> {
    pub fn new(provider: &'p dyn ModelProvider) -> Self {
        Self {
            provider,
            service_models: HashMap::new(),
            waiter_models: HashMap::new(),
        }
    }

    pub fn provider(&self) -> &'p dyn ModelProvider {
        self.provider
    }

    pub fn service_model(&mut self, service: &str, api_version: &str) -> Result<Arc<ServiceModel>> {
        let key = (service.to_string(), api_version.to_string());
        if let Some(model) = self.service_models.get(&key) {
            return Ok(Arc::clone(model));
        }
        let model = Arc::new(ServiceModel::load(self.provider, service, api_version)?);
        self.service_models.insert(key, Arc::clone(&model));
        Ok(model)
    }

    /// The waiter model of a service, or `None` when it publishes none.
    pub fn waiter_model(
        &mut self,
        service: &str,
        api_version: &str,
    ) -> Result<Option<Arc<WaiterModel>>> {
        let key = (service.to_string(), api_version.to_string());
        if let Some(model) = self.waiter_models.get(&key) {
            return Ok(model.clone());
        }
        let model = WaiterModel::load(self.provider, service, api_version)?.map(Arc::new);
        self.waiter_models.insert(key, model.clone());
        Ok(model)
    }
}
