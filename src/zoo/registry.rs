use std::collections::BTreeMap;

use crate::error::ZooError;

use super::{QuickstartDataset, ZooDataset};

/// Name to installer mapping. Built once at startup and read-only afterwards.
#[derive(Default)]
pub struct ZooRegistry {
    datasets: BTreeMap<&'static str, Box<dyn ZooDataset>>,
}

impl ZooRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Result<Self, ZooError> {
        let mut registry = Self::new();
        registry.register(Box::new(QuickstartDataset))?;
        Ok(registry)
    }

    pub fn register(&mut self, dataset: Box<dyn ZooDataset>) -> Result<(), ZooError> {
        let name = dataset.name();
        if self.datasets.contains_key(name) {
            return Err(ZooError::DuplicateDataset(name.to_string()));
        }
        self.datasets.insert(name, dataset);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&dyn ZooDataset, ZooError> {
        self.datasets
            .get(name.trim())
            .map(|dataset| dataset.as_ref())
            .ok_or_else(|| ZooError::UnknownDataset(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.contains_key(name.trim())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.datasets.keys().copied().collect()
    }
}
