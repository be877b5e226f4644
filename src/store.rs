use std::collections::HashMap;

use thiserror::Error;

use crate::forest::{Forest, ForestId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("forest id '{0}' defined more than once")]
    DuplicateId(ForestId),
}

/// In-memory forest repository, built once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct ForestStore {
    forests: Vec<Forest>,
    index: HashMap<ForestId, usize>,
}

impl ForestStore {
    pub fn from_forests(forests: Vec<Forest>) -> Result<Self, StoreError> {
        let mut index = HashMap::with_capacity(forests.len());
        for (position, forest) in forests.iter().enumerate() {
            if index.insert(forest.id.clone(), position).is_some() {
                return Err(StoreError::DuplicateId(forest.id.clone()));
            }
        }
        Ok(Self { forests, index })
    }

    pub fn get(&self, id: &str) -> Option<&Forest> {
        self.index
            .get(&ForestId::new(id))
            .map(|&position| &self.forests[position])
    }

    /// Forests in dataset order.
    pub fn iter(&self) -> impl Iterator<Item = &Forest> {
        self.forests.iter()
    }

    pub fn first(&self) -> Option<&Forest> {
        self.forests.first()
    }

    pub fn len(&self) -> usize {
        self.forests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forests.is_empty()
    }
}
