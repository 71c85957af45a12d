use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::ItemMetadata;

/// PDF path → bibliography record, as produced by the last synchronization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataStore {
    items: BTreeMap<PathBuf, ItemMetadata>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, metadata: ItemMetadata) {
        self.items.insert(path.into(), metadata);
    }

    pub fn get(&self, path: &Path) -> Option<&ItemMetadata> {
        self.items.get(path)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &ItemMetadata)> {
        self.items.iter()
    }

    /// Every tag seen on a synchronized item, sorted and deduplicated.
    pub fn tags(&self) -> Vec<String> {
        self.items
            .values()
            .flat_map(|m| m.tags.iter().cloned())
            .filter(|t| !t.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every collection key seen on a synchronized item, sorted and deduplicated.
    pub fn collections(&self) -> Vec<String> {
        self.items
            .values()
            .flat_map(|m| m.collections.iter().cloned())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Save as pretty JSON, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a snapshot; a missing file gives an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
