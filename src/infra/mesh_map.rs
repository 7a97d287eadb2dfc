// MeSH descriptor id -> human readable name, loaded from a JSON
// object such as {"D000328": "Adult", "D008875": "Middle Aged"}.
// Every id of a topic must be known; a missing name means the
// map is older than the PubMed snapshot in the index.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::domain::query::Conjunction;

#[derive(Debug, Clone, Default)]
pub struct MeshMap {
    names: HashMap<String, String>,
}

impl MeshMap {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read MeSH map '{}'", path.display()))?;
        let names: HashMap<String, String> = serde_json::from_str(&json)
            .with_context(|| format!("MeSH map '{}' is not an id -> name object", path.display()))?;
        tracing::debug!("Loaded {} MeSH names", names.len());
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Names of the conjunction's ids, in conjunction order
    pub fn names_for(&self, conjunction: &Conjunction) -> Result<Vec<String>> {
        conjunction
            .terms()
            .iter()
            .map(|id| {
                self.names
                    .get(id)
                    .cloned()
                    .with_context(|| format!("MeSH id '{id}' is missing from the MeSH map"))
            })
            .collect()
    }
}

impl FromIterator<(String, String)> for MeshMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { names: iter.into_iter().collect() }
    }
}
