use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};

use crate::{FixtureError, TestUnit};

/// Content of a fixture file: test name to test unit.
#[derive(Debug, PartialEq, Eq, Deserialize)]
pub struct TestSuite(pub BTreeMap<String, TestUnit>);

impl TestSuite {
    /// Parses a fixture from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a fixture file.
    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let json = fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let suite = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), tests = suite.0.len(), "parsed fixture");
        Ok(suite)
    }
}
