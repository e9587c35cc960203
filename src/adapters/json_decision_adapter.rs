//! JSON decision record adapter.
//!
//! `path` is either one `.json` file or a directory of them. Each file holds
//! a single record or an array of records.

use crate::domain::decision::ModelInvestmentDecisions;
use crate::domain::error::BetbenchError;
use crate::ports::decision_port::DecisionPort;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct JsonDecisionAdapter {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<ModelInvestmentDecisions>),
    One(Box<ModelInvestmentDecisions>),
}

impl JsonDecisionAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_file(path: &Path) -> Result<Vec<ModelInvestmentDecisions>, BetbenchError> {
        let json = fs::read_to_string(path).map_err(|e| {
            BetbenchError::data(format!("failed to read {}: {}", path.display(), e))
        })?;
        let parsed: OneOrMany = serde_json::from_str(&json).map_err(|e| {
            BetbenchError::data(format!("{}: invalid decision JSON: {}", path.display(), e))
        })?;
        let records = match parsed {
            OneOrMany::Many(records) => records,
            OneOrMany::One(record) => vec![*record],
        };
        debug!(file = %path.display(), records = records.len(), "decisions loaded");
        Ok(records)
    }

    fn json_files(dir: &Path) -> Result<Vec<PathBuf>, BetbenchError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl DecisionPort for JsonDecisionAdapter {
    fn load_decisions(&self) -> Result<Vec<ModelInvestmentDecisions>, BetbenchError> {
        if !self.path.is_dir() {
            return Self::read_file(&self.path);
        }
        let mut records = Vec::new();
        for file in Self::json_files(&self.path)? {
            records.extend(Self::read_file(&file)?);
        }
        Ok(records)
    }
}
