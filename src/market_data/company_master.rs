// =============================================================================
// Company master -- instrument id → display name
// =============================================================================
//
// Names are presentation-only. Ids such as `JKH.N0000` and `JKH` share the
// symbol key `JKH` (text before the first '.'), and the first master row for a
// key wins.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One row of the reference table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub symbol: String,
    pub company_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct CompanyMaster {
    names: HashMap<String, String>,
}

/// Join key shared by the price table and the master table.
pub fn symbol_key(symbol: &str) -> &str {
    let trimmed = symbol.trim();
    trimmed.split('.').next().unwrap_or(trimmed)
}

/// Name order used by the ranked tables: alphabetical, unnamed last.
pub fn cmp_company_names(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl CompanyMaster {
    pub fn from_records(records: impl IntoIterator<Item = CompanyRecord>) -> Self {
        let mut names = HashMap::new();
        for rec in records {
            let key = symbol_key(&rec.symbol);
            let name = rec.company_name.trim();
            if key.is_empty() || name.is_empty() {
                continue;
            }
            names
                .entry(key.to_string())
                .or_insert_with(|| name.to_string());
        }
        Self { names }
    }

    /// Load the master table; a missing file yields an empty master.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "company master not found, names will be empty");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read company master from {}", path.display()))?;
        let records: Vec<CompanyRecord> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse company master from {}", path.display()))?;

        let master = Self::from_records(records);
        info!(path = %path.display(), companies = master.len(), "company master loaded");
        Ok(master)
    }

    pub fn company_name(&self, instrument_id: &str) -> Option<&str> {
        self.names.get(symbol_key(instrument_id)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
