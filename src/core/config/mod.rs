// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequence definition loading.
//!
//! Sequences are created once via configuration; definitions load from
//! YAML or TOML files and seed a store. Seeding is idempotent; existing
//! rows are left untouched so counters survive redeploys.

use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::core::error::{SequenceError, SequenceResult};
use crate::core::model::{ResetPeriod, Sequence};
use crate::core::store::SequenceStore;
use crate::core::template::PatternTemplate;

fn default_padding() -> usize {
    4
}

fn default_step_size() -> u64 {
    1
}

/// One configured sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceDefinition {
    pub tenant_id: String,
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub reset_period: ResetPeriod,
    #[serde(default)]
    pub reset_limit: Option<u64>,
    #[serde(default = "default_padding")]
    pub padding: usize,
    #[serde(default = "default_step_size")]
    pub step_size: u64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl SequenceDefinition {
    /// Materialize a fresh sequence row from this definition.
    pub fn into_sequence(self) -> Sequence {
        let mut seq = Sequence::new(self.tenant_id, self.name, self.pattern)
            .with_padding(self.padding)
            .with_step_size(self.step_size)
            .with_reset_period(self.reset_period);
        seq.reset_limit = self.reset_limit;
        seq.metadata = self
            .metadata
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        seq
    }
}

/// Root of a sequence configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceConfig {
    #[serde(default)]
    pub sequences: Vec<SequenceDefinition>,
}

impl SequenceConfig {
    pub fn from_yaml_str(input: &str) -> SequenceResult<Self> {
        let config: Self = serde_yaml::from_str(input)
            .map_err(|e| SequenceError::configuration(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(input: &str) -> SequenceResult<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| SequenceError::configuration(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, dispatching on its extension
    /// (`.yaml`/`.yml` or `.toml`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> SequenceResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SequenceError::configuration(format!("cannot read '{}': {}", path.display(), e))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            other => Err(SequenceError::configuration(format!(
                "unsupported config extension '{}' for '{}'",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }

    /// Structural validation of every definition.
    fn validate(&self) -> SequenceResult<()> {
        for def in &self.sequences {
            if def.tenant_id.is_empty() || def.name.is_empty() {
                return Err(SequenceError::configuration_with_key(
                    "sequence definitions require tenant_id and name",
                    format!("{}/{}", def.tenant_id, def.name),
                ));
            }
            if def.step_size == 0 {
                return Err(SequenceError::configuration_with_key(
                    "step_size must be at least 1",
                    format!("{}/{}", def.tenant_id, def.name),
                ));
            }
            let template = PatternTemplate::parse(&def.pattern).map_err(|e| {
                SequenceError::configuration_with_key(
                    format!("invalid pattern '{}': {}", def.pattern, e),
                    format!("{}/{}", def.tenant_id, def.name),
                )
            })?;
            if template.has_nested_conditional() {
                return Err(SequenceError::configuration_with_key(
                    format!("pattern '{}' nests conditionals", def.pattern),
                    format!("{}/{}", def.tenant_id, def.name),
                ));
            }
        }
        Ok(())
    }

    /// Insert every definition that does not already exist. Returns the
    /// number of rows created.
    pub fn seed(&self, store: &dyn SequenceStore) -> SequenceResult<usize> {
        let mut created = 0;
        for def in &self.sequences {
            if store.find(&def.tenant_id, &def.name)?.is_some() {
                warn!(
                    "sequence '{}/{}' already exists, keeping stored counter",
                    def.tenant_id, def.name
                );
                continue;
            }
            store.insert(def.clone().into_sequence())?;
            info!("seeded sequence '{}/{}'", def.tenant_id, def.name);
            created += 1;
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::InMemorySequenceStore;

    const YAML: &str = "
sequences:
  - tenant_id: acme
    name: purchase_order
    pattern: \"PO-{YEAR}-{COUNTER:4}\"
    reset_period: yearly
    reset_limit: 9999
    padding: 4
    metadata:
      owner: procurement
  - tenant_id: acme
    name: invoice
    pattern: \"INV-{YEAR}{MONTH}-{COUNTER:5}\"
    reset_period: monthly
    padding: 5
";

    const TOML: &str = r#"
[[sequences]]
tenant_id = "acme"
name = "work_order"
pattern = "WO-{QUARTER}Q{YEAR}-{COUNTER:4}"
reset_period = "yearly"
step_size = 2
"#;

    #[test]
    fn test_yaml_loading() {
        let config = SequenceConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.sequences.len(), 2);
        let po = &config.sequences[0];
        assert_eq!(po.reset_period, ResetPeriod::Yearly);
        assert_eq!(po.reset_limit, Some(9999));
        assert_eq!(po.step_size, 1, "step_size defaults to 1");
        assert_eq!(po.metadata["owner"], "procurement");
    }

    #[test]
    fn test_toml_loading() {
        let config = SequenceConfig::from_toml_str(TOML).unwrap();
        assert_eq!(config.sequences.len(), 1);
        assert_eq!(config.sequences[0].step_size, 2);
        assert_eq!(config.sequences[0].padding, 4, "padding defaults to 4");
    }

    #[test]
    fn test_invalid_pattern_rejected_at_load() {
        let yaml = "
sequences:
  - tenant_id: acme
    name: bad
    pattern: \"\"
";
        let err = SequenceConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, SequenceError::Configuration { .. }));
    }

    #[test]
    fn test_zero_step_rejected() {
        let yaml = "
sequences:
  - tenant_id: acme
    name: bad
    pattern: \"{COUNTER}\"
    step_size: 0
";
        assert!(SequenceConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_seed_is_idempotent() {
        let store = InMemorySequenceStore::new();
        let config = SequenceConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.seed(&store).unwrap(), 2);

        // counters survive a re-seed
        store
            .transact("acme", "purchase_order", &mut |seq| {
                seq.current_value = 42;
                Ok(Vec::new())
            })
            .unwrap();
        assert_eq!(config.seed(&store).unwrap(), 0);
        assert_eq!(
            store
                .find("acme", "purchase_order")
                .unwrap()
                .unwrap()
                .current_value,
            42
        );
    }

    #[test]
    fn test_definition_into_sequence() {
        let config = SequenceConfig::from_yaml_str(YAML).unwrap();
        let seq = config.sequences[0].clone().into_sequence();
        assert_eq!(seq.tenant_id, "acme");
        assert_eq!(seq.reset_period, ResetPeriod::Yearly);
        assert_eq!(seq.current_value, 0);
        assert_eq!(seq.metadata["owner"], "procurement");
    }
}
