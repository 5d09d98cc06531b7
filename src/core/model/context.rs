// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-supplied variable values for one generation call.

use std::collections::BTreeMap;

/// Case-insensitive variable name → value map.
///
/// Keys are folded to upper case on insert and lookup, matching the
/// variable-token grammar. The context is never persisted directly; it is
/// snapshotted into the serial number log at generation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationContext {
    values: BTreeMap<String, String>,
}

impl GenerationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value under the same
    /// case-folded key.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(key.as_ref().to_uppercase(), value.into());
    }

    /// Builder-style insert for test and call-site ergonomics.
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_uppercase()).map(|s| s.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&key.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// JSON snapshot for the audit log.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for GenerationContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = GenerationContext::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let ctx = GenerationContext::new().with("tier", "VIP");
        assert_eq!(ctx.get("TIER"), Some("VIP"));
        assert_eq!(ctx.get("Tier"), Some("VIP"));
        assert_eq!(ctx.get("tier"), Some("VIP"));
    }

    #[test]
    fn test_insert_replaces_across_cases() {
        let mut ctx = GenerationContext::new();
        ctx.insert("region", "EU");
        ctx.insert("REGION", "US");
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.get("region"), Some("US"));
    }

    #[test]
    fn test_snapshot_uses_folded_keys() {
        let ctx = GenerationContext::new().with("tier", "VIP");
        let snap = ctx.snapshot();
        assert_eq!(snap["TIER"], "VIP");
    }
}
