// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only template catalog.
//!
//! Named, categorized, pre-built pattern strings consumed as candidate
//! patterns for new sequences. The catalog never touches counter state.

use serde::{Deserialize, Serialize};

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateEntry {
    pub id: String,
    pub name: String,
    pub category: String,
    pub pattern: String,
    pub description: String,
    /// Recommended counter padding when a sequence adopts this pattern.
    pub padding: usize,
}

/// Listing filters; all criteria are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    /// Exact category match, case-insensitive.
    pub category: Option<String>,
    /// Substring match on the entry name, case-insensitive.
    pub name_contains: Option<String>,
}

impl TemplateFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    fn accepts(&self, entry: &TemplateEntry) -> bool {
        if let Some(category) = &self.category {
            if !entry.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(fragment) = &self.name_contains {
            if !entry
                .name
                .to_lowercase()
                .contains(&fragment.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Catalog read interface.
pub trait TemplateCatalog: Send + Sync {
    /// Entries matching `filter`, in catalog order.
    fn list(&self, filter: &TemplateFilter) -> Vec<TemplateEntry>;

    /// Lookup by id.
    fn get(&self, id: &str) -> Option<TemplateEntry>;
}

/// In-memory catalog backed by a fixed entry list.
#[derive(Debug, Default)]
pub struct InMemoryTemplateCatalog {
    entries: Vec<TemplateEntry>,
}

impl InMemoryTemplateCatalog {
    pub fn new(entries: Vec<TemplateEntry>) -> Self {
        Self { entries }
    }

    /// Catalog of common ERP document-number patterns.
    pub fn with_defaults() -> Self {
        let entry = |id: &str, name: &str, category: &str, pattern: &str, description: &str| {
            TemplateEntry {
                id: id.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                pattern: pattern.to_string(),
                description: description.to_string(),
                padding: 4,
            }
        };
        Self::new(vec![
            entry(
                "purchase-order",
                "Purchase Order",
                "procurement",
                "PO-{YEAR}-{COUNTER:4}",
                "Yearly purchase order numbering",
            ),
            entry(
                "invoice",
                "Invoice",
                "finance",
                "INV-{YEAR}{MONTH}-{COUNTER:5}",
                "Monthly invoice numbering",
            ),
            entry(
                "goods-receipt",
                "Goods Receipt Note",
                "inventory",
                "GRN-{YEAR}-{WEEK}-{COUNTER:4}",
                "Weekly goods receipt numbering",
            ),
            entry(
                "work-order",
                "Work Order",
                "manufacturing",
                "WO-{QUARTER}Q{YEAR}-{COUNTER:4}",
                "Quarterly work order numbering",
            ),
            entry(
                "serial-number",
                "Product Serial",
                "manufacturing",
                "{?TIER=VIP?VIP-{COUNTER:6}:{COUNTER:6}}",
                "Tiered product serial with VIP prefix",
            ),
        ])
    }
}

impl TemplateCatalog for InMemoryTemplateCatalog {
    fn list(&self, filter: &TemplateFilter) -> Vec<TemplateEntry> {
        self.entries
            .iter()
            .filter(|e| filter.accepts(e))
            .cloned()
            .collect()
    }

    fn get(&self, id: &str) -> Option<TemplateEntry> {
        self.entries.iter().find(|e| e.id == id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_all() {
        let catalog = InMemoryTemplateCatalog::with_defaults();
        assert_eq!(catalog.list(&TemplateFilter::all()).len(), 5);
    }

    #[test]
    fn test_filter_by_category() {
        let catalog = InMemoryTemplateCatalog::with_defaults();
        let manufacturing = catalog.list(&TemplateFilter::by_category("MANUFACTURING"));
        assert_eq!(manufacturing.len(), 2);
        assert!(manufacturing.iter().all(|e| e.category == "manufacturing"));
    }

    #[test]
    fn test_filter_by_name_fragment() {
        let catalog = InMemoryTemplateCatalog::with_defaults();
        let filter = TemplateFilter {
            name_contains: Some("order".to_string()),
            ..TemplateFilter::default()
        };
        let orders = catalog.list(&filter);
        assert_eq!(orders.len(), 2);
    }

    #[test]
    fn test_get_by_id() {
        let catalog = InMemoryTemplateCatalog::with_defaults();
        let entry = catalog.get("purchase-order").unwrap();
        assert_eq!(entry.pattern, "PO-{YEAR}-{COUNTER:4}");
        assert!(catalog.get("missing").is_none());
    }
}
