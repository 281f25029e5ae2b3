use crate::types::{TagFilters, TagMap};

/// Check if a resource's tags satisfy the configured filter rules.
///
/// Each rule set is a conjunction: every key must be present with an exact
/// value match. The rule sets themselves are a disjunction, so the first
/// satisfied one wins. An empty filter matches everything.
pub fn matches_tag_filters(filters: &TagFilters, tags: &TagMap) -> bool {
    if filters.is_empty() {
        return true;
    }
    filters
        .iter()
        .any(|rule| rule.iter().all(|(key, value)| tags.get(key) == Some(value)))
}
