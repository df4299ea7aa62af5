//! Field filters

use serde::{Deserialize, Serialize};

/// Allowlist of target field names; empty allows every field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldFilter(Vec<String>);

impl FieldFilter {
    /// Filter allowing every field
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    /// Whether a target field passes this filter
    pub fn allows(&self, field: &str) -> bool {
        self.0.is_empty() || self.0.iter().any(|name| name == field)
    }

    /// This filter when non-empty, otherwise the fallback
    pub fn effective<'a>(&'a self, fallback: &'a FieldFilter) -> &'a FieldFilter {
        if self.is_empty() { fallback } else { self }
    }
}

impl<S: Into<String>> FromIterator<S> for FieldFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<Vec<String>> for FieldFilter {
    fn from(fields: Vec<String>) -> Self {
        Self(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_allows_everything() {
        let filter = FieldFilter::all();
        assert!(filter.is_empty());
        assert!(filter.allows("anything"));
    }

    #[test]
    fn non_empty_filter_is_an_allowlist() {
        let filter = FieldFilter::new(["id", "name"]);
        assert!(filter.allows("id"));
        assert!(!filter.allows("sub"));
        assert_eq!(filter.fields(), ["id".to_string(), "name".to_string()]);
    }

    #[test]
    fn call_filter_overrides_default_only_when_non_empty() {
        let default = FieldFilter::new(["required"]);
        let call = FieldFilter::new(["extra"]);

        assert_eq!(FieldFilter::all().effective(&default), &default);
        assert_eq!(call.effective(&default), &call);
    }

    #[test]
    fn collects_from_iterators() {
        let filter: FieldFilter = vec!["a", "b"].into_iter().collect();
        assert_eq!(filter, FieldFilter::from(vec!["a".to_string(), "b".to_string()]));
    }
}
