use crate::error::ConfigError;
use std::collections::BTreeMap;

/// Tag key to raw filter value. A value may list several accepted values
/// separated by commas; splitting happens when the filter is used.
pub type TagFilters = BTreeMap<String, String>;

const TAG_FILTER_PREFIX: &str = "tag:";

/// A provider-side filter entry: `tag:<key>` and its accepted values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub name: String,
    pub values: Vec<String>,
}

/// Parse `key=value` strings into a filter map.
///
/// Only the first `=` splits, so values may contain `=` or commas. Keys are
/// trimmed and must be non-empty; values must hold at least one non-empty
/// comma separated part.
pub fn parse_tags<S: AsRef<str>>(raw: &[S]) -> Result<TagFilters, ConfigError> {
    let mut tags = TagFilters::new();
    for kv in raw {
        let kv = kv.as_ref();
        let (key, value) = kv
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .filter(|(k, v)| !k.is_empty() && split_values(v).next().is_some())
            .ok_or_else(|| ConfigError::InvalidTag(kv.to_string()))?;
        tags.insert(key.to_string(), value.to_string());
    }
    Ok(tags)
}

/// Split a comma separated tag value into its trimmed, non-empty parts.
pub fn split_values(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|v| !v.is_empty())
}

/// Build the provider filters, one per key, ordered by key.
pub fn to_filters(tags: &TagFilters) -> Vec<TagFilter> {
    tags.iter()
        .map(|(key, value)| TagFilter {
            name: format!("{TAG_FILTER_PREFIX}{}", key.trim()),
            values: split_values(value).map(str::to_string).collect(),
        })
        .collect()
}
