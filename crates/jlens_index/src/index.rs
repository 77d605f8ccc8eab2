use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use dashmap::DashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Simple class name to package set, plus package to owning dependency.
///
/// Both maps shard their locks per key, so indexing tasks insert
/// concurrently without a global lock. Share it through an `Arc`.
#[derive(Debug, Default)]
pub struct ClassIndex {
    class_to_packages: DashMap<String, BTreeSet<String>>,
    package_to_dependency: DashMap<String, String>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `package.simple_name`. Returns false if it was already known.
    pub fn insert_class(&self, package: &str, simple_name: &str) -> bool {
        self.class_to_packages
            .entry(simple_name.to_string())
            .or_default()
            .insert(package.to_string())
    }

    /// Records the dependency owning `package`. When two archives claim the
    /// same package the lexicographically smallest owner is kept, so the
    /// result does not depend on task completion order.
    pub fn record_owner(&self, package: &str, owner: &str) {
        self.package_to_dependency
            .entry(package.to_string())
            .and_modify(|current| {
                if owner < current.as_str() {
                    *current = owner.to_string();
                }
            })
            .or_insert_with(|| owner.to_string());
    }

    /// Packages providing `simple_name`, in lexicographic order.
    pub fn packages_for(&self, simple_name: &str) -> Vec<String> {
        self.class_to_packages
            .get(simple_name)
            .map(|packages| packages.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, simple_name: &str, package: &str) -> bool {
        self.class_to_packages
            .get(simple_name)
            .map_or(false, |packages| packages.contains(package))
    }

    pub fn dependency_for_package(&self, package: &str) -> Option<String> {
        self.package_to_dependency
            .get(package)
            .map(|owner| owner.value().clone())
    }

    /// Number of distinct simple names.
    pub fn simple_name_count(&self) -> usize {
        self.class_to_packages.len()
    }

    /// Number of distinct fully-qualified classes.
    pub fn class_count(&self) -> usize {
        self.class_to_packages
            .iter()
            .map(|entry| entry.value().len())
            .sum()
    }

    pub fn package_owner_count(&self) -> usize {
        self.package_to_dependency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.class_to_packages.is_empty()
    }

    /// Classes whose simple name matches `pattern`, sorted by simple name then
    /// package, at most `limit` hits.
    pub fn search(
        &self,
        pattern: &str,
        search_type: SearchType,
        limit: usize,
    ) -> Result<Vec<ClassSearchHit>, SearchError> {
        let matcher = search_type.compile(pattern)?;

        let mut hits: Vec<ClassSearchHit> = self
            .class_to_packages
            .iter()
            .filter(|entry| matcher.is_match(entry.key()))
            .flat_map(|entry| {
                let simple_name = entry.key().clone();
                entry
                    .value()
                    .iter()
                    .map(|package| ClassSearchHit {
                        class_name: format!("{package}.{simple_name}"),
                        simple_name: simple_name.clone(),
                        package: package.clone(),
                        dependency: None,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        hits.sort_by(|a, b| {
            a.simple_name
                .cmp(&b.simple_name)
                .then_with(|| a.package.cmp(&b.package))
        });
        hits.truncate(limit);
        for hit in &mut hits {
            hit.dependency = self.dependency_for_package(&hit.package);
        }
        Ok(hits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSearchHit {
    pub class_name: String,
    pub simple_name: String,
    pub package: String,
    pub dependency: Option<String>,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid search pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Unknown search type '{0}'. Available: exact, prefix, suffix, contains, wildcard")]
    UnknownSearchType(String),
}

/// How a search pattern is matched against simple class names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Exact,
    Prefix,
    Suffix,
    Contains,
    /// `*` matches any run of characters, `?` a single character.
    #[default]
    Wildcard,
}

impl SearchType {
    pub const fn as_str(self) -> &'static str {
        match self {
            SearchType::Exact => "exact",
            SearchType::Prefix => "prefix",
            SearchType::Suffix => "suffix",
            SearchType::Contains => "contains",
            SearchType::Wildcard => "wildcard",
        }
    }

    fn compile(self, pattern: &str) -> Result<Regex, SearchError> {
        let quoted = regex::escape(pattern);
        let body = match self {
            SearchType::Exact => quoted,
            SearchType::Prefix => format!("{quoted}.*"),
            SearchType::Suffix => format!(".*{quoted}"),
            SearchType::Contains => format!(".*{quoted}.*"),
            SearchType::Wildcard => pattern
                .chars()
                .map(|ch| match ch {
                    '*' => ".*".to_string(),
                    '?' => ".".to_string(),
                    other => regex::escape(other.encode_utf8(&mut [0; 4])),
                })
                .collect(),
        };
        Regex::new(&format!("^(?:{body})$")).map_err(|source| SearchError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(SearchType::Exact),
            "prefix" => Ok(SearchType::Prefix),
            "suffix" => Ok(SearchType::Suffix),
            "contains" => Ok(SearchType::Contains),
            "wildcard" => Ok(SearchType::Wildcard),
            other => Err(SearchError::UnknownSearchType(other.to_string())),
        }
    }
}
