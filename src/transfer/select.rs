use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;

/// Inclusion patterns. A path is kept when any pattern finds a match
/// anywhere in it (search, not full-match). An empty set keeps everything.
#[derive(Clone, Debug, Default)]
pub struct FilterSet {
    patterns: Vec<Regex>,
}

impl FilterSet {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for p in patterns {
            let p = p.as_ref();
            let re = Regex::new(p).map_err(|e| -> anyhow::Error {
                crate::PullError::InvalidFilter { pattern: p.to_string(), reason: e.to_string() }
                    .into()
            })?;
            compiled.push(re);
        }
        Ok(Self { patterns: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(path))
    }
}

/// Drop paths in `skip` and repeated paths, keeping first occurrences in order.
pub fn remove_duplicates(paths: Vec<String>, skip: &HashSet<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(paths.len());
    paths.into_iter().filter(|p| !skip.contains(p) && seen.insert(p.clone())).collect()
}

pub fn filter_files(paths: Vec<String>, filters: &FilterSet) -> Vec<String> {
    if filters.is_empty() {
        return paths;
    }
    paths.into_iter().filter(|p| filters.matches(p)).collect()
}

/// Skip-set removal first, then pattern inclusion.
pub fn select(paths: Vec<String>, skip: &HashSet<String>, filters: &FilterSet) -> Vec<String> {
    filter_files(remove_duplicates(paths, skip), filters)
}
