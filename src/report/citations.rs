//! Cross-section citation reconciliation.
//!
//! Every section is written with its own reference list numbered from 1.
//! Sections are merged into one [`GlobalReferenceTable`] strictly in outline
//! order: a URL keeps the number it was first given, new URLs get the next
//! free number, and the section's `[n]` markers are rewritten to the global
//! numbers. Numbers already published are never changed.

use crate::types::{AppError, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const MARKER_PATTERN: &str = r"\[(\d+)\]";

/// What to do with a `[n]` marker that has no entry in the local list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DanglingCitationPolicy {
    /// Remove the marker
    #[default]
    Drop,
    /// Leave the marker as written
    Preserve,
    /// Fail the section
    Reject,
}

/// Ordered URL to global number table shared by all sections of a report.
#[derive(Debug, Clone, Default)]
pub struct GlobalReferenceTable {
    urls: Vec<String>,
    numbers: HashMap<String, usize>,
}

impl GlobalReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Global number of `url`, if it has one.
    pub fn number_of(&self, url: &str) -> Option<usize> {
        self.numbers.get(url).copied()
    }

    /// Number for `url`, assigning `len + 1` when unseen. The flag is true for
    /// a new entry.
    pub fn assign(&mut self, url: &str) -> (usize, bool) {
        if let Some(number) = self.number_of(url) {
            return (number, false);
        }
        self.urls.push(url.to_string());
        let number = self.urls.len();
        self.numbers.insert(url.to_string(), number);
        (number, true)
    }

    /// `(number, url)` pairs in ascending number.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &str)> {
        self.urls.iter().enumerate().map(|(i, url)| (i + 1, url.as_str()))
    }

    /// `"[n] url"` lines in ascending number.
    pub fn lines(&self) -> Vec<String> {
        self.entries()
            .map(|(number, url)| format!("[{}] {}", number, url))
            .collect()
    }
}

/// A section after its markers were rewritten to global numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledSection {
    pub markdown: String,
    /// Entries this section added to the table, ascending
    pub new_entries: Vec<(usize, String)>,
}

/// Parse a `"[n] url"` entry.
pub fn parse_reference(entry: &str) -> Option<(usize, String)> {
    let rest = entry.trim().strip_prefix('[')?;
    let (number, url) = rest.split_once(']')?;
    let number = number.trim().parse::<usize>().ok()?;
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    Some((number, url.to_string()))
}

fn local_map(references: &[String]) -> BTreeMap<usize, String> {
    let mut local = BTreeMap::new();
    for entry in references {
        match parse_reference(entry) {
            Some((number, url)) => {
                if local.contains_key(&number) {
                    tracing::warn!(number, "Duplicate reference number, keeping the first: {}", entry);
                } else {
                    local.insert(number, url);
                }
            }
            None => tracing::warn!("Skipping malformed reference entry: {}", entry),
        }
    }
    local
}

/// Merge one section's local references into `table` and rewrite its markers.
pub fn reconcile(
    markdown: &str,
    references: &[String],
    table: &mut GlobalReferenceTable,
    policy: DanglingCitationPolicy,
) -> Result<ReconciledSection> {
    let marker = Regex::new(MARKER_PATTERN)
        .map_err(|e| AppError::Internal(format!("Invalid citation pattern: {}", e)))?;
    let local = local_map(references);

    if policy == DanglingCitationPolicy::Reject {
        let dangling: Vec<&str> = marker
            .captures_iter(markdown)
            .filter(|caps| {
                caps[1]
                    .parse::<usize>()
                    .map_or(true, |n| !local.contains_key(&n))
            })
            .filter_map(|caps| caps.get(0).map(|m| m.as_str()))
            .collect();
        if !dangling.is_empty() {
            return Err(AppError::Citation(format!(
                "Citation markers without a reference: {}",
                dangling.join(", ")
            )));
        }
    }

    let mut to_global = HashMap::new();
    let mut new_entries = Vec::new();
    for (local_number, url) in &local {
        let (global, added) = table.assign(url);
        if added {
            new_entries.push((global, url.clone()));
        }
        to_global.insert(*local_number, global);
    }

    let rewritten = marker.replace_all(markdown, |caps: &Captures| {
        let global = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|n| to_global.get(&n));
        match (global, policy) {
            (Some(global), _) => format!("[{}]", global),
            (None, DanglingCitationPolicy::Preserve) => caps[0].to_string(),
            (None, _) => String::new(),
        }
    });

    Ok(ReconciledSection {
        markdown: rewritten.into_owned(),
        new_entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn refs(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_two_sections_share_a_url() {
        let mut table = GlobalReferenceTable::new();

        let a = reconcile(
            "Alpha [1] and beta [2].",
            &refs(&["[1] https://x.test", "[2] https://y.test"]),
            &mut table,
            DanglingCitationPolicy::Drop,
        )
        .unwrap();
        assert_eq!(a.markdown, "Alpha [1] and beta [2].");
        assert_eq!(
            a.new_entries,
            vec![(1, "https://x.test".to_string()), (2, "https://y.test".to_string())]
        );

        let b = reconcile(
            "Gamma [1], again [2].",
            &refs(&["[1] https://y.test", "[2] https://z.test"]),
            &mut table,
            DanglingCitationPolicy::Drop,
        )
        .unwrap();
        assert_eq!(b.markdown, "Gamma [2], again [3].");
        assert_eq!(b.new_entries, vec![(3, "https://z.test".to_string())]);
        assert_eq!(
            table.lines(),
            vec!["[1] https://x.test", "[2] https://y.test", "[3] https://z.test"]
        );
    }

    #[test]
    fn test_numbers_are_contiguous_and_urls_unique_across_many_sections() {
        let mut table = GlobalReferenceTable::new();
        for section in 0..20 {
            let entries: Vec<String> = (1..=4)
                .map(|i| format!("[{}] https://site{}.test", i, (section * 3 + i) % 11))
                .collect();
            reconcile("[1][2][3][4]", &entries, &mut table, DanglingCitationPolicy::Drop).unwrap();
        }

        let numbers: Vec<usize> = table.entries().map(|(n, _)| n).collect();
        assert_eq!(numbers, (1..=table.len()).collect::<Vec<_>>());
        let urls: HashSet<&str> = table.entries().map(|(_, u)| u).collect();
        assert_eq!(urls.len(), table.len());
        assert_eq!(table.len(), 11);
    }

    #[test]
    fn test_published_numbers_never_change() {
        let mut table = GlobalReferenceTable::new();
        reconcile("[1]", &refs(&["[1] https://a.test"]), &mut table, DanglingCitationPolicy::Drop).unwrap();
        let before = table.lines();
        reconcile(
            "[1] [2]",
            &refs(&["[1] https://b.test", "[2] https://a.test"]),
            &mut table,
            DanglingCitationPolicy::Drop,
        )
        .unwrap();
        assert_eq!(&table.lines()[..before.len()], &before[..]);
        assert_eq!(table.number_of("https://a.test"), Some(1));
        assert_eq!(table.number_of("https://b.test"), Some(2));
    }

    #[test]
    fn test_dangling_marker_is_dropped() {
        let mut table = GlobalReferenceTable::new();
        let section = reconcile(
            "Known [1], unknown [7].",
            &refs(&["[1] https://a.test"]),
            &mut table,
            DanglingCitationPolicy::Drop,
        )
        .unwrap();
        assert_eq!(section.markdown, "Known [1], unknown .");
    }

    #[test]
    fn test_dangling_marker_is_preserved() {
        let mut table = GlobalReferenceTable::new();
        let section = reconcile(
            "Unknown [7].",
            &[],
            &mut table,
            DanglingCitationPolicy::Preserve,
        )
        .unwrap();
        assert_eq!(section.markdown, "Unknown [7].");
        assert!(table.is_empty());
    }

    #[test]
    fn test_dangling_marker_is_rejected() {
        let mut table = GlobalReferenceTable::new();
        let err = reconcile(
            "Unknown [7].",
            &refs(&["[1] https://a.test"]),
            &mut table,
            DanglingCitationPolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Citation(_)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_malformed_and_duplicate_entries() {
        let mut table = GlobalReferenceTable::new();
        let section = reconcile(
            "One [1] two [2] three [3].",
            &refs(&[
                "[1] https://first.test",
                "[1] https://second.test",
                "https://no-number.test",
                "[x] https://bad-number.test",
                "[2]",
                " [3]   https://third.test ",
            ]),
            &mut table,
            DanglingCitationPolicy::Drop,
        )
        .unwrap();
        assert_eq!(section.markdown, "One [1] two  three [2].");
        assert_eq!(table.lines(), vec!["[1] https://first.test", "[2] https://third.test"]);
    }

    #[test]
    fn test_local_entries_processed_in_ascending_order() {
        let mut table = GlobalReferenceTable::new();
        reconcile(
            "[2] then [1]",
            &refs(&["[2] https://b.test", "[1] https://a.test"]),
            &mut table,
            DanglingCitationPolicy::Drop,
        )
        .unwrap();
        assert_eq!(table.lines(), vec!["[1] https://a.test", "[2] https://b.test"]);
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            parse_reference("[12] https://a.test/x"),
            Some((12, "https://a.test/x".to_string()))
        );
        assert_eq!(parse_reference("12 https://a.test"), None);
        assert_eq!(parse_reference("[1]   "), None);
    }

    #[test]
    fn test_policy_serde() {
        let policy: DanglingCitationPolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(policy, DanglingCitationPolicy::Reject);
        assert_eq!(DanglingCitationPolicy::default(), DanglingCitationPolicy::Drop);
    }
}
