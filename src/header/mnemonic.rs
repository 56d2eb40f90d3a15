//! Curve mnemonic and unit normalisation
//!
//! Legacy files often fold the unit into the mnemonic (`"GR API"`,
//! `"GR.API"`, `"GR .API"`). The split rules below are tried in order; the
//! first rule producing two non-empty tokens wins. If none does, the whole
//! string is the mnemonic and no unit is derived.

use std::collections::{HashMap, HashSet};

/// One way of splitting a combined mnemonic token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRule {
    /// Split on the first run of whitespace.
    Whitespace,
    /// Split on the first `.`.
    Dot,
}

/// Rules in priority order.
pub const SPLIT_RULES: [SplitRule; 2] = [SplitRule::Whitespace, SplitRule::Dot];

impl SplitRule {
    fn apply(self, raw: &str) -> Option<(&str, &str)> {
        let (mnemonic, unit) = match self {
            SplitRule::Whitespace => raw.split_once(char::is_whitespace)?,
            SplitRule::Dot => raw.split_once('.')?,
        };
        let mnemonic = mnemonic.trim().trim_end_matches('.');
        let unit = unit.trim().trim_start_matches('.').trim();
        (!mnemonic.is_empty() && !unit.is_empty()).then_some((mnemonic, unit))
    }
}

/// Result of splitting a raw mnemonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MnemonicSplit {
    pub mnemonic: String,
    /// `None` when no rule applied; the curve keeps its existing unit.
    pub unit: Option<String>,
}

pub fn split_mnemonic(raw: &str) -> MnemonicSplit {
    let raw = raw.trim();
    SPLIT_RULES
        .iter()
        .find_map(|rule| rule.apply(raw))
        .map(|(mnemonic, unit)| MnemonicSplit {
            mnemonic: mnemonic.to_string(),
            unit: Some(unit.to_string()),
        })
        .unwrap_or_else(|| MnemonicSplit {
            mnemonic: raw.to_string(),
            unit: None,
        })
}

/// Make every mnemonic unique. Each occurrence of a repeated name gets a
/// `:1`, `:2`, ... suffix, skipping suffixes that would collide with a name
/// already present.
pub fn dedupe_mnemonics(names: &mut [String]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in names.iter() {
        *counts.entry(name.clone()).or_default() += 1;
    }
    if counts.values().all(|&n| n == 1) {
        return;
    }

    let mut taken: HashSet<String> = names.iter().cloned().collect();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    for name in names.iter_mut() {
        if counts.get(name.as_str()).copied().unwrap_or(0) < 2 {
            continue;
        }
        let suffix = next_suffix.entry(name.clone()).or_insert(1);
        let mut candidate = format!("{}:{}", name, suffix);
        while taken.contains(&candidate) {
            *suffix += 1;
            candidate = format!("{}:{}", name, suffix);
        }
        *suffix += 1;
        taken.insert(candidate.clone());
        *name = candidate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(raw: &str) -> (String, Option<String>) {
        let s = split_mnemonic(raw);
        (s.mnemonic, s.unit)
    }

    #[test]
    fn test_whitespace_and_dot_split_identically() {
        assert_eq!(split("GR API"), ("GR".into(), Some("API".into())));
        assert_eq!(split("GR.API"), ("GR".into(), Some("API".into())));
        assert_eq!(split("GR .API"), ("GR".into(), Some("API".into())));
    }

    #[test]
    fn test_no_separator_leaves_unit_empty() {
        assert_eq!(split("GR"), ("GR".into(), None));
        assert_eq!(split("  GR  "), ("GR".into(), None));
    }

    #[test]
    fn test_rule_requires_two_tokens() {
        // A trailing dot yields no unit
        assert_eq!(split("GR."), ("GR.".into(), None));
        // Whitespace rule applies; the dangling dot is dropped
        assert_eq!(split("RHOB. G/C3"), ("RHOB".into(), Some("G/C3".into())));
    }

    #[test]
    fn test_dedupe_suffixes_all_occurrences() {
        let mut names: Vec<String> = ["DEPT", "GR", "RHOB", "GR"].iter().map(|s| s.to_string()).collect();
        dedupe_mnemonics(&mut names);
        assert_eq!(names, vec!["DEPT", "GR:1", "RHOB", "GR:2"]);
    }

    #[test]
    fn test_dedupe_avoids_existing_suffix() {
        let mut names: Vec<String> = ["GR", "GR:1", "GR"].iter().map(|s| s.to_string()).collect();
        dedupe_mnemonics(&mut names);
        assert_eq!(names, vec!["GR:2", "GR:1", "GR:3"]);
    }

    #[test]
    fn test_dedupe_is_noop_on_unique_names() {
        let mut names: Vec<String> = ["GR:1", "GR:2"].iter().map(|s| s.to_string()).collect();
        dedupe_mnemonics(&mut names);
        assert_eq!(names, vec!["GR:1", "GR:2"]);
    }
}
