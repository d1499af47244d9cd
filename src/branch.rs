//! Branch classification.
//!
//! The builders page is scoped by the codebase/branch parameters in its URL
//! (`?unity_branch=release/4.6/foo&other_branch=...`). From those the page
//! derives one canonical *branch type* (`trunk`, `4.6`, `2017.1`, ...) which
//! drives tag visibility.
//!
//! Patterns are tried in a fixed order, and for each pattern every codebase is
//! tried in URL order. The first hit wins, so an earlier pattern on a later
//! codebase beats a later pattern on an earlier codebase.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;

/// Query-string suffix that marks a codebase branch parameter.
pub const BRANCH_PARAM_SUFFIX: &str = "_branch";

/// Codebase parameter of the main repository.
pub const DEFAULT_MAIN_CODEBASE: &str = "unity_branch";

/// Branch type used when nothing more specific is known.
pub const TRUNK: &str = "trunk";

// Ordered: first pattern that matches any codebase wins.
static BRANCH_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"^(trunk)").unwrap(),
        Regex::new(r"^(20\d\d\.\d)/").unwrap(),
        Regex::new(r"^(\d\.\d)/").unwrap(),
        Regex::new(r"^release/(\d\.\d)").unwrap(),
    ]
});

/// Tags that name a branch rather than a category (`4.6`, `2017.1`, `Trunk`).
pub static BRANCH_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(20\d\d\.\d|\d\.\d|trunk)$").unwrap());

/// Whether a bare tag looks like a branch name.
pub fn is_branch_tag(tag: &str) -> bool {
    BRANCH_TAG_REGEX.is_match(tag)
}

/// Ordered codebase → branch mapping for the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodebaseBranches {
    entries: Vec<(String, String)>,
}

impl CodebaseBranches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every `*_branch` parameter from a page query string, in order.
    /// Keys and values are percent-decoded; `+` stays literal.
    pub fn from_query(query: &str) -> Self {
        query
            .trim_start_matches('?')
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
                (decode_component(key), decode_component(value))
            })
            .filter(|(key, _)| key.ends_with(BRANCH_PARAM_SUFFIX))
            .collect()
    }

    /// Insert or replace a codebase, keeping its original position.
    pub fn insert(&mut self, codebase: impl Into<String>, branch: impl Into<String>) {
        let codebase = codebase.into();
        let branch = branch.into();
        match self.entries.iter_mut().find(|(name, _)| *name == codebase) {
            Some(entry) => entry.1 = branch,
            None => self.entries.push((codebase, branch)),
        }
    }

    pub fn get(&self, codebase: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == codebase)
            .map(|(_, branch)| branch.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(codebase, branch)| (codebase.as_str(), branch.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CodebaseBranches {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut branches = CodebaseBranches::new();
        for (codebase, branch) in iter {
            branches.insert(codebase, branch);
        }
        branches
    }
}

/// Parse a `codebase=branch` pair as given on the command line.
/// The branch may be percent-encoded (`release%2F4.6`).
pub fn parse_codebase_arg(arg: &str) -> anyhow::Result<(String, String)> {
    let (codebase, branch) = arg
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected CODEBASE=BRANCH, got '{}'", arg))?;
    if codebase.trim().is_empty() {
        anyhow::bail!("Codebase name cannot be empty in '{}'", arg);
    }
    Ok((codebase.trim().to_string(), decode_component(branch)))
}

/// Percent-decode one query component. Undecodable input is kept as is.
fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Run the ordered patterns over the codebases without any fallback.
pub fn match_branch_pattern(branches: &CodebaseBranches) -> Option<String> {
    BRANCH_PATTERNS.iter().find_map(|pattern| {
        branches.iter().find_map(|(_, branch)| {
            pattern
                .captures(branch)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
    })
}

/// Derives the branch type for a page.
#[derive(Debug, Clone)]
pub struct BranchClassifier {
    main_codebase: String,
}

impl Default for BranchClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAIN_CODEBASE)
    }
}

impl BranchClassifier {
    pub fn new(main_codebase: impl Into<String>) -> Self {
        Self {
            main_codebase: main_codebase.into(),
        }
    }

    pub fn main_codebase(&self) -> &str {
        &self.main_codebase
    }

    /// Classify the page's branch context.
    ///
    /// `known_branch_tags` holds the lowercased branch-shaped tags seen on the
    /// current builders. A matched branch type that no builder is tagged with
    /// falls back to `trunk`, as does a page that only carries a non-empty
    /// main-codebase branch no pattern recognises. Anything else yields `None`.
    pub fn classify(
        &self,
        branches: &CodebaseBranches,
        known_branch_tags: &BTreeSet<String>,
    ) -> Option<String> {
        let matched = match_branch_pattern(branches);

        let branch_type = match matched {
            Some(branch_type) if !known_branch_tags.contains(&branch_type.to_lowercase()) => {
                Some(TRUNK.to_string())
            }
            Some(branch_type) => Some(branch_type),
            None if branches
                .get(&self.main_codebase)
                .is_some_and(|branch| !branch.is_empty()) =>
            {
                Some(TRUNK.to_string())
            }
            None => None,
        };

        debug!(?branch_type, codebases = branches.len(), "classified branch");
        branch_type
    }
}
