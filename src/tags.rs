//! Tag normalization relative to a branch type.
//!
//! Builders carry free-form tags such as `ABV`, `Nightly`, `4.6-Nightly`,
//! `Trunk-ABV`, `Trunk` or `Unstable`. On a page scoped to a branch type:
//! - tags prefixed with another branch (`4.6-Nightly` on trunk) are hidden,
//! - the active branch prefix is stripped (`Trunk-ABV` → `ABV`),
//! - bare branch names (`Trunk`, `4.6`) are hidden as they repeat the page's
//!   own context.
//!
//! Without a branch type every tag is shown unchanged.

use crate::branch::is_branch_tag;
use regex::RegexBuilder;

/// Pseudo-tag selecting builders with no visible tags.
pub const NO_TAG: &str = "No Tag";

pub const UNSTABLE_TAG: &str = "Unstable";
pub const WIP_TAG: &str = "WIP";

/// Joins a builder's tags into one selectable compound tag.
pub const TAG_SEPARATOR: &str = " && ";

const BRANCH_SCOPED_UNSTABLE_SUFFIX: &str = "-unstable";

/// Whether `tag` should be shown on a page with the given branch type.
pub fn tag_visible_for_branch(tag: &str, branch_type: Option<&str>) -> bool {
    let Some(branch_type) = branch_type else {
        return true;
    };
    if tag.contains('-') {
        return tag.to_lowercase().contains(&branch_type.to_lowercase());
    }
    !is_branch_tag(tag)
}

/// Strip every case-insensitive `<branch_type>-` occurrence from a dashed tag.
pub fn format_tag(tag: &str, branch_type: Option<&str>) -> String {
    let Some(branch_type) = branch_type else {
        return tag.to_string();
    };
    if !tag.contains('-') {
        return tag.to_string();
    }

    let prefix = regex::escape(&format!("{}-", branch_type));
    match RegexBuilder::new(&prefix).case_insensitive(true).build() {
        Ok(re) => re.replace_all(tag, "").into_owned(),
        Err(_) => tag.to_string(),
    }
}

/// Visible tags, formatted and deduplicated, in first-seen order.
pub fn format_tags<S: AsRef<str>>(tags: &[S], branch_type: Option<&str>) -> Vec<String> {
    let mut output: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().map(AsRef::as_ref) {
        if !tag_visible_for_branch(tag, branch_type) {
            continue;
        }
        let formatted = format_tag(tag, branch_type);
        if !output.contains(&formatted) {
            output.push(formatted);
        }
    }
    output
}

/// Visible tags, formatted, deduplicated and sorted.
pub fn filter_and_format<S: AsRef<str>>(tags: &[S], branch_type: Option<&str>) -> Vec<String> {
    let mut output = format_tags(tags, branch_type);
    output.sort();
    output
}

/// The compound form of a builder's tags, only when it has more than one.
pub fn compound_tag<S: AsRef<str>>(tags: &[S]) -> Option<String> {
    if tags.len() < 2 {
        return None;
    }
    Some(
        tags.iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(TAG_SEPARATOR),
    )
}

/// Whether a builder is flagged unstable or work-in-progress.
///
/// `Unstable` and `WIP` always count. A branch-scoped `<branch>-Unstable` tag
/// counts when it is scoped to the active branch type, or to any branch when
/// there is no branch type.
pub fn has_unstable_tag<S: AsRef<str>>(tags: &[S], branch_type: Option<&str>) -> bool {
    let branch_type = branch_type.map(str::to_lowercase);
    tags.iter().map(AsRef::as_ref).any(|tag| {
        if tag == UNSTABLE_TAG || tag == WIP_TAG {
            return true;
        }
        let lower = tag.to_lowercase();
        match lower.strip_suffix(BRANCH_SCOPED_UNSTABLE_SUFFIX) {
            Some(scope) if !scope.is_empty() => {
                branch_type.as_deref().is_none_or(|branch| scope == branch)
            }
            _ => false,
        }
    })
}
