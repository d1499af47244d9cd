//! Builder row visibility.
//!
//! The predicate is evaluated for every row on every redraw. It is a pure
//! function of the builder's raw tags, the current [`FilterState`] and the
//! page's branch type, applied in this order:
//!
//! 1. With unstable builders hidden, any unstable/WIP builder is dropped.
//! 2. With no tags selected, every builder passes, except that builders which
//!    lost tags to branch scoping only pass when tagged with the branch itself.
//! 3. With tags selected, untagged builders pass only for `No Tag`; tagged
//!    builders pass when a selected tag equals one of their visible tags or
//!    their compound tag (sorted or first-seen order). Selecting `No Tag` also selects the branch type and
//!    admits builders whose only tags are the branch name.

use crate::model::Builder;
use crate::tags::{NO_TAG, compound_tag, filter_and_format, format_tags, has_unstable_tag};
use std::collections::BTreeSet;

/// User-controlled filter settings, mirrored to the page URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Free-text search over builder names.
    pub search: String,
    pub selected_tags: BTreeSet<String>,
    pub hide_unstable: bool,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.selected_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_hide_unstable(mut self, hide_unstable: bool) -> Self {
        self.hide_unstable = hide_unstable;
        self
    }

    /// True when nothing narrows the table.
    pub fn is_default(&self) -> bool {
        self.search.is_empty() && self.selected_tags.is_empty() && !self.hide_unstable
    }
}

/// Parse the comma-joined selection handed back by the tag widget.
pub fn parse_selected_tags(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decide whether a builder row is shown.
pub fn is_visible(builder: &Builder, state: &FilterState, branch_type: Option<&str>) -> bool {
    tags_visible(&builder.tags, state, branch_type)
}

/// [`is_visible`] over a raw tag list.
pub fn tags_visible(tags: &[String], state: &FilterState, branch_type: Option<&str>) -> bool {
    if state.hide_unstable && has_unstable_tag(tags, branch_type) {
        return false;
    }

    let mut visible_tags = filter_and_format(tags, branch_type);
    // Without a branch type every tagged builder counts as carrying it.
    let has_branch_tag = || {
        tags.iter().any(|tag| match branch_type {
            None => true,
            Some(branch) => tag.to_lowercase() == branch.to_lowercase(),
        })
    };

    if state.selected_tags.is_empty() {
        let lost_tags = (!tags.is_empty() && visible_tags.is_empty())
            || tags.len() != visible_tags.len();
        return !lost_tags || has_branch_tag();
    }

    let no_tag_selected = state.selected_tags.contains(NO_TAG);
    if tags.is_empty() {
        return no_tag_selected;
    }

    // The catalog offers the compound in first-seen order; both forms match.
    let compounds = [
        compound_tag(&visible_tags),
        compound_tag(&format_tags(tags, branch_type)),
    ];
    visible_tags.extend(compounds.into_iter().flatten());

    let branch_as_selected = if no_tag_selected { branch_type } else { None };
    state
        .selected_tags
        .iter()
        .map(String::as_str)
        .chain(branch_as_selected)
        .any(|selected| {
            (selected == NO_TAG && visible_tags.is_empty() && has_branch_tag())
                || visible_tags.iter().any(|tag| tag == selected)
        })
}

/// Free-text search over the builder name, as the table's search box does.
pub fn matches_search(builder: &Builder, search: &str) -> bool {
    let search = search.trim();
    search.is_empty() || builder.name.to_lowercase().contains(&search.to_lowercase())
}

/// Hook the table component calls per row during a redraw.
pub trait RowFilter {
    fn include(&self, row_index: usize, row: &Builder) -> bool;
}

/// The builders page row filter: tag predicate plus name search.
#[derive(Debug, Clone, Copy)]
pub struct BuilderFilter<'a> {
    pub state: &'a FilterState,
    pub branch_type: Option<&'a str>,
}

impl<'a> BuilderFilter<'a> {
    pub fn new(state: &'a FilterState, branch_type: Option<&'a str>) -> Self {
        Self { state, branch_type }
    }

    pub fn apply<'b>(&self, builders: &'b [Builder]) -> Vec<&'b Builder> {
        builders
            .iter()
            .enumerate()
            .filter(|(index, builder)| self.include(*index, builder))
            .map(|(_, builder)| builder)
            .collect()
    }
}

impl RowFilter for BuilderFilter<'_> {
    fn include(&self, _row_index: usize, row: &Builder) -> bool {
        matches_search(row, &self.state.search) && is_visible(row, self.state, self.branch_type)
    }
}
