//! Filter state ↔ page URL query.
//!
//! | Parameter       | Field            | Notes                                        |
//! |-----------------|------------------|----------------------------------------------|
//! | `search`        | `search`         | omitted when empty                           |
//! | `tag`           | `selected_tags`  | repeated once per tag, omitted when none     |
//! | `hide_unstable` | `hide_unstable`  | omitted only when every other field is empty |
//!
//! Other parameters (codebase branches, ...) belong to the page and are kept
//! untouched when the filter state is merged back into a URL.

use crate::filter::FilterState;
use url::form_urlencoded;

pub const SEARCH_PARAM: &str = "search";
pub const TAG_PARAM: &str = "tag";
pub const HIDE_UNSTABLE_PARAM: &str = "hide_unstable";

fn is_filter_param(key: &str) -> bool {
    key == SEARCH_PARAM || key == TAG_PARAM || key == HIDE_UNSTABLE_PARAM
}

fn append_filter_pairs(
    serializer: &mut form_urlencoded::Serializer<'_, String>,
    state: &FilterState,
) {
    if !state.search.is_empty() {
        serializer.append_pair(SEARCH_PARAM, &state.search);
    }
    for tag in &state.selected_tags {
        serializer.append_pair(TAG_PARAM, tag);
    }
    if !state.is_default() {
        serializer.append_pair(
            HIDE_UNSTABLE_PARAM,
            if state.hide_unstable { "true" } else { "false" },
        );
    }
}

/// Encode only the filter parameters.
pub fn serialize(state: &FilterState) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    append_filter_pairs(&mut serializer, state);
    serializer.finish()
}

/// Decode the filter parameters out of a page query. Unknown keys are
/// ignored; blank `tag` values are dropped.
pub fn deserialize(query: &str) -> FilterState {
    let query = query.trim_start_matches('?');
    let mut state = FilterState::new();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match &*key {
            SEARCH_PARAM => state.search = value.into_owned(),
            TAG_PARAM => {
                let tag = value.trim();
                if !tag.is_empty() {
                    state.selected_tags.insert(tag.to_string());
                }
            }
            HIDE_UNSTABLE_PARAM => state.hide_unstable = value == "true",
            _ => {}
        }
    }

    state
}

/// Replace the filter parameters of `existing`, keeping every other parameter
/// byte for byte in its original order.
pub fn merge_into_query(existing: &str, state: &FilterState) -> String {
    let existing = existing.trim_start_matches('?');
    let mut segments: Vec<&str> = existing
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| {
            form_urlencoded::parse(segment.as_bytes())
                .next()
                .is_none_or(|(key, _)| !is_filter_param(&key))
        })
        .collect();

    let filters = serialize(state);
    if !filters.is_empty() {
        segments.push(&filters);
    }
    segments.join("&")
}

/// Whether two queries carry the same decoded parameters in the same order.
pub fn same_query(a: &str, b: &str) -> bool {
    let a = form_urlencoded::parse(a.trim_start_matches('?').as_bytes());
    let b = form_urlencoded::parse(b.trim_start_matches('?').as_bytes());
    a.eq(b)
}
