//! The set of selectable tags for the current builder snapshot.
//!
//! Rebuilt from scratch on every snapshot so tags of removed builders do not
//! linger. The same pass records which raw tags are branch names; branch
//! classification consults that set, so a rebuild first collects branch tags,
//! then classifies, then normalizes tags against the resulting branch type.

use crate::branch::{BranchClassifier, CodebaseBranches, is_branch_tag};
use crate::model::Builder;
use crate::tags::{NO_TAG, compound_tag, format_tags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// One entry of the tag selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub text: String,
}

/// Payload consumed by the multi-select tag widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOptions {
    pub results: Vec<SelectOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCatalog {
    tags: BTreeSet<String>,
    branch_tags: BTreeSet<String>,
}

impl Default for TagCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TagCatalog {
    /// An empty catalog holding only the `No Tag` sentinel.
    pub fn new() -> Self {
        Self {
            tags: BTreeSet::from([NO_TAG.to_string()]),
            branch_tags: BTreeSet::new(),
        }
    }

    /// Rebuild from a snapshot and return the branch type it was built for.
    pub fn rebuild(
        &mut self,
        builders: &[Builder],
        classifier: &BranchClassifier,
        branches: &CodebaseBranches,
    ) -> Option<String> {
        self.tags.clear();
        self.branch_tags.clear();

        for builder in builders {
            self.collect_branch_tags(builder);
        }

        let branch_type = classifier.classify(branches, &self.branch_tags);
        for builder in builders {
            self.add_builder_tags(builder, branch_type.as_deref());
        }
        self.tags.insert(NO_TAG.to_string());

        debug!(
            builders = builders.len(),
            tags = self.tags.len(),
            branch_tags = self.branch_tags.len(),
            ?branch_type,
            "rebuilt tag catalog"
        );
        branch_type
    }

    /// Rebuild against an already known branch type, leaving classification
    /// to the caller.
    pub fn rebuild_for_branch(&mut self, builders: &[Builder], branch_type: Option<&str>) {
        self.tags.clear();
        self.branch_tags.clear();
        for builder in builders {
            self.collect_branch_tags(builder);
            self.add_builder_tags(builder, branch_type);
        }
        self.tags.insert(NO_TAG.to_string());
    }

    fn collect_branch_tags(&mut self, builder: &Builder) {
        for tag in builder.tags.iter().filter(|tag| is_branch_tag(tag)) {
            self.branch_tags.insert(tag.to_lowercase());
        }
    }

    fn add_builder_tags(&mut self, builder: &Builder, branch_type: Option<&str>) {
        let formatted = format_tags(&builder.tags, branch_type);
        if let Some(compound) = compound_tag(&formatted) {
            self.tags.insert(compound);
        }
        self.tags.extend(formatted);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// All tags in alphabetical order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Lowercased raw tags that name a branch.
    pub fn branch_tags(&self) -> &BTreeSet<String> {
        &self.branch_tags
    }

    pub fn select_options(&self) -> SelectOptions {
        SelectOptions {
            results: self
                .tags()
                .map(|tag| SelectOption {
                    id: tag.to_string(),
                    text: tag.to_string(),
                })
                .collect(),
        }
    }
}
