//! Snapshot commands: `katana-builders branch|tags|filter`.

use super::{load_config, page_query};
use crate::{Cli, PageArgs};
use anyhow::{Context, Result};
use katana_builders::branch::{BranchClassifier, CodebaseBranches, match_branch_pattern};
use katana_builders::catalog::TagCatalog;
use katana_builders::config::BuildersConfig;
use katana_builders::history::{HistorySink, MemoryHistory};
use katana_builders::model::{Builder, BuilderSnapshot};
use katana_builders::page::{BuildersPage, ColumnSort};
use katana_builders::tags::filter_and_format;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Filter changes applied on top of the page query.
#[derive(Debug, Clone, Default)]
pub struct FilterEdits {
    pub tags: Option<String>,
    pub search: Option<String>,
    pub toggle_hide_unstable: bool,
}

#[derive(Serialize)]
struct RowView<'a> {
    name: &'a str,
    url: &'a str,
    tags: Vec<String>,
    status: Option<String>,
}

impl<'a> RowView<'a> {
    fn new(builder: &'a Builder, branch_type: Option<&str>) -> Self {
        Self {
            name: &builder.name,
            url: &builder.url,
            tags: filter_and_format(&builder.tags, branch_type),
            status: builder
                .latest_build
                .as_ref()
                .map(|build| match build.results {
                    Some(result) => result.to_string(),
                    None => "running".to_string(),
                }),
        }
    }
}

fn load_snapshot(path: &Path) -> Result<BuilderSnapshot> {
    BuilderSnapshot::load(path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))
}

fn open_page(
    config: &BuildersConfig,
    page: &PageArgs,
    snapshot: &Path,
) -> Result<(Arc<MemoryHistory>, BuildersPage<MemoryHistory>)> {
    let history = Arc::new(MemoryHistory::new(page_query(page)?));
    let mut builders_page = BuildersPage::new(Arc::clone(&history), config);
    builders_page.on_snapshot(load_snapshot(snapshot)?);
    Ok((history, builders_page))
}

pub fn cmd_branch(
    cli: &Cli,
    project_dir: &Path,
    page: &PageArgs,
    snapshot: Option<&Path>,
) -> Result<()> {
    let config = load_config(cli, project_dir)?;
    let branches = CodebaseBranches::from_query(&page_query(page)?);
    let classifier = BranchClassifier::new(config.main_codebase());

    let branch_type = match snapshot {
        Some(path) => {
            let snapshot = load_snapshot(path)?;
            TagCatalog::new().rebuild(&snapshot.builders, &classifier, &branches)
        }
        None => {
            // Without a snapshot the matched branch counts as known.
            let known: BTreeSet<String> = match_branch_pattern(&branches)
                .map(|branch| branch.to_lowercase())
                .into_iter()
                .collect();
            classifier.classify(&branches, &known)
        }
    };

    println!("{}", branch_type.as_deref().unwrap_or("none"));
    Ok(())
}

pub fn cmd_tags(
    cli: &Cli,
    project_dir: &Path,
    snapshot: &Path,
    page: &PageArgs,
    json: bool,
) -> Result<()> {
    let config = load_config(cli, project_dir)?;
    let (_, builders_page) = open_page(&config, page, snapshot)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&builders_page.tag_options())?
        );
    } else {
        for tag in builders_page.catalog().tags() {
            println!("{}", tag);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_filter(
    cli: &Cli,
    project_dir: &Path,
    snapshot: &Path,
    page: &PageArgs,
    edits: &FilterEdits,
    sort: &[String],
    json: bool,
    print_url: bool,
) -> Result<()> {
    let config = load_config(cli, project_dir)?;
    let sorting = sort
        .iter()
        .map(|key| key.parse::<ColumnSort>())
        .collect::<Result<Vec<_>, _>>()?;

    let (history, mut builders_page) = open_page(&config, page, snapshot)?;
    if let Some(tags) = &edits.tags {
        builders_page.set_selected_tags(tags);
    }
    if let Some(search) = &edits.search {
        builders_page.set_search(search.as_str());
    }
    if edits.toggle_hide_unstable {
        builders_page.toggle_hide_unstable();
    }

    let branch_type = builders_page.branch_type();
    let rows = builders_page.rows(&sorting)?;
    if json {
        let views: Vec<RowView<'_>> = rows
            .iter()
            .map(|builder| RowView::new(builder, branch_type))
            .collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
    } else {
        for builder in &rows {
            println!("{}", builder.name);
        }
    }

    builders_page.flush_url();
    if print_url {
        println!("?{}", history.current_query());
    }
    Ok(())
}
