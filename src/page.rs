//! The builders page: snapshot → catalog → filter → sort.
//!
//! `BuildersPage` owns everything the page derives from its URL and the
//! latest realtime snapshot. Filter edits apply at once and reach the URL
//! through the debounced writer; navigation reads the URL back eagerly.

use crate::branch::{BranchClassifier, CodebaseBranches};
use crate::catalog::{SelectOptions, TagCatalog};
use crate::config::BuildersConfig;
use crate::errors::SortError;
use crate::filter::{BuilderFilter, FilterState, parse_selected_tags};
use crate::history::{DebouncedUrlWriter, HistorySink};
use crate::model::{Builder, BuilderSnapshot};
use crate::query;
use crate::sort::{
    NOT_AVAILABLE, SortDirection, SortRegistry, SortType, SortValue, stable_sort_by,
};
use crate::tags::filter_and_format;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Extracts a column's sort value from a row under the page's branch type.
pub type CellValue = fn(&Builder, Option<&str>) -> SortValue;

/// One column of the builders table.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    /// `None` for columns that cannot be sorted.
    pub sort_type: Option<SortType>,
    /// Directions a header click cycles through, first one on first click.
    pub sorting: &'static [SortDirection],
    pub value: CellValue,
}

impl Column {
    pub fn default_direction(&self) -> SortDirection {
        self.sorting.first().copied().unwrap_or_default()
    }
}

const ASC_DESC: &[SortDirection] = &[SortDirection::Asc, SortDirection::Desc];
const DESC_ASC: &[SortDirection] = &[SortDirection::Desc, SortDirection::Asc];

fn tags_value(builder: &Builder, branch_type: Option<&str>) -> SortValue {
    SortValue::Text(filter_and_format(&builder.tags, branch_type).join(", "))
}

fn name_value(builder: &Builder, _: Option<&str>) -> SortValue {
    SortValue::Text(builder.name.clone())
}

fn progress_value(builder: &Builder, _: Option<&str>) -> SortValue {
    SortValue::Number(builder.current_builds.len() as f64)
}

fn last_run_value(builder: &Builder, _: Option<&str>) -> SortValue {
    SortValue::Number(
        builder
            .latest_build
            .as_ref()
            .and_then(|build| build.finished_at())
            .unwrap_or(0.0),
    )
}

fn status_value(builder: &Builder, _: Option<&str>) -> SortValue {
    builder
        .latest_build
        .as_ref()
        .map(|build| SortValue::Status(build.results))
        .unwrap_or(SortValue::Null)
}

fn length_value(builder: &Builder, _: Option<&str>) -> SortValue {
    builder
        .latest_build
        .as_ref()
        .and_then(|build| build.duration())
        .map(SortValue::Number)
        .unwrap_or_else(|| SortValue::from(NOT_AVAILABLE))
}

fn no_value(_: &Builder, _: Option<&str>) -> SortValue {
    SortValue::Null
}

/// The builders table layout, left to right.
pub fn builders_columns() -> [Column; 9] {
    [
        Column {
            name: "tags",
            sort_type: Some(SortType::StringIgnoreEmpty),
            sorting: ASC_DESC,
            value: tags_value,
        },
        Column {
            name: "name",
            sort_type: Some(SortType::Natural),
            sorting: ASC_DESC,
            value: name_value,
        },
        Column {
            name: "progress",
            sort_type: Some(SortType::Numeric),
            sorting: ASC_DESC,
            value: progress_value,
        },
        Column {
            name: "last_run",
            sort_type: Some(SortType::NumberIgnoreZero),
            sorting: DESC_ASC,
            value: last_run_value,
        },
        Column {
            name: "status",
            sort_type: Some(SortType::BuilderStatus),
            sorting: ASC_DESC,
            value: status_value,
        },
        Column {
            name: "shortcuts",
            sort_type: None,
            sorting: &[],
            value: no_value,
        },
        Column {
            name: "revision",
            sort_type: None,
            sorting: &[],
            value: no_value,
        },
        Column {
            name: "length",
            sort_type: Some(SortType::NumbersWithNa),
            sorting: ASC_DESC,
            value: length_value,
        },
        Column {
            name: "custom_build",
            sort_type: None,
            sorting: &[],
            value: no_value,
        },
    ]
}

pub fn find_column(name: &str) -> Option<Column> {
    builders_columns()
        .into_iter()
        .find(|column| column.name == name)
}

/// One key of a multi-column sort, written `column` or `column:direction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSort {
    pub column: String,
    /// `None` uses the column's first sorting direction.
    pub direction: Option<SortDirection>,
}

impl ColumnSort {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction: Some(direction),
        }
    }
}

impl std::str::FromStr for ColumnSort {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, direction) = match s.split_once(':') {
            Some((column, direction)) => (column, Some(direction.parse()?)),
            None => (s, None),
        };
        Ok(Self {
            column: column.trim().to_string(),
            direction,
        })
    }
}

/// Stable multi-key sort of builder rows.
///
/// Comparators are resolved before any comparison so a bad key fails the
/// whole sort instead of half of it.
pub fn sort_rows<'a>(
    rows: Vec<&'a Builder>,
    sorting: &[ColumnSort],
    branch_type: Option<&str>,
    registry: &SortRegistry,
) -> Result<Vec<&'a Builder>, SortError> {
    let keys = sorting
        .iter()
        .map(|key| {
            let column = find_column(&key.column)
                .ok_or_else(|| SortError::UnknownColumn(key.column.clone()))?;
            let sort_type = column
                .sort_type
                .ok_or_else(|| SortError::NotSortable(key.column.clone()))?;
            let direction = key.direction.unwrap_or_else(|| column.default_direction());
            let compare = registry.get_for(sort_type.name(), direction)?;
            Ok::<_, SortError>((column.value, compare))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut keyed: Vec<(Vec<SortValue>, &Builder)> = rows
        .into_iter()
        .map(|row| {
            let values = keys.iter().map(|(value, _)| value(row, branch_type)).collect();
            (values, row)
        })
        .collect();

    stable_sort_by(&mut keyed, |(a, _), (b, _)| {
        keys.iter()
            .zip(a.iter().zip(b))
            .map(|((_, compare), (x, y))| compare(x, y))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// Page state for the builders table.
pub struct BuildersPage<S: HistorySink> {
    classifier: BranchClassifier,
    branches: CodebaseBranches,
    catalog: TagCatalog,
    state: FilterState,
    builders: Vec<Builder>,
    branch_type: Option<String>,
    latest_revisions: BTreeMap<String, Value>,
    comparison_url: String,
    default_sort: ColumnSort,
    registry: SortRegistry,
    writer: DebouncedUrlWriter<S>,
}

impl<S: HistorySink> BuildersPage<S> {
    /// Open the page at the sink's current location.
    pub fn new(sink: Arc<S>, config: &BuildersConfig) -> Self {
        let query = sink.current_query();
        let branches = CodebaseBranches::from_query(&query);
        let mut state = query::deserialize(&query);
        if state.is_default() && config.hide_unstable() {
            state.hide_unstable = true;
        }
        let (column, direction) = config.default_sort();

        debug!(%query, codebases = branches.len(), "opening builders page");
        Self {
            classifier: BranchClassifier::new(config.main_codebase()),
            branches,
            catalog: TagCatalog::new(),
            state,
            builders: Vec::new(),
            branch_type: None,
            latest_revisions: BTreeMap::new(),
            comparison_url: String::new(),
            default_sort: ColumnSort::new(column, direction),
            registry: SortRegistry::with_defaults(),
            writer: DebouncedUrlWriter::new(sink, config.url_debounce()),
        }
    }

    /// Replace the rows with a fresh snapshot and re-derive tags and branch.
    pub fn on_snapshot(&mut self, snapshot: BuilderSnapshot) {
        self.builders = snapshot.builders;
        self.latest_revisions = snapshot.latest_revisions;
        self.comparison_url = snapshot.comparison_url;
        self.branch_type = self
            .catalog
            .rebuild(&self.builders, &self.classifier, &self.branches);
    }

    pub fn branch_type(&self) -> Option<&str> {
        self.branch_type.as_deref()
    }

    pub fn branches(&self) -> &CodebaseBranches {
        &self.branches
    }

    pub fn catalog(&self) -> &TagCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn builders(&self) -> &[Builder] {
        &self.builders
    }

    pub fn latest_revisions(&self) -> &BTreeMap<String, Value> {
        &self.latest_revisions
    }

    pub fn comparison_url(&self) -> &str {
        &self.comparison_url
    }

    pub fn registry(&self) -> &SortRegistry {
        &self.registry
    }

    /// Rows passing the current filter, in snapshot order.
    pub fn visible_builders(&self) -> Vec<&Builder> {
        BuilderFilter::new(&self.state, self.branch_type()).apply(&self.builders)
    }

    /// Visible rows sorted by `sorting`, or by the default sort when empty.
    pub fn rows(&self, sorting: &[ColumnSort]) -> Result<Vec<&Builder>, SortError> {
        let sorting = if sorting.is_empty() {
            std::slice::from_ref(&self.default_sort)
        } else {
            sorting
        };
        sort_rows(
            self.visible_builders(),
            sorting,
            self.branch_type(),
            &self.registry,
        )
    }

    /// Apply the tag widget's comma-joined selection.
    ///
    /// The URL write is scheduled on the tokio runtime.
    pub fn set_selected_tags(&mut self, value: &str) {
        self.state.selected_tags = parse_selected_tags(value);
        self.schedule_url_write();
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.state.search = search.into();
        self.schedule_url_write();
    }

    /// Flip hide-unstable and return the new value.
    pub fn toggle_hide_unstable(&mut self) -> bool {
        self.state.hide_unstable = !self.state.hide_unstable;
        self.schedule_url_write();
        self.state.hide_unstable
    }

    fn schedule_url_write(&mut self) {
        self.writer.schedule(self.state.clone());
    }

    /// Load state from a location the user navigated to.
    ///
    /// Drops any pending URL write. The catalog is rebuilt only when the
    /// codebase branches changed.
    pub fn on_navigate(&mut self, query: &str) {
        self.writer.cancel();
        self.state = query::deserialize(query);

        let branches = CodebaseBranches::from_query(query);
        if branches != self.branches {
            debug!(codebases = branches.len(), "codebase branches changed");
            self.branches = branches;
            self.branch_type = self
                .catalog
                .rebuild(&self.builders, &self.classifier, &self.branches);
        }
    }

    pub fn tag_options(&self) -> SelectOptions {
        self.catalog.select_options()
    }

    pub fn url_write_pending(&self) -> bool {
        self.writer.is_pending()
    }

    /// Write any pending filter state to the URL now.
    pub fn flush_url(&mut self) -> bool {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildersToml;
    use crate::history::MemoryHistory;
    use crate::model::{Build, BuildResult};
    use std::time::Duration;

    fn build(result: Option<BuildResult>, times: [f64; 2]) -> Build {
        Build {
            number: Some(1),
            results: result,
            times: times.into_iter().map(Some).collect(),
        }
    }

    fn snapshot() -> BuilderSnapshot {
        BuilderSnapshot {
            builders: vec![
                Builder::new("Windows 10")
                    .with_tags(["ABV", "Trunk"])
                    .with_latest_build(build(Some(BuildResult::Success), [100.0, 400.0])),
                Builder::new("Linux 2")
                    .with_tags(["Nightly"])
                    .with_latest_build(build(Some(BuildResult::Failure), [50.0, 60.0])),
                Builder::new("Docs"),
                Builder::new("Linux 10")
                    .with_tags(["Trunk-Nightly", "WIP"])
                    .with_latest_build(build(Some(BuildResult::Exception), [10.0, 20.0])),
            ],
            latest_revisions: BTreeMap::new(),
            comparison_url: "/compare".to_string(),
        }
    }

    fn page(query: &str) -> (Arc<MemoryHistory>, BuildersPage<MemoryHistory>) {
        let history = Arc::new(MemoryHistory::new(query));
        let config = BuildersConfig::from_toml(BuildersToml::default());
        let mut page = BuildersPage::new(Arc::clone(&history), &config);
        page.on_snapshot(snapshot());
        (history, page)
    }

    fn names(rows: &[&Builder]) -> Vec<String> {
        rows.iter().map(|row| row.name.clone()).collect()
    }

    #[test]
    fn test_column_layout() {
        let columns = builders_columns();
        assert_eq!(columns[1].name, "name");
        assert_eq!(columns[3].default_direction(), SortDirection::Desc);
        assert!(find_column("revision").unwrap().sort_type.is_none());
        assert_eq!(
            find_column("length").unwrap().sort_type,
            Some(SortType::NumbersWithNa)
        );
    }

    #[test]
    fn test_column_sort_parse() {
        let key: ColumnSort = "status:desc".parse().unwrap();
        assert_eq!(key, ColumnSort::new("status", SortDirection::Desc));
        let key: ColumnSort = "last_run".parse().unwrap();
        assert_eq!(key.direction, None);
        assert!("name:up".parse::<ColumnSort>().is_err());
    }

    #[test]
    fn test_snapshot_classifies_from_url() {
        let (_, page) = page("unity_branch=trunk");
        assert_eq!(page.branch_type(), Some("trunk"));
        assert!(page.catalog().contains("Nightly"));
        assert!(!page.catalog().contains("Trunk-Nightly"));
        assert_eq!(page.comparison_url(), "/compare");
    }

    #[test]
    fn test_default_rows_sorted_by_name() {
        let (_, page) = page("");
        let rows = page.rows(&[]).unwrap();
        assert_eq!(
            names(&rows),
            vec!["Docs", "Linux 2", "Linux 10", "Windows 10"]
        );
    }

    #[test]
    fn test_rows_sort_by_status_and_length() {
        let (_, page) = page("");
        let rows = page
            .rows(&[ColumnSort::new("status", SortDirection::Asc)])
            .unwrap();
        assert_eq!(
            names(&rows),
            vec!["Linux 2", "Windows 10", "Linux 10", "Docs"]
        );

        let rows = page
            .rows(&[ColumnSort::new("length", SortDirection::Desc)])
            .unwrap();
        assert_eq!(names(&rows).last().map(String::as_str), Some("Docs"));
        assert_eq!(names(&rows)[0], "Windows 10");
    }

    #[test]
    fn test_rows_last_run_defaults_to_desc() {
        let (_, page) = page("");
        let rows = page.rows(&["last_run".parse().unwrap()]).unwrap();
        assert_eq!(
            names(&rows),
            vec!["Windows 10", "Linux 2", "Linux 10", "Docs"]
        );
    }

    #[test]
    fn test_rows_multi_key_is_stable() {
        let (_, page) = page("");
        let rows = page
            .rows(&[
                ColumnSort::new("progress", SortDirection::Asc),
                ColumnSort::new("name", SortDirection::Desc),
            ])
            .unwrap();
        assert_eq!(
            names(&rows),
            vec!["Windows 10", "Linux 10", "Linux 2", "Docs"]
        );
    }

    #[test]
    fn test_rows_rejects_bad_columns() {
        let (_, page) = page("");
        assert!(matches!(
            page.rows(&["revision".parse().unwrap()]),
            Err(SortError::NotSortable(_))
        ));
        assert!(matches!(
            page.rows(&["owner".parse().unwrap()]),
            Err(SortError::UnknownColumn(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_edits_reach_url_after_debounce() {
        let (history, mut page) = page("unity_branch=trunk");
        page.set_selected_tags("Nightly, ");
        assert_eq!(names(&page.visible_builders()), vec!["Linux 2", "Linux 10"]);
        assert!(page.toggle_hide_unstable());
        assert_eq!(names(&page.visible_builders()), vec!["Linux 2"]);
        assert!(page.url_write_pending());
        assert!(history.entries().is_empty());

        tokio::time::sleep(Duration::from_millis(1001)).await;
        tokio::task::yield_now().await;
        assert_eq!(
            history.entries(),
            vec!["unity_branch=trunk&tag=Nightly&hide_unstable=true"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_matches_name_case_insensitively() {
        let (history, mut page) = page("");
        page.set_search("LINUX");
        assert_eq!(names(&page.visible_builders()), vec!["Linux 2", "Linux 10"]);
        assert!(page.flush_url());
        assert_eq!(history.entries(), vec!["search=LINUX&hide_unstable=false"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_applies_eagerly_and_cancels_write() {
        let (history, mut page) = page("");
        assert_eq!(page.branch_type(), None);
        page.set_search("docs");

        page.on_navigate("unity_branch=trunk&tag=ABV");
        assert!(!page.url_write_pending());
        assert_eq!(page.branch_type(), Some("trunk"));
        assert!(page.state().search.is_empty());
        assert_eq!(names(&page.visible_builders()), vec!["Windows 10"]);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(history.entries().is_empty());
    }

    #[test]
    fn test_new_reads_state_from_location() {
        let (_, page) = page("?unity_branch=trunk&search=win&hide_unstable=true");
        assert_eq!(page.state().search, "win");
        assert!(page.state().hide_unstable);
        assert_eq!(page.branches().get("unity_branch"), Some("trunk"));
        assert_eq!(page.tag_options().results.len(), page.catalog().len());
    }
}
