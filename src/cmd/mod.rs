//! CLI command implementations.
//!
//! | Module   | Commands handled            |
//! |----------|-----------------------------|
//! | `page`   | `Branch`, `Tags`, `Filter`  |
//! | `sort`   | `Sort`                      |
//! | `config` | `Config`                    |

pub mod config;
pub mod page;
pub mod sort;

pub use config::cmd_config;
pub use page::{FilterEdits, cmd_branch, cmd_filter, cmd_tags};
pub use sort::cmd_sort;

use crate::{Cli, PageArgs};
use anyhow::Result;
use katana_builders::branch::parse_codebase_arg;
use katana_builders::config::BuildersConfig;
use std::path::Path;

pub(crate) fn load_config(cli: &Cli, project_dir: &Path) -> Result<BuildersConfig> {
    BuildersConfig::with_cli_args(
        project_dir.to_path_buf(),
        cli.verbose,
        cli.main_codebase.clone(),
    )
}

/// The page query with every `--codebase` pair set on it. Existing
/// parameters are kept verbatim.
pub(crate) fn page_query(page: &PageArgs) -> Result<String> {
    let mut segments: Vec<String> = page
        .query
        .trim_start_matches('?')
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    for arg in &page.codebases {
        let (codebase, branch) = parse_codebase_arg(arg)?;
        let pair = format!(
            "{}={}",
            urlencoding::encode(&codebase),
            urlencoding::encode(&branch)
        );
        let existing = segments.iter_mut().find(|segment| {
            let key = segment.split_once('=').map_or(segment.as_str(), |(key, _)| key);
            urlencoding::decode(key).is_ok_and(|key| key == codebase)
        });
        match existing {
            Some(segment) => *segment = pair,
            None => segments.push(pair),
        }
    }

    Ok(segments.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(query: &str, codebases: &[&str]) -> PageArgs {
        PageArgs {
            query: query.to_string(),
            codebases: codebases.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_page_query_appends_codebases() {
        let query = page_query(&args("tag=ABV", &["unity_branch=release%2F4.6%2Ffoo"])).unwrap();
        assert_eq!(query, "tag=ABV&unity_branch=release%2F4.6%2Ffoo");
    }

    #[test]
    fn test_page_query_replaces_codebase_in_place() {
        let query = page_query(&args(
            "?unity_branch=trunk&search=x",
            &["unity_branch=2017.1/staging"],
        ))
        .unwrap();
        assert_eq!(query, "unity_branch=2017.1%2Fstaging&search=x");
    }

    #[test]
    fn test_page_query_keeps_plus_and_spaces_apart() {
        let query = page_query(&args("unity_branch=a+b", &["other_branch=c%20d"])).unwrap();
        assert_eq!(query, "unity_branch=a+b&other_branch=c%20d");
    }

    #[test]
    fn test_page_query_rejects_malformed_codebase() {
        assert!(page_query(&args("", &["unity_branch"])).is_err());
    }
}
