//! Builder snapshot types as pushed by the realtime feed.
//!
//! The feed is loosely typed: `tags` may arrive as a list, a single string,
//! `null`, or not at all. Everything is normalized here so the filtering code
//! only ever sees `Vec<String>`.

use crate::errors::SnapshotError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Result code of a finished build, as reported by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum BuildResult {
    Success,
    Warnings,
    Failure,
    Skipped,
    Exception,
    Retry,
    Canceled,
    NotRebuilt,
    DependencyFailure,
    Resume,
    Merged,
    Interrupted,
}

impl BuildResult {
    pub const ALL: [BuildResult; 12] = [
        BuildResult::Success,
        BuildResult::Warnings,
        BuildResult::Failure,
        BuildResult::Skipped,
        BuildResult::Exception,
        BuildResult::Retry,
        BuildResult::Canceled,
        BuildResult::NotRebuilt,
        BuildResult::DependencyFailure,
        BuildResult::Resume,
        BuildResult::Merged,
        BuildResult::Interrupted,
    ];

    /// CSS class name used by the dashboard for this result.
    pub fn css_class(self) -> &'static str {
        match self {
            BuildResult::Success => "success",
            BuildResult::Warnings => "warnings",
            BuildResult::Failure => "failure",
            BuildResult::Skipped => "skipped",
            BuildResult::Exception => "exception",
            BuildResult::Retry => "retry",
            BuildResult::Canceled => "canceled",
            BuildResult::NotRebuilt => "not-rebuilt",
            BuildResult::DependencyFailure => "dependency-failure",
            BuildResult::Resume => "waiting-for-dependency",
            BuildResult::Merged => "not-started",
            BuildResult::Interrupted => "interrupted",
        }
    }
}

impl TryFrom<i64> for BuildResult {
    type Error = SnapshotError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|index| BuildResult::ALL.get(index).copied())
            .ok_or(SnapshotError::UnknownResult(code))
    }
}

impl From<BuildResult> for i64 {
    fn from(result: BuildResult) -> Self {
        result as i64
    }
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.css_class())
    }
}

impl std::str::FromStr for BuildResult {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        BuildResult::ALL
            .iter()
            .copied()
            .find(|result| result.css_class() == wanted)
            .or(match wanted.as_str() {
                "resume" => Some(BuildResult::Resume),
                "merged" => Some(BuildResult::Merged),
                _ => None,
            })
            .ok_or_else(|| anyhow::anyhow!("Invalid build result '{}'", s))
    }
}

/// A single build as carried in a builder row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Build {
    #[serde(default)]
    pub number: Option<i64>,
    /// `None` while the build is still running.
    #[serde(default, deserialize_with = "deserialize_result")]
    pub results: Option<BuildResult>,
    /// `[start, end]` epoch seconds; `end` is null while running.
    #[serde(default)]
    pub times: Vec<Option<f64>>,
}

impl Build {
    pub fn started_at(&self) -> Option<f64> {
        self.times.first().copied().flatten()
    }

    pub fn finished_at(&self) -> Option<f64> {
        self.times.get(1).copied().flatten()
    }

    /// Wall-clock length in seconds, once the build has finished.
    pub fn duration(&self) -> Option<f64> {
        Some(self.finished_at()? - self.started_at()?)
    }
}

/// One row of the builders table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Builder {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub latest_build: Option<Build>,
    #[serde(default)]
    pub current_builds: Vec<Build>,
}

impl Builder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_latest_build(mut self, build: Build) -> Self {
        self.latest_build = Some(build);
        self
    }
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(tag)) => vec![tag],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(tag) => Some(tag),
                other => {
                    warn!(value = %other, "dropping non-string builder tag");
                    None
                }
            })
            .collect(),
        Some(other) => {
            warn!(value = %other, "ignoring malformed builder tags");
            Vec::new()
        }
    })
}

/// Result code the master reports for a build that has not finished.
const RESULT_PENDING: i64 = -1;

/// Unknown result codes degrade to "running" for that build only.
fn deserialize_result<'de, D>(deserializer: D) -> Result<Option<BuildResult>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::Number(number)) => match number.as_i64() {
            Some(RESULT_PENDING) => None,
            Some(code) => match BuildResult::try_from(code) {
                Ok(result) => Some(result),
                Err(err) => {
                    warn!(code, error = %err, "treating build with unknown result as running");
                    None
                }
            },
            None => {
                warn!(value = %number, "ignoring non-integer build result");
                None
            }
        },
        Some(other) => {
            warn!(value = %other, "ignoring malformed build result");
            None
        }
    })
}

/// A full builders push from the realtime layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderSnapshot {
    #[serde(default)]
    pub builders: Vec<Builder>,
    #[serde(default)]
    pub latest_revisions: BTreeMap<String, Value>,
    #[serde(default, rename = "comparisonURL")]
    pub comparison_url: String,
}

impl BuilderSnapshot {
    pub fn from_json(content: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }
}
