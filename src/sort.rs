//! Named comparators for table columns.
//!
//! Every sort type is registered as an `<name>-asc` / `<name>-desc` pair, the
//! way column configuration addresses them. Comparators never fail: values of
//! an unexpected shape still get a position, just a less meaningful one.
//!
//! | Sort type             | Ordering                                                  |
//! |-----------------------|-----------------------------------------------------------|
//! | `natural`             | HTML stripped, digit runs by value (`"2" < "10"`)         |
//! | `builder-status`      | fixed result priority; `desc` walks the list reversed     |
//! | `number-ignore-zero`  | numeric, `0` always last                                  |
//! | `string-ignore-empty` | text, `""` always last                                    |
//! | `numbers-with-na`     | natural, `"N/A"` always last                              |
//! | `numeric`             | numeric, non-numbers first                                |
//! | `string`              | case-insensitive text                                     |

use crate::errors::SortError;
use crate::model::BuildResult;
use regex::Regex;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static HTML_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<[a-z].*>").unwrap());

static HTML_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static HTML_ENTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());

/// Results in the order failing builders should surface.
pub const STATUS_PRIORITY: [BuildResult; 8] = [
    BuildResult::Failure,
    BuildResult::DependencyFailure,
    BuildResult::Success,
    BuildResult::NotRebuilt,
    BuildResult::Canceled,
    BuildResult::Retry,
    BuildResult::Skipped,
    BuildResult::Exception,
];

/// Text rendered in a length cell with no finished build.
pub const NOT_AVAILABLE: &str = "N/A";

/// A cell value as seen by the comparators.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Null,
    Number(f64),
    Text(String),
    /// A build; `None` while it has no result yet.
    Status(Option<BuildResult>),
}

impl SortValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SortValue::Number(n) => Some(*n),
            SortValue::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            SortValue::Null => Cow::Borrowed(""),
            SortValue::Number(n) => Cow::Owned(n.to_string()),
            SortValue::Text(text) => Cow::Borrowed(text),
            SortValue::Status(result) => {
                Cow::Borrowed(result.map(BuildResult::css_class).unwrap_or(""))
            }
        }
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        SortValue::Text(value.to_string())
    }
}

impl From<String> for SortValue {
    fn from(value: String) -> Self {
        SortValue::Text(value)
    }
}

impl From<f64> for SortValue {
    fn from(value: f64) -> Self {
        SortValue::Number(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn is_reversed(self) -> bool {
        self == SortDirection::Desc
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(SortError::InvalidDirection(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortType {
    Natural,
    BuilderStatus,
    NumberIgnoreZero,
    StringIgnoreEmpty,
    NumbersWithNa,
    Numeric,
    String,
}

impl SortType {
    pub const ALL: [SortType; 7] = [
        SortType::Natural,
        SortType::BuilderStatus,
        SortType::NumberIgnoreZero,
        SortType::StringIgnoreEmpty,
        SortType::NumbersWithNa,
        SortType::Numeric,
        SortType::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SortType::Natural => "natural",
            SortType::BuilderStatus => "builder-status",
            SortType::NumberIgnoreZero => "number-ignore-zero",
            SortType::StringIgnoreEmpty => "string-ignore-empty",
            SortType::NumbersWithNa => "numbers-with-na",
            SortType::Numeric => "numeric",
            SortType::String => "string",
        }
    }

    pub fn compare(self, a: &SortValue, b: &SortValue, direction: SortDirection) -> Ordering {
        let reverse = direction.is_reversed();
        match self {
            SortType::Natural => natural_value_cmp(a, b, reverse),
            SortType::BuilderStatus => builder_status_cmp(a, b, reverse),
            SortType::NumberIgnoreZero => ignore_value_cmp(
                &a.as_number().unwrap_or(0.0),
                &b.as_number().unwrap_or(0.0),
                &0.0,
                reverse,
            ),
            SortType::StringIgnoreEmpty => {
                ignore_value_cmp(&a.as_text(), &b.as_text(), &Cow::Borrowed(""), reverse)
            }
            SortType::NumbersWithNa => absolute_order_cmp(a, b, NOT_AVAILABLE, reverse),
            SortType::Numeric => {
                let key = |v: &SortValue| v.as_number().unwrap_or(f64::NEG_INFINITY);
                directed(key(a).total_cmp(&key(b)), reverse)
            }
            SortType::String => directed(
                a.as_text().to_lowercase().cmp(&b.as_text().to_lowercase()),
                reverse,
            ),
        }
    }
}

impl std::fmt::Display for SortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for SortType {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SortType::ALL
            .into_iter()
            .find(|sort_type| sort_type.name() == wanted)
            .ok_or_else(|| SortError::UnknownSortType(s.to_string()))
    }
}

fn directed(ordering: Ordering, reverse: bool) -> Ordering {
    if reverse { ordering.reverse() } else { ordering }
}

/// Sort key for natural ordering: markup reduced to its text, whitespace
/// trimmed.
pub fn natural_pre(value: &str) -> String {
    if HTML_REGEX.is_match(value) {
        let text = HTML_TAG_REGEX.replace_all(value, "");
        decode_entities(&text).trim().to_string()
    } else {
        value.trim().to_string()
    }
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(decimal) = entity.strip_prefix('#') {
        return decimal.parse().ok().and_then(char::from_u32);
    }
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

/// Decode character references; unknown names are left untouched.
fn decode_entities(text: &str) -> Cow<'_, str> {
    HTML_ENTITY_REGEX.replace_all(text, |caps: &regex::Captures<'_>| {
        match decode_entity(&caps[1]) {
            Some(ch) => ch.to_string(),
            None => caps[0].to_string(),
        }
    })
}

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(value: &str) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (i, ch) in value.char_indices() {
        let is_digit = ch.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                chunks.push(make_chunk(&value[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if let Some(prev) = in_digits {
        chunks.push(make_chunk(&value[start..], prev));
    }
    chunks
}

fn make_chunk(text: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Digits(text)
    } else {
        Chunk::Text(text)
    }
}

fn digits_cmp(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
}

/// Natural string order: runs of digits compare by value, everything else
/// case-insensitively, with a case-sensitive tiebreak.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_chunks = chunks(a);
    let b_chunks = chunks(b);

    for (x, y) in a_chunks.iter().zip(&b_chunks) {
        let ordering = match (x, y) {
            (Chunk::Digits(x), Chunk::Digits(y)) => digits_cmp(x, y),
            (Chunk::Digits(x) | Chunk::Text(x), Chunk::Digits(y) | Chunk::Text(y)) => {
                x.to_lowercase().cmp(&y.to_lowercase())
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    a_chunks
        .len()
        .cmp(&b_chunks.len())
        .then_with(|| a.cmp(b))
}

fn natural_value_cmp(a: &SortValue, b: &SortValue, reverse: bool) -> Ordering {
    let ordering = match (a, b) {
        (SortValue::Number(x), SortValue::Number(y)) => x.total_cmp(y),
        _ => natural_cmp(&natural_pre(&a.as_text()), &natural_pre(&b.as_text())),
    };
    directed(ordering, reverse)
}

fn status_of(value: &SortValue) -> Option<Option<BuildResult>> {
    match value {
        SortValue::Null => None,
        SortValue::Status(result) => Some(*result),
        _ => Some(None),
    }
}

/// Order builds by [`STATUS_PRIORITY`].
///
/// `reverse` walks the priority list backwards instead of negating the
/// result; results missing from the list sort the first argument first.
/// Rows without a build always go last.
pub fn builder_status_cmp(a: &SortValue, b: &SortValue, reverse: bool) -> Ordering {
    match (status_of(a), status_of(b)) {
        (Some(a_result), Some(b_result)) => {
            if a_result == b_result {
                return Ordering::Equal;
            }
            let mut order = STATUS_PRIORITY.to_vec();
            if reverse {
                order.reverse();
            }
            for item in order {
                if a_result == Some(item) {
                    return Ordering::Less;
                }
                if b_result == Some(item) {
                    return Ordering::Greater;
                }
            }
            Ordering::Less
        }
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
    }
}

/// Order values while pinning `ignore` to the bottom in both directions.
pub fn ignore_value_cmp<T: PartialOrd + ?Sized>(a: &T, b: &T, ignore: &T, reverse: bool) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    if a == ignore {
        return Ordering::Greater;
    }
    if b == ignore {
        return Ordering::Less;
    }
    let ordering = if a > b {
        Ordering::Greater
    } else {
        Ordering::Less
    };
    directed(ordering, reverse)
}

/// Natural order with `bottom` text pinned below every other value.
pub fn absolute_order_cmp(a: &SortValue, b: &SortValue, bottom: &str, reverse: bool) -> Ordering {
    let is_bottom = |value: &SortValue| value.as_text().trim() == bottom;
    match (is_bottom(a), is_bottom(b)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => natural_value_cmp(a, b, reverse),
    }
}

/// Stable in-place sort that tolerates comparators which are not total
/// orders. `slice::sort_by` may panic on those.
pub fn stable_sort_by<T, F>(values: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    for i in 1..values.len() {
        let mut j = i;
        while j > 0 && compare(&values[j - 1], &values[j]) == Ordering::Greater {
            values.swap(j - 1, j);
            j -= 1;
        }
    }
}

pub type Comparator = Box<dyn Fn(&SortValue, &SortValue) -> Ordering + Send + Sync>;

/// Comparators addressed by `<sort-type>-<direction>`.
pub struct SortRegistry {
    comparators: BTreeMap<String, Comparator>,
}

impl Default for SortRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SortRegistry {
    pub fn empty() -> Self {
        Self {
            comparators: BTreeMap::new(),
        }
    }

    /// Registry holding every [`SortType`] in both directions.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for sort_type in SortType::ALL {
            registry.register(
                sort_type.name(),
                move |a, b| sort_type.compare(a, b, SortDirection::Asc),
                move |a, b| sort_type.compare(a, b, SortDirection::Desc),
            );
        }
        registry
    }

    pub fn register<A, D>(&mut self, name: &str, asc: A, desc: D)
    where
        A: Fn(&SortValue, &SortValue) -> Ordering + Send + Sync + 'static,
        D: Fn(&SortValue, &SortValue) -> Ordering + Send + Sync + 'static,
    {
        self.comparators
            .insert(format!("{}-{}", name, SortDirection::Asc), Box::new(asc));
        self.comparators
            .insert(format!("{}-{}", name, SortDirection::Desc), Box::new(desc));
    }

    pub fn get(&self, name: &str) -> Option<&Comparator> {
        self.comparators.get(name)
    }

    pub fn get_for(
        &self,
        sort_type: &str,
        direction: SortDirection,
    ) -> Result<&Comparator, SortError> {
        self.get(&format!("{}-{}", sort_type, direction))
            .ok_or_else(|| SortError::UnknownSortType(sort_type.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.comparators.keys().map(String::as_str)
    }

    /// Stable sort of `values` with the named comparator.
    pub fn sort(
        &self,
        values: &mut [SortValue],
        sort_type: &str,
        direction: SortDirection,
    ) -> Result<(), SortError> {
        let comparator = self.get_for(sort_type, direction)?;
        stable_sort_by(values, |a, b| comparator(a, b));
        Ok(())
    }
}

impl std::fmt::Debug for SortRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortRegistry")
            .field("comparators", &self.comparators.keys().collect::<Vec<_>>())
            .finish()
    }
}
