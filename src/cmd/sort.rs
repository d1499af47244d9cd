//! Comparator playground: `katana-builders sort`.

use anyhow::Result;
use katana_builders::model::BuildResult;
use katana_builders::sort::{SortDirection, SortRegistry, SortType, SortValue};

fn parse_value(sort_type: SortType, raw: &str) -> Result<SortValue> {
    if sort_type != SortType::BuilderStatus {
        return Ok(SortValue::from(raw));
    }
    match raw.trim().to_lowercase().as_str() {
        "" | "none" | "null" => Ok(SortValue::Null),
        "running" => Ok(SortValue::Status(None)),
        _ => Ok(SortValue::Status(Some(raw.parse::<BuildResult>()?))),
    }
}

fn display_value(value: &SortValue) -> String {
    match value {
        SortValue::Null => "none".to_string(),
        SortValue::Status(None) => "running".to_string(),
        other => other.as_text().into_owned(),
    }
}

pub fn cmd_sort(sort_type: &str, desc: bool, values: &[String]) -> Result<()> {
    let sort_type: SortType = sort_type.parse()?;
    let direction = if desc {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    };

    let mut values = values
        .iter()
        .map(|raw| parse_value(sort_type, raw))
        .collect::<Result<Vec<_>>>()?;
    SortRegistry::with_defaults().sort(&mut values, sort_type.name(), direction)?;

    for value in &values {
        println!("{}", display_value(value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_values() {
        assert_eq!(
            parse_value(SortType::BuilderStatus, "failure").unwrap(),
            SortValue::Status(Some(BuildResult::Failure))
        );
        assert_eq!(
            parse_value(SortType::BuilderStatus, "running").unwrap(),
            SortValue::Status(None)
        );
        assert_eq!(
            parse_value(SortType::BuilderStatus, "none").unwrap(),
            SortValue::Null
        );
        assert!(parse_value(SortType::BuilderStatus, "purple").is_err());
    }

    #[test]
    fn test_other_types_keep_text() {
        assert_eq!(
            parse_value(SortType::Natural, "Linux 10").unwrap(),
            SortValue::Text("Linux 10".to_string())
        );
        assert_eq!(display_value(&SortValue::Null), "none");
    }
}
