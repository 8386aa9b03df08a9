use serde_json::Value;

use super::error::FilterError;
use super::filter_where::{FilterWhere, DOC_COLUMN};
use super::types::{FilterOrderInfo, SortDirection};

/// Sort parsing and SQL rendering. Accepted forms:
/// `"createdAt desc, name"`, `["createdAt desc", "name"]` and
/// `{"createdAt": "desc"}`. The direction defaults to ascending.
pub struct FilterOrder;

impl FilterOrder {
    pub fn parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::String(s) => Self::parse_list(s),
            Value::Array(items) => items.iter().try_fold(Vec::new(), |mut out, item| {
                let s = item
                    .as_str()
                    .ok_or_else(|| FilterError::InvalidSort("sort entries must be strings".to_string()))?;
                out.extend(Self::parse_list(s)?);
                Ok(out)
            }),
            Value::Object(fields) => fields
                .iter()
                .map(|(field, dir)| {
                    let dir = dir
                        .as_str()
                        .ok_or_else(|| FilterError::InvalidSort(format!("direction for {} must be a string", field)))?;
                    Self::entry(field, Some(dir))
                })
                .collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(FilterError::InvalidSort(format!("unsupported sort value {}", other))),
        }
    }

    /// Comma separated `field [asc|desc]` entries
    pub fn parse_list(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut words = part.split_whitespace();
                let field = words.next().unwrap_or_default();
                let dir = words.next();
                if words.next().is_some() {
                    return Err(FilterError::InvalidSort(format!("unexpected text in '{}'", part)));
                }
                Self::entry(field, dir)
            })
            .collect()
    }

    fn entry(field: &str, dir: Option<&str>) -> Result<FilterOrderInfo, FilterError> {
        FilterWhere::validate_field_name(field)?;
        let sort = match dir {
            Some(dir) => dir.parse::<SortDirection>().map_err(FilterError::InvalidSort)?,
            None => SortDirection::Asc,
        };
        Ok(FilterOrderInfo { field: field.to_string(), sort })
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let columns = infos
            .iter()
            .map(|info| format!("(\"{}\"->'{}') {}", DOC_COLUMN, info.field, info.sort.to_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("ORDER BY {}", columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_string_array_and_object_forms() {
        let parsed = FilterOrder::parse(&json!("createdAt desc, name")).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].sort, SortDirection::Desc);
        assert_eq!(parsed[1].field, "name");
        assert_eq!(parsed[1].sort, SortDirection::Asc);

        let parsed = FilterOrder::parse(&json!(["name ASC", "createdAt desc"])).unwrap();
        assert_eq!(parsed[1].field, "createdAt");

        let parsed = FilterOrder::parse(&json!({ "name": "DESC" })).unwrap();
        assert_eq!(parsed[0].sort, SortDirection::Desc);
    }

    #[test]
    fn rejects_bad_fields_and_directions() {
        assert!(FilterOrder::parse(&json!("name; drop")).is_err());
        assert!(FilterOrder::parse(&json!("name sideways")).is_err());
        assert!(FilterOrder::parse(&json!("name asc extra")).is_err());
        assert!(FilterOrder::parse(&json!(42)).is_err());
    }

    #[test]
    fn generates_order_by_on_document_fields() {
        let parsed = FilterOrder::parse(&json!("createdAt desc")).unwrap();
        assert_eq!(FilterOrder::generate(&parsed), "ORDER BY (\"doc\"->'createdAt') DESC");
        assert_eq!(FilterOrder::generate(&[]), "");
    }
}
