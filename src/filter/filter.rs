use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{FilterWhere, DOC_COLUMN};
use super::types::{FilterOrderInfo, FilterWhereOptions, SqlParam, SqlResult, WhereNode};
use crate::types::RecordStatus;

/// Table holding every collection's documents
pub const DOCUMENTS_TABLE: &str = "documents";

/// A query against one collection: where document, ordering, paging and
/// the soft-delete option. Compiles to SQL for Postgres and to a parsed
/// condition tree for the in-memory matcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    where_data: Map<String, Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
    options: FilterWhereOptions,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the where document. Conditions are parsed eagerly so an
    /// invalid document is rejected here rather than at query time.
    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        let Value::Object(map) = conditions else {
            return Err(FilterError::InvalidWhereClause("where must be an object".to_string()));
        };
        FilterWhere::parse(&map)?;
        self.where_data = map;
        Ok(self)
    }

    /// Set a top-level equality condition, replacing any existing condition
    /// on the same field.
    pub fn where_eq(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.where_data.insert(field.to_string(), value.into());
        self
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::parse(&order_spec)?;
        Ok(self)
    }

    /// Set ordering only when the caller supplied none
    pub fn default_order(&mut self, order_spec: &str) -> Result<&mut Self, FilterError> {
        if self.order_data.is_empty() {
            self.order_data = FilterOrder::parse_list(order_spec)?;
        }
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }

        // Apply max page size from config
        let max_limit = crate::config::config().api.max_page_size;
        let applied_limit = if limit > max_limit {
            tracing::debug!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn include_deleted(&mut self, include: bool) -> &mut Self {
        self.options.include_deleted = include;
        self
    }

    pub fn where_data(&self) -> &Map<String, Value> {
        &self.where_data
    }

    pub fn where_value(&self, field: &str) -> Option<&Value> {
        self.where_data.get(field)
    }

    pub fn where_nodes(&self) -> Result<Vec<WhereNode>, FilterError> {
        FilterWhere::parse(&self.where_data)
    }

    pub fn order_info(&self) -> &[FilterOrderInfo] {
        &self.order_data
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset
    }

    /// Soft-deleted records are hidden unless the caller asked for them or
    /// filters on `status` at the top level.
    pub fn excludes_deleted(&self) -> bool {
        !self.options.include_deleted && !self.where_data.contains_key(RecordStatus::FIELD)
    }

    /// `$1` is always the collection name; where parameters follow.
    pub fn to_sql(&self, collection: &str) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.to_where_sql(collection)?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT \"{}\" FROM \"{}\"", DOC_COLUMN, DOCUMENTS_TABLE),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self, collection: &str) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = self.to_where_sql(collection)?;
        let query = format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", DOCUMENTS_TABLE, where_clause);
        Ok(SqlResult { query, params })
    }

    fn to_where_sql(&self, collection: &str) -> Result<(String, Vec<SqlParam>), FilterError> {
        let nodes = self.where_nodes()?;
        let (conditions, where_params) = FilterWhere::generate(&nodes, 1, self.excludes_deleted());

        let mut params = Vec::with_capacity(where_params.len() + 1);
        params.push(SqlParam::Text(collection.to_string()));
        params.extend(where_params);

        Ok((format!("\"collection\" = $1 AND {}", conditions), params))
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_query_hides_deleted_records() {
        let filter = Filter::new();
        let sql = filter.to_sql("clients").unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"doc\" FROM \"documents\" WHERE \"collection\" = $1 AND (\"doc\"->'status') IS DISTINCT FROM '2'::jsonb"
        );
        assert_eq!(sql.params, vec![SqlParam::Text("clients".to_string())]);
    }

    #[test]
    fn explicit_status_filter_includes_deleted_records() {
        let mut filter = Filter::new();
        filter.where_clause(json!({ "status": 2 })).unwrap();
        assert!(!filter.excludes_deleted());

        let sql = filter.to_count_sql("clients").unwrap();
        assert_eq!(
            sql.query,
            "SELECT COUNT(*) AS count FROM \"documents\" WHERE \"collection\" = $1 AND (\"doc\"->'status') = $2"
        );
        assert_eq!(sql.params[1], SqlParam::Json(json!(2)));
    }

    #[test]
    fn where_eq_overrides_existing_condition() {
        let mut filter = Filter::new();
        filter.where_clause(json!({ "clientId": { "$ne": "C1" }, "name": "x" })).unwrap();
        filter.where_eq("clientId", "C1");
        assert_eq!(filter.where_value("clientId"), Some(&json!("C1")));
        assert_eq!(filter.where_data().len(), 2);
    }

    #[test]
    fn paging_and_ordering_render() {
        let mut filter = Filter::new();
        filter.order(json!("createdAt desc")).unwrap().limit(10, Some(20)).unwrap();
        let sql = filter.to_sql("sites").unwrap();
        assert!(sql.query.ends_with("ORDER BY (\"doc\"->'createdAt') DESC LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(Filter::new().where_clause(json!([1, 2])).is_err());
        assert!(Filter::new().limit(-1, None).is_err());
        assert!(Filter::new().limit(5, Some(-1)).is_err());
    }

    #[test]
    fn limit_is_capped() {
        let mut filter = Filter::new();
        filter.limit(i64::MAX, None).unwrap();
        assert_eq!(filter.limit_value(), Some(crate::config::config().api.max_page_size));
    }
}
