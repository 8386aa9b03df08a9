use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo, SqlParam, WhereNode};

/// Name of the JSONB column holding each document
pub const DOC_COLUMN: &str = "doc";

/// Condition appended to default queries so soft-deleted records stay hidden
pub const NOT_DELETED_SQL: &str = "(\"doc\"->'status') IS DISTINCT FROM '2'::jsonb";

pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Parse a Mongo-style where document into a condition tree
    pub fn parse(where_data: &Map<String, Value>) -> Result<Vec<WhereNode>, FilterError> {
        let mut nodes = Vec::new();
        for (key, value) in where_data {
            if key.starts_with('$') {
                nodes.push(Self::parse_logical_operator(key, value)?);
            } else {
                nodes.extend(Self::parse_field_condition(key, value)?);
            }
        }
        Ok(nodes)
    }

    /// Render the conditions as SQL over the JSONB document column.
    /// Parameters are numbered from `starting_param_index + 1`.
    pub fn generate(
        nodes: &[WhereNode],
        starting_param_index: usize,
        exclude_deleted: bool,
    ) -> (String, Vec<SqlParam>) {
        let mut filter_where = Self::new(starting_param_index);

        let mut sql_conditions = vec![];
        if exclude_deleted {
            sql_conditions.push(NOT_DELETED_SQL.to_string());
        }
        for node in nodes {
            sql_conditions.push(filter_where.node_sql(node));
        }

        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        (where_clause, filter_where.param_values)
    }

    pub fn validate_field_name(field: &str) -> Result<(), FilterError> {
        let mut chars = field.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidField(field.to_string()));
        }
        Ok(())
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<WhereNode, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut branches = Vec::with_capacity(arr.len());
                for v in arr {
                    let obj = v
                        .as_object()
                        .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} entries must be objects", op)))?;
                    branches.push(WhereNode::And(Self::parse(obj)?));
                }
                Ok(if op == "$and" { WhereNode::And(branches) } else { WhereNode::Or(branches) })
            }
            "$not" => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$not requires object".to_string()))?;
                Ok(WhereNode::Not(Self::parse(obj)?))
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<WhereNode>, FilterError> {
        Self::validate_field_name(field)?;

        let operators = match value {
            Value::Object(obj) if !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')) => obj,
            // Implicit equality: { field: value }
            _ => return Ok(vec![WhereNode::Field(Self::field_info(field, FilterOp::Eq, value.clone(), false)?)]),
        };

        let case_insensitive = operators
            .get("$options")
            .and_then(Value::as_str)
            .map(|o| o.contains('i'))
            .unwrap_or(false);

        let mut nodes = Vec::new();
        for (op_key, op_val) in operators {
            if op_key == "$options" {
                continue;
            }
            let operator = FilterOp::from_key(op_key)
                .ok_or_else(|| FilterError::UnsupportedOperator(op_key.to_string()))?;
            nodes.push(WhereNode::Field(Self::field_info(field, operator, op_val.clone(), case_insensitive)?));
        }
        Ok(nodes)
    }

    fn field_info(field: &str, operator: FilterOp, data: Value, case_insensitive: bool) -> Result<FilterWhereInfo, FilterError> {
        let pattern = match operator {
            FilterOp::Like | FilterOp::ILike => {
                let raw = Self::string_operand(operator, &data)?;
                Some(like_to_regex(raw, operator == FilterOp::ILike)?)
            }
            FilterOp::Regex => {
                let raw = Self::string_operand(operator, &data)?;
                Some(RegexBuilder::new(raw).case_insensitive(case_insensitive).build()?)
            }
            op if op.takes_list() => {
                if !data.is_array() {
                    return Err(FilterError::InvalidOperatorData(format!("{:?} requires array", operator)));
                }
                None
            }
            FilterOp::Exists => {
                if !data.is_boolean() {
                    return Err(FilterError::InvalidOperatorData("$exists requires boolean".to_string()));
                }
                None
            }
            _ => None,
        };

        Ok(FilterWhereInfo {
            field: field.to_string(),
            operator,
            data,
            case_insensitive: case_insensitive || operator == FilterOp::ILike,
            pattern,
        })
    }

    fn string_operand(operator: FilterOp, data: &Value) -> Result<&str, FilterError> {
        data.as_str()
            .ok_or_else(|| FilterError::InvalidOperatorData(format!("{:?} requires string", operator)))
    }

    fn node_sql(&mut self, node: &WhereNode) -> String {
        match node {
            WhereNode::Field(info) => self.field_sql(info),
            WhereNode::And(children) => {
                if children.is_empty() { return "1=1".to_string(); }
                if children.len() == 1 { return self.node_sql(&children[0]); }
                let parts: Vec<String> = children.iter().map(|c| format!("({})", self.node_sql(c))).collect();
                parts.join(" AND ")
            }
            WhereNode::Or(children) => {
                if children.is_empty() { return "1=0".to_string(); }
                let parts: Vec<String> = children.iter().map(|c| format!("({})", self.node_sql(c))).collect();
                parts.join(" OR ")
            }
            WhereNode::Not(children) => {
                let inner = self.node_sql(&WhereNode::And(children.clone()));
                // NULL comparisons on missing fields must count as "not matched"
                format!("({}) IS NOT TRUE", inner)
            }
        }
    }

    fn field_sql(&mut self, info: &FilterWhereInfo) -> String {
        // Field names are validated to [A-Za-z0-9_], so inlining them as literals is safe
        let json_expr = format!("(\"{}\"->'{}')", DOC_COLUMN, info.field);
        let text_expr = format!("(\"{}\"->>'{}')", DOC_COLUMN, info.field);

        match info.operator {
            FilterOp::Eq => {
                if info.data.is_null() { format!("COALESCE({}, 'null'::jsonb) = 'null'::jsonb", json_expr) }
                else { format!("{} = {}", json_expr, self.json_param(&info.data)) }
            }
            FilterOp::Ne => {
                if info.data.is_null() { format!("COALESCE({}, 'null'::jsonb) <> 'null'::jsonb", json_expr) }
                else { format!("{} IS DISTINCT FROM {}", json_expr, self.json_param(&info.data)) }
            }
            FilterOp::Gt => format!("{} > {}", json_expr, self.json_param(&info.data)),
            FilterOp::Gte => format!("{} >= {}", json_expr, self.json_param(&info.data)),
            FilterOp::Lt => format!("{} < {}", json_expr, self.json_param(&info.data)),
            FilterOp::Lte => format!("{} <= {}", json_expr, self.json_param(&info.data)),
            FilterOp::Like => format!("{} LIKE {}", text_expr, self.text_param(&info.data)),
            FilterOp::ILike => format!("{} ILIKE {}", text_expr, self.text_param(&info.data)),
            FilterOp::Regex => {
                let op = if info.case_insensitive { "~*" } else { "~" };
                format!("{} {} {}", text_expr, op, self.text_param(&info.data))
            }
            FilterOp::In | FilterOp::NIn => {
                let values = info.data.as_array().cloned().unwrap_or_default();
                let negate = info.operator == FilterOp::NIn;
                if values.is_empty() {
                    return if negate { "1=1".to_string() } else { "1=0".to_string() };
                }
                let params: Vec<String> = values.iter().map(|v| self.json_param(v)).collect();
                if negate {
                    format!("({} IS NULL OR {} NOT IN ({}))", json_expr, json_expr, params.join(", "))
                } else {
                    format!("{} IN ({})", json_expr, params.join(", "))
                }
            }
            FilterOp::Exists => {
                if info.data.as_bool().unwrap_or(true) { format!("{} IS NOT NULL", json_expr) }
                else { format!("{} IS NULL", json_expr) }
            }
        }
    }

    fn json_param(&mut self, value: &Value) -> String {
        self.param(SqlParam::Json(value.clone()))
    }

    fn text_param(&mut self, value: &Value) -> String {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.param(SqlParam::Text(text))
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Translate a SQL LIKE pattern (`%`, `_`) into an anchored regex
fn like_to_regex(pattern: &str, case_insensitive: bool) -> Result<Regex, FilterError> {
    let mut translated = String::from("^");
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '%' => translated.push_str(".*"),
            '_' => translated.push('.'),
            other => translated.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    translated.push('$');

    Ok(RegexBuilder::new(&translated)
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(true)
        .build()?)
}
