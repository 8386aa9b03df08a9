use regex::Regex;
use serde_json::Value;

/// Field operators of the where document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    Regex,
    In,
    NIn,
    Exists,
}

impl FilterOp {
    /// Operator for a `$`-prefixed key; `$neq` is accepted as `$ne`
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$regex" => FilterOp::Regex,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$exists" => FilterOp::Exists,
            _ => return None,
        })
    }

    /// Operators whose operand is a list
    pub fn takes_list(&self) -> bool {
        matches!(self, FilterOp::In | FilterOp::NIn)
    }
}

/// A single field predicate. `pattern` is compiled once at parse time for
/// `$like`, `$ilike` and `$regex` so the in-memory matcher can reuse it.
#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub field: String,
    pub operator: FilterOp,
    pub data: Value,
    pub case_insensitive: bool,
    pub pattern: Option<Regex>,
}

/// Parsed WHERE tree; a list of nodes at the top level is an implicit AND
#[derive(Debug, Clone)]
pub enum WhereNode {
    Field(FilterWhereInfo),
    And(Vec<WhereNode>),
    Or(Vec<WhereNode>),
    Not(Vec<WhereNode>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterWhereOptions {
    /// Include soft-deleted (`status = 2`) records
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(format!("sort direction must be asc or desc, got '{}'", s))
        }
    }
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub field: String,
    pub sort: SortDirection,
}

/// Bound parameter for generated SQL
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Compared against a `jsonb` expression
    Json(Value),
    /// Compared against a `->>` text expression
    Text(String),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}
