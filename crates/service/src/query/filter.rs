//! Query Translator: request parameters to a typed filter expression.
//!
//! `careers[in]=Web Development,Data Science&averageCost[lte]=10000&housing=true`
//! becomes three AND-ed clauses. Operands stay as the raw request strings and are
//! coerced against the stored value's JSON type when a document is tested, so
//! nothing from the request is ever spliced into a query string.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use models::Document;

use crate::errors::{ServiceError, ServiceResult};

/// Raw request parameters, keyed by name (`averageCost[lte]` stays one key).
pub type QueryParams = BTreeMap<String, String>;

/// Control keys consumed by the result shaper; never treated as field filters.
pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(String),
    GreaterThan(String),
    GreaterOrEqual(String),
    LessThan(String),
    LessOrEqual(String),
    In(Vec<String>),
}

impl Condition {
    fn from_suffix(suffix: &str, raw: &str) -> ServiceResult<Self> {
        let operand = raw.to_string();
        Ok(match suffix {
            "gt" => Condition::GreaterThan(operand),
            "gte" => Condition::GreaterOrEqual(operand),
            "lt" => Condition::LessThan(operand),
            "lte" => Condition::LessOrEqual(operand),
            "in" => Condition::In(
                raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect(),
            ),
            other => return Err(ServiceError::BadFilter(format!("unsupported operator `{other}`"))),
        })
    }

    /// Test a single stored scalar against this condition.
    fn accepts(&self, stored: &Value) -> bool {
        match self {
            Condition::Equals(op) => scalar_eq(stored, op),
            Condition::In(ops) => ops.iter().any(|op| scalar_eq(stored, op)),
            Condition::GreaterThan(op) => cmp_operand(stored, op) == Some(Ordering::Greater),
            Condition::GreaterOrEqual(op) => matches!(cmp_operand(stored, op), Some(Ordering::Greater | Ordering::Equal)),
            Condition::LessThan(op) => cmp_operand(stored, op) == Some(Ordering::Less),
            Condition::LessOrEqual(op) => matches!(cmp_operand(stored, op), Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub condition: Condition,
}

impl FieldFilter {
    /// Missing fields never match. Array fields match when any element does.
    pub fn matches(&self, doc: &Document) -> bool {
        match lookup(doc, &self.field) {
            None => false,
            Some(Value::Array(items)) => items.iter().any(|v| self.condition.accepts(v)),
            Some(v) => self.condition.accepts(v),
        }
    }
}

/// Conjunction of field clauses. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<FieldFilter>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl ToString) -> Self {
        Self::new().and(field, Condition::Equals(value.to_string()))
    }

    pub fn and(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push(FieldFilter { field: field.into(), condition });
        self
    }

    pub fn clauses(&self) -> &[FieldFilter] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|c| c.matches(doc))
    }
}

/// Translate request parameters into a [`Filter`].
///
/// Reserved control keys are dropped; `field[op]` keys become comparisons and
/// bare keys become equality. Field names are not checked against any schema.
pub fn translate(params: &QueryParams) -> ServiceResult<Filter> {
    let mut filter = Filter::new();
    for (key, raw) in params {
        let (field, suffix) = split_key(key)?;
        if RESERVED_KEYS.contains(&field) {
            continue;
        }
        let condition = match suffix {
            Some(suffix) => Condition::from_suffix(suffix, raw)?,
            None => Condition::Equals(raw.clone()),
        };
        filter = filter.and(field, condition);
    }
    Ok(filter)
}

fn split_key(key: &str) -> ServiceResult<(&str, Option<&str>)> {
    let (field, suffix) = match key.find('[') {
        Some(open) => {
            let rest = &key[open + 1..];
            let suffix = rest
                .strip_suffix(']')
                .filter(|s| !s.contains('[') && !s.contains(']'))
                .ok_or_else(|| ServiceError::BadFilter(format!("malformed key `{key}`")))?;
            (&key[..open], Some(suffix))
        }
        None => (key, None),
    };
    if field.is_empty() {
        return Err(ServiceError::BadFilter(format!("missing field name in `{key}`")));
    }
    Ok((field, suffix))
}

/// Resolve a dotted path (`location.city`) inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn scalar_eq(stored: &Value, operand: &str) -> bool {
    match stored {
        Value::String(s) => s == operand,
        Value::Number(n) => match (n.as_f64(), operand.trim().parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => false,
        },
        Value::Bool(b) => operand.parse::<bool>().map(|o| o == *b).unwrap_or(false),
        Value::Null => operand == "null",
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn cmp_operand(stored: &Value, operand: &str) -> Option<Ordering> {
    match stored {
        Value::Number(n) => n.as_f64()?.partial_cmp(&operand.trim().parse::<f64>().ok()?),
        Value::String(s) => Some(match (parse_time(s), parse_time(operand)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => s.as_str().cmp(operand),
        }),
        _ => None,
    }
}

fn parse_time(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over stored values used for sorting; absent sorts like null.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let null = Value::Null;
    let (a, b) = (a.unwrap_or(&null), b.unwrap_or(&null));
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => match (parse_time(x), parse_time(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.cmp(y),
        },
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
