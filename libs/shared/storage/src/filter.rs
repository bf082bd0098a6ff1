use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gte,
    Lte,
}

impl FilterOp {
    pub fn rest_prefix(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gte => "gte",
            FilterOp::Lte => "lte",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

/// Conjunction of field conditions. Values compare as strings, which is
/// exactly what the stored shapes need: `YYYY-MM-DD` dates and `HH:MM` times
/// order lexicographically.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl ToString) -> Self {
        self.push(field, FilterOp::Eq, value);
        self
    }

    pub fn neq(mut self, field: &str, value: impl ToString) -> Self {
        self.push(field, FilterOp::Neq, value);
        self
    }

    pub fn gte(mut self, field: &str, value: impl ToString) -> Self {
        self.push(field, FilterOp::Gte, value);
        self
    }

    pub fn lte(mut self, field: &str, value: impl ToString) -> Self {
        self.push(field, FilterOp::Lte, value);
        self
    }

    fn push(&mut self, field: &str, op: FilterOp, value: impl ToString) {
        self.conditions.push(Condition {
            field: field.to_string(),
            op,
            value: value.to_string(),
        });
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// True when any condition needs an ordered comparison.
    pub fn has_range(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| matches!(c.op, FilterOp::Gte | FilterOp::Lte))
    }

    /// Client-side evaluation, used by the in-memory store and by the
    /// fetch-all fallback path. Must agree with the backend's semantics.
    pub fn matches(&self, data: &Value) -> bool {
        self.conditions.iter().all(|cond| {
            let field_value = match data.get(&cond.field) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                _ => return matches!(cond.op, FilterOp::Neq),
            };
            match cond.op {
                FilterOp::Eq => field_value == cond.value,
                FilterOp::Neq => field_value != cond.value,
                FilterOp::Gte => field_value.as_str() >= cond.value.as_str(),
                FilterOp::Lte => field_value.as_str() <= cond.value.as_str(),
            }
        })
    }
}
