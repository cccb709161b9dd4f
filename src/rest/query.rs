//! Filter-query construction for the data service
//!
//! Rows are addressed with `column=operator.value` pairs, embedded
//! relations with `select=col,relation(col,...)` and ordering with
//! `order=column.asc`. The same `Query` targets reads, patches and deletes.

use std::fmt::Display;

/// Comparison operators understood by the data service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Neq,
    /// Case-insensitive pattern match; `*` is the wildcard
    Ilike,
    Gte,
    Lte,
    In,
    Is,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Ilike => "ilike",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Is => "is",
        }
    }
}

/// A single `column=op.value` predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub op: Op,
    pub value: String,
}

/// Sort direction for `order=`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Query-string builder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    select: Option<String>,
    predicates: Vec<Predicate>,
    order: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns and embedded relations to return
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    pub fn filter(mut self, column: impl Into<String>, op: Op, value: impl Display) -> Self {
        self.predicates.push(Predicate {
            column: column.into(),
            op,
            value: value.to_string(),
        });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Display) -> Self {
        self.filter(column, Op::Eq, value)
    }

    pub fn neq(self, column: impl Into<String>, value: impl Display) -> Self {
        self.filter(column, Op::Neq, value)
    }

    /// Prefix match: `column ILIKE 'value%'`
    pub fn starts_with(self, column: impl Into<String>, value: &str) -> Self {
        self.filter(column, Op::Ilike, format!("{}*", escape_pattern(value)))
    }

    /// Substring match: `column ILIKE '%value%'`
    pub fn contains(self, column: impl Into<String>, value: &str) -> Self {
        self.filter(column, Op::Ilike, format!("*{}*", escape_pattern(value)))
    }

    pub fn gte(self, column: impl Into<String>, value: impl Display) -> Self {
        self.filter(column, Op::Gte, value)
    }

    pub fn lte(self, column: impl Into<String>, value: impl Display) -> Self {
        self.filter(column, Op::Lte, value)
    }

    /// `column=in.(a,b,c)`
    pub fn one_of<T: Display>(self, column: impl Into<String>, values: &[T]) -> Self {
        let list = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.filter(column, Op::In, format!("({list})"))
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn has_order(&self) -> bool {
        self.order.is_some()
    }

    /// Key/value pairs in the order they are sent
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .predicates
            .iter()
            .map(|p| (p.column.clone(), format!("{}.{}", p.op.as_str(), p.value)))
            .collect();

        if let Some(select) = &self.select {
            pairs.push(("select".to_string(), select.clone()));
        }

        if let Some((column, direction)) = &self.order {
            let direction = match direction {
                Direction::Asc => "asc",
                Direction::Desc => "desc",
            };
            pairs.push(("order".to_string(), format!("{column}.{direction}")));
        }

        pairs
    }

    /// Encoded query string without the leading `?`
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_pairs())
            .finish()
    }
}

/// Free text must not inject wildcards or list syntax into a pattern
fn escape_pattern(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !matches!(c, '*' | '%' | ',' | '(' | ')'))
        .collect()
}
