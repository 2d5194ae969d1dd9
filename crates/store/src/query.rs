//! Equality-filtered, ordered, limited collection queries.

use std::cmp::Ordering;

use crate::remote::Document;

/// An equality filter on a top-level document field.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub equals: Document,
}

/// Ordering on a top-level document field.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

/// A collection query: zero or more equality filters, optional ordering,
/// optional result limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, equals: impl Into<Document>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            equals: equals.into(),
        });
        self
    }

    pub fn order_by_asc(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            descending: false,
        });
        self
    }

    pub fn order_by_desc(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document passes every filter.
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|f| doc.get(&f.field) == Some(&f.equals))
    }

    /// Runs the query over a collection snapshot.
    pub fn apply(&self, docs: &[Document]) -> Vec<Document> {
        let mut result: Vec<Document> = docs.iter().filter(|d| self.matches(d)).cloned().collect();

        if let Some(order) = &self.order_by {
            result.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(&order.field).unwrap_or(&Document::Null),
                    b.get(&order.field).unwrap_or(&Document::Null),
                );
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        if let Some(limit) = self.limit {
            result.truncate(limit);
        }

        result
    }
}

/// Total order over scalar JSON values: null < bool < number < string;
/// arrays and objects compare equal (never used as sort keys here).
fn compare_values(a: &Document, b: &Document) -> Ordering {
    match (a, b) {
        (Document::Null, Document::Null) => Ordering::Equal,
        (Document::Null, _) => Ordering::Less,
        (_, Document::Null) => Ordering::Greater,
        (Document::Bool(x), Document::Bool(y)) => x.cmp(y),
        (Document::Bool(_), _) => Ordering::Less,
        (_, Document::Bool(_)) => Ordering::Greater,
        (Document::Number(x), Document::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Document::Number(_), _) => Ordering::Less,
        (_, Document::Number(_)) => Ordering::Greater,
        (Document::String(x), Document::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
