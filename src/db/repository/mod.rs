//! Entity stores — free functions over a borrowed connection, one
//! canonical store per entity.
//!
//! Every scoped query takes a single `&AccessScope` parameter and folds
//! it into the WHERE clause; there are no separate admin / non-admin
//! code paths. Display labels (site name, patient name, user initials)
//! are joined at read time and never written back.

pub mod activity;
pub mod building;
pub mod medical_record;
pub mod patient;
pub mod site;
pub mod user;

use rusqlite::ToSql;

use crate::models::Sort;

/// Accumulates WHERE conditions and their bound parameters for a
/// dynamically assembled query.
pub(crate) struct QueryParts {
    conditions: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl QueryParts {
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Add a condition with no bound parameter (e.g. an inlined scope
    /// predicate).
    pub fn condition(&mut self, cond: impl Into<String>) {
        self.conditions.push(cond.into());
    }

    /// Add a condition with one bound parameter.
    pub fn bind(&mut self, cond: impl Into<String>, value: impl ToSql + 'static) {
        self.conditions.push(cond.into());
        self.params.push(Box::new(value));
    }

    /// Add a condition whose SQL contains several placeholders bound to
    /// the given values, in order.
    pub fn bind_many(&mut self, cond: impl Into<String>, values: Vec<Box<dyn ToSql>>) {
        self.conditions.push(cond.into());
        self.params.extend(values);
    }

    /// `""` when empty, otherwise `"WHERE a AND b AND ..."`.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

/// Resolve a client-facing sort key against a fixed allow-list.
/// Unknown keys fall back silently to the default order — never an
/// error.
pub(crate) fn order_clause(sort: &Sort, allowed: &[(&str, &str)], default: &str) -> String {
    let resolved = sort
        .field
        .as_deref()
        .and_then(|field| allowed.iter().find(|(key, _)| *key == field))
        .map(|(_, expr)| *expr);
    match resolved {
        Some(expr) => format!("ORDER BY {expr} {}", sort.direction_sql()),
        None => format!("ORDER BY {default}"),
    }
}

/// Substring-match pattern for case-insensitive LIKE search.
pub(crate) fn like_pattern(search: &str) -> String {
    format!("%{}%", search.trim())
}
