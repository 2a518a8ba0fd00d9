//! Access-scope resolution: which site rows a user may act upon.
//!
//! Admins are unrestricted. Everyone else gets the set
//! `{primary_site_id} ∪ assigned_site_ids` — the primary site is always
//! in scope even when absent from the assigned set. The scope is applied
//! as a SQL predicate on every scoped read/update/delete; a specific-id
//! request outside scope is indistinguishable from genuine absence.

use std::collections::BTreeSet;

use crate::models::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// No filtering predicate (admin).
    AllSites,
    /// Only rows whose site id is in the set.
    Sites(BTreeSet<i64>),
}

impl AccessScope {
    /// Resolve the effective scope for a user's claims.
    pub fn for_user(role: Role, primary_site_id: i64, assigned_site_ids: &[i64]) -> Self {
        if role.is_admin() {
            return Self::AllSites;
        }
        let mut sites: BTreeSet<i64> = assigned_site_ids.iter().copied().collect();
        sites.insert(primary_site_id);
        Self::Sites(sites)
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::AllSites)
    }

    /// True when the scope is a non-admin set with no sites at all.
    /// Scoped list queries then return empty collections, not errors.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Sites(sites) if sites.is_empty())
    }

    pub fn contains(&self, site_id: i64) -> bool {
        match self {
            Self::AllSites => true,
            Self::Sites(sites) => sites.contains(&site_id),
        }
    }

    /// SQL predicate over `column`, or `None` when unrestricted.
    ///
    /// Site ids come from verified token claims and are plain integers,
    /// so they are inlined rather than bound. An empty set yields a
    /// never-true predicate.
    pub fn sql_condition(&self, column: &str) -> Option<String> {
        match self {
            Self::AllSites => None,
            Self::Sites(sites) if sites.is_empty() => Some("1 = 0".into()),
            Self::Sites(sites) => {
                let ids: Vec<String> = sites.iter().map(|id| id.to_string()).collect();
                Some(format!("{column} IN ({})", ids.join(", ")))
            }
        }
    }
}
