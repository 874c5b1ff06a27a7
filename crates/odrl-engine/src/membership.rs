//! Party collection membership.
//!
//! Whether a principal belongs to a `PartyCollection` is answered by an
//! injected oracle, so the engine does not care where groups come from.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Answers collection membership questions.
pub trait MembershipOracle: Send + Sync {
    /// True when `principal` is a member of `collection`.
    fn is_member(&self, collection: &str, principal: &str) -> bool;
}

/// Oracle that knows no memberships; collections only match their own uid.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMembership;

impl MembershipOracle for NoMembership {
    fn is_member(&self, _collection: &str, _principal: &str) -> bool {
        false
    }
}

/// In-memory membership table.
#[derive(Debug, Default)]
pub struct StaticMembership {
    groups: RwLock<HashMap<String, HashSet<String>>>,
}

impl StaticMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(collection, members)` pairs.
    pub fn from_groups<I, M>(groups: I) -> Self
    where
        I: IntoIterator<Item = (String, M)>,
        M: IntoIterator<Item = String>,
    {
        let table = groups
            .into_iter()
            .map(|(collection, members)| (collection, members.into_iter().collect()))
            .collect();
        Self {
            groups: RwLock::new(table),
        }
    }

    pub fn add_member(&self, collection: impl Into<String>, principal: impl Into<String>) {
        self.groups
            .write()
            .entry(collection.into())
            .or_default()
            .insert(principal.into());
    }

    /// Returns whether the principal was a member.
    pub fn remove_member(&self, collection: &str, principal: &str) -> bool {
        self.groups
            .write()
            .get_mut(collection)
            .map(|members| members.remove(principal))
            .unwrap_or(false)
    }
}

impl MembershipOracle for StaticMembership {
    fn is_member(&self, collection: &str, principal: &str) -> bool {
        self.groups
            .read()
            .get(collection)
            .map(|members| members.contains(principal))
            .unwrap_or(false)
    }
}
