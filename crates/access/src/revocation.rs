//! Revocation requests and policies

use crate::grants::{AccessGrantMap, AccessResourceName, AccessType};
use std::collections::BTreeMap;

/// Resources to revoke, at most one resource per access type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRevocationSet {
    entries: BTreeMap<AccessType, AccessResourceName>,
}

impl AccessRevocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set revoking a single resource
    pub fn single(
        access_type: impl Into<AccessType>,
        resource: impl Into<AccessResourceName>,
    ) -> Self {
        let mut set = Self::new();
        set.insert(access_type, resource);
        set
    }

    /// Add a resource, replacing any resource already listed for the type
    pub fn insert(
        &mut self,
        access_type: impl Into<AccessType>,
        resource: impl Into<AccessResourceName>,
    ) -> Option<AccessResourceName> {
        self.entries.insert(access_type.into(), resource.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccessType, &AccessResourceName)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A, R> FromIterator<(A, R)> for AccessRevocationSet
where
    A: Into<AccessType>,
    R: Into<AccessResourceName>,
{
    fn from_iter<I: IntoIterator<Item = (A, R)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (access_type, resource) in iter {
            set.insert(access_type, resource);
        }
        set
    }
}

/// How revoked grants leave a map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokePolicy {
    /// Keep an empty-code tombstone so the client overwrites its cookie
    Tombstone,
    /// Delete the entry; used when the authoritative copy lives in the store
    Remove,
}

impl From<bool> for RevokePolicy {
    /// `keep = true` keeps tombstones
    fn from(keep: bool) -> Self {
        if keep {
            RevokePolicy::Tombstone
        } else {
            RevokePolicy::Remove
        }
    }
}

impl AccessGrantMap {
    /// Revoke every resource listed in `revoke` according to `policy`
    pub fn revoke(&mut self, revoke: &AccessRevocationSet, policy: RevokePolicy) {
        for (access_type, resource) in revoke.iter() {
            match policy {
                RevokePolicy::Tombstone => {
                    self.add(access_type.clone(), resource.clone(), "");
                }
                RevokePolicy::Remove => {
                    self.remove(access_type, resource);
                }
            }
        }
    }
}
