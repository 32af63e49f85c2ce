//! Grant map and its key/value newtypes

use crate::cookie::{expires_in, Cookie, CookieName};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::ops::Deref;
use std::time::Duration;

macro_rules! access_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

access_newtype!(
    /// Category of permission, like `view` or `edit`
    AccessType
);

access_newtype!(
    /// Name of the protected resource, like a user or a folder
    AccessResourceName
);

access_newtype!(
    /// Proof that access was granted; empty means tracked but inactive
    AccessCode
);

impl AccessCode {
    /// Whether this code is a tombstone rather than a live proof
    pub fn is_placeholder(&self) -> bool {
        self.0.is_empty()
    }
}

type GrantTree = BTreeMap<AccessType, BTreeMap<AccessResourceName, AccessCode>>;

/// All grants held by one principal
///
/// Removing the last resource under a type removes the type, so the map
/// never holds (or persists) an empty inner mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessGrantMap {
    grants: GrantTree,
}

impl AccessGrantMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the code for `(access_type, resource)`
    pub fn add(
        &mut self,
        access_type: impl Into<AccessType>,
        resource: impl Into<AccessResourceName>,
        code: impl Into<AccessCode>,
    ) {
        self.grants
            .entry(access_type.into())
            .or_default()
            .insert(resource.into(), code.into());
    }

    /// Remove the grant, dropping the type once it has no resources left
    pub fn remove(&mut self, access_type: &str, resource: &str) -> Option<AccessCode> {
        let resources = self.grants.get_mut(access_type)?;
        let removed = resources.remove(resource);
        if resources.is_empty() {
            self.grants.remove(access_type);
        }
        removed
    }

    pub fn get(&self, access_type: &str, resource: &str) -> Option<&AccessCode> {
        self.grants.get(access_type)?.get(resource)
    }

    /// Like [`get`](Self::get) but treats tombstones as absent
    pub fn active_code(&self, access_type: &str, resource: &str) -> Option<&AccessCode> {
        self.get(access_type, resource)
            .filter(|code| !code.is_placeholder())
    }

    /// Add every grant of `other`; on conflicts `other` wins
    pub fn merge(&mut self, other: &AccessGrantMap) {
        for (access_type, resource, code) in other.iter() {
            self.add(access_type.clone(), resource.clone(), code.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccessType, &AccessResourceName, &AccessCode)> {
        self.grants.iter().flat_map(|(access_type, resources)| {
            resources
                .iter()
                .map(move |(resource, code)| (access_type, resource, code))
        })
    }

    /// Number of grants, tombstones included
    pub fn len(&self) -> usize {
        self.grants.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// One cookie per grant, named `<type>-<resource>`
    ///
    /// Live codes expire `expiration` from now; tombstones become session
    /// cookies so the client overwrites its old proof without receiving a
    /// new time-boxed one.
    pub fn to_cookies(&self, expiration: Duration) -> Vec<Cookie> {
        let expires = expires_in(expiration);
        self.iter()
            .map(|(access_type, resource, code)| {
                let mut cookie = Cookie::new(
                    CookieName::grant_cookie_name(access_type, resource),
                    code.as_str(),
                );
                if !code.is_placeholder() {
                    cookie.expires = expires;
                }
                cookie
            })
            .collect()
    }
}

impl<A, R, C> FromIterator<(A, R, C)> for AccessGrantMap
where
    A: Into<AccessType>,
    R: Into<AccessResourceName>,
    C: Into<AccessCode>,
{
    fn from_iter<I: IntoIterator<Item = (A, R, C)>>(iter: I) -> Self {
        let mut map = AccessGrantMap::new();
        for (access_type, resource, code) in iter {
            map.add(access_type, resource, code);
        }
        map
    }
}

impl Serialize for AccessGrantMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.grants.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AccessGrantMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut grants = GrantTree::deserialize(deserializer)?;
        grants.retain(|_, resources| !resources.is_empty());
        Ok(Self { grants })
    }
}
