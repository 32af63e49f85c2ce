//! Access cookie wire format
//!
//! Two kinds of cookies are exchanged with clients:
//!
//! - `session=<id>; Path=/; Expires=<date>` for store-backed principals
//! - `<type>-<resource>=<code>; Path=/[; Expires=<date>]` for cookie-only
//!   grants, where `Expires` is omitted for tombstones
//!
//! Type and resource are percent-encoded in grant cookie names, and the
//! type additionally escapes `-` so the first `-` always separates them.

use crate::grants::{AccessResourceName, AccessType};
use chrono::{DateTime, Utc};
use std::fmt::{self, Display};
use std::time::Duration;
use warden_core::{Error, Result, COOKIE_PATH, GRANT_COOKIE_SEPARATOR, SESSION_COOKIE};

/// IMF-fixdate as used by the `Expires` attribute
const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// An outgoing cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    /// Absolute expiration; `None` makes it a session cookie
    pub expires: Option<DateTime<Utc>>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: COOKIE_PATH.to_string(),
            expires: None,
        }
    }

    /// The `session` cookie carrying a server-side session id
    pub fn session(session_id: &str, expiration: Duration) -> Self {
        let mut cookie = Cookie::new(SESSION_COOKIE, session_id);
        cookie.expires = expires_in(expiration);
        cookie
    }

    /// Render the value of a `Set-Cookie` header
    pub fn to_header_value(&self) -> String {
        self.to_string()
    }
}

impl Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}",
            sanitize_name(&self.name),
            sanitize_value(&self.value)
        )?;
        if !self.path.is_empty() {
            write!(f, "; Path={}", self.path)?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", expires.format(EXPIRES_FORMAT))?;
        }
        Ok(())
    }
}

/// Absolute expiration `expiration` from now, if representable
pub(crate) fn expires_in(expiration: Duration) -> Option<DateTime<Utc>> {
    let delta = chrono::Duration::from_std(expiration).ok()?;
    Utc::now().checked_add_signed(delta)
}

fn sanitize_name(name: &str) -> String {
    name.replace(['\n', '\r'], "-")
}

/// Drop octets browsers reject; quote values containing space or comma
fn sanitize_value(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|&c| (' '..='~').contains(&c) && c != '"' && c != ';' && c != '\\')
        .collect();
    if cleaned.contains([' ', ',']) {
        format!("\"{cleaned}\"")
    } else {
        cleaned
    }
}

/// Meaning of an incoming cookie name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieName {
    /// The `session` cookie
    Session,
    /// A `<type>-<resource>` grant cookie
    Grant {
        access_type: AccessType,
        resource: AccessResourceName,
    },
}

impl CookieName {
    /// Classify a cookie name, splitting grant names on the first `-`
    pub fn parse(name: &str) -> Result<Self> {
        if name == SESSION_COOKIE {
            return Ok(CookieName::Session);
        }
        let (access_type, resource) = name
            .split_once(GRANT_COOKIE_SEPARATOR)
            .ok_or_else(|| Error::invalid_cookie_name(name, "missing '-' separator"))?;
        if access_type.is_empty() {
            return Err(Error::invalid_cookie_name(name, "empty access type"));
        }
        let decode = |part: &str| {
            urlencoding::decode(part)
                .map(|decoded| decoded.into_owned())
                .map_err(|_| Error::invalid_cookie_name(name, "invalid percent-encoding"))
        };
        Ok(CookieName::Grant {
            access_type: decode(access_type)?.into(),
            resource: decode(resource)?.into(),
        })
    }

    /// Name of the cookie carrying the grant of `(access_type, resource)`
    pub fn grant_cookie_name(access_type: &str, resource: &str) -> String {
        format!(
            "{}{GRANT_COOKIE_SEPARATOR}{}",
            urlencoding::encode(access_type).replace(GRANT_COOKIE_SEPARATOR, "%2D"),
            urlencoding::encode(resource)
        )
    }
}

/// Split a request `Cookie` header into `(name, value)` pairs
///
/// Entries without `=` or with an empty name are skipped; surrounding
/// double quotes are stripped from values.
pub fn parse_cookie_header(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some((name, value))
    })
}
