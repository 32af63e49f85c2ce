//! Access grants for warden
//!
//! A principal's rights are a two-level map `type -> resource -> proof code`
//! ([`AccessGrantMap`]). Grants travel either as one cookie per resource
//! (`<type>-<resource>=<code>`) or inside a server-side session record; this
//! crate owns the map itself, revocation ([`AccessRevocationSet`],
//! [`RevokePolicy`]) and the cookie wire format ([`Cookie`], [`CookieName`]).

pub mod cookie;
pub mod grants;
pub mod revocation;

pub use cookie::{parse_cookie_header, Cookie, CookieName};
pub use grants::{AccessCode, AccessGrantMap, AccessResourceName, AccessType};
pub use revocation::{AccessRevocationSet, RevokePolicy};
