//! Hierarchical key construction.
//!
//! Every key lives under `<scope>:` and is built from the entity kind, the
//! owner and, for parameters and results, the instance id:
//!
//! ```text
//! <scope>:instance:<executable|invoker>:<ownerName>:<id>
//! <scope>:parameter:<executable|invoker>:<ownerName>:<id>:<name>
//! <scope>:result:<executable|invoker>:<ownerName>:<id>:<name>
//! ```
//!
//! This layout is persisted and must stay bit-exact. Each prefix is a strict
//! string prefix of its children's keys, which is what makes prefix-scan
//! listing and prefix-scoped bulk deletion work.
//!
//! Ids and names must not contain `*` (the wildcard) or `:` (the segment
//! separator). This is a caller contract and is not checked at runtime.

use crate::types::{FieldKind, Owner};

/// The wildcard segment.
pub const WILDCARD: &str = "*";

/// Selects one named key or every key under a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// Every key under the prefix.
    All,
    /// A single key.
    Named(&'a str),
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(segment: &'a str) -> Self {
        if segment == WILDCARD { Self::All } else { Self::Named(segment) }
    }
}

/// Builds keys for one scope.
///
/// # Examples
///
/// ```
/// use instancedb::{FieldKind, KeySpace, Owner, Target};
///
/// let keys = KeySpace::new("default");
/// let owner = Owner::invoker("testinv");
///
/// assert_eq!(keys.instance_key(&owner, Target::Named("2")), "default:instance:invoker:testinv:2");
/// assert_eq!(
///     keys.field_key(FieldKind::Parameter, &owner, "2", Target::Named("foo")),
///     "default:parameter:invoker:testinv:2:foo",
/// );
/// assert_eq!(
///     keys.field_key(FieldKind::Result, &owner, "2", Target::All),
///     "default:result:invoker:testinv:2:",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    scope: String,
}

impl KeySpace {
    /// Creates a key space for the given scope.
    pub fn new(scope: impl Into<String>) -> Self {
        Self { scope: scope.into() }
    }

    /// Returns the scope.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn owner_part(owner: &Owner) -> String {
        format!("{}:{}:", owner.kind(), owner.name())
    }

    /// Returns the prefix shared by every instance of `owner`.
    #[must_use]
    pub fn instance_prefix(&self, owner: &Owner) -> String {
        format!("{}:instance:{}", self.scope, Self::owner_part(owner))
    }

    /// Returns the key of one instance, or the owner's instance prefix for
    /// [`Target::All`].
    #[must_use]
    pub fn instance_key(&self, owner: &Owner, id: Target<'_>) -> String {
        let mut key = self.instance_prefix(owner);
        if let Target::Named(id) = id {
            key.push_str(id);
        }
        key
    }

    /// Returns the prefix shared by every parameter (or result) of one
    /// instance.
    #[must_use]
    pub fn field_prefix(&self, kind: FieldKind, owner: &Owner, id: &str) -> String {
        format!("{}:{}:{}{}:", self.scope, kind.segment(), Self::owner_part(owner), id)
    }

    /// Returns the key of one parameter (or result), or the instance's field
    /// prefix for [`Target::All`].
    #[must_use]
    pub fn field_key(&self, kind: FieldKind, owner: &Owner, id: &str, name: Target<'_>) -> String {
        let mut key = self.field_prefix(kind, owner, id);
        if let Target::Named(name) = name {
            key.push_str(name);
        }
        key
    }
}

/// Returns the last colon-delimited segment of a key.
///
/// Drivers use this to turn scanned keys into the names reported by `list`
/// and `get_all`.
#[must_use]
pub fn leaf_name(key: &str) -> &str {
    key.rsplit_once(':').map_or(key, |(_, leaf)| leaf)
}
