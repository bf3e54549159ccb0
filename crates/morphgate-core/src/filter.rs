//! Filter-policy model and evaluation.
//!
//! Administrators express route filtering as maps keyed by content-type UID,
//! where a value is either a single boolean (scope-level opinion) or a map of
//! per-method booleans. Only explicit booleans participate in filtering: a
//! missing key, or a key whose value is not a boolean, carries no opinion and
//! never causes rejection. That contract is encoded as [`FilterFlag`], decided
//! once at ingestion, so evaluation is a total match over two small enums.

use std::collections::HashMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

/// Filtering mode of one policy section.
///
/// Unknown mode names are treated as [`FilterMode::None`]: an unrecognized
/// mode must never start rejecting traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    Allow,
    Deny,
    #[default]
    None,
}

impl FilterMode {
    pub fn from_name(name: &str) -> Self {
        match name {
            "allow" => FilterMode::Allow,
            "deny" => FilterMode::Deny,
            _ => FilterMode::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::Allow => "allow",
            FilterMode::Deny => "deny",
            FilterMode::None => "none",
        }
    }
}

impl<'de> Deserialize<'de> for FilterMode {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Other(IgnoredAny),
        }

        Ok(match Raw::deserialize(de)? {
            Raw::Name(s) => FilterMode::from_name(&s),
            Raw::Other(_) => {
                tracing::debug!("non-string filter mode ignored, defaulting to none");
                FilterMode::None
            }
        })
    }
}

/// Per-key opinion in a filter map.
///
/// `Unset` covers both an absent key and a key holding a non-boolean value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterFlag {
    #[default]
    Unset,
    Allowed,
    Denied,
}

impl From<bool> for FilterFlag {
    fn from(b: bool) -> Self {
        if b {
            FilterFlag::Allowed
        } else {
            FilterFlag::Denied
        }
    }
}

impl<'de> Deserialize<'de> for FilterFlag {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Other(IgnoredAny),
        }

        Ok(match Raw::deserialize(de)? {
            Raw::Flag(b) => FilterFlag::from(b),
            Raw::Other(_) => {
                tracing::debug!("non-boolean filter value coerced to no-opinion");
                FilterFlag::Unset
            }
        })
    }
}

/// One configured entry for a content-type UID: a scope-level opinion, or a
/// map of per-method opinions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UidRule {
    Flag(FilterFlag),
    Methods(HashMap<String, FilterFlag>),
}

impl Default for UidRule {
    fn default() -> Self {
        UidRule::Flag(FilterFlag::Unset)
    }
}

impl<'de> Deserialize<'de> for UidRule {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Methods(HashMap<String, FilterFlag>),
            Other(IgnoredAny),
        }

        Ok(match Raw::deserialize(de)? {
            Raw::Flag(b) => UidRule::Flag(FilterFlag::from(b)),
            Raw::Methods(m) => UidRule::Methods(m),
            Raw::Other(_) => UidRule::Flag(FilterFlag::Unset),
        })
    }
}

/// A filter map keyed by content-type UID.
///
/// Lookup-only: ordering is irrelevant here, so this wraps a plain `HashMap`.
/// A settings value that is not a mapping degrades to an empty map instead of
/// failing the whole document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterRules(HashMap<String, UidRule>);

impl FilterRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn insert(&mut self, uid: impl Into<String>, rule: UidRule) {
        self.0.insert(uid.into(), rule);
    }

    /// Scope-level opinion for `uid`. A per-method map is not a boolean and
    /// therefore carries no scope-level opinion.
    pub fn scope_flag(&self, uid: &str) -> FilterFlag {
        match self.0.get(uid) {
            Some(UidRule::Flag(f)) => *f,
            _ => FilterFlag::Unset,
        }
    }

    /// Method-level opinion for `(uid, method)`. A scope-level boolean
    /// carries no method-level opinion.
    pub fn method_flag(&self, uid: &str, method: &str) -> FilterFlag {
        match self.0.get(uid) {
            Some(UidRule::Methods(m)) => m.get(method).copied().unwrap_or_default(),
            _ => FilterFlag::Unset,
        }
    }
}

impl<'de> Deserialize<'de> for FilterRules {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Map(HashMap<String, UidRule>),
            Other(IgnoredAny),
        }

        Ok(match Raw::deserialize(de)? {
            Raw::Map(m) => FilterRules(m),
            Raw::Other(_) => {
                tracing::debug!("filter map is not a mapping, treating as empty");
                FilterRules::default()
            }
        })
    }
}

fn decide(mode: FilterMode, flag: FilterFlag) -> bool {
    !matches!(
        (mode, flag),
        (FilterMode::Allow, FilterFlag::Denied) | (FilterMode::Deny, FilterFlag::Allowed)
    )
}

/// Scope-level decision for one content-type UID.
///
/// `allow` rejects only an explicit `false`; `deny` rejects only an explicit
/// `true`; `none` always allows. An empty map never rejects in either mode.
pub fn is_allowable_scope(mode: FilterMode, uid: &str, rules: &FilterRules) -> bool {
    decide(mode, rules.scope_flag(uid))
}

/// Method-level decision, the same rule one level deeper than
/// [`is_allowable_scope`]: the lookup key is `(uid, method)`.
pub fn is_allowable_method(mode: FilterMode, uid: &str, method: &str, rules: &FilterRules) -> bool {
    decide(mode, rules.method_flag(uid, method))
}

/// A resolved `(mode, rules)` pair carried through a registry walk.
///
/// Scope and method checks for one content type must consult the same map,
/// so the walker resolves the pair once and threads it through.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub mode: FilterMode,
    pub rules: &'a FilterRules,
}

impl<'a> FilterContext<'a> {
    pub fn new(mode: FilterMode, rules: &'a FilterRules) -> Self {
        Self { mode, rules }
    }

    pub fn allows_scope(&self, uid: &str) -> bool {
        is_allowable_scope(self.mode, uid, self.rules)
    }

    pub fn allows_method(&self, uid: &str, method: &str) -> bool {
        is_allowable_method(self.mode, uid, method, self.rules)
    }
}
