//! Globally unique identifiers for network elements.
//!
//! Every node and edge carries an [`Id`]. Ids are the only cross-reference
//! mechanism used by the persistence formats, and two elements compare equal
//! exactly when their ids do.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A 128-bit identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
    /// Generate a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The all-zero identifier, used by the record format for "no reference".
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// True for [`Id::nil`].
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse an identifier, reporting which element the text belonged to.
    pub fn parse_for(text: &str, context: &str) -> Result<Self> {
        text.parse()
            .map_err(|_| Error::parse(format!("{context}: invalid identifier '{text}'")))
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| Error::parse(format!("invalid identifier '{s}': {e}")))
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_unique() {
        let a = Id::new();
        let b = Id::new();
        assert_ne!(a, b);
        assert!(!a.is_nil());
    }

    #[test]
    fn test_display_parse_round_trip() {
        let id = Id::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        let parsed: Id = text.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_invalid() {
        let result = "not-a-uuid".parse::<Id>();
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_for_context() {
        let err = Id::parse_for("zzz", "edge end1").unwrap_err();
        assert!(err.to_string().contains("edge end1"));
    }

    #[test]
    fn test_nil() {
        assert!(Id::nil().is_nil());
        assert_eq!(Id::nil().to_string(), "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_serde_transparent() {
        let id = Id::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
