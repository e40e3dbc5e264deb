//! Newtype wrappers for identifiers to ensure type safety.
//!
//! The API assigns identifiers as integers, but clients treat them as opaque
//! strings. Every id type accepts either form on the wire. Ids that hold a
//! canonical integer are written back as integers so the service can decode
//! them; anything else is written as a string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Wire representation of an identifier: JSON string or JSON integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Parses `s` as an integer only if formatting it back yields `s` unchanged.
fn canonical_integer(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().filter(|n| n.to_string() == s)
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            /// Create a new id from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the inner string reference.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Returns true if the id is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match canonical_integer(&self.0) {
                    Some(n) => serializer.serialize_i64(n),
                    None => serializer.serialize_str(&self.0),
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into()))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<i64> for $name {
            fn from(n: i64) -> Self {
                Self(n.to_string())
            }
        }
    };
}

define_id!(
    /// Identifier of a research task, assigned by the service on submission.
    TaskId
);

define_id!(
    /// Identifier of a resume analysis, assigned by the service on upload.
    AnalysisId
);

define_id!(
    /// Identifier of an uploaded PDF document.
    DocumentId
);

define_id!(
    /// Identifier of a PDF chat session.
    SessionId
);

define_id!(
    /// Identifier of a text-to-SQL query record.
    QueryId
);

define_id!(
    /// Identifier of a registered user.
    UserId
);
