// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Person data model.
//
// A `Person` is keyed by a client-assigned UUID and owns an ordered list of
// `Communication` values. Every write replaces the whole record, so the
// communications list has no identity of its own.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a [`Person`].
///
/// Serialized as the canonical hyphenated UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(Uuid);

impl PersonId {
    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a random identifier.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// The all-zero identifier, which never names a stored person.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for PersonId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for PersonId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A single contact value (email, phone number, ...) owned by a person.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Communication {
    pub value: String,
}

impl Communication {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// The managed resource.
///
/// `name` and `communications` default to empty when missing from input;
/// `id` is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub communications: Vec<Communication>,
}

impl Person {
    /// Build a person from an id, a name and a list of contact values.
    pub fn new<I, S>(id: PersonId, name: impl Into<String>, communications: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            name: name.into(),
            communications: communications.into_iter().map(Communication::new).collect(),
        }
    }

    /// True if any communication value equals `value` exactly.
    pub fn has_communication(&self, value: &str) -> bool {
        self.communications.iter().any(|c| c.value == value)
    }
}

// `"communications": null` is accepted and read as an empty list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Communication>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Communication>>::deserialize(deserializer)?.unwrap_or_default())
}
