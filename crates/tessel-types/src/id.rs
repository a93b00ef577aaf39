//! String-backed identifiers.
//!
//! All identifiers on the wire are plain JSON strings. The newtypes exist so
//! that a `TileId` can never be passed where a `NodeId` is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a string value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the underlying string.
            pub fn into_string(self) -> String {
                self.0
            }

            /// Returns `true` if the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
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

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Opaque, lexicographically sortable event identifier.
    ///
    /// Ordering is plain byte-wise string ordering; it is the tie-breaker
    /// after the logical timestamp in the materializer's deterministic sort.
    EventId
);

string_id!(
    /// Identifier of a collaborative space.
    SpaceId
);

string_id!(
    /// Spatial partition key inside a space.
    TileId
);

string_id!(
    /// Identifier of an editing layer.
    LayerId
);

string_id!(
    /// Identifier of the actor (user, service, solver) that authored an event.
    ActorId
);

string_id!(
    /// Identifier of a materialized node.
    NodeId
);

impl EventId {
    /// Generate a fresh time-ordered identifier (UUID v7).
    ///
    /// The hyphenated lowercase form of a v7 UUID sorts lexicographically in
    /// creation order.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }
}
