//! Authority and visibility metadata carried by every event.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! scope_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every accepted wire value, in declaration order.
            pub const VARIANTS: &'static [&'static str] = &[$($text),+];

            /// The wire value of this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Parse a wire value, returning `None` for anything not allowed.
            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

scope_enum!(
    /// Who may see the event.
    Realm {
        Personal => "personal",
        Team => "team",
        Public => "public",
    }
);

scope_enum!(
    /// Whether the event is ground truth or a computed projection.
    Authority {
        /// Authoritative, symbolic facts. Never carries numeric measurements.
        Source => "source",
        /// Computed output (layouts, physics, features).
        Derived => "derived",
    }
);

scope_enum!(
    /// Position of the event relative to the tile boundary.
    Boundary {
        Interior => "interior",
        Boundary => "boundary",
        Exterior => "exterior",
    }
);

scope_enum!(
    /// Optional disclosure policy.
    Policy {
        Public => "public",
        Private => "private",
        Redacted => "redacted",
    }
);

/// Scope of an event: realm, authority, boundary, and optional policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub realm: Realm,
    pub authority: Authority,
    pub boundary: Boundary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,
}

impl Scope {
    /// Personal, interior, authoritative scope.
    pub fn source() -> Self {
        Self {
            realm: Realm::Personal,
            authority: Authority::Source,
            boundary: Boundary::Interior,
            policy: None,
        }
    }

    /// Personal, interior, derived scope.
    pub fn derived() -> Self {
        Self {
            authority: Authority::Derived,
            ..Self::source()
        }
    }

    pub fn is_source(&self) -> bool {
        self.authority == Authority::Source
    }

    pub fn is_derived(&self) -> bool {
        self.authority == Authority::Derived
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::source()
    }
}
