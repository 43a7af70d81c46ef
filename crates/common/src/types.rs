use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// Length of the hexadecimal form of every entity identifier.
pub const HEX_ID_LEN: usize = 32;

/// Error returned when a string is not a valid hex-encoded identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} id '{input}': expected {HEX_ID_LEN} hexadecimal characters")]
pub struct IdParseError {
    pub kind: &'static str,
    pub input: String,
}

fn parse_hex(kind: &'static str, input: &str) -> Result<Uuid, IdParseError> {
    let err = || IdParseError {
        kind,
        input: input.to_string(),
    };
    if input.len() != HEX_ID_LEN || !input.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(err());
    }
    Uuid::try_parse(input).map_err(|_| err())
}

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Parses the 32-character hexadecimal form.
            pub fn parse_hex(input: &str) -> Result<Self, IdParseError> {
                parse_hex($kind, input).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.simple())
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse_hex(s)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::parse_hex(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_id!(
    /// Identifier of a catalog product.
    ProductId,
    "product"
);

hex_id!(
    /// Identifier of a committed order.
    OrderId,
    "order"
);

hex_id!(
    /// Identifier of a single cart line.
    CartLineId,
    "cart line"
);

/// Identity of an authenticated caller.
///
/// Issued by the upstream authentication layer and treated as opaque here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
