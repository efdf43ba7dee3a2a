//! Typed document identifiers.
//!
//! All identifiers are 24-character hexadecimal strings (the document
//! store's object id format). Parsing rejects anything else with
//! `InvalidArgument`, so a malformed id never reaches the store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const ID_LEN: usize = 24;

fn is_object_id(raw: &str) -> bool {
    raw.len() == ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit())
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: &str) -> Result<Self> {
                let raw = raw.trim();
                if is_object_id(raw) {
                    Ok(Self(raw.to_ascii_lowercase()))
                } else {
                    Err(Error::InvalidArgument(format!("Invalid {} id: {raw:?}", $label)))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(raw: String) -> Result<Self> {
                Self::parse(&raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(raw: &str) -> Result<Self> {
                Self::parse(raw)
            }
        }
    };
}

define_id!(
    /// Identifier of a listed property.
    PropertyId,
    "property"
);
define_id!(
    /// Identifier of a user, as issued by the session provider.
    UserId,
    "user"
);
define_id!(ReviewId, "review");
define_id!(MessageId, "message");
