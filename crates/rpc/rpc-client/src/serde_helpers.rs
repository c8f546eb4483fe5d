//! Deserializers for the node's JSON encodings.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Quantity {
    Num(u64),
    Str(String),
}

/// Integers are usually sent as decimal strings.
pub(crate) fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Quantity::deserialize(deserializer)? {
        Quantity::Num(n) => Ok(n),
        Quantity::Str(s) => s.parse().map_err(de::Error::custom),
    }
}

/// Case-insensitive hex, `null` and `""` decode to no bytes.
pub(crate) fn hex_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    hex::decode(s).map_err(de::Error::custom)
}

pub(crate) fn base64_bytes<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<u8>, D::Error> {
    let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    STANDARD.decode(s).map_err(de::Error::custom)
}

/// A list of base64 strings, `null` decodes to an empty list.
pub(crate) fn base64_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Vec<u8>>, D::Error> {
    Option::<Vec<String>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(|s| STANDARD.decode(s).map_err(de::Error::custom))
        .collect()
}
