pub mod auth;
pub mod files;
pub mod pages;
pub mod public;
pub mod qrs;

use serde::{Deserialize, Deserializer};

/// For `#[serde(default, deserialize_with = "...")]` on nullable patch
/// fields: absent stays `None`, `null` becomes `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
