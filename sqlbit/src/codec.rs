//! Encode/decode pairs for field types the mapper cannot decompose into columns.
//!
//! The encoded bytes land in a single column with the backend's blob type.

use crate::error::OrmError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub struct ExternalCodec<V> {
    pub encode: fn(&V) -> Result<Vec<u8>, OrmError>,
    pub decode: fn(&[u8]) -> Result<V, OrmError>,
}

impl<V> Clone for ExternalCodec<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for ExternalCodec<V> {}

impl<V> ExternalCodec<V> {
    pub const fn new(encode: fn(&V) -> Result<Vec<u8>, OrmError>, decode: fn(&[u8]) -> Result<V, OrmError>) -> Self {
        Self { encode, decode }
    }
}

impl<V: Serialize + DeserializeOwned> ExternalCodec<V> {
    /// Compact binary encoding.
    pub fn bincode() -> Self {
        Self::new(|v| Ok(bincode::serialize(v)?), |bytes| Ok(bincode::deserialize(bytes)?))
    }

    /// Human readable JSON bytes, handy when the table is inspected by other tools.
    pub fn json() -> Self {
        Self::new(|v| Ok(serde_json::to_vec(v)?), |bytes| Ok(serde_json::from_slice(bytes)?))
    }
}
