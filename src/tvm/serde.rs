//! serde support for cells
//!
//! A cell is written as its BoC: a base64 string for human readable formats
//! (JSON, TOML) and raw bytes otherwise.

use crate::tvm::boc;
use crate::tvm::cell::Cell;
use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            let encoded = boc::boc_to_base64(self).map_err(<S::Error as serde::ser::Error>::custom)?;
            serializer.serialize_str(&encoded)
        } else {
            let bytes = boc::serialize_boc(self).map_err(<S::Error as serde::ser::Error>::custom)?;
            serializer.serialize_bytes(&bytes)
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let is_human_readable = deserializer.is_human_readable();
        let bytes = deserializer.deserialize_bytes(BocVisitor)?;

        let cell = if is_human_readable {
            let encoded = std::str::from_utf8(&bytes).map_err(D::Error::custom)?;
            boc::base64_to_boc(encoded)
        } else {
            boc::deserialize_boc(&bytes)
        }
        .map_err(D::Error::custom)?;

        Ok(Arc::unwrap_or_clone(cell))
    }
}

/// Accepts both strings and byte arrays, borrowing when possible
struct BocVisitor;

impl<'de> Visitor<'de> for BocVisitor {
    type Value = Cow<'de, [u8]>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a BoC as a base64 string or a byte array")
    }

    fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Cow::Owned(v.as_bytes().to_vec()))
    }

    fn visit_borrowed_str<E: Error>(self, v: &'de str) -> Result<Self::Value, E> {
        Ok(Cow::Borrowed(v.as_bytes()))
    }

    fn visit_string<E: Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Cow::Owned(v.into_bytes()))
    }

    fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(Cow::Owned(v.to_vec()))
    }

    fn visit_borrowed_bytes<E: Error>(self, v: &'de [u8]) -> Result<Self::Value, E> {
        Ok(Cow::Borrowed(v))
    }

    fn visit_byte_buf<E: Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(Cow::Owned(v))
    }
}
