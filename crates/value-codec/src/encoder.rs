//! Encoding container stack, the mirror of the decoding stack.
//!
//! A type's [`Encodable::encode`] routine is handed an [`Encoder`]
//! positioned at an empty slot (`Null`). Requesting a keyed or unkeyed
//! container lazily materializes the slot; nested and super-delegated
//! encodes run against a fresh child slot that is spliced into the parent
//! when the routine returns.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::{BlobStrategy, CoderConfig, DateStrategy};
use crate::decoder::{MAX_DEPTH, SUPER_KEY};
use crate::error::EncodeError;
use crate::path::CodingPath;
use crate::value::{Blob, Value, ValueKind};

/// Self-describing encode capability, the inverse of
/// [`Decodable`](crate::Decodable).
pub trait Encodable {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError>;
}

/// Cursor over a single pending slot in the value tree under construction.
pub struct Encoder<'a> {
    config: &'a CoderConfig,
    path: CodingPath,
    depth: usize,
    slot: Value,
}

impl<'a> Encoder<'a> {
    pub(crate) fn root(config: &'a CoderConfig) -> Self {
        Encoder {
            config,
            path: CodingPath::root(),
            depth: MAX_DEPTH,
            slot: Value::Null,
        }
    }

    fn child(&self, path: CodingPath) -> Result<Encoder<'a>, EncodeError> {
        if self.depth == 0 {
            return Err(EncodeError::DepthLimitExceeded { path });
        }
        Ok(Encoder {
            config: self.config,
            path,
            depth: self.depth - 1,
            slot: Value::Null,
        })
    }

    pub fn path(&self) -> &CodingPath {
        &self.path
    }

    pub fn config(&self) -> &CoderConfig {
        self.config
    }

    pub(crate) fn into_value(self) -> Value {
        self.slot
    }

    /// Keyed (struct-like) view. Materializes the slot as an empty `Object`
    /// on first request; fails if the slot already holds a non-object value.
    pub fn keyed(&mut self) -> Result<KeyedEncoder<'_, 'a>, EncodeError> {
        match &self.slot {
            Value::Null => self.slot = Value::Object(Vec::new()),
            Value::Object(_) => {}
            other => {
                return Err(EncodeError::ContainerMismatch {
                    expected: ValueKind::Object,
                    found: other.kind(),
                    path: self.path.clone(),
                })
            }
        }
        Ok(KeyedEncoder { enc: self })
    }

    /// Unkeyed (sequence) view, lazily materialized as an `Array`.
    pub fn unkeyed(&mut self) -> Result<UnkeyedEncoder<'_, 'a>, EncodeError> {
        match &self.slot {
            Value::Null => self.slot = Value::Array(Vec::new()),
            Value::Array(_) => {}
            other => {
                return Err(EncodeError::ContainerMismatch {
                    expected: ValueKind::Array,
                    found: other.kind(),
                    path: self.path.clone(),
                })
            }
        }
        Ok(UnkeyedEncoder { enc: self })
    }

    /// Single-value view. Each write replaces the slot's current tag.
    pub fn scalar(&mut self) -> ScalarEncoder<'_, 'a> {
        ScalarEncoder { enc: self }
    }
}

/// Keyed encoding view accumulating `Object` entries in insertion order.
pub struct KeyedEncoder<'e, 'a> {
    enc: &'e mut Encoder<'a>,
}

impl<'e, 'a> KeyedEncoder<'e, 'a> {
    fn entries_mut(&mut self) -> &mut Vec<(String, Value)> {
        match &mut self.enc.slot {
            Value::Object(entries) => entries,
            _ => unreachable!("keyed encoder slot is always an object"),
        }
    }

    /// Insert-or-replace under the unique-key invariant: last write for a
    /// given key within one container wins, keeping the first insertion's
    /// position.
    fn insert(&mut self, key: String, value: Value) {
        let entries = self.entries_mut();
        match entries.iter_mut().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }

    fn stored_key(&self, key: &str) -> String {
        self.enc.config.key.apply(key).into_owned()
    }

    pub fn encode<T: Encodable + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<(), EncodeError> {
        let mut child = self.enc.child(self.enc.path.child_key(key))?;
        value.encode(&mut child)?;
        let stored = self.stored_key(key);
        self.insert(stored, child.into_value());
        Ok(())
    }

    /// Encodes the value when present; skips the key entirely when absent.
    pub fn encode_opt<T: Encodable>(
        &mut self,
        key: &str,
        value: &Option<T>,
    ) -> Result<(), EncodeError> {
        match value {
            Some(inner) => self.encode(key, inner),
            None => Ok(()),
        }
    }

    /// Writes an explicit `Null` under `key`.
    pub fn encode_null(&mut self, key: &str) -> Result<(), EncodeError> {
        let stored = self.stored_key(key);
        self.insert(stored, Value::Null);
        Ok(())
    }

    /// Runs `build` against a fresh nested keyed container, then splices the
    /// produced sub-value in at `key`.
    pub fn nested_keyed<F>(&mut self, key: &str, build: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut KeyedEncoder<'_, 'a>) -> Result<(), EncodeError>,
    {
        let mut child = self.enc.child(self.enc.path.child_key(key))?;
        build(&mut child.keyed()?)?;
        let stored = self.stored_key(key);
        self.insert(stored, child.into_value());
        Ok(())
    }

    /// Runs `build` against a fresh nested unkeyed container, then splices
    /// the produced sub-value in at `key`.
    pub fn nested_unkeyed<F>(&mut self, key: &str, build: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut UnkeyedEncoder<'_, 'a>) -> Result<(), EncodeError>,
    {
        let mut child = self.enc.child(self.enc.path.child_key(key))?;
        build(&mut child.unkeyed()?)?;
        let stored = self.stored_key(key);
        self.insert(stored, child.into_value());
        Ok(())
    }

    /// Hands a base type's encode routine a slot nested under the reserved
    /// `"super"` key, so base and derived fields coexist in one object.
    /// Collision between the reserved key and a derived field's own key is a
    /// caller contract, not checked here.
    pub fn super_encoder<F>(&mut self, encode_super: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut Encoder<'_>) -> Result<(), EncodeError>,
    {
        self.super_encoder_key(SUPER_KEY, encode_super)
    }

    /// Super-delegation under a caller-chosen reserved key.
    pub fn super_encoder_key<F>(&mut self, key: &str, encode_super: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut Encoder<'_>) -> Result<(), EncodeError>,
    {
        let mut child = self.enc.child(self.enc.path.child_key(key))?;
        encode_super(&mut child)?;
        let stored = self.stored_key(key);
        self.insert(stored, child.into_value());
        Ok(())
    }
}

/// Unkeyed encoding view appending to an `Array`.
pub struct UnkeyedEncoder<'e, 'a> {
    enc: &'e mut Encoder<'a>,
}

impl<'e, 'a> UnkeyedEncoder<'e, 'a> {
    fn items_mut(&mut self) -> &mut Vec<Value> {
        match &mut self.enc.slot {
            Value::Array(items) => items,
            _ => unreachable!("unkeyed encoder slot is always an array"),
        }
    }

    fn next_index(&self) -> usize {
        match &self.enc.slot {
            Value::Array(items) => items.len(),
            _ => unreachable!("unkeyed encoder slot is always an array"),
        }
    }

    pub fn len(&self) -> usize {
        self.next_index()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encode_next<T: Encodable + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        let index = self.next_index();
        let mut child = self.enc.child(self.enc.path.child_index(index))?;
        value.encode(&mut child)?;
        self.items_mut().push(child.into_value());
        Ok(())
    }

    pub fn encode_next_null(&mut self) -> Result<(), EncodeError> {
        self.items_mut().push(Value::Null);
        Ok(())
    }

    pub fn nested_keyed_next<F>(&mut self, build: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut KeyedEncoder<'_, 'a>) -> Result<(), EncodeError>,
    {
        let index = self.next_index();
        let mut child = self.enc.child(self.enc.path.child_index(index))?;
        build(&mut child.keyed()?)?;
        self.items_mut().push(child.into_value());
        Ok(())
    }

    pub fn nested_unkeyed_next<F>(&mut self, build: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut UnkeyedEncoder<'_, 'a>) -> Result<(), EncodeError>,
    {
        let index = self.next_index();
        let mut child = self.enc.child(self.enc.path.child_index(index))?;
        build(&mut child.unkeyed()?)?;
        self.items_mut().push(child.into_value());
        Ok(())
    }

    /// Appends a slot produced by a base type's encode routine.
    pub fn super_encoder_next<F>(&mut self, encode_super: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut Encoder<'_>) -> Result<(), EncodeError>,
    {
        let index = self.next_index();
        let mut child = self.enc.child(self.enc.path.child_index(index))?;
        encode_super(&mut child)?;
        self.items_mut().push(child.into_value());
        Ok(())
    }
}

/// Single-value encoding view. Writes replace the slot's tag; strategies are
/// applied at each date/blob write.
pub struct ScalarEncoder<'e, 'a> {
    enc: &'e mut Encoder<'a>,
}

impl<'e, 'a> ScalarEncoder<'e, 'a> {
    fn put(&mut self, value: Value) {
        self.enc.slot = value;
    }

    pub fn write_null(&mut self) {
        self.put(Value::Null);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.put(Value::Bool(value));
    }

    pub fn write_i64(&mut self, value: i64) {
        self.put(Value::Int(value));
    }

    pub fn write_u64(&mut self, value: u64) {
        self.put(Value::UInt(value));
    }

    pub fn write_f64(&mut self, value: f64) {
        self.put(Value::Float(value));
    }

    pub fn write_str(&mut self, value: &str) {
        self.put(Value::Str(value.to_owned()));
    }

    /// Blob write under the active blob strategy.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let value = match self.enc.config.blob {
            BlobStrategy::Base64 => Value::Str(BASE64_STANDARD.encode(bytes)),
            BlobStrategy::Raw => Value::Bytes(bytes.to_vec()),
            BlobStrategy::Delegate => Value::Array(
                bytes
                    .iter()
                    .map(|byte| Value::UInt(u64::from(*byte)))
                    .collect(),
            ),
        };
        self.put(value);
    }

    /// Date write under the active date strategy.
    pub fn write_datetime(&mut self, datetime: &DateTime<Utc>) {
        let value = match &self.enc.config.date {
            DateStrategy::EpochSeconds => Value::Int(datetime.timestamp()),
            DateStrategy::EpochMillis => Value::Int(datetime.timestamp_millis()),
            DateStrategy::Iso8601 => {
                Value::Str(datetime.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            DateStrategy::Formatted(format) => Value::Str(datetime.format(format).to_string()),
            DateStrategy::Delegate => {
                let seconds = datetime.timestamp() as f64
                    + f64::from(datetime.timestamp_subsec_nanos()) / 1e9;
                Value::Float(seconds)
            }
        };
        self.put(value);
    }
}

impl Encodable for bool {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_bool(*self);
        Ok(())
    }
}

impl Encodable for i8 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_i64(i64::from(*self));
        Ok(())
    }
}

impl Encodable for i16 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_i64(i64::from(*self));
        Ok(())
    }
}

impl Encodable for i32 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_i64(i64::from(*self));
        Ok(())
    }
}

impl Encodable for i64 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_i64(*self);
        Ok(())
    }
}

impl Encodable for u8 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_u64(u64::from(*self));
        Ok(())
    }
}

impl Encodable for u16 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_u64(u64::from(*self));
        Ok(())
    }
}

impl Encodable for u32 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_u64(u64::from(*self));
        Ok(())
    }
}

impl Encodable for u64 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_u64(*self);
        Ok(())
    }
}

impl Encodable for f32 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_f64(f64::from(*self));
        Ok(())
    }
}

impl Encodable for f64 {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_f64(*self);
        Ok(())
    }
}

impl Encodable for str {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_str(self);
        Ok(())
    }
}

impl Encodable for String {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_str(self);
        Ok(())
    }
}

impl Encodable for Blob {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_bytes(&self.0);
        Ok(())
    }
}

impl Encodable for DateTime<Utc> {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        encoder.scalar().write_datetime(self);
        Ok(())
    }
}

impl<T: Encodable> Encodable for Option<T> {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        match self {
            Some(inner) => inner.encode(encoder),
            None => {
                encoder.scalar().write_null();
                Ok(())
            }
        }
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut seq = encoder.unkeyed()?;
        for item in self {
            seq.encode_next(item)?;
        }
        Ok(())
    }
}

impl<T: Encodable> Encodable for BTreeMap<String, T> {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut keyed = encoder.keyed()?;
        for (key, value) in self {
            keyed.encode(key, value)?;
        }
        Ok(())
    }
}
