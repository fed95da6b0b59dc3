//! Decoding container stack.
//!
//! A type's [`Decodable::decode`] routine asks the [`Decoder`] for a keyed,
//! unkeyed, or single-value view over the current generic value, and pulls
//! its fields out of that view. Nested and super-delegated decodes re-enter
//! the stack on a sub-value with an extended coding path. Any failure at any
//! depth aborts the whole decode.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};

use crate::config::{BlobStrategy, CoderConfig, DateStrategy};
use crate::error::DecodeError;
use crate::path::CodingPath;
use crate::value::{Blob, Value, ValueKind};

/// Bound on container nesting. Pathologically deep inputs fail with
/// [`DecodeError::DepthLimitExceeded`] instead of exhausting the call stack.
pub(crate) const MAX_DEPTH: usize = 128;

/// Reserved key used by the no-argument super-delegation entry points.
pub(crate) const SUPER_KEY: &str = "super";

/// Self-describing decode capability. Implemented by hand (or by a separate
/// codegen step); the core never inspects a type's internals.
pub trait Decodable: Sized {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError>;
}

/// Cursor over a single position in the input value tree.
pub struct Decoder<'de> {
    value: &'de Value,
    config: &'de CoderConfig,
    path: CodingPath,
    depth: usize,
}

impl<'de> Decoder<'de> {
    pub(crate) fn root(value: &'de Value, config: &'de CoderConfig) -> Self {
        Decoder {
            value,
            config,
            path: CodingPath::root(),
            depth: MAX_DEPTH,
        }
    }

    fn at(
        value: &'de Value,
        config: &'de CoderConfig,
        path: CodingPath,
        depth: usize,
    ) -> Result<Self, DecodeError> {
        if depth == 0 {
            return Err(DecodeError::DepthLimitExceeded { path });
        }
        Ok(Decoder {
            value,
            config,
            path,
            depth: depth - 1,
        })
    }

    /// The generic value this decoder is positioned at.
    pub fn value(&self) -> &'de Value {
        self.value
    }

    pub fn path(&self) -> &CodingPath {
        &self.path
    }

    pub fn config(&self) -> &CoderConfig {
        self.config
    }

    /// Keyed (struct-like) view. Fails unless the current value is an
    /// `Object`.
    pub fn keyed(&self) -> Result<KeyedDecoder<'de>, DecodeError> {
        match self.value {
            Value::Object(entries) => Ok(KeyedDecoder {
                entries,
                config: self.config,
                path: self.path.clone(),
                depth: self.depth,
            }),
            other => Err(DecodeError::TypeMismatch {
                expected: ValueKind::Object,
                found: other.kind(),
                path: self.path.clone(),
            }),
        }
    }

    /// Unkeyed (sequence) view. Fails unless the current value is an `Array`.
    pub fn unkeyed(&self) -> Result<UnkeyedDecoder<'de>, DecodeError> {
        match self.value {
            Value::Array(items) => Ok(UnkeyedDecoder {
                items,
                config: self.config,
                path: self.path.clone(),
                depth: self.depth,
                cursor: 0,
            }),
            other => Err(DecodeError::TypeMismatch {
                expected: ValueKind::Array,
                found: other.kind(),
                path: self.path.clone(),
            }),
        }
    }

    /// Single-value view over the current value, for scalar leaf types.
    pub fn scalar(&self) -> ScalarDecoder<'de> {
        ScalarDecoder {
            value: self.value,
            config: self.config,
            path: self.path.clone(),
        }
    }
}

/// Keyed decoding view over an `Object`'s entries.
pub struct KeyedDecoder<'de> {
    entries: &'de [(String, Value)],
    config: &'de CoderConfig,
    path: CodingPath,
    depth: usize,
}

impl<'de> KeyedDecoder<'de> {
    fn lookup(&self, key: &str) -> Option<&'de Value> {
        let stored = self.config.key.apply(key);
        self.entries
            .iter()
            .find(|(name, _)| name.as_str() == stored.as_ref())
            .map(|(_, value)| value)
    }

    fn child(&self, key: &str, value: &'de Value) -> Result<Decoder<'de>, DecodeError> {
        Decoder::at(value, self.config, self.path.child_key(key), self.depth)
    }

    fn require(&self, key: &str) -> Result<&'de Value, DecodeError> {
        self.lookup(key).ok_or_else(|| DecodeError::KeyNotFound {
            key: key.to_owned(),
            path: self.path.clone(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Stored entry keys, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &'de str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decodes a required field. A missing key fails with `KeyNotFound`;
    /// a `Null` value fails inside the field's own decode for non-optional
    /// targets.
    pub fn decode<T: Decodable>(&self, key: &str) -> Result<T, DecodeError> {
        let value = self.require(key)?;
        T::decode(&self.child(key, value)?)
    }

    /// Decodes an optional field. Absence and explicit `Null` both yield
    /// `None`, never an error.
    pub fn decode_opt<T: Decodable>(&self, key: &str) -> Result<Option<T>, DecodeError> {
        match self.lookup(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::decode(&self.child(key, value)?).map(Some),
        }
    }

    /// Re-enters the stack with a keyed view over the sub-value at `key`.
    pub fn nested_keyed(&self, key: &str) -> Result<KeyedDecoder<'de>, DecodeError> {
        self.child(key, self.require(key)?)?.keyed()
    }

    /// Re-enters the stack with an unkeyed view over the sub-value at `key`.
    pub fn nested_unkeyed(&self, key: &str) -> Result<UnkeyedDecoder<'de>, DecodeError> {
        self.child(key, self.require(key)?)?.unkeyed()
    }

    /// Decoder scoped to the reserved `"super"` key, letting a derived type
    /// run a base type's decode routine over its own nested slot.
    pub fn super_decoder(&self) -> Result<Decoder<'de>, DecodeError> {
        self.super_decoder_key(SUPER_KEY)
    }

    /// Super-delegation under a caller-chosen reserved key.
    pub fn super_decoder_key(&self, key: &str) -> Result<Decoder<'de>, DecodeError> {
        self.child(key, self.require(key)?)
    }
}

/// Unkeyed decoding view with a sequential cursor.
pub struct UnkeyedDecoder<'de> {
    items: &'de [Value],
    config: &'de CoderConfig,
    path: CodingPath,
    depth: usize,
    cursor: usize,
}

impl<'de> UnkeyedDecoder<'de> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index the next read will consume.
    pub fn index(&self) -> usize {
        self.cursor
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor >= self.items.len()
    }

    fn next_value(&mut self) -> Result<(usize, &'de Value), DecodeError> {
        if self.is_at_end() {
            return Err(DecodeError::EndOfContainer {
                path: self.path.child_index(self.cursor),
            });
        }
        let index = self.cursor;
        self.cursor += 1;
        Ok((index, &self.items[index]))
    }

    fn child(&self, index: usize, value: &'de Value) -> Result<Decoder<'de>, DecodeError> {
        Decoder::at(value, self.config, self.path.child_index(index), self.depth)
    }

    /// Decodes the next element, advancing the cursor. Reading past the end
    /// fails with `EndOfContainer`.
    pub fn decode_next<T: Decodable>(&mut self) -> Result<T, DecodeError> {
        let (index, value) = self.next_value()?;
        T::decode(&self.child(index, value)?)
    }

    /// Decodes the next element, consuming an explicit `Null` as `None`.
    pub fn decode_next_opt<T: Decodable>(&mut self) -> Result<Option<T>, DecodeError> {
        let (index, value) = self.next_value()?;
        match value {
            Value::Null => Ok(None),
            other => T::decode(&self.child(index, other)?).map(Some),
        }
    }

    pub fn nested_keyed_next(&mut self) -> Result<KeyedDecoder<'de>, DecodeError> {
        let (index, value) = self.next_value()?;
        self.child(index, value)?.keyed()
    }

    pub fn nested_unkeyed_next(&mut self) -> Result<UnkeyedDecoder<'de>, DecodeError> {
        let (index, value) = self.next_value()?;
        self.child(index, value)?.unkeyed()
    }

    /// Decoder over the next element, for super-delegation inside sequences.
    pub fn super_decoder_next(&mut self) -> Result<Decoder<'de>, DecodeError> {
        let (index, value) = self.next_value()?;
        self.child(index, value)
    }
}

/// Single-value decoding view with checked scalar coercion.
pub struct ScalarDecoder<'de> {
    value: &'de Value,
    config: &'de CoderConfig,
    path: CodingPath,
}

impl<'de> ScalarDecoder<'de> {
    fn mismatch(&self, expected: ValueKind) -> DecodeError {
        DecodeError::TypeMismatch {
            expected,
            found: self.value.kind(),
            path: self.path.clone(),
        }
    }

    fn overflow(&self) -> DecodeError {
        DecodeError::NumberOverflow {
            path: self.path.clone(),
        }
    }

    fn strategy_input(&self, detail: impl Into<String>) -> DecodeError {
        DecodeError::InvalidStrategyInput {
            path: self.path.clone(),
            detail: detail.into(),
        }
    }

    fn require_non_null(&self) -> Result<(), DecodeError> {
        if self.value.is_null() {
            return Err(DecodeError::ValueNotFound {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn decode_bool(&self) -> Result<bool, DecodeError> {
        self.require_non_null()?;
        match *self.value {
            Value::Bool(v) => Ok(v),
            _ => Err(self.mismatch(ValueKind::Bool)),
        }
    }

    /// Widened integer read feeding every fixed-width target. Floats are
    /// accepted only when finite with zero fraction; everything in range is
    /// exact, everything else is `NumberOverflow`.
    fn integer(&self) -> Result<i128, DecodeError> {
        self.require_non_null()?;
        match *self.value {
            Value::Int(v) => Ok(i128::from(v)),
            Value::UInt(v) => Ok(i128::from(v)),
            Value::Float(v) => {
                let in_range = v >= -9.223_372_036_854_776e18 && v < 1.844_674_407_370_955_2e19;
                if v.is_finite() && v.fract() == 0.0 && in_range {
                    Ok(v as i128)
                } else {
                    Err(self.overflow())
                }
            }
            _ => Err(self.mismatch(ValueKind::Int)),
        }
    }

    pub fn decode_i64(&self) -> Result<i64, DecodeError> {
        i64::try_from(self.integer()?).map_err(|_| self.overflow())
    }

    pub fn decode_i32(&self) -> Result<i32, DecodeError> {
        i32::try_from(self.integer()?).map_err(|_| self.overflow())
    }

    pub fn decode_i16(&self) -> Result<i16, DecodeError> {
        i16::try_from(self.integer()?).map_err(|_| self.overflow())
    }

    pub fn decode_i8(&self) -> Result<i8, DecodeError> {
        i8::try_from(self.integer()?).map_err(|_| self.overflow())
    }

    pub fn decode_u64(&self) -> Result<u64, DecodeError> {
        u64::try_from(self.integer()?).map_err(|_| self.overflow())
    }

    pub fn decode_u32(&self) -> Result<u32, DecodeError> {
        u32::try_from(self.integer()?).map_err(|_| self.overflow())
    }

    pub fn decode_u16(&self) -> Result<u16, DecodeError> {
        u16::try_from(self.integer()?).map_err(|_| self.overflow())
    }

    pub fn decode_u8(&self) -> Result<u8, DecodeError> {
        u8::try_from(self.integer()?).map_err(|_| self.overflow())
    }

    pub fn decode_f64(&self) -> Result<f64, DecodeError> {
        self.require_non_null()?;
        match *self.value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            Value::UInt(v) => Ok(v as f64),
            _ => Err(self.mismatch(ValueKind::Float)),
        }
    }

    /// Narrowing read. A non-finite source, or a finite source whose
    /// narrowed result overflows to infinity, fails with `NumberOverflow`.
    pub fn decode_f32(&self) -> Result<f32, DecodeError> {
        let wide = self.decode_f64()?;
        if !wide.is_finite() {
            return Err(self.overflow());
        }
        let narrow = wide as f32;
        if narrow.is_infinite() {
            return Err(self.overflow());
        }
        Ok(narrow)
    }

    pub fn decode_str(&self) -> Result<&'de str, DecodeError> {
        self.require_non_null()?;
        match self.value {
            Value::Str(v) => Ok(v.as_str()),
            _ => Err(self.mismatch(ValueKind::Str)),
        }
    }

    pub fn decode_string(&self) -> Result<String, DecodeError> {
        self.decode_str().map(str::to_owned)
    }

    /// Blob read under the active blob strategy (exact inverse of the encode
    /// side).
    pub fn decode_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        self.require_non_null()?;
        match self.config.blob {
            BlobStrategy::Base64 => {
                let text = self.decode_str()?;
                BASE64_STANDARD
                    .decode(text)
                    .map_err(|err| self.strategy_input(format!("invalid base64: {err}")))
            }
            BlobStrategy::Raw => match self.value {
                Value::Bytes(bytes) => Ok(bytes.clone()),
                _ => Err(self.mismatch(ValueKind::Bytes)),
            },
            BlobStrategy::Delegate => match self.value {
                Value::Array(items) => {
                    let mut bytes = Vec::with_capacity(items.len());
                    for (index, item) in items.iter().enumerate() {
                        let element = ScalarDecoder {
                            value: item,
                            config: self.config,
                            path: self.path.child_index(index),
                        };
                        bytes.push(element.decode_u8()?);
                    }
                    Ok(bytes)
                }
                _ => Err(self.mismatch(ValueKind::Array)),
            },
        }
    }

    /// Date read under the active date strategy.
    pub fn decode_datetime(&self) -> Result<DateTime<Utc>, DecodeError> {
        self.require_non_null()?;
        match &self.config.date {
            DateStrategy::EpochSeconds | DateStrategy::Delegate => {
                let seconds = self.decode_f64()?;
                self.datetime_from_unix(seconds)
            }
            DateStrategy::EpochMillis => match *self.value {
                // Integer millisecond counts reconstruct exactly; going
                // through f64 division would smear the sub-second nanos.
                Value::Int(_) | Value::UInt(_) => {
                    let millis = self.decode_i64()?;
                    DateTime::from_timestamp_millis(millis)
                        .ok_or_else(|| self.strategy_input("epoch offset out of range"))
                }
                _ => {
                    let millis = self.decode_f64()?;
                    self.datetime_from_unix(millis / 1000.0)
                }
            },
            DateStrategy::Iso8601 => {
                let text = self.decode_str()?;
                DateTime::parse_from_rfc3339(text)
                    .map(|parsed| parsed.with_timezone(&Utc))
                    .map_err(|err| self.strategy_input(format!("invalid RFC 3339 date: {err}")))
            }
            DateStrategy::Formatted(format) => {
                let text = self.decode_str()?;
                chrono::NaiveDateTime::parse_from_str(text, format)
                    .map(|naive| naive.and_utc())
                    .map_err(|err| {
                        self.strategy_input(format!("date `{text}` does not match format: {err}"))
                    })
            }
        }
    }

    fn datetime_from_unix(&self, seconds: f64) -> Result<DateTime<Utc>, DecodeError> {
        if !seconds.is_finite() {
            return Err(self.strategy_input("non-finite epoch offset"));
        }
        let whole = seconds.floor();
        if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
            return Err(self.strategy_input("epoch offset out of range"));
        }
        let nanos = ((seconds - whole) * 1e9).round() as u32;
        let nanos = nanos.min(999_999_999);
        DateTime::from_timestamp(whole as i64, nanos)
            .ok_or_else(|| self.strategy_input("epoch offset out of range"))
    }
}

impl Decodable for bool {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_bool()
    }
}

impl Decodable for i8 {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_i8()
    }
}

impl Decodable for i16 {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_i16()
    }
}

impl Decodable for i32 {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_i32()
    }
}

impl Decodable for i64 {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_i64()
    }
}

impl Decodable for u8 {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_u8()
    }
}

impl Decodable for u16 {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_u16()
    }
}

impl Decodable for u32 {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_u32()
    }
}

impl Decodable for u64 {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_u64()
    }
}

impl Decodable for f32 {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_f32()
    }
}

impl Decodable for f64 {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_f64()
    }
}

impl Decodable for String {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_string()
    }
}

impl Decodable for Blob {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_bytes().map(Blob)
    }
}

impl Decodable for DateTime<Utc> {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        decoder.scalar().decode_datetime()
    }
}

impl<T: Decodable> Decodable for Option<T> {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        if decoder.value().is_null() {
            return Ok(None);
        }
        T::decode(decoder).map(Some)
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        let mut seq = decoder.unkeyed()?;
        let mut items = Vec::with_capacity(seq.len());
        while !seq.is_at_end() {
            items.push(seq.decode_next()?);
        }
        Ok(items)
    }
}

impl<T: Decodable> Decodable for BTreeMap<String, T> {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        let keyed = decoder.keyed()?;
        let mut map = BTreeMap::new();
        let keys: Vec<String> = keyed.keys().map(str::to_owned).collect();
        for key in keys {
            let value = keyed.decode(&key)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}
