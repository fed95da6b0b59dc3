//! Bidirectional codec between a generic structured value and typed objects
//! that declare their own field layout.
//!
//! Decoding trusts nothing about the input's shape beyond what the target
//! type's declared fields demand; encoding reconstructs the same generic
//! value from a typed object graph. The engine is a container stack: keyed,
//! unkeyed, and single-value views over a position in the tree, with nested
//! container creation, super-delegation for inheritance-style composition,
//! coding-path tracking on every error, checked numeric coercion, and
//! pluggable date/blob/key strategies.
//!
//! ```
//! use value_codec::{Decodable, DecodeError, Decoder, Encodable, EncodeError,
//!     Encoder, Value, ValueDecoder, ValueEncoder};
//!
//! struct Point {
//!     x: i64,
//!     y: i64,
//! }
//!
//! impl Decodable for Point {
//!     fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
//!         let keyed = decoder.keyed()?;
//!         Ok(Point {
//!             x: keyed.decode("x")?,
//!             y: keyed.decode("y")?,
//!         })
//!     }
//! }
//!
//! impl Encodable for Point {
//!     fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
//!         let mut keyed = encoder.keyed()?;
//!         keyed.encode("x", &self.x)?;
//!         keyed.encode("y", &self.y)
//!     }
//! }
//!
//! let input = Value::Object(vec![
//!     ("x".to_owned(), Value::Int(3)),
//!     ("y".to_owned(), Value::Int(-4)),
//! ]);
//! let point: Point = ValueDecoder::new().decode(&input).unwrap();
//! let output = ValueEncoder::new().encode(&point).unwrap();
//! assert_eq!(output, input);
//! ```

mod config;
mod decoder;
mod encoder;
mod error;
mod json;
mod path;
mod value;

pub use config::{BlobStrategy, CoderConfig, DateStrategy, KeyStrategy};
pub use decoder::{Decodable, Decoder, KeyedDecoder, ScalarDecoder, UnkeyedDecoder};
pub use encoder::{Encodable, Encoder, KeyedEncoder, ScalarEncoder, UnkeyedEncoder};
pub use error::{DecodeError, EncodeError};
pub use path::{CodingPath, PathEntry};
pub use value::{Blob, Value, ValueKind};

/// Top-level decode driver. Holds the strategy context for every traversal
/// it runs; each `decode` call owns an independent container stack.
#[derive(Debug, Clone, Default)]
pub struct ValueDecoder {
    config: CoderConfig,
}

impl ValueDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CoderConfig) -> Self {
        ValueDecoder { config }
    }

    pub fn config(&self) -> &CoderConfig {
        &self.config
    }

    /// Decodes a typed object out of a generic value, or fails with the
    /// first error encountered anywhere in the traversal.
    pub fn decode<T: Decodable>(&self, value: &Value) -> Result<T, DecodeError> {
        T::decode(&Decoder::root(value, &self.config))
    }
}

/// Top-level encode driver, the mirror of [`ValueDecoder`].
#[derive(Debug, Clone, Default)]
pub struct ValueEncoder {
    config: CoderConfig,
}

impl ValueEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CoderConfig) -> Self {
        ValueEncoder { config }
    }

    pub fn config(&self) -> &CoderConfig {
        &self.config
    }

    /// Encodes a typed object into a generic value.
    pub fn encode<T: Encodable + ?Sized>(&self, value: &T) -> Result<Value, EncodeError> {
        let mut encoder = Encoder::root(&self.config);
        value.encode(&mut encoder)?;
        Ok(encoder.into_value())
    }
}
