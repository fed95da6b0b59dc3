//! Decode→encode round trips over hand-written capability conformances.

use value_codec::{
    Decodable, DecodeError, Decoder, Encodable, EncodeError, Encoder, Value, ValueDecoder,
    ValueEncoder,
};

fn obj(fields: &[(&str, Value)]) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect(),
    )
}

fn roundtrip<T: Decodable + Encodable>(input: &Value) -> Value {
    let decoded: T = ValueDecoder::new()
        .decode(input)
        .unwrap_or_else(|err| panic!("decode failed: {err}"));
    ValueEncoder::new()
        .encode(&decoded)
        .unwrap_or_else(|err| panic!("encode failed: {err}"))
}

#[derive(Debug, PartialEq)]
struct Simple {
    a: i64,
    b: String,
}

impl Decodable for Simple {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        let keyed = decoder.keyed()?;
        Ok(Simple {
            a: keyed.decode("a")?,
            b: keyed.decode("b")?,
        })
    }
}

impl Encodable for Simple {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut keyed = encoder.keyed()?;
        keyed.encode("a", &self.a)?;
        keyed.encode("b", &self.b)
    }
}

#[test]
fn simple_structure_roundtrip() {
    let input = obj(&[("a", Value::Int(4)), ("b", Value::Str("Hello".into()))]);
    assert_eq!(roundtrip::<Simple>(&input), input);
}

struct Containing {
    t: Simple,
}

impl Decodable for Containing {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        let keyed = decoder.keyed()?;
        Ok(Containing {
            t: keyed.decode("t")?,
        })
    }
}

impl Encodable for Containing {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut keyed = encoder.keyed()?;
        keyed.encode("t", &self.t)
    }
}

#[test]
fn containing_structure_roundtrip() {
    let input = obj(&[(
        "t",
        obj(&[("a", Value::Int(4)), ("b", Value::Str("Hello".into()))]),
    )]);
    assert_eq!(roundtrip::<Containing>(&input), input);
}

/// Splits `age` and a nested `name` object through explicit nested
/// containers rather than a nested conformance.
struct Person {
    age: i64,
    firstname: String,
    surname: String,
}

impl Decodable for Person {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        let keyed = decoder.keyed()?;
        let name = keyed.nested_keyed("name")?;
        Ok(Person {
            age: keyed.decode("age")?,
            firstname: name.decode("firstname")?,
            surname: name.decode("surname")?,
        })
    }
}

impl Encodable for Person {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut keyed = encoder.keyed()?;
        keyed.encode("age", &self.age)?;
        keyed.nested_keyed("name", |name| {
            name.encode("firstname", &self.firstname)?;
            name.encode("surname", &self.surname)
        })
    }
}

#[test]
fn nested_container_roundtrip() {
    let input = obj(&[
        ("age", Value::Int(25)),
        (
            "name",
            obj(&[
                ("firstname", Value::Str("John".into())),
                ("surname", Value::Str("Smith".into())),
            ]),
        ),
    ]);
    assert_eq!(roundtrip::<Person>(&input), input);
}

struct Base {
    a: i64,
}

impl Decodable for Base {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        let keyed = decoder.keyed()?;
        Ok(Base {
            a: keyed.decode("a")?,
        })
    }
}

impl Encodable for Base {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut keyed = encoder.keyed()?;
        keyed.encode("a", &self.a)
    }
}

/// Derived type delegating part of its layout to [`Base`] under the
/// reserved key `"Super"`, so base and derived fields coexist in one
/// object without collision.
struct Derived {
    base: Base,
    b: String,
}

impl Decodable for Derived {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        let keyed = decoder.keyed()?;
        let base = Base::decode(&keyed.super_decoder_key("Super")?)?;
        Ok(Derived {
            base,
            b: keyed.decode("B")?,
        })
    }
}

impl Encodable for Derived {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut keyed = encoder.keyed()?;
        keyed.encode("B", &self.b)?;
        keyed.super_encoder_key("Super", |sup| self.base.encode(sup))
    }
}

#[test]
fn super_delegation_roundtrip() {
    let derived = Derived {
        base: Base { a: 648 },
        b: "Test".to_owned(),
    };
    let encoded = ValueEncoder::new().encode(&derived).unwrap();
    assert_eq!(
        encoded,
        obj(&[
            ("B", Value::Str("Test".into())),
            ("Super", obj(&[("a", Value::Int(648))])),
        ])
    );

    let decoded: Derived = ValueDecoder::new().decode(&encoded).unwrap();
    assert_eq!(decoded.base.a, 648);
    assert_eq!(decoded.b, "Test");
}

struct DefaultSuper {
    base: Base,
    label: String,
}

impl Decodable for DefaultSuper {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        let keyed = decoder.keyed()?;
        Ok(DefaultSuper {
            base: Base::decode(&keyed.super_decoder()?)?,
            label: keyed.decode("label")?,
        })
    }
}

impl Encodable for DefaultSuper {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut keyed = encoder.keyed()?;
        keyed.encode("label", &self.label)?;
        keyed.super_encoder(|sup| self.base.encode(sup))
    }
}

#[test]
fn default_super_key_is_super() {
    let value = ValueEncoder::new()
        .encode(&DefaultSuper {
            base: Base { a: 1 },
            label: "x".to_owned(),
        })
        .unwrap();
    assert!(value.get("super").is_some());
}

struct WithOptional {
    required: i64,
    maybe: Option<String>,
}

impl Decodable for WithOptional {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        let keyed = decoder.keyed()?;
        Ok(WithOptional {
            required: keyed.decode("required")?,
            maybe: keyed.decode_opt("maybe")?,
        })
    }
}

impl Encodable for WithOptional {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut keyed = encoder.keyed()?;
        keyed.encode("required", &self.required)?;
        keyed.encode_opt("maybe", &self.maybe)
    }
}

#[test]
fn optional_field_absent_and_null_both_decode_to_none() {
    let decoder = ValueDecoder::new();

    let absent = obj(&[("required", Value::Int(1))]);
    let decoded: WithOptional = decoder.decode(&absent).unwrap();
    assert_eq!(decoded.maybe, None);

    let explicit_null = obj(&[("required", Value::Int(1)), ("maybe", Value::Null)]);
    let decoded: WithOptional = decoder.decode(&explicit_null).unwrap();
    assert_eq!(decoded.maybe, None);

    let present = obj(&[
        ("required", Value::Int(1)),
        ("maybe", Value::Str("here".into())),
    ]);
    let decoded: WithOptional = decoder.decode(&present).unwrap();
    assert_eq!(decoded.maybe, Some("here".to_owned()));
}

#[test]
fn optional_none_encodes_to_absent_key() {
    let encoded = ValueEncoder::new()
        .encode(&WithOptional {
            required: 1,
            maybe: None,
        })
        .unwrap();
    assert_eq!(encoded, obj(&[("required", Value::Int(1))]));
}

struct Repeated;

impl Encodable for Repeated {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut keyed = encoder.keyed()?;
        keyed.encode("k", &1i64)?;
        keyed.encode("other", &0i64)?;
        keyed.encode("k", &2i64)
    }
}

#[test]
fn last_write_wins_keeps_first_insertion_order() {
    let encoded = ValueEncoder::new().encode(&Repeated).unwrap();
    assert_eq!(
        encoded,
        obj(&[("k", Value::Int(2)), ("other", Value::Int(0))])
    );
}

struct Pair {
    left: i64,
    right: String,
}

impl Decodable for Pair {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        let mut seq = decoder.unkeyed()?;
        let left = seq.decode_next()?;
        let right = seq.decode_next()?;
        Ok(Pair { left, right })
    }
}

impl Encodable for Pair {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut seq = encoder.unkeyed()?;
        seq.encode_next(&self.left)?;
        seq.encode_next(&self.right)
    }
}

#[test]
fn unkeyed_roundtrip_and_cursor() {
    let input = Value::Array(vec![Value::Int(7), Value::Str("seven".into())]);
    assert_eq!(roundtrip::<Pair>(&input), input);
}

#[test]
fn unkeyed_cursor_state() {
    let input = Value::Array(vec![Value::Int(1), Value::Int(2)]);

    struct Probe;
    impl Decodable for Probe {
        fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
            let mut seq = decoder.unkeyed()?;
            assert_eq!(seq.len(), 2);
            assert_eq!(seq.index(), 0);
            assert!(!seq.is_at_end());
            let _: i64 = seq.decode_next()?;
            assert_eq!(seq.index(), 1);
            let _: i64 = seq.decode_next()?;
            assert!(seq.is_at_end());
            Ok(Probe)
        }
    }
    let _: Probe = ValueDecoder::new().decode(&input).unwrap();
}

struct Matrix {
    rows: Vec<Vec<i64>>,
}

impl Decodable for Matrix {
    fn decode(decoder: &Decoder<'_>) -> Result<Self, DecodeError> {
        let keyed = decoder.keyed()?;
        Ok(Matrix {
            rows: keyed.decode("rows")?,
        })
    }
}

impl Encodable for Matrix {
    fn encode(&self, encoder: &mut Encoder<'_>) -> Result<(), EncodeError> {
        let mut keyed = encoder.keyed()?;
        keyed.nested_unkeyed("rows", |rows| {
            for row in &self.rows {
                rows.nested_unkeyed_next(|cells| {
                    for cell in row {
                        cells.encode_next(cell)?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    }
}

#[test]
fn nested_unkeyed_containers_preserve_sequence_order() {
    let input = obj(&[(
        "rows",
        Value::Array(vec![
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            Value::Array(vec![Value::Int(3)]),
            Value::Array(vec![]),
        ]),
    )]);
    assert_eq!(roundtrip::<Matrix>(&input), input);
}
