//! Mapping between native Rust types and ASN.1 value trees.
//!
//! `AsnType` is implemented here for the primitive types and generated by
//! `#[derive(AsnType)]` for structs (SEQUENCE or SET) and enums (CHOICE).

use crate::common::{Length, Tag, TagAndLength};
use crate::constraint::Constraint;
use crate::error::{Error, Result};
use crate::marshal::{Encoder, TaggedEncoder};
use crate::types::{ComponentType, TypeDescriptor};
use crate::unmarshal::parse_tag_and_length;
use crate::value::{ObjectIdentifier, Real, Value};
use bit_vec::BitVec;
use num_bigint::BigInt;
use std::convert::TryFrom;

pub trait AsnType: Sized {
    fn descriptor() -> TypeDescriptor;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self>;

    /// Whether a field of this type may be absent from its SEQUENCE or SET.
    fn is_optional() -> bool {
        false
    }

    /// The value of a field of this type; `None` leaves it out.
    fn to_component(&self) -> Option<Value> {
        Some(self.to_value())
    }

    fn from_component(value: Option<Value>, name: &str) -> Result<Self> {
        match value {
            Some(v) => Self::from_value(v),
            None => Err(Error::mismatch(
                name,
                Self::descriptor().kind().name(),
                "absent component",
            )),
        }
    }
}

#[doc(hidden)]
pub fn unexpected(expected: &str, actual: impl ToString) -> Error {
    Error::mismatch("$", expected, actual)
}

impl AsnType for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::boolean()
    }

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<bool> {
        value.as_bool().ok_or_else(|| unexpected("BOOLEAN", value.kind_name()))
    }
}

macro_rules! asn_type_int {
    ($($t:ty),*) => {
        $(
            impl AsnType for $t {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::integer()
                        .with_constraint(Constraint::range(<$t>::MIN, <$t>::MAX))
                }

                fn to_value(&self) -> Value {
                    Value::Integer(BigInt::from(*self))
                }

                fn from_value(value: Value) -> Result<$t> {
                    match value.as_integer() {
                        Some(i) => <$t>::try_from(i).map_err(|_| unexpected(stringify!($t), i)),
                        None => Err(unexpected("INTEGER", value.kind_name())),
                    }
                }
            }
        )*
    };
}

asn_type_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl AsnType for BigInt {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::integer()
    }

    fn to_value(&self) -> Value {
        Value::Integer(self.clone())
    }

    fn from_value(value: Value) -> Result<BigInt> {
        match value {
            Value::Integer(i) | Value::Enumerated(i) => Ok(i),
            other => Err(unexpected("INTEGER", other.kind_name())),
        }
    }
}

impl AsnType for Vec<u8> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::octet_string()
    }

    fn to_value(&self) -> Value {
        Value::OctetString(self.clone())
    }

    fn from_value(value: Value) -> Result<Vec<u8>> {
        match value {
            Value::OctetString(bytes) => Ok(bytes),
            other => Err(unexpected("OCTET STRING", other.kind_name())),
        }
    }
}

impl AsnType for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::utf8_string()
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<String> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(unexpected("UTF8String", other.kind_name())),
        }
    }
}

impl AsnType for () {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::null()
    }

    fn to_value(&self) -> Value {
        Value::Null
    }

    fn from_value(value: Value) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            other => Err(unexpected("NULL", other.kind_name())),
        }
    }
}

impl AsnType for BitVec {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::bit_string()
    }

    fn to_value(&self) -> Value {
        Value::BitString(self.clone())
    }

    fn from_value(value: Value) -> Result<BitVec> {
        match value {
            Value::BitString(bits) => Ok(bits),
            other => Err(unexpected("BIT STRING", other.kind_name())),
        }
    }
}

impl AsnType for ObjectIdentifier {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::object_identifier()
    }

    fn to_value(&self) -> Value {
        Value::ObjectIdentifier(self.clone())
    }

    fn from_value(value: Value) -> Result<ObjectIdentifier> {
        match value {
            Value::ObjectIdentifier(oid) => Ok(oid),
            other => Err(unexpected("OBJECT IDENTIFIER", other.kind_name())),
        }
    }
}

impl AsnType for Real {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::real()
    }

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    fn from_value(value: Value) -> Result<Real> {
        match value {
            Value::Real(r) => Ok(r),
            other => Err(unexpected("REAL", other.kind_name())),
        }
    }
}

/// An OPTIONAL field.
///
/// Outside a SEQUENCE or SET there is nowhere to leave a value out, so
/// `None` stands alone as NULL.
impl<T: AsnType> AsnType for Option<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Option<T>> {
        T::from_value(value).map(Some)
    }

    fn is_optional() -> bool {
        true
    }

    fn to_component(&self) -> Option<Value> {
        self.as_ref().map(AsnType::to_value)
    }

    fn from_component(value: Option<Value>, _name: &str) -> Result<Option<T>> {
        value.map(T::from_value).transpose()
    }
}

/// `SEQUENCE OF T`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceOf<T>(pub Vec<T>);

/// `SET OF T`. DER and CER order the elements by their encoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetOf<T>(pub Vec<T>);

fn elements_of<T: AsnType>(items: Vec<Value>) -> Result<Vec<T>> {
    items.into_iter().map(T::from_value).collect()
}

impl<T: AsnType> AsnType for SequenceOf<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::sequence_of(T::descriptor())
    }

    fn to_value(&self) -> Value {
        Value::SequenceOf(self.0.iter().map(AsnType::to_value).collect())
    }

    fn from_value(value: Value) -> Result<SequenceOf<T>> {
        match value {
            Value::SequenceOf(items) => Ok(SequenceOf(elements_of(items)?)),
            other => Err(unexpected("SEQUENCE OF", other.kind_name())),
        }
    }
}

impl<T: AsnType> AsnType for SetOf<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::set_of(T::descriptor())
    }

    fn to_value(&self) -> Value {
        Value::SetOf(self.0.iter().map(AsnType::to_value).collect())
    }

    fn from_value(value: Value) -> Result<SetOf<T>> {
        match value {
            Value::SetOf(items) => Ok(SetOf(elements_of(items)?)),
            other => Err(unexpected("SET OF", other.kind_name())),
        }
    }
}

/// An undecoded element, for ANY slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawValue {
    pub tag: Tag,
    /// Content octets.
    pub bytes: Vec<u8>,
    /// The complete encoding. When empty, it is built from `tag` and `bytes`.
    pub full_bytes: Vec<u8>,
}

impl AsnType for RawValue {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::any()
    }

    fn to_value(&self) -> Value {
        if !self.full_bytes.is_empty() {
            return Value::Any(self.full_bytes.clone());
        }
        let t = TaggedEncoder {
            header: TagAndLength {
                tag: self.tag,
                length: Length::Definite(self.bytes.len()),
            },
            body: self.bytes.clone(),
        };
        Value::Any(t.encode())
    }

    fn from_value(value: Value) -> Result<RawValue> {
        let full_bytes = match value {
            Value::Any(raw) => raw,
            other => return Err(unexpected("ANY", other.kind_name())),
        };
        let (header, rest) = parse_tag_and_length(&full_bytes)
            .map_err(|e| Error::Encoding(format!("malformed ANY: {}", e)))?;
        let bytes = match header.length {
            Length::Definite(n) => rest.get(..n),
            Length::Indefinite => rest.get(..rest.len().saturating_sub(2)),
        }
        .ok_or_else(|| Error::Encoding("malformed ANY: truncated".to_string()))?
        .to_vec();
        Ok(RawValue {
            tag: header.tag,
            bytes,
            full_bytes,
        })
    }
}

/// How a derived field is tagged.
#[doc(hidden)]
#[derive(Clone, Copy, Debug)]
pub enum Tagging {
    Implicit(Tag),
    Explicit(Tag),
}

#[doc(hidden)]
pub fn tagged(descriptor: TypeDescriptor, tagging: Option<Tagging>) -> TypeDescriptor {
    match tagging {
        Some(Tagging::Implicit(tag)) => descriptor.tagged_implicitly(tag),
        Some(Tagging::Explicit(tag)) => descriptor.tagged_explicitly(tag),
        None => descriptor,
    }
}

#[doc(hidden)]
pub fn field<T: AsnType>(name: &str, tagging: Option<Tagging>) -> ComponentType {
    let descriptor = tagged(T::descriptor(), tagging);
    if T::is_optional() {
        ComponentType::optional(name, descriptor)
    } else {
        ComponentType::required(name, descriptor)
    }
}

#[doc(hidden)]
pub fn components_of(value: Value, expected: &str) -> Result<Vec<(String, Value)>> {
    match value {
        Value::Sequence(components) | Value::Set(components) => Ok(components),
        other => Err(unexpected(expected, other.kind_name())),
    }
}

#[doc(hidden)]
pub fn take_component(components: &mut Vec<(String, Value)>, name: &str) -> Option<Value> {
    let i = components.iter().position(|(n, _)| n == name)?;
    Some(components.remove(i).1)
}
