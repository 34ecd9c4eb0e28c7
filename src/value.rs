use bit_vec::BitVec;
use num_bigint::BigInt;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An OBJECT IDENTIFIER as its sequence of arcs.
///
/// Construction does not validate the arcs; the encoder rejects identifiers
/// that X.690 cannot represent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentifier(Vec<u64>);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid object identifier {0:?}")]
pub struct ParseOidError(String);

impl ObjectIdentifier {
    pub fn new(arcs: impl Into<Vec<u64>>) -> ObjectIdentifier {
        ObjectIdentifier(arcs.into())
    }

    pub fn arcs(&self) -> &[u64] {
        &self.0
    }

    /// Why this identifier cannot be encoded, if it cannot.
    pub(crate) fn check(&self) -> Option<String> {
        match self.0.as_slice() {
            [] | [_] => Some(format!("{} has fewer than two arcs", self)),
            [first, ..] if *first > 2 => Some(format!("{}: first arc greater than 2", self)),
            [first, second, ..] if *first < 2 && *second >= 40 => {
                Some(format!("{}: second arc must be below 40", self))
            }
            [_, second, ..] if second.checked_add(80).is_none() => {
                Some(format!("{}: second arc too large", self))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", arc)?;
        }
        Ok(())
    }
}

impl FromStr for ObjectIdentifier {
    type Err = ParseOidError;

    fn from_str(s: &str) -> Result<ObjectIdentifier, ParseOidError> {
        let arcs = s
            .split('.')
            .map(|arc| arc.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseOidError(s.to_string()))?;
        Ok(ObjectIdentifier(arcs))
    }
}

/// A REAL value as `mantissa * base ^ exponent`.
///
/// Finite values are kept normalized: the mantissa is not a multiple of the
/// base, and zero is always `0 * 2 ^ 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Real {
    Finite { mantissa: i64, base: u8, exponent: i64 },
    PlusInfinity,
    MinusInfinity,
}

impl Real {
    /// # Panics
    ///
    /// If normalizing the mantissa pushes the exponent past `i64::MAX`.
    pub fn new(mantissa: i64, base: u8, exponent: i64) -> Real {
        match Real::try_new(mantissa, base, exponent) {
            Some(r) => r,
            None => panic!(
                "REAL exponent overflow normalizing {} * {}^{}",
                mantissa, base, exponent
            ),
        }
    }

    /// Normalized value, or `None` if the exponent overflows.
    pub fn try_new(mut mantissa: i64, base: u8, mut exponent: i64) -> Option<Real> {
        if mantissa == 0 {
            return Some(Real::zero());
        }
        if base >= 2 {
            let b = i64::from(base);
            while mantissa % b == 0 {
                mantissa /= b;
                exponent = exponent.checked_add(1)?;
            }
        }
        Some(Real::Finite {
            mantissa,
            base,
            exponent,
        })
    }

    pub fn zero() -> Real {
        Real::Finite {
            mantissa: 0,
            base: 2,
            exponent: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Real::Finite { mantissa: 0, .. })
    }

    /// Exact binary decomposition of a float; `None` for NaN.
    pub fn from_f64(v: f64) -> Option<Real> {
        if v.is_nan() {
            return None;
        }
        if v.is_infinite() {
            return Some(if v > 0.0 {
                Real::PlusInfinity
            } else {
                Real::MinusInfinity
            });
        }
        let bits = v.to_bits();
        let negative = bits >> 63 == 1;
        let biased = ((bits >> 52) & 0x7ff) as i64;
        let fraction = (bits & ((1 << 52) - 1)) as i64;
        let (mantissa, exponent) = if biased == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1 << 52), biased - 1075)
        };
        let mantissa = if negative { -mantissa } else { mantissa };
        Real::try_new(mantissa, 2, exponent)
    }

    pub fn to_f64(&self) -> f64 {
        match *self {
            Real::PlusInfinity => f64::INFINITY,
            Real::MinusInfinity => f64::NEG_INFINITY,
            Real::Finite {
                mantissa,
                base,
                exponent,
            } => {
                let exponent = exponent.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
                mantissa as f64 * f64::from(base).powi(exponent)
            }
        }
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Real::PlusInfinity => write!(f, "PLUS-INFINITY"),
            Real::MinusInfinity => write!(f, "MINUS-INFINITY"),
            Real::Finite {
                mantissa,
                base,
                exponent,
            } => write!(
                f,
                "{{ mantissa {}, base {}, exponent {} }}",
                mantissa, base, exponent
            ),
        }
    }
}

/// A value tree. Composite values own their children.
///
/// Named components of SEQUENCE and SET keep schema order; absent OPTIONAL
/// components are simply left out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Boolean(bool),
    Integer(BigInt),
    Enumerated(BigInt),
    BitString(BitVec),
    OctetString(Vec<u8>),
    Null,
    ObjectIdentifier(ObjectIdentifier),
    Real(Real),
    String(String),
    Sequence(Vec<(String, Value)>),
    Set(Vec<(String, Value)>),
    Choice(String, Box<Value>),
    SequenceOf(Vec<Value>),
    SetOf(Vec<Value>),
    /// One complete encoded element, tag and length included.
    Any(Vec<u8>),
}

impl Value {
    pub fn choice(name: impl Into<String>, value: impl Into<Value>) -> Value {
        Value::Choice(name.into(), Box::new(value.into()))
    }

    pub fn sequence<N, I>(components: I) -> Value
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Value)>,
    {
        Value::Sequence(
            components
                .into_iter()
                .map(|(n, v)| (n.into(), v))
                .collect(),
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "BOOLEAN",
            Value::Integer(_) => "INTEGER",
            Value::Enumerated(_) => "ENUMERATED",
            Value::BitString(_) => "BIT STRING",
            Value::OctetString(_) => "OCTET STRING",
            Value::Null => "NULL",
            Value::ObjectIdentifier(_) => "OBJECT IDENTIFIER",
            Value::Real(_) => "REAL",
            Value::String(_) => "character string",
            Value::Sequence(_) => "SEQUENCE",
            Value::Set(_) => "SET",
            Value::Choice(..) => "CHOICE",
            Value::SequenceOf(_) => "SEQUENCE OF",
            Value::SetOf(_) => "SET OF",
            Value::Any(_) => "ANY",
        }
    }

    /// Component or chosen alternative by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Sequence(fields) | Value::Set(fields) => fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v),
            Value::Choice(n, v) if n == name => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&BigInt> {
        match self {
            Value::Integer(i) | Value::Enumerated(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(b) | Value::Any(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_components(self) -> Option<Vec<(String, Value)>> {
        match self {
            Value::Sequence(fields) | Value::Set(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn into_elements(self) -> Option<Vec<Value>> {
        match self {
            Value::SequenceOf(items) | Value::SetOf(items) => Some(items),
            _ => None,
        }
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "'")?;
    for b in bytes {
        write!(f, "{:02X}", b)?;
    }
    write!(f, "'H")
}

fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    write!(f, "{{ ")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, " }}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(true) => write!(f, "TRUE"),
            Value::Boolean(false) => write!(f, "FALSE"),
            Value::Integer(i) | Value::Enumerated(i) => write!(f, "{}", i),
            Value::BitString(bits) => {
                write!(f, "'")?;
                for bit in bits.iter() {
                    write!(f, "{}", if bit { '1' } else { '0' })?;
                }
                write!(f, "'B")
            }
            Value::OctetString(bytes) | Value::Any(bytes) => write_hex(f, bytes),
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(oid) => write_list(f, oid.arcs().iter()),
            Value::Real(r) => write!(f, "{}", r),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Value::Sequence(fields) | Value::Set(fields) => {
                write_list(f, fields.iter().map(|(n, v)| format!("{} {}", n, v)))
            }
            Value::Choice(name, value) => write!(f, "{} : {}", name, value),
            Value::SequenceOf(items) | Value::SetOf(items) => write_list(f, items.iter()),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Value {
                    Value::Integer(BigInt::from(v))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Boolean(v)
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Value {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::String(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Value {
        Value::OctetString(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Value {
        Value::OctetString(v)
    }
}

impl From<BitVec> for Value {
    fn from(v: BitVec) -> Value {
        Value::BitString(v)
    }
}

impl From<ObjectIdentifier> for Value {
    fn from(v: ObjectIdentifier) -> Value {
        Value::ObjectIdentifier(v)
    }
}

impl From<Real> for Value {
    fn from(v: Real) -> Value {
        Value::Real(v)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Value {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oid_text() {
        let oid: ObjectIdentifier = "1.2.840.113549".parse().unwrap();
        assert_eq!(oid.arcs(), &[1, 2, 840, 113549]);
        assert_eq!(oid.to_string(), "1.2.840.113549");
        assert!("1..2".parse::<ObjectIdentifier>().is_err());
        assert!("".parse::<ObjectIdentifier>().is_err());

        assert!(ObjectIdentifier::new(vec![1, 2]).check().is_none());
        assert!(ObjectIdentifier::new(vec![3, 1]).check().is_some());
        assert!(ObjectIdentifier::new(vec![1, 40]).check().is_some());
        assert!(ObjectIdentifier::new(vec![2, 999]).check().is_none());
        assert!(ObjectIdentifier::new(vec![1]).check().is_some());
    }

    #[test]
    fn real_normalization() {
        assert_eq!(Real::new(8, 2, 0), Real::new(1, 2, 3));
        assert_eq!(Real::new(1500, 10, -2), Real::new(15, 10, 0));
        assert_eq!(Real::new(0, 10, 7), Real::zero());
        assert_eq!(Real::from_f64(0.5), Some(Real::new(1, 2, -1)));
        assert_eq!(Real::from_f64(-3.0), Some(Real::new(-3, 2, 0)));
        assert_eq!(Real::from_f64(f64::NAN), None);
        assert_eq!(Real::from_f64(f64::NEG_INFINITY), Some(Real::MinusInfinity));
        assert_eq!(Real::new(125, 10, -2).to_f64(), 1.25);
        assert_eq!(Real::from_f64(6.75).unwrap().to_f64(), 6.75);

        assert_eq!(Real::try_new(4, 2, i64::MAX - 2), Some(Real::new(1, 2, i64::MAX)));
        assert_eq!(Real::try_new(2, 2, i64::MAX), None);
        assert_eq!(Real::try_new(100, 10, i64::MAX - 1), None);
        assert_eq!(Real::try_new(3, 2, i64::MAX), Some(Real::new(3, 2, i64::MAX)));
    }

    #[test]
    fn notation() {
        let v = Value::sequence(vec![
            ("id", Value::from(7)),
            ("ok", Value::from(true)),
            ("raw", Value::from(vec![0xdeu8, 0xad])),
            ("name", Value::from("a\"b")),
        ]);
        assert_eq!(
            v.to_string(),
            "{ id 7, ok TRUE, raw 'DEAD'H, name \"a\"\"b\" }"
        );
        assert_eq!(Value::choice("num", 3).to_string(), "num : 3");
        let bits = BitVec::from_bytes(&[0b1010_0000]);
        assert_eq!(Value::from(bits).to_string(), "'10100000'B");
        assert_eq!(v.get("ok"), Some(&Value::Boolean(true)));
        assert_eq!(v.get("missing"), None);
    }
}
