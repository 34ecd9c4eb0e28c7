use crate::common::{Format, Length, Path, Tag, TagAndLength, TAG_BIT_STRING, TAG_OCTET_STRING};
use crate::error::{Error, Result};
use crate::mode::Mode;
use crate::options::EncodeOptions;
use crate::typed::AsnType;
use crate::types::{Kind, TypeDescriptor};
use crate::unmarshal;
use crate::value::{ObjectIdentifier, Real, Value};
use bit_vec::BitVec;
use log::{debug, trace};
use num_bigint::BigInt;

/// Largest string segment CER allows.
pub const CER_SEGMENT: usize = 1000;

pub trait Encoder {
    fn len(&self) -> usize {
        self.encode().len()
    }
    fn encode(&self) -> Vec<u8>;
}

/// An element header followed by its content, and by end-of-contents octets
/// when the length is indefinite.
pub struct TaggedEncoder<E: Encoder> {
    pub header: TagAndLength,
    pub body: E,
}

impl<E: Encoder> Encoder for TaggedEncoder<E> {
    fn encode(&self) -> Vec<u8> {
        let mut v = self.header.encode();
        v.append(&mut self.body.encode());
        if self.header.length == Length::Indefinite {
            v.extend_from_slice(&[0x00, 0x00]);
        }
        v
    }
}

fn base128_int_length(mut n: u64) -> usize {
    if n == 0 {
        return 1;
    }

    let mut l = 0;
    while n > 0 {
        l += 1;
        n >>= 7;
    }

    l
}

pub(crate) fn encode_int_using_base128(n: u64) -> Vec<u8> {
    let mut v = vec![];

    let l = base128_int_length(n);

    for i in (0..l).rev() {
        let mut o = (n >> (i * 7)) as u8;
        o &= 0x7f;
        if i != 0 {
            o |= 0x80;
        }

        v.push(o);
    }

    v
}

fn length_length(mut i: usize) -> usize {
    let mut num_bytes = 1;
    while i > 255 {
        num_bytes += 1;
        i >>= 8;
    }
    num_bytes
}

fn encode_length(i: usize) -> Vec<u8> {
    let mut v = vec![];
    let mut n = length_length(i);

    while n > 0 {
        v.push((i >> ((n - 1) * 8)) as u8);
        n -= 1;
    }
    v
}

impl Encoder for TagAndLength {
    fn encode(&self) -> Vec<u8> {
        let mut v = vec![];

        let mut b = self.tag.class.bits() << 6;
        if self.tag.is_constructed() {
            b |= 0x20;
        }
        if self.tag.number >= 31 {
            b |= 0x1f;
            v.push(b);
            v.append(&mut encode_int_using_base128(u64::from(self.tag.number)));
        } else {
            b |= self.tag.number as u8;
            v.push(b);
        }

        match self.length {
            Length::Indefinite => v.push(0x80),
            Length::Definite(length) if length >= 128 => {
                let l = length_length(length);
                v.push(0x80 | l as u8);
                v.append(&mut encode_length(length));
            }
            Length::Definite(length) => v.push(length as u8),
        }

        v
    }
}

impl Encoder for Vec<u8> {
    fn len(&self) -> usize {
        self.len()
    }

    fn encode(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl Encoder for BigInt {
    fn encode(&self) -> Vec<u8> {
        self.to_signed_bytes_be()
    }
}

fn encode_oid(oid: &ObjectIdentifier) -> Result<Vec<u8>> {
    if let Some(reason) = oid.check() {
        return Err(Error::Encoding(reason));
    }
    let arcs = oid.arcs();
    let mut v = encode_int_using_base128(arcs[0] * 40 + arcs[1]);
    for arc in &arcs[2..] {
        v.append(&mut encode_int_using_base128(*arc));
    }
    Ok(v)
}

/// Big-endian magnitude without leading zero octets.
fn unsigned_bytes(n: u64) -> Vec<u8> {
    let bytes = n.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

pub(crate) fn encode_real(real: &Real) -> Result<Vec<u8>> {
    match *real {
        Real::PlusInfinity => Ok(vec![0x40]),
        Real::MinusInfinity => Ok(vec![0x41]),
        Real::Finite { mantissa: 0, .. } => Ok(vec![]),
        Real::Finite {
            mantissa,
            base: 2,
            exponent,
        } => {
            // binary form, base 2, scale factor 0
            let mut first = 0x80;
            if mantissa < 0 {
                first |= 0x40;
            }
            let exponent = BigInt::from(exponent).to_signed_bytes_be();
            let mut v = vec![];
            match exponent.len() {
                1 => v.push(first),
                2 => v.push(first | 0x01),
                3 => v.push(first | 0x02),
                n => {
                    v.push(first | 0x03);
                    v.push(n as u8);
                }
            }
            v.extend_from_slice(&exponent);
            v.append(&mut unsigned_bytes(mantissa.unsigned_abs()));
            Ok(v)
        }
        Real::Finite {
            mantissa,
            base: 10,
            exponent,
        } => {
            // ISO 6093 NR3
            let exponent = if exponent == 0 {
                "+0".to_string()
            } else {
                exponent.to_string()
            };
            let mut v = vec![0x03];
            v.extend_from_slice(format!("{}.E{}", mantissa, exponent).as_bytes());
            Ok(v)
        }
        Real::Finite { base, .. } => Err(Error::Encoding(format!(
            "REAL base {} is not 2 or 10",
            base
        ))),
    }
}

struct Writer<'o> {
    mode: Mode,
    options: &'o EncodeOptions,
}

impl Writer<'_> {
    fn indefinite(&self) -> bool {
        match self.mode {
            Mode::Cer => true,
            Mode::Der => false,
            Mode::Ber => self.options.indefinite_length,
        }
    }

    fn chunk_size(&self) -> Option<usize> {
        match self.mode {
            Mode::Cer => Some(CER_SEGMENT),
            Mode::Der => None,
            Mode::Ber => self.options.chunk_size,
        }
    }

    fn element(&self, tag: Tag, content: Vec<u8>) -> Vec<u8> {
        let length = if tag.is_constructed() && self.indefinite() {
            Length::Indefinite
        } else {
            Length::Definite(content.len())
        };
        trace!("write {} {:?}", tag, length);
        TaggedEncoder {
            header: TagAndLength { tag, length },
            body: content,
        }
        .encode()
    }

    fn value(
        &self,
        descriptor: &TypeDescriptor,
        value: &Value,
        path: &Path<'_>,
    ) -> Result<Vec<u8>> {
        let tags = descriptor.tags().as_slice();
        let (mut out, wrappers) = match (descriptor.kind(), value) {
            (Kind::Choice(alternatives), Value::Choice(name, inner)) => {
                let alternative = alternatives.get(name).ok_or_else(|| {
                    Error::mismatch(path, "CHOICE", format!("unknown alternative {}", name))
                })?;
                (self.value(alternative, inner, &path.field(name))?, tags)
            }
            (Kind::Any, Value::Any(raw)) => {
                unmarshal::check_element(raw, self.mode)
                    .map_err(|e| Error::Encoding(format!("{}: malformed ANY: {}", path, e)))?;
                (raw.clone(), tags)
            }
            (kind, value) => {
                let (own, wrappers) = tags.split_last().ok_or_else(|| {
                    Error::InvalidSchema(format!("{} has no tag", kind.name()))
                })?;
                let (format, content) = self.content(kind, value, path)?;
                (self.element(own.with_format(format), content), wrappers)
            }
        };
        for wrapper in wrappers.iter().rev() {
            out = self.element(wrapper.constructed(), out);
        }
        Ok(out)
    }

    fn content(&self, kind: &Kind, value: &Value, path: &Path<'_>) -> Result<(Format, Vec<u8>)> {
        let primitive =
            |content: Vec<u8>| -> Result<(Format, Vec<u8>)> { Ok((Format::Primitive, content)) };
        match (kind, value) {
            (Kind::Boolean, Value::Boolean(b)) => primitive(vec![if *b { 0xff } else { 0x00 }]),
            (Kind::Integer, Value::Integer(i)) | (Kind::Enumerated, Value::Enumerated(i)) => {
                primitive(i.encode())
            }
            (Kind::Null, Value::Null) => primitive(vec![]),
            (Kind::ObjectIdentifier, Value::ObjectIdentifier(oid)) => primitive(encode_oid(oid)?),
            (Kind::Real, Value::Real(r)) => primitive(encode_real(r)?),
            (Kind::OctetString, Value::OctetString(bytes)) => self.octets(bytes),
            (Kind::String(string), Value::String(s)) => {
                let bytes = string
                    .encode(s)
                    .map_err(|e| Error::Encoding(format!("{}: {}", path, e)))?;
                self.octets(&bytes)
            }
            (Kind::BitString, Value::BitString(bits)) => self.bits(bits),
            (Kind::Sequence(components), Value::Sequence(fields)) => {
                let mut content = vec![];
                for component in components {
                    let value = match fields.iter().find(|(n, _)| n == &component.name) {
                        Some((_, v)) => v,
                        None => continue,
                    };
                    if component.is_default(value) {
                        continue;
                    }
                    let mut bytes =
                        self.value(&component.descriptor, value, &path.field(&component.name))?;
                    content.append(&mut bytes);
                }
                Ok((Format::Constructed, content))
            }
            (Kind::Set(components), Value::Set(fields)) => {
                let mut encoded = vec![];
                for component in components {
                    let value = match fields.iter().find(|(n, _)| n == &component.name) {
                        Some((_, v)) => v,
                        None => continue,
                    };
                    if component.is_default(value) {
                        continue;
                    }
                    let bytes =
                        self.value(&component.descriptor, value, &path.field(&component.name))?;
                    let (tag, _) = unmarshal::parse_tag(&bytes)
                        .map_err(|e| Error::Encoding(format!("{}: {}", path, e)))?;
                    encoded.push((component.descriptor.set_sort_key(self.mode, tag), bytes));
                }
                if self.mode.is_restricted() {
                    encoded.sort_by_key(|(key, _)| *key);
                }
                Ok((Format::Constructed, encoded.into_iter().flat_map(|(_, b)| b).collect()))
            }
            (Kind::SequenceOf(element), Value::SequenceOf(items)) => {
                let mut content = vec![];
                for (i, item) in items.iter().enumerate() {
                    content.append(&mut self.value(element, item, &path.index(i))?);
                }
                Ok((Format::Constructed, content))
            }
            (Kind::SetOf(element), Value::SetOf(items)) => {
                let mut encoded = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.value(element, item, &path.index(i)))
                    .collect::<Result<Vec<_>>>()?;
                if self.mode.is_restricted() {
                    encoded.sort();
                }
                Ok((Format::Constructed, encoded.concat()))
            }
            (kind, value) => Err(Error::mismatch(path, kind.name(), value.kind_name())),
        }
    }

    /// OCTET STRING and character string content, segmented when a chunk
    /// size applies and the content is longer.
    fn octets(&self, bytes: &[u8]) -> Result<(Format, Vec<u8>)> {
        match self.chunk_size() {
            Some(0) => Err(Error::Encoding("string segments cannot be empty".to_string())),
            Some(n) if bytes.len() > n => {
                let segment = Tag::universal(TAG_OCTET_STRING);
                let content = bytes
                    .chunks(n)
                    .flat_map(|chunk| self.element(segment, chunk.to_vec()))
                    .collect();
                Ok((Format::Constructed, content))
            }
            _ => Ok((Format::Primitive, bytes.to_vec())),
        }
    }

    /// BIT STRING content: unused-bits octet then the bits, zero padded. A
    /// segment carries its own unused-bits octet, so it holds one data octet
    /// less than the chunk size.
    fn bits(&self, bits: &BitVec) -> Result<(Format, Vec<u8>)> {
        let data = bits.to_bytes();
        let unused = ((8 - bits.len() % 8) % 8) as u8;
        match self.chunk_size() {
            Some(n) if n < 2 => Err(Error::Encoding(format!(
                "BIT STRING segments of {} octets cannot hold data",
                n
            ))),
            Some(n) if data.len() + 1 > n => {
                let segment = Tag::universal(TAG_BIT_STRING);
                let chunks: Vec<&[u8]> = data.chunks(n - 1).collect();
                let last = chunks.len() - 1;
                let mut content = vec![];
                for (i, chunk) in chunks.into_iter().enumerate() {
                    let mut segment_content = vec![if i == last { unused } else { 0 }];
                    segment_content.extend_from_slice(chunk);
                    content.append(&mut self.element(segment, segment_content));
                }
                Ok((Format::Constructed, content))
            }
            _ => {
                let mut content = vec![unused];
                content.extend_from_slice(&data);
                Ok((Format::Primitive, content))
            }
        }
    }
}

/// Encode `value` as a value of `descriptor` under `mode`.
pub fn encode(value: &Value, descriptor: &TypeDescriptor, mode: Mode) -> Result<Vec<u8>> {
    encode_with_options(value, descriptor, mode, &EncodeOptions::default())
}

/// Encode with explicit options. The value is checked against the
/// descriptor in full before any output is produced.
pub fn encode_with_options(
    value: &Value,
    descriptor: &TypeDescriptor,
    mode: Mode,
    options: &EncodeOptions,
) -> Result<Vec<u8>> {
    if options.indefinite_length && !mode.allows_indefinite_constructed() {
        return Err(Error::Encoding(format!(
            "{} does not allow indefinite length",
            mode
        )));
    }
    let value = descriptor.conform(value.clone(), &Path::Root, options.check_constraints)?;
    let writer = Writer { mode, options };
    let out = writer.value(descriptor, &value, &Path::Root)?;
    debug!(
        "encoded {} under {} into {} bytes",
        descriptor.kind().name(),
        mode,
        out.len()
    );
    Ok(out)
}

/// Encode a native value through its `AsnType` mapping.
pub fn marshal<T: AsnType>(v: &T, mode: Mode) -> Result<Vec<u8>> {
    encode(&v.to_value(), &T::descriptor(), mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TAG_INTEGER;
    use crate::types::ComponentType;

    fn der(value: impl Into<Value>, descriptor: &TypeDescriptor) -> Vec<u8> {
        encode(&value.into(), descriptor, Mode::Der).unwrap()
    }

    #[test]
    fn it_works() {
        let int = TypeDescriptor::integer();
        assert_eq!(der(10, &int), vec![0x02, 0x01, 0x0a]);
        assert_eq!(der(127, &int), vec![0x02, 0x01, 0x7f]);
        assert_eq!(der(128, &int), vec![0x02, 0x02, 0x00, 0x80]);
        assert_eq!(der(-128, &int), vec![0x02, 0x01, 0x80]);
        assert_eq!(der(-129, &int), vec![0x02, 0x02, 0xff, 0x7f]);
        assert_eq!(der(0, &int), vec![0x02, 0x01, 0x00]);

        let int_struct = TypeDescriptor::sequence(vec![ComponentType::required("a", int.clone())]);
        assert_eq!(
            der(Value::sequence(vec![("a", Value::from(64))]), &int_struct),
            vec![0x30, 0x03, 0x02, 0x01, 0x40]
        );

        let two_int_struct = TypeDescriptor::sequence(vec![
            ComponentType::required("a", int.clone()),
            ComponentType::required("b", int.clone()),
        ]);
        assert_eq!(
            der(
                Value::sequence(vec![("a", Value::from(64)), ("b", Value::from(65))]),
                &two_int_struct
            ),
            vec![0x30, 0x06, 0x02, 0x01, 0x40, 0x02, 0x01, 0x41]
        );

        let nested = TypeDescriptor::sequence(vec![ComponentType::required("a", int_struct)]);
        let inner = Value::sequence(vec![("a", Value::from(127))]);
        assert_eq!(
            der(Value::sequence(vec![("a", inner)]), &nested),
            vec![0x30, 0x05, 0x30, 0x03, 0x02, 0x01, 0x7f]
        );

        assert_eq!(
            der(vec![1u8, 2, 3], &TypeDescriptor::octet_string()),
            vec![0x04, 0x03, 0x01, 0x02, 0x03]
        );

        let implicit = TypeDescriptor::sequence(vec![ComponentType::required(
            "a",
            int.clone().tagged_implicitly(Tag::context(5)),
        )]);
        assert_eq!(
            der(Value::sequence(vec![("a", Value::from(64))]), &implicit),
            vec![0x30, 0x03, 0x85, 0x01, 0x40]
        );

        let explicit = TypeDescriptor::sequence(vec![ComponentType::required(
            "a",
            int.tagged_explicitly(Tag::context(5)),
        )]);
        assert_eq!(
            der(Value::sequence(vec![("a", Value::from(64))]), &explicit),
            vec![0x30, 0x05, 0xa5, 0x03, 0x02, 0x01, 0x40]
        );

        let raw = TypeDescriptor::any();
        assert_eq!(
            der(Value::Any(vec![0x81, 0x03, 0x01, 0x02, 0x03]), &raw),
            vec![0x81, 0x03, 0x01, 0x02, 0x03]
        );
    }

    #[test]
    fn headers() {
        struct HeaderTest {
            header: TagAndLength,
            bytes: Vec<u8>,
        }

        let header_data = vec![
            HeaderTest {
                header: TagAndLength {
                    tag: Tag::universal(TAG_INTEGER),
                    length: Length::Definite(1),
                },
                bytes: vec![0x02, 0x01],
            },
            HeaderTest {
                header: TagAndLength {
                    tag: Tag::private(30).constructed(),
                    length: Length::Definite(0),
                },
                bytes: vec![0xfe, 0x00],
            },
            HeaderTest {
                header: TagAndLength {
                    tag: Tag::universal(31),
                    length: Length::Definite(0),
                },
                bytes: vec![0x1f, 0x1f, 0x00],
            },
            HeaderTest {
                header: TagAndLength {
                    tag: Tag::universal(128),
                    length: Length::Definite(0),
                },
                bytes: vec![0x1f, 0x81, 0x00, 0x00],
            },
            HeaderTest {
                header: TagAndLength {
                    tag: Tag::universal(0x4001),
                    length: Length::Definite(0),
                },
                bytes: vec![0x1f, 0x81, 0x80, 0x01, 0x00],
            },
            HeaderTest {
                header: TagAndLength {
                    tag: Tag::universal(0),
                    length: Length::Definite(128),
                },
                bytes: vec![0x00, 0x81, 0x80],
            },
            HeaderTest {
                header: TagAndLength {
                    tag: Tag::universal(0),
                    length: Length::Definite(256),
                },
                bytes: vec![0x00, 0x82, 0x01, 0x00],
            },
            HeaderTest {
                header: TagAndLength {
                    tag: Tag::context(0).constructed(),
                    length: Length::Indefinite,
                },
                bytes: vec![0xa0, 0x80],
            },
        ];

        for test in &header_data {
            assert_eq!(test.header.encode(), test.bytes);
        }
    }

    #[test]
    fn booleans_and_oids() {
        let boolean = TypeDescriptor::boolean();
        assert_eq!(der(true, &boolean), vec![0x01, 0x01, 0xff]);
        assert_eq!(der(false, &boolean), vec![0x01, 0x01, 0x00]);

        let oid = TypeDescriptor::object_identifier();
        let rsa: ObjectIdentifier = "1.2.840.113549".parse().unwrap();
        assert_eq!(
            der(rsa, &oid),
            vec![0x06, 0x06, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d]
        );
        assert_eq!(
            der(ObjectIdentifier::new(vec![2, 999, 3]), &oid),
            vec![0x06, 0x03, 0x88, 0x37, 0x03]
        );

        let bad = Value::from(ObjectIdentifier::new(vec![3, 1]));
        assert!(matches!(encode(&bad, &oid, Mode::Der), Err(Error::Encoding(_))));
    }

    #[test]
    fn bit_strings() {
        let bits = TypeDescriptor::bit_string();
        let mut v = BitVec::from_bytes(&[0b1010_1100]);
        v.truncate(6);
        assert_eq!(der(v, &bits), vec![0x03, 0x02, 0x02, 0b1010_1100]);
        assert_eq!(der(BitVec::new(), &bits), vec![0x03, 0x01, 0x00]);

        let long = BitVec::from_elem(8 * 1000, true);
        let cer = encode(&Value::from(long), &bits, Mode::Cer).unwrap();
        // constructed, indefinite, a full segment of 999 data octets then the rest
        assert_eq!(&cer[..2], &[0x23, 0x80]);
        assert_eq!(&cer[2..7], &[0x03, 0x82, 0x03, 0xe8, 0x00]);
        assert_eq!(&cer[7 + 999..7 + 999 + 4], &[0x03, 0x02, 0x00, 0xff]);
        assert_eq!(&cer[cer.len() - 2..], &[0x00, 0x00]);
        assert_eq!(cer.len(), 2 + 4 + 1000 + 4 + 2);
    }

    #[test]
    fn reals() {
        let real = TypeDescriptor::real();
        assert_eq!(der(Real::zero(), &real), vec![0x09, 0x00]);
        assert_eq!(der(Real::PlusInfinity, &real), vec![0x09, 0x01, 0x40]);
        assert_eq!(der(Real::MinusInfinity, &real), vec![0x09, 0x01, 0x41]);
        // 0.5 = 1 * 2^-1
        assert_eq!(
            der(Real::new(1, 2, -1), &real),
            vec![0x09, 0x03, 0x80, 0xff, 0x01]
        );
        // -12 = -3 * 2^2
        assert_eq!(
            der(Real::new(-12, 2, 0), &real),
            vec![0x09, 0x03, 0xc0, 0x02, 0x03]
        );
        assert_eq!(
            der(Real::new(150, 10, -1), &real),
            vec![0x09, 0x07, 0x03, b'1', b'5', b'.', b'E', b'+', b'0']
        );
        assert_eq!(
            der(Real::new(-25, 10, -3), &real),
            vec![0x09, 0x08, 0x03, b'-', b'2', b'5', b'.', b'E', b'-', b'3']
        );
    }

    #[test]
    fn sets_are_sorted() {
        let set = TypeDescriptor::set(vec![
            ComponentType::required(
                "flag",
                TypeDescriptor::boolean().tagged_implicitly(Tag::context(1)),
            ),
            ComponentType::required(
                "num",
                TypeDescriptor::integer().tagged_implicitly(Tag::context(0)),
            ),
        ]);
        let v = Value::Set(vec![
            ("flag".to_string(), Value::from(true)),
            ("num".to_string(), Value::from(5)),
        ]);
        assert_eq!(
            encode(&v, &set, Mode::Der).unwrap(),
            vec![0x31, 0x06, 0x80, 0x01, 0x05, 0x81, 0x01, 0xff]
        );
        assert_eq!(
            encode(&v, &set, Mode::Ber).unwrap(),
            vec![0x31, 0x06, 0x81, 0x01, 0xff, 0x80, 0x01, 0x05]
        );
        assert_eq!(
            encode(&v, &set, Mode::Cer).unwrap(),
            vec![0x31, 0x80, 0x80, 0x01, 0x05, 0x81, 0x01, 0xff, 0x00, 0x00]
        );

        let set_of = TypeDescriptor::set_of(TypeDescriptor::integer());
        let v = Value::SetOf(vec![Value::from(300), Value::from(2), Value::from(1)]);
        assert_eq!(
            encode(&v, &set_of, Mode::Der).unwrap(),
            vec![0x31, 0x0a, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02, 0x02, 0x02, 0x01, 0x2c]
        );
    }

    #[test]
    fn defaults_are_omitted() {
        let d = TypeDescriptor::sequence(vec![
            ComponentType::defaulted("version", TypeDescriptor::integer(), 0),
            ComponentType::optional("note", TypeDescriptor::utf8_string()),
            ComponentType::required("flag", TypeDescriptor::boolean()),
        ]);
        let v = Value::sequence(vec![("version", Value::from(0)), ("flag", Value::from(false))]);
        assert_eq!(
            encode(&v, &d, Mode::Der).unwrap(),
            vec![0x30, 0x03, 0x01, 0x01, 0x00]
        );
        let v = Value::sequence(vec![("version", Value::from(2)), ("flag", Value::from(false))]);
        assert_eq!(
            encode(&v, &d, Mode::Der).unwrap(),
            vec![0x30, 0x06, 0x02, 0x01, 0x02, 0x01, 0x01, 0x00]
        );

        let d = TypeDescriptor::sequence(vec![
            ComponentType::defaulted("version", TypeDescriptor::enumerated(), 0),
            ComponentType::required("flag", TypeDescriptor::boolean()),
        ]);
        let given = Value::sequence(vec![
            ("version", Value::Enumerated(BigInt::from(0))),
            ("flag", Value::from(true)),
        ]);
        let left_out = Value::sequence(vec![("flag", Value::from(true))]);
        for mode in [Mode::Ber, Mode::Der].iter() {
            assert_eq!(
                encode(&given, &d, *mode).unwrap(),
                vec![0x30, 0x03, 0x01, 0x01, 0xff]
            );
            assert_eq!(
                encode(&left_out, &d, *mode).unwrap(),
                vec![0x30, 0x03, 0x01, 0x01, 0xff]
            );
        }
    }

    #[test]
    fn length_forms() {
        let seq = TypeDescriptor::sequence_of(TypeDescriptor::null());
        let v = Value::SequenceOf(vec![Value::Null]);
        let options = EncodeOptions {
            indefinite_length: true,
            ..EncodeOptions::default()
        };
        assert_eq!(
            encode_with_options(&v, &seq, Mode::Ber, &options).unwrap(),
            vec![0x30, 0x80, 0x05, 0x00, 0x00, 0x00]
        );
        assert!(matches!(
            encode_with_options(&v, &seq, Mode::Der, &options),
            Err(Error::Encoding(_))
        ));

        let octets = TypeDescriptor::octet_string();
        let chunked = EncodeOptions {
            chunk_size: Some(2),
            ..EncodeOptions::default()
        };
        assert_eq!(
            encode_with_options(&Value::from(vec![1u8, 2, 3]), &octets, Mode::Ber, &chunked)
                .unwrap(),
            vec![0x24, 0x07, 0x04, 0x02, 0x01, 0x02, 0x04, 0x01, 0x03]
        );

        let long = encode(&Value::from(vec![0u8; 300]), &octets, Mode::Der).unwrap();
        assert_eq!(&long[..4], &[0x04, 0x82, 0x01, 0x2c]);
    }

    #[test]
    fn all_or_nothing() {
        let d = TypeDescriptor::sequence(vec![
            ComponentType::required("a", TypeDescriptor::integer()),
            ComponentType::required(
                "b",
                TypeDescriptor::integer()
                    .with_constraint(crate::constraint::Constraint::range(0, 9)),
            ),
        ]);
        let v = Value::sequence(vec![("a", Value::from(1)), ("b", Value::from(10))]);
        match encode(&v, &d, Mode::Der) {
            Err(Error::ConstraintViolation { path, .. }) => assert_eq!(path, "$.b"),
            other => panic!("unexpected {:?}", other),
        }

        let unchecked = EncodeOptions {
            check_constraints: false,
            ..EncodeOptions::default()
        };
        assert!(encode_with_options(&v, &d, Mode::Der, &unchecked).is_ok());

        let raw = Value::Any(vec![0x04, 0x05, 0x01]);
        assert!(matches!(
            encode(&raw, &TypeDescriptor::any(), Mode::Ber),
            Err(Error::Encoding(_))
        ));
    }
}
