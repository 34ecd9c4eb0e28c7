use crate::common::{
    Class, Format, Length, Path, Tag, TagAndLength, TAG_BIT_STRING, TAG_END_OF_CONTENTS,
    TAG_OCTET_STRING, TAG_SEQUENCE, TAG_SET,
};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::marshal::{encode_real, CER_SEGMENT};
use crate::mode::Mode;
use crate::options::DecodeOptions;
use crate::registry::Registry;
use crate::typed::AsnType;
use crate::types::{ComponentType, Kind, Presence, TypeDescriptor};
use crate::value::{ObjectIdentifier, Real, Value};
use bit_vec::BitVec;
use log::{debug, trace};
use num_bigint::BigInt;
use std::convert::TryFrom;

type KindResult<T> = std::result::Result<T, DecodeErrorKind>;

fn truncated(needed: usize, available: usize) -> DecodeErrorKind {
    DecodeErrorKind::Truncated { needed, available }
}

fn invalid(reason: impl Into<String>) -> DecodeErrorKind {
    DecodeErrorKind::InvalidContent(reason.into())
}

fn non_canonical(reason: impl Into<String>) -> DecodeErrorKind {
    DecodeErrorKind::NonCanonical(reason.into())
}

// parse_base128_int parses a base-128 encoded int from the given offset in the
// given byte slice. It returns the value and the new offset.
fn parse_base128_int(bytes: &[u8], init_offset: usize) -> KindResult<(u64, usize)> {
    let mut offset = init_offset;
    let mut ret: u64 = 0;
    while offset < bytes.len() {
        let b = bytes[offset];
        // integers should be minimally encoded, so the leading octet should
        // never be 0x80
        if offset == init_offset && b == 0x80 {
            return Err(invalid("integer is not minimally encoded"));
        }
        if ret > u64::MAX >> 7 {
            return Err(invalid("base 128 integer too large"));
        }
        ret = (ret << 7) | u64::from(b & 0x7f);
        offset += 1;
        if b & 0x80 == 0 {
            return Ok((ret, offset));
        }
    }
    Err(truncated(1, 0))
}

/// Parse the identifier octets at the start of `bytes`, returning the tag and
/// the number of octets used.
pub(crate) fn parse_tag(bytes: &[u8]) -> KindResult<(Tag, usize)> {
    let b = *bytes.first().ok_or_else(|| truncated(1, 0))?;
    let class = Class::from_bits(b >> 6);
    let format = if b & 0x20 == 0x20 {
        Format::Constructed
    } else {
        Format::Primitive
    };
    let mut number = u32::from(b & 0x1f);
    let mut offset = 1;

    // If the bottom five bits are set, then the tag number is actually base 128
    // encoded afterwards
    if number == 0x1f {
        let (n, next) = parse_base128_int(bytes, offset)?;
        number = u32::try_from(n).map_err(|_| invalid("tag number too large"))?;
        offset = next;
        // Tags should be encoded in minimal form.
        if number < 0x1f {
            return Err(invalid("non-minimal tag"));
        }
    }

    Ok((Tag::new(class, format, number), offset))
}

/// Parse the length octets at the start of `bytes`, returning the length and
/// the number of octets used. Canonical-form checks are left to the caller.
fn parse_length(bytes: &[u8]) -> KindResult<(Length, usize)> {
    let b = *bytes.first().ok_or_else(|| truncated(1, 0))?;
    if b & 0x80 == 0 {
        // The length is encoded in the bottom 7 bits.
        return Ok((Length::Definite(usize::from(b)), 1));
    }
    if b == 0x80 {
        return Ok((Length::Indefinite, 1));
    }
    if b == 0xff {
        return Err(DecodeErrorKind::MalformedLength(
            "reserved length octet 0xFF".to_string(),
        ));
    }

    // Bottom 7 bits give the number of length bytes to follow.
    let num_bytes = usize::from(b & 0x7f);
    if bytes.len() < 1 + num_bytes {
        return Err(truncated(1 + num_bytes, bytes.len()));
    }
    let mut length: usize = 0;
    for b in &bytes[1..=num_bytes] {
        length = length
            .checked_mul(256)
            .and_then(|l| l.checked_add(usize::from(*b)))
            .ok_or_else(|| DecodeErrorKind::MalformedLength("length too large".to_string()))?;
    }
    Ok((Length::Definite(length), 1 + num_bytes))
}

// parse_tag_and_length parses an ASN.1 tag and length pair at the start of a
// byte slice. It returns the parsed header and the bytes following it.
pub fn parse_tag_and_length(bytes: &[u8]) -> KindResult<(TagAndLength, &[u8])> {
    let (tag, offset) = parse_tag(bytes)?;
    let (length, n) = parse_length(&bytes[offset..])?;
    Ok((TagAndLength { tag, length }, &bytes[offset + n..]))
}

fn decode_oid(content: &[u8]) -> KindResult<ObjectIdentifier> {
    if content.is_empty() {
        return Err(invalid("empty OBJECT IDENTIFIER"));
    }
    let mut arcs = vec![];
    let mut offset = 0;
    while offset < content.len() {
        let (v, next) = parse_base128_int(content, offset).map_err(|e| match e {
            DecodeErrorKind::Truncated { .. } => {
                invalid("truncated OBJECT IDENTIFIER subidentifier")
            }
            e => e,
        })?;
        if arcs.is_empty() {
            let (first, second) = match v {
                v if v < 40 => (0, v),
                v if v < 80 => (1, v - 40),
                v => (2, v - 80),
            };
            arcs.push(first);
            arcs.push(second);
        } else {
            arcs.push(v);
        }
        offset = next;
    }
    Ok(ObjectIdentifier::new(arcs))
}

/// Decimal REAL text in NR1, NR2 or NR3 form as `(mantissa, exponent)` in
/// base 10.
fn parse_decimal(text: &str) -> Option<(i64, i64)> {
    let text = text.trim_start_matches(' ');
    let (number, exponent) = match text.find(|c: char| c == 'E' || c == 'e') {
        Some(i) => (&text[..i], text[i + 1..].parse::<i64>().ok()?),
        None => (text, 0),
    };
    let (negative, number) = match number.as_bytes().first() {
        Some(b'-') => (true, &number[1..]),
        Some(b'+') => (false, &number[1..]),
        _ => (false, number),
    };
    let (whole, fraction) = match number.find(|c: char| c == '.' || c == ',') {
        Some(i) => (&number[..i], &number[i + 1..]),
        None => (number, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    let mut mantissa: i64 = 0;
    for c in whole.chars().chain(fraction.chars()) {
        let digit = i64::from(c.to_digit(10)?);
        mantissa = mantissa.checked_mul(10)?.checked_add(digit)?;
    }
    let exponent = exponent.checked_sub(i64::try_from(fraction.len()).ok()?)?;
    Some((if negative { -mantissa } else { mantissa }, exponent))
}

fn decode_real(content: &[u8], mode: Mode) -> KindResult<Real> {
    let first = match content.first() {
        None => return Ok(Real::zero()),
        Some(b) => *b,
    };

    if first & 0x80 != 0 {
        let negative = first & 0x40 != 0;
        let base_bits = (first >> 4) & 0x03;
        let scale = i64::from((first >> 2) & 0x03);
        let (exponent_length, exponent_start) = match first & 0x03 {
            0 => (1, 1),
            1 => (2, 1),
            2 => (3, 1),
            _ => match content.get(1) {
                Some(n) => (usize::from(*n), 2),
                None => return Err(invalid("truncated REAL exponent")),
            },
        };
        let exponent_bytes = content
            .get(exponent_start..exponent_start + exponent_length)
            .ok_or_else(|| invalid("truncated REAL exponent"))?;
        if exponent_bytes.is_empty() {
            return Err(invalid("REAL exponent without octets"));
        }
        let mantissa_bytes = &content[exponent_start + exponent_length..];
        if mantissa_bytes.is_empty() {
            return Err(invalid("REAL without mantissa"));
        }

        let exponent = i64::try_from(BigInt::from_signed_bytes_be(exponent_bytes))
            .map_err(|_| invalid("REAL exponent too large"))?;
        let magnitude = BigInt::from_bytes_be(num_bigint::Sign::Plus, mantissa_bytes);
        let mantissa =
            i64::try_from(magnitude).map_err(|_| invalid("REAL mantissa too large"))?;

        if mode.is_restricted() {
            if base_bits != 0 {
                return Err(non_canonical("REAL base must be 2"));
            }
            if scale != 0 {
                return Err(non_canonical("REAL scale factor must be 0"));
            }
            if mantissa % 2 == 0 {
                return Err(non_canonical("REAL mantissa must be odd"));
            }
            if BigInt::from(exponent).to_signed_bytes_be().len() != exponent_bytes.len() {
                return Err(non_canonical("REAL exponent not minimally encoded"));
            }
        }

        let bits_per_digit = match base_bits {
            0 => 1,
            1 => 3,
            2 => 4,
            _ => return Err(invalid("reserved REAL base")),
        };
        let exponent = exponent
            .checked_mul(bits_per_digit)
            .and_then(|e| e.checked_add(scale))
            .ok_or_else(|| invalid("REAL exponent too large"))?;
        let mantissa = if negative { -mantissa } else { mantissa };
        return Real::try_new(mantissa, 2, exponent)
            .ok_or_else(|| invalid("REAL exponent too large"));
    }

    if first & 0x40 != 0 {
        return match (first, content.len()) {
            (0x40, 1) => Ok(Real::PlusInfinity),
            (0x41, 1) => Ok(Real::MinusInfinity),
            (0x42, _) | (0x43, _) => Err(invalid("NOT-A-NUMBER and minus zero are not supported")),
            _ => Err(invalid(format!("reserved REAL special value {:#04x}", first))),
        };
    }

    let form = first & 0x3f;
    if !(1..=3).contains(&form) {
        return Err(invalid(format!("reserved decimal REAL form {}", form)));
    }
    let text = std::str::from_utf8(&content[1..]).map_err(|_| invalid("decimal REAL is not text"))?;
    let (mantissa, exponent) =
        parse_decimal(text).ok_or_else(|| invalid(format!("malformed decimal REAL {:?}", text)))?;
    let real =
        Real::try_new(mantissa, 10, exponent).ok_or_else(|| invalid("REAL exponent too large"))?;
    if mode.is_restricted() {
        let canonical = encode_real(&real).map_err(|e| invalid(e.to_string()))?;
        if canonical != content {
            return Err(non_canonical("decimal REAL not in canonical NR3 form"));
        }
    }
    Ok(real)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    AwaitTag,
    AwaitLength,
    AwaitContent,
    AwaitEndOfContents,
    Done,
    Failed,
}

/// One complete element as found in the input.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    pub tag: Tag,
    pub indefinite: bool,
    /// Absolute offset of the identifier octets.
    pub offset: usize,
    pub content: &'a [u8],
    /// Absolute offset of the first content octet.
    pub content_offset: usize,
    /// The whole encoding, header and end-of-contents octets included.
    pub raw: &'a [u8],
}

/// Reads elements from a window of the input.
///
/// A decoder for constructed content only sees that content, so no read can
/// run past the end of the enclosing element. Offsets in errors are absolute.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
    mode: Mode,
    options: DecodeOptions,
    depth: usize,
    state: State,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8], mode: Mode, options: DecodeOptions) -> Decoder<'a> {
        Decoder {
            data,
            pos: 0,
            base: 0,
            mode,
            options,
            depth: 0,
            state: State::AwaitTag,
        }
    }

    /// Octets consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn error(&self, kind: DecodeErrorKind, at: usize) -> Error {
        Error::decoding(kind, self.base + at)
    }

    fn descend(&self, content: &'a [u8], offset: usize) -> Result<Decoder<'a>> {
        if self.depth >= self.options.max_depth {
            return Err(Error::decoding(
                DecodeErrorKind::TooDeep(self.options.max_depth),
                offset,
            ));
        }
        Ok(Decoder {
            data: content,
            pos: 0,
            base: offset,
            mode: self.mode,
            options: self.options,
            depth: self.depth + 1,
            state: State::AwaitTag,
        })
    }

    /// Fail unless every octet of the window was consumed.
    pub fn finish(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.error(
                DecodeErrorKind::TrailingData(self.data.len() - self.pos),
                self.pos,
            ))
        }
    }

    fn peek_tag(&self) -> Result<Option<Tag>> {
        if self.is_empty() {
            return Ok(None);
        }
        match parse_tag(self.rest()) {
            Ok((tag, _)) => Ok(Some(tag)),
            Err(kind) => Err(self.error(kind, self.pos)),
        }
    }

    fn expect_tag(&self) -> Result<Tag> {
        match self.peek_tag()? {
            Some(tag) => Ok(tag),
            None => Err(self.error(truncated(1, 0), self.pos)),
        }
    }

    /// Read the next complete element. After a failure every further read
    /// fails as well.
    pub fn read_element(&mut self) -> Result<Element<'a>> {
        if self.state == State::Failed {
            return Err(self.error(invalid("decoder has already failed"), self.pos));
        }
        let result = self.step_element();
        self.state = if result.is_ok() {
            State::AwaitTag
        } else {
            State::Failed
        };
        result
    }

    fn step_element(&mut self) -> Result<Element<'a>> {
        let start = self.pos;
        let mut tag = Tag::universal(TAG_END_OF_CONTENTS);
        let mut length = Length::Definite(0);
        let mut content = (start, start);
        self.state = State::AwaitTag;

        loop {
            self.state = match self.state {
                State::AwaitTag => {
                    let (t, n) = parse_tag(self.rest()).map_err(|k| self.error(k, self.pos))?;
                    if t == Tag::universal(TAG_END_OF_CONTENTS) {
                        return Err(self.error(invalid("unexpected end-of-contents"), self.pos));
                    }
                    tag = t;
                    self.pos += n;
                    State::AwaitLength
                }
                State::AwaitLength => {
                    length = self.read_length(tag)?;
                    State::AwaitContent
                }
                State::AwaitContent => match length {
                    Length::Definite(n) => {
                        let available = self.data.len() - self.pos;
                        if n > available {
                            return Err(self.error(truncated(n, available), self.pos));
                        }
                        content = (self.pos, self.pos + n);
                        self.pos += n;
                        State::Done
                    }
                    Length::Indefinite => State::AwaitEndOfContents,
                },
                State::AwaitEndOfContents => {
                    let end = self.end_of_contents()?;
                    content = (self.pos, end);
                    self.pos = end + 2;
                    State::Done
                }
                State::Done | State::Failed => break,
            };
        }

        trace!("read {} {:?} at {}", tag, length, self.base + start);
        Ok(Element {
            tag,
            indefinite: length == Length::Indefinite,
            offset: self.base + start,
            content: &self.data[content.0..content.1],
            content_offset: self.base + content.0,
            raw: &self.data[start..self.pos],
        })
    }

    fn read_length(&mut self, tag: Tag) -> Result<Length> {
        let at = self.pos;
        let rest = self.rest();
        let (length, n) = parse_length(rest).map_err(|k| self.error(k, at))?;
        match length {
            Length::Indefinite => {
                if !tag.is_constructed() {
                    return Err(self.error(
                        DecodeErrorKind::MalformedLength(
                            "indefinite length on a primitive encoding".to_string(),
                        ),
                        at,
                    ));
                }
                if !self.mode.allows_indefinite_constructed() {
                    return Err(self.error(
                        non_canonical(format!("indefinite length under {}", self.mode)),
                        at,
                    ));
                }
            }
            Length::Definite(l) => {
                if self.mode.is_restricted() && n > 1 && (l < 0x80 || rest[1] == 0) {
                    return Err(self.error(non_canonical("length not minimally encoded"), at));
                }
                if tag.is_constructed() && !self.mode.allows_definite_constructed() {
                    return Err(self.error(
                        non_canonical(format!(
                            "definite length on a constructed encoding under {}",
                            self.mode
                        )),
                        at,
                    ));
                }
            }
        }
        self.pos += n;
        Ok(length)
    }

    /// Find the end-of-contents octets closing the indefinite-length element
    /// whose content starts here, returning their position.
    fn end_of_contents(&self) -> Result<usize> {
        let mut inner = self.descend(self.rest(), self.base + self.pos)?;
        loop {
            match inner.rest() {
                [] => return Err(inner.error(truncated(2, 0), inner.pos)),
                [0x00] => return Err(inner.error(truncated(2, 1), inner.pos)),
                [0x00, 0x00, ..] => return Ok(self.pos + inner.pos),
                [0x00, _, ..] => {
                    return Err(inner.error(
                        invalid("end-of-contents octets with non-zero length"),
                        inner.pos,
                    ))
                }
                _ => {
                    inner.read_element()?;
                }
            }
        }
    }

    fn value(&mut self, descriptor: &TypeDescriptor, path: &Path<'_>) -> Result<Value> {
        let tags = descriptor.tags().as_slice();
        let wrappers = if descriptor.kind().has_own_tag() {
            &tags[..tags.len().saturating_sub(1)]
        } else {
            tags
        };
        let value = self.wrapped(descriptor, wrappers, path)?;
        if self.options.check_constraints {
            descriptor.check_constraint(&value, path)?;
        }
        Ok(value)
    }

    fn wrapped(
        &mut self,
        descriptor: &TypeDescriptor,
        wrappers: &[Tag],
        path: &Path<'_>,
    ) -> Result<Value> {
        let (outer, inner) = match wrappers.split_first() {
            Some(split) => split,
            None => return self.base_value(descriptor, path),
        };
        let element = self.read_element()?;
        if !element.tag.matches(outer) {
            return Err(Error::decoding(
                DecodeErrorKind::UnknownTag(element.tag),
                element.offset,
            ));
        }
        if !element.tag.is_constructed() {
            return Err(Error::decoding(
                invalid(format!("explicit tag {} must be constructed", outer)),
                element.offset,
            ));
        }
        let mut child = self.descend(element.content, element.content_offset)?;
        let value = child.wrapped(descriptor, inner, path)?;
        child.finish()?;
        Ok(value)
    }

    fn base_value(&mut self, descriptor: &TypeDescriptor, path: &Path<'_>) -> Result<Value> {
        match descriptor.kind() {
            Kind::Choice(alternatives) => {
                let tag = self.expect_tag()?;
                let (name, alternative) = alternatives
                    .resolve(&tag)
                    .map_err(|k| self.error(k, self.pos))?;
                let inner = self.value(alternative, &path.field(name))?;
                Ok(Value::Choice(name.to_string(), Box::new(inner)))
            }
            Kind::Any => {
                let element = self.read_element()?;
                Ok(Value::Any(element.raw.to_vec()))
            }
            kind => {
                let own = descriptor.tags().innermost().ok_or_else(|| {
                    Error::InvalidSchema(format!("{} has no tag", kind.name()))
                })?;
                let element = self.read_element()?;
                if !element.tag.matches(own) {
                    return Err(Error::decoding(
                        DecodeErrorKind::UnknownTag(element.tag),
                        element.offset,
                    ));
                }
                self.content(kind, &element, path)
            }
        }
    }

    fn primitive(&self, element: &Element<'a>, name: &str) -> Result<&'a [u8]> {
        if element.tag.is_constructed() {
            return Err(Error::decoding(
                invalid(format!("{} must use the primitive encoding", name)),
                element.offset,
            ));
        }
        Ok(element.content)
    }

    fn constructed(&self, element: &Element<'a>, name: &str) -> Result<Decoder<'a>> {
        if !element.tag.is_constructed() {
            return Err(Error::decoding(
                invalid(format!("{} must use the constructed encoding", name)),
                element.offset,
            ));
        }
        self.descend(element.content, element.content_offset)
    }

    fn content(&self, kind: &Kind, element: &Element<'a>, path: &Path<'_>) -> Result<Value> {
        let at = element.content_offset;
        let fail = |kind: DecodeErrorKind| Error::decoding(kind, at);
        match kind {
            Kind::Boolean => match self.primitive(element, "BOOLEAN")? {
                [0x00] => Ok(Value::Boolean(false)),
                [0xff] => Ok(Value::Boolean(true)),
                [_] if self.mode.is_restricted() => {
                    Err(fail(non_canonical("BOOLEAN TRUE must be 0xFF")))
                }
                [_] => Ok(Value::Boolean(true)),
                _ => Err(fail(invalid("BOOLEAN content must be one octet"))),
            },
            Kind::Integer => Ok(Value::Integer(self.integer(element, "INTEGER")?)),
            Kind::Enumerated => Ok(Value::Enumerated(self.integer(element, "ENUMERATED")?)),
            Kind::Null => match self.primitive(element, "NULL")? {
                [] => Ok(Value::Null),
                _ => Err(fail(invalid("NULL content must be empty"))),
            },
            Kind::ObjectIdentifier => {
                let content = self.primitive(element, "OBJECT IDENTIFIER")?;
                Ok(Value::ObjectIdentifier(decode_oid(content).map_err(fail)?))
            }
            Kind::Real => {
                let content = self.primitive(element, "REAL")?;
                Ok(Value::Real(decode_real(content, self.mode).map_err(fail)?))
            }
            Kind::OctetString => Ok(Value::OctetString(
                self.segments(element, TAG_OCTET_STRING)?
                    .into_iter()
                    .flat_map(|(_, s)| s.iter().copied())
                    .collect(),
            )),
            Kind::String(string) => {
                let bytes: Vec<u8> = self
                    .segments(element, TAG_OCTET_STRING)?
                    .into_iter()
                    .flat_map(|(_, s)| s.iter().copied())
                    .collect();
                Ok(Value::String(string.decode(&bytes).map_err(|e| fail(invalid(e)))?))
            }
            Kind::BitString => Ok(Value::BitString(self.bit_string(element)?)),
            Kind::Sequence(components) => {
                let mut child = self.constructed(element, "SEQUENCE")?;
                Ok(Value::Sequence(child.sequence(components, path)?))
            }
            Kind::Set(components) => {
                let mut child = self.constructed(element, "SET")?;
                Ok(Value::Set(child.set(components, path)?))
            }
            Kind::SequenceOf(item) => {
                let mut child = self.constructed(element, "SEQUENCE OF")?;
                let mut items = vec![];
                while !child.is_empty() {
                    items.push(child.value(item, &path.index(items.len()))?);
                }
                Ok(Value::SequenceOf(items))
            }
            Kind::SetOf(item) => {
                let mut child = self.constructed(element, "SET OF")?;
                let data = child.data;
                let mut items = vec![];
                let mut previous: Option<&[u8]> = None;
                while !child.is_empty() {
                    let start = child.pos;
                    items.push(child.value(item, &path.index(items.len()))?);
                    let encoding = &data[start..child.pos];
                    if self.mode.is_restricted() && previous.map_or(false, |p| p > encoding) {
                        return Err(child.error(non_canonical("SET OF elements not sorted"), start));
                    }
                    previous = Some(encoding);
                }
                Ok(Value::SetOf(items))
            }
            Kind::Choice(_) | Kind::Any => Err(Error::InvalidSchema(format!(
                "{} has no content of its own",
                kind.name()
            ))),
        }
    }

    fn integer(&self, element: &Element<'a>, name: &str) -> Result<BigInt> {
        let content = self.primitive(element, name)?;
        let fail = |kind: DecodeErrorKind| Error::decoding(kind, element.content_offset);
        match content {
            [] => return Err(fail(invalid(format!("empty {}", name)))),
            [0x00, next, ..] | [0xff, next, ..]
                if self.mode.is_restricted() && (content[0] ^ *next) & 0x80 == 0 =>
            {
                return Err(fail(non_canonical(format!("{} not minimally encoded", name))))
            }
            _ => {}
        }
        Ok(BigInt::from_signed_bytes_be(content))
    }

    /// The primitive segments of a string encoding with their absolute
    /// offsets. A primitive encoding is its own single segment.
    fn segments(&self, element: &Element<'a>, number: u32) -> Result<Vec<(usize, &'a [u8])>> {
        if !element.tag.is_constructed() {
            if self.mode.is_cer() && element.content.len() > CER_SEGMENT {
                return Err(Error::decoding(
                    non_canonical("primitive string longer than 1000 octets under CER"),
                    element.offset,
                ));
            }
            return Ok(vec![(element.content_offset, element.content)]);
        }
        if self.mode.is_der() {
            return Err(Error::decoding(
                non_canonical("constructed string under DER"),
                element.offset,
            ));
        }

        let mut child = self.descend(element.content, element.content_offset)?;
        let mut segments = vec![];
        while !child.is_empty() {
            let segment = child.read_element()?;
            if !segment.tag.matches(&Tag::universal(number)) {
                return Err(Error::decoding(
                    DecodeErrorKind::UnknownTag(segment.tag),
                    segment.offset,
                ));
            }
            if segment.tag.is_constructed() && self.mode.is_cer() {
                return Err(Error::decoding(
                    non_canonical("nested constructed string under CER"),
                    segment.offset,
                ));
            }
            segments.append(&mut child.segments(&segment, number)?);
        }

        if self.mode.is_cer() {
            let total: usize = segments.iter().map(|(_, s)| s.len()).sum();
            if total <= CER_SEGMENT {
                return Err(Error::decoding(
                    non_canonical("constructed string of at most 1000 octets under CER"),
                    element.offset,
                ));
            }
            let last = segments.len() - 1;
            let short = segments[..last].iter().find(|(_, s)| s.len() != CER_SEGMENT);
            if let Some((offset, _)) = short {
                return Err(Error::decoding(
                    non_canonical("string segment other than 1000 octets under CER"),
                    *offset,
                ));
            }
        }
        Ok(segments)
    }

    fn bit_string(&self, element: &Element<'a>) -> Result<BitVec> {
        let segments = self.segments(element, TAG_BIT_STRING)?;
        let last = segments.len().saturating_sub(1);
        let mut data = vec![];
        let mut unused = 0;
        for (i, (offset, content)) in segments.into_iter().enumerate() {
            let fail = |kind: DecodeErrorKind| Error::decoding(kind, offset);
            let (&u, bits) = content
                .split_first()
                .ok_or_else(|| fail(invalid("BIT STRING without the unused bits octet")))?;
            if u > 7 {
                return Err(fail(invalid("more than 7 unused bits")));
            }
            if u > 0 && (bits.is_empty() || i != last) {
                return Err(fail(invalid("unused bits on an empty or inner segment")));
            }
            let padding = bits.last().map_or(0, |b| b & ((1 << u) - 1));
            if self.mode.is_restricted() && u > 0 && padding != 0 {
                return Err(fail(non_canonical("non-zero BIT STRING padding")));
            }
            data.extend_from_slice(bits);
            unused = usize::from(u);
        }
        let mut bits = BitVec::from_bytes(&data);
        bits.truncate(data.len() * 8 - unused);
        Ok(bits)
    }

    fn sequence(
        &mut self,
        components: &[ComponentType],
        path: &Path<'_>,
    ) -> Result<Vec<(String, Value)>> {
        let mut out = Vec::with_capacity(components.len());
        for component in components {
            let field = path.field(&component.name);
            let present = match self.peek_tag()? {
                Some(tag) => component.descriptor.matches_tag(&tag),
                None => false,
            };
            if present {
                let at = self.pos;
                let value = self.value(&component.descriptor, &field)?;
                if self.mode.is_restricted() && component.is_default(&value) {
                    return Err(self.error(
                        non_canonical(format!("{} encoded with its DEFAULT value", component.name)),
                        at,
                    ));
                }
                out.push((component.name.clone(), value));
                continue;
            }
            match &component.presence {
                Presence::Required => {
                    let kind = match self.peek_tag()? {
                        Some(tag) => DecodeErrorKind::UnknownTag(tag),
                        None => DecodeErrorKind::MissingComponent(field.to_string()),
                    };
                    return Err(self.error(kind, self.pos));
                }
                Presence::Optional => {}
                Presence::Default(d) => out.push((component.name.clone(), d.clone())),
            }
        }
        self.finish()?;
        Ok(out)
    }

    fn set(
        &mut self,
        components: &[ComponentType],
        path: &Path<'_>,
    ) -> Result<Vec<(String, Value)>> {
        let mut found: Vec<Option<Value>> = vec![None; components.len()];
        let mut last_key = None;
        while let Some(tag) = self.peek_tag()? {
            let at = self.pos;
            let i = components
                .iter()
                .position(|c| c.descriptor.matches_tag(&tag))
                .ok_or_else(|| self.error(DecodeErrorKind::UnknownTag(tag), at))?;
            let component = &components[i];
            if found[i].is_some() {
                return Err(self.error(
                    invalid(format!("duplicate SET component {}", component.name)),
                    at,
                ));
            }
            let value = self.value(&component.descriptor, &path.field(&component.name))?;
            if self.mode.is_restricted() {
                let key = component.descriptor.set_sort_key(self.mode, tag);
                if last_key.map_or(false, |last| key < last) {
                    return Err(
                        self.error(non_canonical("SET components not in canonical order"), at)
                    );
                }
                last_key = Some(key);
                if component.is_default(&value) {
                    return Err(self.error(
                        non_canonical(format!("{} encoded with its DEFAULT value", component.name)),
                        at,
                    ));
                }
            }
            found[i] = Some(value);
        }

        let mut out = Vec::with_capacity(components.len());
        for (component, value) in components.iter().zip(found) {
            match (value, &component.presence) {
                (Some(v), _) => out.push((component.name.clone(), v)),
                (None, Presence::Required) => {
                    return Err(self.error(
                        DecodeErrorKind::MissingComponent(path.field(&component.name).to_string()),
                        self.pos,
                    ))
                }
                (None, Presence::Optional) => {}
                (None, Presence::Default(d)) => out.push((component.name.clone(), d.clone())),
            }
        }
        Ok(out)
    }

    /// Decode one element without a schema: SEQUENCE and SET become lists of
    /// their elements, other universal types are found in the universal
    /// registry.
    fn untyped(&mut self) -> Result<Value> {
        let tag = self.expect_tag()?;
        if tag.matches(&Tag::universal(TAG_SEQUENCE)) || tag.matches(&Tag::universal(TAG_SET)) {
            let element = self.read_element()?;
            let mut child = self.constructed(&element, "SEQUENCE")?;
            let mut items = vec![];
            while !child.is_empty() {
                items.push(child.untyped()?);
            }
            return Ok(if tag.number == TAG_SET {
                Value::SetOf(items)
            } else {
                Value::SequenceOf(items)
            });
        }
        let (_, descriptor) = Registry::universal()
            .resolve(&tag)
            .map_err(|k| self.error(k, self.pos))?;
        self.value(descriptor, &Path::Root)
    }
}

/// Check that `bytes` is exactly one element with headers valid under `mode`.
pub(crate) fn check_element(bytes: &[u8], mode: Mode) -> Result<()> {
    let mut decoder = Decoder::new(bytes, mode, DecodeOptions::default());
    decoder.read_element()?;
    decoder.finish()
}

/// Decode one value of `descriptor` from the start of `bytes`, returning it
/// with the number of octets consumed.
pub fn decode(bytes: &[u8], descriptor: &TypeDescriptor, mode: Mode) -> Result<(Value, usize)> {
    decode_with_options(bytes, descriptor, mode, &DecodeOptions::default())
}

pub fn decode_with_options(
    bytes: &[u8],
    descriptor: &TypeDescriptor,
    mode: Mode,
    options: &DecodeOptions,
) -> Result<(Value, usize)> {
    let mut decoder = Decoder::new(bytes, mode, *options);
    let value = decoder.value(descriptor, &Path::Root)?;
    debug!(
        "decoded {} under {} from {} of {} bytes",
        descriptor.kind().name(),
        mode,
        decoder.position(),
        bytes.len()
    );
    Ok((value, decoder.position()))
}

/// Like `decode`, but every octet of `bytes` must belong to the value.
pub fn decode_exact(bytes: &[u8], descriptor: &TypeDescriptor, mode: Mode) -> Result<Value> {
    let (value, consumed) = decode(bytes, descriptor, mode)?;
    if consumed < bytes.len() {
        return Err(Error::decoding(
            DecodeErrorKind::TrailingData(bytes.len() - consumed),
            consumed,
        ));
    }
    Ok(value)
}

/// Decode one element using only the built-in universal types.
pub fn decode_untyped(bytes: &[u8], mode: Mode) -> Result<(Value, usize)> {
    let mut decoder = Decoder::new(bytes, mode, DecodeOptions::default());
    let value = decoder.untyped()?;
    Ok((value, decoder.position()))
}

/// Decode a native value through its `AsnType` mapping, returning it with
/// the bytes following it.
pub fn unmarshal<T: AsnType>(bytes: &[u8], mode: Mode) -> Result<(T, &[u8])> {
    let (value, consumed) = decode(bytes, &T::descriptor(), mode)?;
    Ok((T::from_value(value)?, &bytes[consumed..]))
}
