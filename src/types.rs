//! Type descriptors: what a value of a given ASN.1 type looks like and how
//! it is tagged.

use crate::common::{self, Class, Path, Tag, TagSet};
use crate::constraint::Constraint;
use crate::error::{Error, Result};
use crate::mode::Mode;
use crate::registry::{self, Registry};
use crate::value::{Real, Value};

/// The restricted character string types and the useful time types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StringKind {
    Utf8,
    Numeric,
    Printable,
    Teletex,
    Videotex,
    Ia5,
    UtcTime,
    GeneralizedTime,
    Graphic,
    Visible,
    General,
    Universal,
    Bmp,
}

impl StringKind {
    pub const ALL: [StringKind; 13] = [
        StringKind::Utf8,
        StringKind::Numeric,
        StringKind::Printable,
        StringKind::Teletex,
        StringKind::Videotex,
        StringKind::Ia5,
        StringKind::UtcTime,
        StringKind::GeneralizedTime,
        StringKind::Graphic,
        StringKind::Visible,
        StringKind::General,
        StringKind::Universal,
        StringKind::Bmp,
    ];

    pub fn tag_number(self) -> u32 {
        match self {
            StringKind::Utf8 => common::TAG_UTF8_STRING,
            StringKind::Numeric => common::TAG_NUMERIC_STRING,
            StringKind::Printable => common::TAG_PRINTABLE_STRING,
            StringKind::Teletex => common::TAG_T61_STRING,
            StringKind::Videotex => common::TAG_VIDEOTEX_STRING,
            StringKind::Ia5 => common::TAG_IA5_STRING,
            StringKind::UtcTime => common::TAG_UTCTIME,
            StringKind::GeneralizedTime => common::TAG_GENERALIZED_TIME,
            StringKind::Graphic => common::TAG_GRAPHIC_STRING,
            StringKind::Visible => common::TAG_VISIBLE_STRING,
            StringKind::General => common::TAG_GENERAL_STRING,
            StringKind::Universal => common::TAG_UNIVERSAL_STRING,
            StringKind::Bmp => common::TAG_BMPSTRING,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StringKind::Utf8 => "UTF8String",
            StringKind::Numeric => "NumericString",
            StringKind::Printable => "PrintableString",
            StringKind::Teletex => "TeletexString",
            StringKind::Videotex => "VideotexString",
            StringKind::Ia5 => "IA5String",
            StringKind::UtcTime => "UTCTime",
            StringKind::GeneralizedTime => "GeneralizedTime",
            StringKind::Graphic => "GraphicString",
            StringKind::Visible => "VisibleString",
            StringKind::General => "GeneralString",
            StringKind::Universal => "UniversalString",
            StringKind::Bmp => "BMPString",
        }
    }

    /// Whether `c` belongs to this type's character repertoire.
    pub fn permits(self, c: char) -> bool {
        match self {
            StringKind::Utf8 => true,
            StringKind::Numeric => c.is_ascii_digit() || c == ' ',
            StringKind::Printable => {
                c.is_ascii_alphanumeric() || " '()+,-./:=?".contains(c)
            }
            StringKind::Ia5 => c.is_ascii(),
            StringKind::Visible | StringKind::UtcTime | StringKind::GeneralizedTime => {
                (' '..='~').contains(&c)
            }
            StringKind::Teletex
            | StringKind::Videotex
            | StringKind::Graphic
            | StringKind::General => (c as u32) <= 0xff,
            StringKind::Universal => true,
            StringKind::Bmp => (c as u32) <= 0xffff,
        }
    }

    pub(crate) fn check(self, s: &str) -> std::result::Result<(), String> {
        match s.chars().find(|c| !self.permits(*c)) {
            Some(c) => Err(format!("{:?} is not a valid {} character", c, self.name())),
            None => Ok(()),
        }
    }

    pub(crate) fn encode(self, s: &str) -> std::result::Result<Vec<u8>, String> {
        self.check(s)?;
        Ok(match self {
            StringKind::Utf8 => s.as_bytes().to_vec(),
            StringKind::Universal => s.chars().flat_map(|c| (c as u32).to_be_bytes()).collect(),
            StringKind::Bmp => s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect(),
            _ => s.chars().map(|c| c as u8).collect(),
        })
    }

    pub(crate) fn decode(self, bytes: &[u8]) -> std::result::Result<String, String> {
        let s = match self {
            StringKind::Utf8 => std::str::from_utf8(bytes)
                .map_err(|e| format!("invalid UTF-8: {}", e))?
                .to_string(),
            StringKind::Universal => {
                if bytes.len() % 4 != 0 {
                    return Err("UniversalString length not a multiple of 4".to_string());
                }
                bytes
                    .chunks(4)
                    .map(|c| {
                        let u = u32::from_be_bytes([c[0], c[1], c[2], c[3]]);
                        std::char::from_u32(u).ok_or_else(|| format!("invalid code point {:#x}", u))
                    })
                    .collect::<std::result::Result<String, String>>()?
            }
            StringKind::Bmp => {
                if bytes.len() % 2 != 0 {
                    return Err("BMPString length not a multiple of 2".to_string());
                }
                let units: Vec<u16> = bytes
                    .chunks(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|_| "invalid BMPString".to_string())?
            }
            _ => bytes.iter().map(|b| char::from(*b)).collect(),
        };
        self.check(&s)?;
        Ok(s)
    }
}

/// The ASN.1 type variants.
#[derive(Clone, Debug, PartialEq)]
pub enum Kind {
    Boolean,
    Integer,
    Enumerated,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    Real,
    String(StringKind),
    Sequence(Vec<ComponentType>),
    Set(Vec<ComponentType>),
    Choice(Registry),
    SequenceOf(Box<TypeDescriptor>),
    SetOf(Box<TypeDescriptor>),
    Any,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Boolean => "BOOLEAN",
            Kind::Integer => "INTEGER",
            Kind::Enumerated => "ENUMERATED",
            Kind::BitString => "BIT STRING",
            Kind::OctetString => "OCTET STRING",
            Kind::Null => "NULL",
            Kind::ObjectIdentifier => "OBJECT IDENTIFIER",
            Kind::Real => "REAL",
            Kind::String(s) => s.name(),
            Kind::Sequence(_) => "SEQUENCE",
            Kind::Set(_) => "SET",
            Kind::Choice(_) => "CHOICE",
            Kind::SequenceOf(_) => "SEQUENCE OF",
            Kind::SetOf(_) => "SET OF",
            Kind::Any => "ANY",
        }
    }

    /// The universal tag, or `None` for CHOICE and ANY which have none.
    pub fn default_tag(&self) -> Option<Tag> {
        let number = match self {
            Kind::Boolean => common::TAG_BOOLEAN,
            Kind::Integer => common::TAG_INTEGER,
            Kind::Enumerated => common::TAG_ENUM,
            Kind::BitString => common::TAG_BIT_STRING,
            Kind::OctetString => common::TAG_OCTET_STRING,
            Kind::Null => common::TAG_NULL,
            Kind::ObjectIdentifier => common::TAG_OID,
            Kind::Real => common::TAG_REAL,
            Kind::String(s) => s.tag_number(),
            Kind::Sequence(_) | Kind::SequenceOf(_) => {
                return Some(Tag::universal(common::TAG_SEQUENCE).constructed())
            }
            Kind::Set(_) | Kind::SetOf(_) => {
                return Some(Tag::universal(common::TAG_SET).constructed())
            }
            Kind::Choice(_) | Kind::Any => return None,
        };
        Some(Tag::universal(number))
    }

    pub fn has_own_tag(&self) -> bool {
        !matches!(self, Kind::Choice(_) | Kind::Any)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    Default(Value),
}

/// A named component of a SEQUENCE or SET, or an alternative of a CHOICE.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentType {
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub presence: Presence,
}

impl ComponentType {
    pub fn required(name: impl Into<String>, descriptor: TypeDescriptor) -> ComponentType {
        ComponentType {
            name: name.into(),
            descriptor,
            presence: Presence::Required,
        }
    }

    pub fn optional(name: impl Into<String>, descriptor: TypeDescriptor) -> ComponentType {
        ComponentType {
            name: name.into(),
            descriptor,
            presence: Presence::Optional,
        }
    }

    pub fn defaulted(
        name: impl Into<String>,
        descriptor: TypeDescriptor,
        default: impl Into<Value>,
    ) -> ComponentType {
        ComponentType {
            name: name.into(),
            descriptor,
            presence: Presence::Default(default.into()),
        }
    }

    /// Whether `value` equals this component's DEFAULT and is therefore left
    /// out of encodings.
    pub fn is_default(&self, value: &Value) -> bool {
        matches!(&self.presence, Presence::Default(d) if d == value)
    }
}

/// Describes one ASN.1 type: its tags, its variant and its constraint.
///
/// Descriptors are built once and only read afterwards; they can be shared
/// freely between threads.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDescriptor {
    tags: TagSet,
    kind: Kind,
    constraint: Option<Constraint>,
}

impl TypeDescriptor {
    pub fn new(kind: Kind) -> TypeDescriptor {
        let tags = match kind.default_tag() {
            Some(tag) => TagSet::single(tag),
            None => TagSet::new(),
        };
        TypeDescriptor {
            tags,
            kind,
            constraint: None,
        }
    }

    pub fn boolean() -> TypeDescriptor {
        TypeDescriptor::new(Kind::Boolean)
    }

    pub fn integer() -> TypeDescriptor {
        TypeDescriptor::new(Kind::Integer)
    }

    pub fn enumerated() -> TypeDescriptor {
        TypeDescriptor::new(Kind::Enumerated)
    }

    pub fn bit_string() -> TypeDescriptor {
        TypeDescriptor::new(Kind::BitString)
    }

    pub fn octet_string() -> TypeDescriptor {
        TypeDescriptor::new(Kind::OctetString)
    }

    pub fn null() -> TypeDescriptor {
        TypeDescriptor::new(Kind::Null)
    }

    pub fn object_identifier() -> TypeDescriptor {
        TypeDescriptor::new(Kind::ObjectIdentifier)
    }

    pub fn real() -> TypeDescriptor {
        TypeDescriptor::new(Kind::Real)
    }

    pub fn string(kind: StringKind) -> TypeDescriptor {
        TypeDescriptor::new(Kind::String(kind))
    }

    pub fn utf8_string() -> TypeDescriptor {
        TypeDescriptor::string(StringKind::Utf8)
    }

    pub fn printable_string() -> TypeDescriptor {
        TypeDescriptor::string(StringKind::Printable)
    }

    pub fn ia5_string() -> TypeDescriptor {
        TypeDescriptor::string(StringKind::Ia5)
    }

    pub fn any() -> TypeDescriptor {
        TypeDescriptor::new(Kind::Any)
    }

    /// A SEQUENCE; every DEFAULT value must be a valid value of its
    /// component.
    pub fn try_sequence(components: Vec<ComponentType>) -> Result<TypeDescriptor> {
        let components = conform_defaults(components, "SEQUENCE")?;
        Ok(TypeDescriptor::new(Kind::Sequence(components)))
    }

    /// # Panics
    ///
    /// If a DEFAULT value is not a valid value of its component.
    pub fn sequence(components: Vec<ComponentType>) -> TypeDescriptor {
        match TypeDescriptor::try_sequence(components) {
            Ok(d) => d,
            Err(e) => panic!("{}", e),
        }
    }

    /// A SET; its components must have distinct tags and valid DEFAULT
    /// values.
    pub fn try_set(components: Vec<ComponentType>) -> Result<TypeDescriptor> {
        registry::check_distinct(&components, "SET")?;
        let components = conform_defaults(components, "SET")?;
        Ok(TypeDescriptor::new(Kind::Set(components)))
    }

    /// # Panics
    ///
    /// If the components do not have distinct tags, or a DEFAULT value is
    /// not a valid value of its component.
    pub fn set(components: Vec<ComponentType>) -> TypeDescriptor {
        match TypeDescriptor::try_set(components) {
            Ok(d) => d,
            Err(e) => panic!("{}", e),
        }
    }

    /// A CHOICE; its alternatives must have distinct tags.
    pub fn try_choice(alternatives: Vec<ComponentType>) -> Result<TypeDescriptor> {
        if let Some(alt) = alternatives.iter().find(|a| a.presence != Presence::Required) {
            return Err(Error::InvalidSchema(format!(
                "CHOICE alternative {} cannot be OPTIONAL or DEFAULT",
                alt.name
            )));
        }
        Ok(TypeDescriptor::new(Kind::Choice(Registry::new(alternatives)?)))
    }

    /// # Panics
    ///
    /// If the alternatives do not have distinct tags.
    pub fn choice(alternatives: Vec<ComponentType>) -> TypeDescriptor {
        match TypeDescriptor::try_choice(alternatives) {
            Ok(d) => d,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn sequence_of(element: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::new(Kind::SequenceOf(Box::new(element)))
    }

    pub fn set_of(element: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::new(Kind::SetOf(Box::new(element)))
    }

    /// Attach a constraint, intersecting it with any already present.
    pub fn with_constraint(mut self, constraint: Constraint) -> TypeDescriptor {
        self.constraint = Some(match self.constraint.take() {
            Some(existing) => existing.and(constraint),
            None => constraint,
        });
        self
    }

    /// `[tag] IMPLICIT T`. Untagged CHOICE and ANY are tagged explicitly.
    pub fn tagged_implicitly(mut self, tag: Tag) -> TypeDescriptor {
        self.tags = self.tags.tag_implicitly(tag);
        self
    }

    /// `[tag] EXPLICIT T`.
    pub fn tagged_explicitly(mut self, tag: Tag) -> TypeDescriptor {
        self.tags = self.tags.tag_explicitly(tag);
        self
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    /// Whether an element starting with `tag` can be a value of this type.
    pub fn matches_tag(&self, tag: &Tag) -> bool {
        match self.tags.outermost() {
            Some(outer) => outer.matches(tag),
            None => match &self.kind {
                Kind::Choice(alternatives) => alternatives.resolve(tag).is_ok(),
                _ => true,
            },
        }
    }

    /// Key used to order SET components under CER: the outermost tag, or
    /// for an untagged CHOICE the smallest tag among its alternatives.
    pub(crate) fn cer_sort_key(&self) -> Option<(Class, u32)> {
        match (self.tags.outermost(), &self.kind) {
            (Some(outer), _) => Some(outer.key()),
            (None, Kind::Choice(alternatives)) => alternatives.tags().map(|t| t.key()).min(),
            _ => None,
        }
    }

    pub(crate) fn check_constraint(&self, value: &Value, path: &Path<'_>) -> Result<()> {
        match &self.constraint {
            Some(c) => c.validate(value).map_err(|failed| Error::ConstraintViolation {
                path: path.to_string(),
                constraint: failed.clone(),
                actual: value.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Build a typed value from a native one.
    ///
    /// The value's shape is checked against this descriptor, components are
    /// put in schema order, absent DEFAULT components are filled in and
    /// constraints are validated.
    pub fn construct(&self, value: impl Into<Value>) -> Result<Value> {
        self.conform(value.into(), &Path::Root, true)
    }

    pub(crate) fn conform(&self, value: Value, path: &Path<'_>, check: bool) -> Result<Value> {
        let value = match (&self.kind, value) {
            (Kind::Boolean, v @ Value::Boolean(_))
            | (Kind::Integer, v @ Value::Integer(_))
            | (Kind::Enumerated, v @ Value::Enumerated(_))
            | (Kind::BitString, v @ Value::BitString(_))
            | (Kind::OctetString, v @ Value::OctetString(_))
            | (Kind::Null, v @ Value::Null)
            | (Kind::Any, v @ Value::Any(_)) => v,
            (Kind::Enumerated, Value::Integer(i)) => Value::Enumerated(i),
            (Kind::ObjectIdentifier, Value::ObjectIdentifier(oid)) => {
                if let Some(reason) = oid.check() {
                    return Err(Error::Encoding(format!("{}: {}", path, reason)));
                }
                Value::ObjectIdentifier(oid)
            }
            (Kind::Real, Value::Real(r)) => Value::Real(match r {
                Real::Finite {
                    mantissa,
                    base,
                    exponent,
                } if base == 2 || base == 10 => match Real::try_new(mantissa, base, exponent) {
                    Some(r) => r,
                    None => {
                        return Err(Error::Encoding(format!("{}: REAL exponent too large", path)))
                    }
                },
                Real::Finite { base, .. } => {
                    return Err(Error::Encoding(format!(
                        "{}: REAL base {} is not 2 or 10",
                        path, base
                    )))
                }
                r => r,
            }),
            (Kind::String(kind), Value::String(s)) => {
                if let Err(reason) = kind.check(&s) {
                    return Err(Error::Encoding(format!("{}: {}", path, reason)));
                }
                Value::String(s)
            }
            (Kind::Sequence(components), v) => {
                Value::Sequence(conform_components(components, v, path, check, "SEQUENCE")?)
            }
            (Kind::Set(components), v) => {
                Value::Set(conform_components(components, v, path, check, "SET")?)
            }
            (Kind::Choice(alternatives), v) => conform_choice(alternatives, v, path, check)?,
            (Kind::SequenceOf(element), Value::SequenceOf(items)) => {
                Value::SequenceOf(conform_elements(element, items, path, check)?)
            }
            (Kind::SetOf(element), Value::SetOf(items)) => {
                Value::SetOf(conform_elements(element, items, path, check)?)
            }
            (kind, v) => return Err(Error::mismatch(path, kind.name(), v.kind_name())),
        };
        if check {
            self.check_constraint(&value, path)?;
        }
        Ok(value)
    }

    /// Ordering key of a SET component whose encoding starts with
    /// `encoded_tag`. Only CER orders an untagged CHOICE differently.
    pub(crate) fn set_sort_key(&self, mode: Mode, encoded_tag: Tag) -> (Class, u32) {
        if mode.is_cer() && self.tags.is_empty() {
            if let Some(key) = self.cer_sort_key() {
                return key;
            }
        }
        encoded_tag.key()
    }
}

/// Store each DEFAULT in the form a decoded or conformed value takes, so
/// that it compares equal to a supplied value.
fn conform_defaults(components: Vec<ComponentType>, container: &str) -> Result<Vec<ComponentType>> {
    components
        .into_iter()
        .map(|mut component| {
            if let Presence::Default(d) = component.presence {
                let path = Path::Root;
                let name = &component.name;
                let conformed = component
                    .descriptor
                    .conform(d, &path.field(&component.name), true)
                    .map_err(|e| {
                        Error::InvalidSchema(format!(
                            "{} DEFAULT of {}: {}",
                            container, name, e
                        ))
                    })?;
                component.presence = Presence::Default(conformed);
            }
            Ok(component)
        })
        .collect()
}

fn conform_elements(
    element: &TypeDescriptor,
    items: Vec<Value>,
    path: &Path<'_>,
    check: bool,
) -> Result<Vec<Value>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| element.conform(item, &path.index(i), check))
        .collect()
}

fn conform_components(
    components: &[ComponentType],
    value: Value,
    path: &Path<'_>,
    check: bool,
    expected: &str,
) -> Result<Vec<(String, Value)>> {
    let mut supplied = match value {
        Value::Sequence(fields) | Value::Set(fields) => {
            for (name, _) in &fields {
                if !components.iter().any(|c| &c.name == name) {
                    return Err(Error::mismatch(
                        path,
                        expected,
                        format!("unknown component {}", name),
                    ));
                }
            }
            fields
        }
        Value::SequenceOf(items) => {
            if items.len() != components.len() {
                return Err(Error::mismatch(
                    path,
                    format!("{} of {} components", expected, components.len()),
                    format!("tuple of {} values", items.len()),
                ));
            }
            components
                .iter()
                .map(|c| c.name.clone())
                .zip(items)
                .collect()
        }
        other => return Err(Error::mismatch(path, expected, other.kind_name())),
    };

    let mut out = Vec::with_capacity(components.len());
    for component in components {
        let field_path = path.field(&component.name);
        let matching = supplied.iter().filter(|(n, _)| n == &component.name).count();
        if matching > 1 {
            return Err(Error::mismatch(
                &field_path,
                "a single value",
                format!("{} values", matching),
            ));
        }
        let value = supplied
            .iter()
            .position(|(n, _)| n == &component.name)
            .map(|i| supplied.remove(i).1);
        match (value, &component.presence) {
            (Some(v), _) => out.push((
                component.name.clone(),
                component.descriptor.conform(v, &field_path, check)?,
            )),
            (None, Presence::Required) => {
                return Err(Error::mismatch(
                    &field_path,
                    component.descriptor.kind().name(),
                    "absent component",
                ))
            }
            (None, Presence::Optional) => {}
            (None, Presence::Default(d)) => out.push((component.name.clone(), d.clone())),
        }
    }
    Ok(out)
}

fn conform_choice(
    alternatives: &Registry,
    value: Value,
    path: &Path<'_>,
    check: bool,
) -> Result<Value> {
    let (name, inner) = match value {
        Value::Choice(name, inner) => (name, *inner),
        Value::Sequence(mut fields) | Value::Set(mut fields) => {
            if fields.len() != 1 {
                return Err(Error::mismatch(
                    path,
                    "exactly one CHOICE alternative",
                    format!("{} alternatives", fields.len()),
                ));
            }
            match fields.pop() {
                Some(field) => field,
                None => return Err(Error::mismatch(path, "CHOICE", "no alternative")),
            }
        }
        other => return Err(Error::mismatch(path, "CHOICE", other.kind_name())),
    };
    let descriptor = match alternatives.get(&name) {
        Some(d) => d,
        None => {
            return Err(Error::mismatch(
                path,
                "CHOICE",
                format!("unknown alternative {}", name),
            ))
        }
    };
    let inner = descriptor.conform(inner, &path.field(&name), check)?;
    Ok(Value::Choice(name, Box::new(inner)))
}
