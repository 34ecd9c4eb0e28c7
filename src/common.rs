use std::fmt;

pub const TAG_END_OF_CONTENTS: u32 = 0;
pub const TAG_BOOLEAN: u32 = 1;
pub const TAG_INTEGER: u32 = 2;
pub const TAG_BIT_STRING: u32 = 3;
pub const TAG_OCTET_STRING: u32 = 4;
pub const TAG_NULL: u32 = 5;
pub const TAG_OID: u32 = 6;
pub const TAG_REAL: u32 = 9;
pub const TAG_ENUM: u32 = 10;
pub const TAG_UTF8_STRING: u32 = 12;
pub const TAG_SEQUENCE: u32 = 16;
pub const TAG_SET: u32 = 17;
pub const TAG_NUMERIC_STRING: u32 = 18;
pub const TAG_PRINTABLE_STRING: u32 = 19;
pub const TAG_T61_STRING: u32 = 20;
pub const TAG_VIDEOTEX_STRING: u32 = 21;
pub const TAG_IA5_STRING: u32 = 22;
pub const TAG_UTCTIME: u32 = 23;
pub const TAG_GENERALIZED_TIME: u32 = 24;
pub const TAG_GRAPHIC_STRING: u32 = 25;
pub const TAG_VISIBLE_STRING: u32 = 26;
pub const TAG_GENERAL_STRING: u32 = 27;
pub const TAG_UNIVERSAL_STRING: u32 = 28;
pub const TAG_BMPSTRING: u32 = 30;

/// ASN.1 class types represent the namespace of the tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Class {
    Universal,
    Application,
    Context,
    Private,
}

impl Class {
    pub(crate) fn bits(self) -> u8 {
        match self {
            Class::Universal => 0b00,
            Class::Application => 0b01,
            Class::Context => 0b10,
            Class::Private => 0b11,
        }
    }

    pub(crate) fn from_bits(b: u8) -> Class {
        match b & 0b11 {
            0b00 => Class::Universal,
            0b01 => Class::Application,
            0b10 => Class::Context,
            _ => Class::Private,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Primitive,
    Constructed,
}

/// A single tag: class, primitive/constructed flag and number.
///
/// Two tags *match* when class and number agree; the format bit describes a
/// particular encoding and is not part of a type's identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    pub class: Class,
    pub format: Format,
    pub number: u32,
}

impl Tag {
    pub const fn new(class: Class, format: Format, number: u32) -> Tag {
        Tag {
            class,
            format,
            number,
        }
    }

    pub const fn universal(number: u32) -> Tag {
        Tag::new(Class::Universal, Format::Primitive, number)
    }

    pub const fn application(number: u32) -> Tag {
        Tag::new(Class::Application, Format::Primitive, number)
    }

    pub const fn context(number: u32) -> Tag {
        Tag::new(Class::Context, Format::Primitive, number)
    }

    pub const fn private(number: u32) -> Tag {
        Tag::new(Class::Private, Format::Primitive, number)
    }

    pub fn constructed(self) -> Tag {
        Tag {
            format: Format::Constructed,
            ..self
        }
    }

    pub fn with_format(self, format: Format) -> Tag {
        Tag { format, ..self }
    }

    pub fn is_constructed(&self) -> bool {
        self.format == Format::Constructed
    }

    pub fn matches(&self, other: &Tag) -> bool {
        self.class == other.class && self.number == other.number
    }

    /// Canonical ordering key (X.680 8.6): universal, application,
    /// context-specific, private, then ascending number.
    pub fn key(&self) -> (Class, u32) {
        (self.class, self.number)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class {
            Class::Universal => write!(f, "[UNIVERSAL {}]", self.number),
            Class::Application => write!(f, "[APPLICATION {}]", self.number),
            Class::Context => write!(f, "[{}]", self.number),
            Class::Private => write!(f, "[PRIVATE {}]", self.number),
        }
    }
}

// ASN.1 has IMPLICIT and EXPLICIT tags, which can be translated as "instead
// of" and "in addition to". When not specified, every built-in type has a
// default tag in the UNIVERSAL class.
//
// For example: a BIT STRING is tagged [UNIVERSAL 3] by default. Saying
// [IMPLICIT CONTEXT-SPECIFIC 42] means that the tag is replaced by another.
//
// On the other hand, if it said [EXPLICIT CONTEXT-SPECIFIC 10], then an
// /additional/ tag would wrap the default tag. This explicit tag will have the
// constructed flag set.
//
// Tags layer to an arbitrary depth; a TagSet keeps the whole chain with the
// outermost tag first. Untagged CHOICE and ANY have an empty chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TagSet(Vec<Tag>);

impl TagSet {
    pub fn new() -> TagSet {
        TagSet(Vec::new())
    }

    pub fn single(tag: Tag) -> TagSet {
        TagSet(vec![tag])
    }

    pub fn outermost(&self) -> Option<&Tag> {
        self.0.first()
    }

    pub fn innermost(&self) -> Option<&Tag> {
        self.0.last()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Tag] {
        &self.0
    }

    /// Replace the outermost tag, keeping its format.
    pub fn tag_implicitly(&self, tag: Tag) -> TagSet {
        let mut tags = self.0.clone();
        match tags.first_mut() {
            Some(outer) => *outer = tag.with_format(outer.format),
            None => tags.push(tag.constructed()),
        }
        TagSet(tags)
    }

    /// Wrap the whole chain in an additional constructed tag.
    pub fn tag_explicitly(&self, tag: Tag) -> TagSet {
        let mut tags = Vec::with_capacity(self.0.len() + 1);
        tags.push(tag.constructed());
        tags.extend_from_slice(&self.0);
        TagSet(tags)
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", tag)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Length {
    Definite(usize),
    Indefinite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagAndLength {
    pub tag: Tag,
    pub length: Length,
}

/// Location of a component inside a value tree, for diagnostics.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Path<'a> {
    Root,
    Field(&'a Path<'a>, &'a str),
    Index(&'a Path<'a>, usize),
}

impl<'a> Path<'a> {
    pub(crate) fn field(&'a self, name: &'a str) -> Path<'a> {
        Path::Field(self, name)
    }

    pub(crate) fn index(&'a self, i: usize) -> Path<'a> {
        Path::Index(self, i)
    }
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Root => write!(f, "$"),
            Path::Field(parent, name) => write!(f, "{}.{}", parent, name),
            Path::Index(parent, i) => write!(f, "{}[{}]", parent, i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_chains() {
        let integer = TagSet::single(Tag::universal(TAG_INTEGER));

        let implicit = integer.tag_implicitly(Tag::context(5));
        assert_eq!(implicit.as_slice(), &[Tag::context(5)]);

        let explicit = integer.tag_explicitly(Tag::context(5));
        assert_eq!(
            explicit.as_slice(),
            &[Tag::context(5).constructed(), Tag::universal(TAG_INTEGER)]
        );

        // an implicit tag on top of an explicit one replaces the wrapper
        let both = explicit.tag_implicitly(Tag::application(1));
        assert_eq!(
            both.as_slice(),
            &[Tag::application(1).constructed(), Tag::universal(TAG_INTEGER)]
        );

        let untagged = TagSet::new().tag_implicitly(Tag::context(0));
        assert_eq!(untagged.as_slice(), &[Tag::context(0).constructed()]);
    }

    #[test]
    fn canonical_order() {
        let mut tags = vec![
            Tag::private(0),
            Tag::context(2),
            Tag::universal(TAG_SEQUENCE),
            Tag::context(1),
            Tag::application(7),
        ];
        tags.sort_by_key(|t| t.key());
        assert_eq!(
            tags,
            vec![
                Tag::universal(TAG_SEQUENCE),
                Tag::application(7),
                Tag::context(1),
                Tag::context(2),
                Tag::private(0),
            ]
        );
    }

    #[test]
    fn display() {
        assert_eq!(Tag::context(3).to_string(), "[3]");
        assert_eq!(Tag::universal(2).to_string(), "[UNIVERSAL 2]");
        let root = Path::Root;
        let a = root.field("a");
        let b = a.index(2);
        assert_eq!(b.to_string(), "$.a[2]");
    }
}
