//! Tag to type lookup tables.
//!
//! A `Registry` answers "which type does an element with this tag hold" for
//! one decoding context: the alternatives of a CHOICE, or the built-in
//! universal types for schema-less decoding. Tables are built once and only
//! read afterwards.

use crate::common::{Class, Format, Tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::types::{ComponentType, Kind, StringKind, TypeDescriptor};
use lazy_static::lazy_static;
use log::debug;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct Registry {
    entries: Vec<ComponentType>,
    index: HashMap<(Class, u32), usize>,
    /// Entry accepting any tag: an untagged ANY.
    wildcard: Option<usize>,
}

/// The tags an element of `descriptor` may start with; `None` when it may
/// start with any tag.
pub(crate) fn leading_tags(descriptor: &TypeDescriptor) -> Option<Vec<Tag>> {
    if let Some(outer) = descriptor.tags().outermost() {
        return Some(vec![*outer]);
    }
    match descriptor.kind() {
        Kind::Choice(alternatives) if alternatives.wildcard.is_none() => {
            Some(alternatives.tags().collect())
        }
        _ => None,
    }
}

/// Reject component lists whose members could not be told apart by tag.
pub(crate) fn check_distinct(components: &[ComponentType], context: &str) -> Result<()> {
    Registry::new(components.to_vec()).map_err(|e| match e {
        Error::InvalidSchema(reason) => Error::InvalidSchema(format!("{}: {}", context, reason)),
        e => e,
    })?;
    if let Some(c) = components.iter().find(|c| leading_tags(&c.descriptor).is_none()) {
        return Err(Error::InvalidSchema(format!(
            "{}: untagged ANY component {} is ambiguous",
            context, c.name
        )));
    }
    Ok(())
}

impl Registry {
    pub fn new(entries: Vec<ComponentType>) -> Result<Registry> {
        let mut index = HashMap::new();
        let mut wildcard = None;
        for (i, entry) in entries.iter().enumerate() {
            match leading_tags(&entry.descriptor) {
                Some(tags) => {
                    for tag in tags {
                        if let Some(previous) = index.insert(tag.key(), i) {
                            return Err(Error::InvalidSchema(format!(
                                "{} and {} share the tag {}",
                                entries[previous].name, entry.name, tag
                            )));
                        }
                    }
                }
                None if wildcard.is_none() => wildcard = Some(i),
                None => {
                    return Err(Error::InvalidSchema(format!(
                        "more than one untagged ANY ({})",
                        entry.name
                    )))
                }
            }
        }
        debug!("registry built with {} tags", index.len());
        Ok(Registry {
            entries,
            index,
            wildcard,
        })
    }

    /// The built-in universal types, keyed by their universal tag.
    pub fn universal() -> &'static Registry {
        &UNIVERSAL
    }

    /// Pick the entry for an element starting with `tag`.
    pub fn resolve(
        &self,
        tag: &Tag,
    ) -> std::result::Result<(&str, &TypeDescriptor), DecodeErrorKind> {
        match self.index.get(&tag.key()).or(self.wildcard.as_ref()) {
            Some(&i) => {
                let entry = &self.entries[i];
                Ok((&entry.name, &entry.descriptor))
            }
            None => Err(DecodeErrorKind::UnknownTag(*tag)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.descriptor)
    }

    pub fn entries(&self) -> &[ComponentType] {
        &self.entries
    }

    /// Every tag this registry resolves, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.index
            .keys()
            .map(|&(class, number)| Tag::new(class, Format::Primitive, number))
    }

    fn universal_types() -> Registry {
        let mut entries = vec![
            ComponentType::required("BOOLEAN", TypeDescriptor::boolean()),
            ComponentType::required("INTEGER", TypeDescriptor::integer()),
            ComponentType::required("BIT STRING", TypeDescriptor::bit_string()),
            ComponentType::required("OCTET STRING", TypeDescriptor::octet_string()),
            ComponentType::required("NULL", TypeDescriptor::null()),
            ComponentType::required("OBJECT IDENTIFIER", TypeDescriptor::object_identifier()),
            ComponentType::required("REAL", TypeDescriptor::real()),
            ComponentType::required("ENUMERATED", TypeDescriptor::enumerated()),
        ];
        for kind in StringKind::ALL.iter() {
            entries.push(ComponentType::required(kind.name(), TypeDescriptor::string(*kind)));
        }
        let index = entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.descriptor.tags().outermost().map(|t| (t.key(), i)))
            .collect();
        Registry {
            entries,
            index,
            wildcard: None,
        }
    }
}

lazy_static! {
    static ref UNIVERSAL: Registry = Registry::universal_types();
}
