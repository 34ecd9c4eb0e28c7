//! ASN.1 type system with BER, CER and DER codecs.
//!
//! Types are described at run time with [`TypeDescriptor`]s and values are
//! [`Value`] trees; [`encode`] and [`decode`] convert between the two and the
//! X.690 transfer syntaxes. Native Rust types take part through [`AsnType`],
//! which can be derived:
//!
//! ```
//! use asn1_codec::{AsnType, Mode};
//!
//! #[derive(AsnType, Debug, PartialEq)]
//! struct Request {
//!     num: i32,
//! }
//!
//! let bytes = asn1_codec::marshal(&Request { num: 1 }, Mode::Der).unwrap();
//! assert_eq!(bytes, vec![0x30, 0x03, 0x02, 0x01, 0x01]);
//! let (req, rest) = asn1_codec::unmarshal::<Request>(&bytes, Mode::Der).unwrap();
//! assert_eq!(req, Request { num: 1 });
//! assert!(rest.is_empty());
//! ```

pub mod common;
pub mod constraint;
mod error;
pub mod marshal;
pub mod mode;
pub mod options;
pub mod registry;
pub mod stream;
pub mod typed;
pub mod types;
pub mod unmarshal;
pub mod value;

pub use crate::common::{Class, Format, Length, Tag, TagAndLength, TagSet};
pub use crate::constraint::Constraint;
pub use crate::error::{DecodeErrorKind, Error, Result};
pub use crate::marshal::{encode, encode_with_options, marshal};
pub use crate::mode::Mode;
pub use crate::options::{DecodeOptions, EncodeOptions};
pub use crate::registry::Registry;
pub use crate::stream::{decode_stream, StreamDecoder, Values};
pub use crate::typed::{AsnType, RawValue, SequenceOf, SetOf};
pub use crate::types::{ComponentType, Kind, Presence, StringKind, TypeDescriptor};
pub use crate::unmarshal::{
    decode, decode_exact, decode_untyped, decode_with_options, unmarshal, Decoder, Element,
};
pub use crate::value::{ObjectIdentifier, Real, Value};
pub use asn1_codec_derive::AsnType;
