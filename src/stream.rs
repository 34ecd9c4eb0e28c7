//! Decoding of consecutive top-level values.
//!
//! [`Values`] walks a complete buffer. [`StreamDecoder`] takes its input in
//! pieces and tells a value that has not fully arrived yet (an underrun,
//! reported as `Truncated`) apart from the end of the stream.

use crate::error::{DecodeErrorKind, Error, Result};
use crate::mode::Mode;
use crate::options::DecodeOptions;
use crate::types::TypeDescriptor;
use crate::unmarshal::{decode_with_options, Decoder};
use crate::value::Value;
use log::{debug, trace};

/// Length of the complete element at the start of `bytes`. Only the headers
/// are checked, so a `Truncated` error here means the element has not been
/// fully received.
fn element_length(bytes: &[u8], mode: Mode, options: &DecodeOptions) -> Result<usize> {
    let element = Decoder::new(bytes, mode, *options).read_element()?;
    Ok(element.raw.len())
}

fn value_of(
    element: &[u8],
    descriptor: &TypeDescriptor,
    mode: Mode,
    options: &DecodeOptions,
) -> Result<Value> {
    let (value, consumed) = decode_with_options(element, descriptor, mode, options)?;
    if consumed < element.len() {
        return Err(Error::decoding(
            DecodeErrorKind::TrailingData(element.len() - consumed),
            consumed,
        ));
    }
    Ok(value)
}

/// Iterator over the values of one type laid end to end in a buffer.
///
/// Iteration ends when the buffer is used up or after the first error. A
/// buffer ending inside a value yields a `Truncated` error.
pub struct Values<'a> {
    data: &'a [u8],
    pos: usize,
    descriptor: &'a TypeDescriptor,
    mode: Mode,
    options: DecodeOptions,
    done: bool,
}

impl<'a> Values<'a> {
    pub fn new(
        data: &'a [u8],
        descriptor: &'a TypeDescriptor,
        mode: Mode,
        options: DecodeOptions,
    ) -> Values<'a> {
        Values {
            data,
            pos: 0,
            descriptor,
            mode,
            options,
            done: false,
        }
    }

    /// Octets consumed by the values returned so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn step(&mut self) -> Result<Value> {
        let rest = &self.data[self.pos..];
        let length = element_length(rest, self.mode, &self.options)?;
        let value = value_of(&rest[..length], self.descriptor, self.mode, &self.options)?;
        self.pos += length;
        Ok(value)
    }
}

impl<'a> Iterator for Values<'a> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.data.len() {
            return None;
        }
        let result = self.step().map_err(|e| e.shifted(self.pos));
        self.done = result.is_err();
        Some(result)
    }
}

/// Iterate over every value of `descriptor` in `bytes`.
pub fn decode_stream<'a>(
    bytes: &'a [u8],
    descriptor: &'a TypeDescriptor,
    mode: Mode,
) -> Values<'a> {
    Values::new(bytes, descriptor, mode, DecodeOptions::default())
}

/// Decodes values of one type from input fed in arbitrary pieces.
///
/// ```
/// use asn1_codec::{Mode, StreamDecoder, TypeDescriptor, Value};
///
/// let mut stream = StreamDecoder::new(TypeDescriptor::integer(), Mode::Der);
/// stream.feed(&[0x02, 0x01, 0x05, 0x02]);
/// assert_eq!(stream.next_value().unwrap(), Some(Value::from(5)));
/// // the second INTEGER has only started to arrive
/// assert!(stream.next_value().is_err());
/// assert!(!stream.is_failed());
/// stream.feed(&[0x01, 0x06]);
/// assert_eq!(stream.next_value().unwrap(), Some(Value::from(6)));
/// assert_eq!(stream.next_value().unwrap(), None);
/// ```
pub struct StreamDecoder {
    descriptor: TypeDescriptor,
    mode: Mode,
    options: DecodeOptions,
    buffer: Vec<u8>,
    /// Stream offset of `buffer[0]`.
    offset: usize,
    failed: bool,
}

impl StreamDecoder {
    pub fn new(descriptor: TypeDescriptor, mode: Mode) -> StreamDecoder {
        StreamDecoder::with_options(descriptor, mode, DecodeOptions::default())
    }

    pub fn with_options(
        descriptor: TypeDescriptor,
        mode: Mode,
        options: DecodeOptions,
    ) -> StreamDecoder {
        StreamDecoder {
            descriptor,
            mode,
            options,
            buffer: vec![],
            offset: 0,
            failed: false,
        }
    }

    /// Append received octets.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Octets received but not yet decoded.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Octets of the stream decoded so far.
    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// The next complete value, or `None` when nothing is pending.
    ///
    /// When the pending octets end inside a value the error is `Truncated`
    /// and the decoder stays usable: feed more input and call again. Any
    /// other error is final.
    pub fn next_value(&mut self) -> Result<Option<Value>> {
        if self.failed {
            return Err(Error::decoding(
                DecodeErrorKind::InvalidContent("stream decoder has already failed".to_string()),
                self.offset,
            ));
        }
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let length = match element_length(&self.buffer, self.mode, &self.options) {
            Ok(length) => length,
            Err(e) => {
                if let Some(DecodeErrorKind::Truncated { needed, available }) = e.decode_kind() {
                    trace!(
                        "underrun at {}: {} bytes needed, {} available",
                        self.offset,
                        needed,
                        available
                    );
                } else {
                    self.failed = true;
                }
                return Err(e.shifted(self.offset));
            }
        };

        let result = value_of(&self.buffer[..length], &self.descriptor, self.mode, &self.options);
        match result {
            Ok(value) => {
                debug!(
                    "decoded {} of {} bytes at {}",
                    self.descriptor.kind().name(),
                    length,
                    self.offset
                );
                self.buffer.drain(..length);
                self.offset += length;
                Ok(Some(value))
            }
            Err(e) => {
                self.failed = true;
                Err(e.shifted(self.offset))
            }
        }
    }

    /// Declare the end of the input. Fails if octets are still pending.
    pub fn finish(&self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        match element_length(&self.buffer, self.mode, &self.options) {
            Err(e) => Err(e.shifted(self.offset)),
            Ok(_) => Err(Error::decoding(
                DecodeErrorKind::TrailingData(self.buffer.len()),
                self.offset,
            )),
        }
    }
}
