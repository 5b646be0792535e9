//! Error types for SCEF loading and serialization.
//!
//! Errors are returned as values. A failed [`load`](crate::Document::load)
//! or [`save`](crate::Document::save) yields an [`ErrorKind`], and the
//! document's [`last_error`](crate::Document::last_error) context keeps the
//! position, the extra payload, the item under construction, and the stack
//! of open groups at the moment of failure.
//!
//! ## Warnings
//!
//! Recoverable anomalies (a bad escape, an unexpected character, a quoted
//! string hitting end of stream) are routed through a user callback before
//! the parser decides how to continue. The callback inspects the error
//! context and answers with a [`WarnAction`]; `Abort` always fails the
//! operation with the corresponding error.
//!
//! ## Examples
//!
//! ```rust
//! use scef::{from_bytes, ErrorKind, Flags};
//!
//! let (doc, result) = from_bytes(b"!SCEF:V=1\n<g: a", Flags::empty());
//! assert_eq!(result, Err(ErrorKind::PrematureEnd));
//! assert_eq!(doc.last_error().code(), Some(ErrorKind::PrematureEnd));
//! ```

use thiserror::Error;

use crate::encoding::EncodingKind;
use crate::items::{ItemRef, WeakItemRef};
use crate::stream::StreamStatus;

/// Scratch capacity for a reported escape sequence: eight hex digits plus
/// the scalar that terminated the sequence.
pub(crate) const ESCAPE_BUFFER: usize = 9;

/// Every error and warning code the library reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// The backing file was not found.
    #[error("file not found")]
    FileNotFound,
    /// The byte source failed mid-read.
    #[error("unable to read from stream")]
    CannotRead,
    /// The byte sink failed mid-write.
    #[error("unable to write to stream")]
    CannotWrite,
    /// The byte stream does not conform to its text encoding.
    #[error("stream does not conform to its encoding")]
    BadEncoding,
    /// The stream length is not a multiple of the encoding's code-unit
    /// width, so a decode failure is guaranteed before it happens.
    #[error("stream length incompatible with detected encoding")]
    BadPredictedEncoding,
    /// An unexpected character was found; the context carries what was
    /// found and what was expected.
    #[error("unexpected character in document")]
    InvalidChar,
    /// A malformed escape sequence; the context carries the partial
    /// sequence.
    #[error("invalid escape sequence")]
    BadEscape,
    /// The document declares a format version this library does not
    /// support.
    #[error("unsupported format version")]
    UnsupportedVersion,
    /// An unresolvable structural error.
    #[error("document format is invalid")]
    BadFormat,
    /// An item of unknown kind was encountered during serialization.
    #[error("unknown item kind")]
    UnknownObject,
    /// The stream ended where more input was required; the context carries
    /// the expected character.
    #[error("unexpected end of document")]
    PrematureEnd,
    /// Two name tokens were adjacent without a separator.
    #[error("adjacent name tokens without separator")]
    MergedText,
    /// Warning: the stream encoding has been determined.
    #[error("encoding detected")]
    EncodingDetected,
    /// Warning: the document format version has been determined.
    #[error("format version detected")]
    VersionDetected,
    /// The document carries no `!SCEF` header. Surfaced only when header
    /// presence is enforced.
    #[error("document has no header")]
    NoHeader,
    /// End of stream. Control code used internally for flow; never the
    /// final result of a successful operation.
    #[error("end of stream")]
    EndOfStream,
    /// An unclassified internal error.
    #[error("internal error")]
    UnknownInternal,
}

impl From<StreamStatus> for ErrorKind {
    fn from(status: StreamStatus) -> Self {
        match status {
            StreamStatus::Ok => ErrorKind::UnknownInternal,
            StreamStatus::FileNotFound => ErrorKind::FileNotFound,
            StreamStatus::CannotRead => ErrorKind::CannotRead,
            StreamStatus::CannotWrite => ErrorKind::CannotWrite,
            StreamStatus::BadEncoding => ErrorKind::BadEncoding,
            StreamStatus::EndOfStream => ErrorKind::EndOfStream,
        }
    }
}

/// Per-code payload carried by an [`ErrorContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorExtra {
    /// No extra information.
    #[default]
    None,
    /// Detected document properties, for the `EncodingDetected` and
    /// `VersionDetected` warnings.
    Format {
        /// Detected format version; 0 when not yet known.
        version: u16,
        /// Detected stream encoding.
        encoding: EncodingKind,
    },
    /// What was found and what was expected, for `InvalidChar`. An
    /// `expected` of `0` means no specific character was required.
    InvalidChar {
        /// Scalar that was found.
        found: u32,
        /// Scalar that was expected, or 0.
        expected: u32,
    },
    /// The partial escape sequence, for `BadEscape`.
    BadEscape {
        /// Collected scalars, valid up to `length`.
        sequence: [u32; ESCAPE_BUFFER],
        /// Number of valid scalars in `sequence`.
        length: usize,
    },
    /// The character that was expected when the stream ended, for
    /// `PrematureEnd`.
    PrematureEnd {
        /// Scalar that was expected.
        expected: u32,
    },
}

impl ErrorExtra {
    /// The reported escape scalars, when the payload is
    /// [`ErrorExtra::BadEscape`].
    #[must_use]
    pub fn escape_sequence(&self) -> Option<&[u32]> {
        match self {
            ErrorExtra::BadEscape { sequence, length } => Some(&sequence[..*length]),
            _ => None,
        }
    }
}

/// Control flow answer from a warning callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarnAction {
    /// Let the parser choose the most conservative continuation for the
    /// site. A missing callback behaves as if it always answered this.
    #[default]
    Default,
    /// Keep parsing, accepting or discarding as fits the site.
    Continue,
    /// Accept the item as if it were well formed.
    Accept,
    /// Discard the offending item or sequence.
    Discard,
    /// Fail the operation with the pending error.
    Abort,
}

/// Warning callback signature: inspect the pending error context, answer
/// with a [`WarnAction`]. Invoked synchronously from inside the parser; it
/// must not re-enter the same document.
pub type WarningHandler<'a> = dyn FnMut(&ErrorContext) -> WarnAction + 'a;

/// Where and why an operation last went wrong.
///
/// `critical_item` and the open-group stack hold weak references into the
/// document tree; they are invalidated by
/// [`Document::clear`](crate::Document::clear) or by dropping the document.
#[derive(Debug, Default)]
pub struct ErrorContext {
    code: Option<ErrorKind>,
    line: u64,
    column: u64,
    extra: ErrorExtra,
    critical_item: Option<WeakItemRef>,
    stack: Vec<WeakItemRef>,
}

impl ErrorContext {
    /// The last error code, or `None` after a fully successful operation.
    #[must_use]
    pub fn code(&self) -> Option<ErrorKind> {
        self.code
    }

    /// Line where the error occurred (1-based; 0 when the error is not
    /// tied to a document position).
    #[must_use]
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Column where the error occurred (1-based; 0 when not tied to a
    /// position).
    #[must_use]
    pub fn column(&self) -> u64 {
        self.column
    }

    /// The per-code payload.
    #[must_use]
    pub fn extra(&self) -> &ErrorExtra {
        &self.extra
    }

    /// The item under construction when the error occurred, if it is still
    /// alive.
    #[must_use]
    pub fn critical_item(&self) -> Option<ItemRef> {
        self.critical_item.as_ref().and_then(WeakItemRef::upgrade)
    }

    /// The groups open at the moment of the error, outermost first,
    /// skipping any that no longer exist.
    #[must_use]
    pub fn item_stack(&self) -> Vec<ItemRef> {
        self.stack.iter().filter_map(WeakItemRef::upgrade).collect()
    }

    /// Resets the context to the no-error state.
    pub fn clear(&mut self) {
        self.code = None;
        self.line = 0;
        self.column = 0;
        self.extra = ErrorExtra::None;
        self.critical_item = None;
        self.stack.clear();
    }

    pub(crate) fn set_position(&mut self, line: u64, column: u64) {
        self.line = line;
        self.column = column;
    }

    pub(crate) fn set_code(&mut self, code: ErrorKind) {
        self.code = Some(code);
        self.extra = ErrorExtra::None;
    }

    pub(crate) fn set_invalid_char(&mut self, found: u32, expected: u32) {
        self.code = Some(ErrorKind::InvalidChar);
        self.extra = ErrorExtra::InvalidChar { found, expected };
    }

    pub(crate) fn set_bad_escape(&mut self, scalars: &[u32]) {
        let mut sequence = [0u32; ESCAPE_BUFFER];
        let length = scalars.len().min(ESCAPE_BUFFER);
        sequence[..length].copy_from_slice(&scalars[..length]);
        self.code = Some(ErrorKind::BadEscape);
        self.extra = ErrorExtra::BadEscape { sequence, length };
    }

    pub(crate) fn set_premature_end(&mut self, expected: u32) {
        self.code = Some(ErrorKind::PrematureEnd);
        self.extra = ErrorExtra::PrematureEnd { expected };
    }

    pub(crate) fn set_format(&mut self, code: ErrorKind, version: u16, encoding: EncodingKind) {
        self.code = Some(code);
        self.extra = ErrorExtra::Format { version, encoding };
    }

    pub(crate) fn set_critical_item(&mut self, item: Option<WeakItemRef>) {
        self.critical_item = item;
    }

    pub(crate) fn push_open_group(&mut self, item: WeakItemRef) {
        self.stack.push(item);
    }

    pub(crate) fn pop_open_group(&mut self) {
        self.stack.pop();
    }
}

/// Library result, carrying the bare error code. Positional context lives
/// in the document's [`ErrorContext`].
pub type Result<T> = std::result::Result<T, ErrorKind>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Item;
    use std::rc::Rc;

    #[test]
    fn clear_resets_everything() {
        let mut ctx = ErrorContext::default();
        ctx.set_position(3, 7);
        ctx.set_invalid_char('x' as u32, ';' as u32);
        ctx.clear();
        assert_eq!(ctx.code(), None);
        assert_eq!(ctx.line(), 0);
        assert_eq!(ctx.column(), 0);
        assert_eq!(*ctx.extra(), ErrorExtra::None);
    }

    #[test]
    fn escape_payload_truncates_to_buffer() {
        let mut ctx = ErrorContext::default();
        let long: Vec<u32> = (0..20).collect();
        ctx.set_bad_escape(&long);
        assert_eq!(ctx.extra().escape_sequence().unwrap().len(), ESCAPE_BUFFER);
    }

    #[test]
    fn weak_items_do_not_outlive_the_tree() {
        let mut ctx = ErrorContext::default();
        let item = Item::singlet();
        ctx.set_critical_item(Some(Rc::downgrade(&item)));
        assert!(ctx.critical_item().is_some());
        drop(item);
        assert!(ctx.critical_item().is_none());
    }

    #[test]
    fn stream_status_maps_to_error_kind() {
        assert_eq!(
            ErrorKind::from(StreamStatus::EndOfStream),
            ErrorKind::EndOfStream
        );
        assert_eq!(
            ErrorKind::from(StreamStatus::CannotRead),
            ErrorKind::CannotRead
        );
    }
}
