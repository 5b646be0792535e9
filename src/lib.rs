//! # scef
//!
//! A loader and serializer for SCEF ("Structured Configuration Exchange
//! Format"), a hand-written text configuration format with groups,
//! singlets, and key/value pairs.
//!
//! ## What makes SCEF different?
//!
//! The parser keeps *everything*: alongside the payload items, spacing
//! runs and comments are preserved as first-class tree items, so a
//! program can load a hand-written configuration file, change one value,
//! and save it back without destroying the author's formatting.
//!
//! - **Round-trip faithful**: cosmetic items survive load/save cycles
//! - **Seven text encodings**: detected from the Byte-Order Mark (UTF-8,
//!   UTF-16 LE/BE, UCS-4 LE/BE, ANSI), with laxed and strict decoding
//! - **Forgiving parser**: recoverable anomalies are routed through a
//!   warning callback that decides whether to accept, discard, or abort
//! - **Precise positions**: every item and error carries its 1-based
//!   line and column
//!
//! ## Quick Start
//!
//! ```rust
//! use scef::{from_bytes, Flags};
//!
//! let input = b"!SCEF:V=1\n<window:\n\twidth = 1280;\n\theight = 720;\n>";
//! let (doc, result) = from_bytes(input, Flags::empty());
//! result.unwrap();
//!
//! let window = doc.root().find_group_by_name("window").unwrap();
//! let window = window.borrow();
//! let width = window
//!     .as_group()
//!     .unwrap()
//!     .children()
//!     .find_key_by_name("width")
//!     .unwrap();
//! assert_eq!(*width.borrow().as_keyed_value().unwrap().value(), "1280");
//! ```
//!
//! ## Editing and saving
//!
//! ```rust
//! use scef::{from_bytes, to_vec, EncodingKind, Flags, Item};
//!
//! let (mut doc, result) = from_bytes(b"!SCEF:V=1\na;", Flags::empty());
//! result.unwrap();
//!
//! doc.root_mut().push(Item::keyed_value_pair("added", "yes"));
//!
//! let bytes = to_vec(&mut doc, Flags::empty(), EncodingKind::Ansi).unwrap();
//! assert_eq!(&bytes, b"!SCEF:V=1\na;added=yes;");
//! ```
//!
//! ## Reformatting
//!
//! Saving with [`Flags::AUTO_SPACING`] and [`Flags::AUTO_QUOTE`] rewrites
//! a document with derived indentation and minimal quoting:
//!
//! ```rust
//! use scef::{from_bytes, to_vec, EncodingKind, Flags};
//!
//! let (mut doc, result) = from_bytes(b"<g:a;k=v;>", Flags::empty());
//! result.unwrap();
//!
//! let tidy = to_vec(
//!     &mut doc,
//!     Flags::AUTO_SPACING | Flags::AUTO_QUOTE,
//!     EncodingKind::Ansi,
//! )
//! .unwrap();
//! assert_eq!(
//!     String::from_utf8(tidy).unwrap(),
//!     "!SCEF:V=1\n\n<g:\n\ta;\n\tk = v;\n>\n"
//! );
//! ```
//!
//! ## Warning callbacks
//!
//! Malformed input does not have to be fatal. The callback sees the full
//! error context and steers the parser:
//!
//! ```rust
//! use scef::{Document, ErrorContext, Flags, SliceReader, WarnAction};
//!
//! // The escape ^z is not valid; keep the source text verbatim.
//! let mut doc = Document::new();
//! let mut keep = |_: &ErrorContext| WarnAction::Continue;
//! doc.load(
//!     &mut SliceReader::new(b"!SCEF:V=1\n'ab^zd';"),
//!     Flags::empty(),
//!     Some(&mut keep),
//! )
//! .unwrap();
//!
//! let item = doc.root().get(0).unwrap().borrow();
//! assert_eq!(*item.as_singlet().unwrap().name(), "ab^zd");
//! ```
//!
//! See the [`spec`] module for the format itself.

#![warn(missing_docs)]

mod de;
mod document;
mod encoding;
mod error;
mod header;
mod items;
mod options;
mod ser;
pub mod spec;
mod stream;
mod text;

pub use document::{Document, DocumentProperties};
pub use encoding::EncodingKind;
pub use error::{ErrorContext, ErrorExtra, ErrorKind, Result, WarnAction, WarningHandler};
pub use items::{
    Comment, Group, InlineSpace, Item, ItemBody, ItemKind, ItemList, ItemRef, KeyedValue,
    KindMask, Position, QuoteMode, Singlet, Spacer, WeakItemRef,
};
pub use options::Flags;
pub use stream::{InputStream, OutputStream, SliceReader, StreamStatus};
pub use text::Utf32String;

/// Loads a document from a byte slice.
///
/// Returns the document together with the load result, so a partial tree
/// and its error context remain inspectable after a failure.
///
/// # Examples
///
/// ```rust
/// use scef::{from_bytes, Flags};
///
/// let (doc, result) = from_bytes(b"!SCEF:V=1\nname = value;", Flags::empty());
/// result.unwrap();
/// assert_eq!(doc.root().len(), 1);
/// ```
pub fn from_bytes(bytes: &[u8], flags: Flags) -> (Document, Result<()>) {
    let mut doc = Document::new();
    let mut reader = SliceReader::new(bytes);
    let result = doc.load(&mut reader, flags, None);
    (doc, result)
}

/// Loads a document from a byte slice, routing warnings through
/// `handler`.
///
/// # Examples
///
/// ```rust
/// use scef::{from_bytes_with, ErrorContext, Flags, WarnAction};
///
/// let mut seen = 0usize;
/// let mut handler = |_: &ErrorContext| {
///     seen += 1;
///     WarnAction::Default
/// };
/// let (_, result) = from_bytes_with(b"!SCEF:V=1\na;", Flags::empty(), &mut handler);
/// result.unwrap();
/// assert_eq!(seen, 0);
/// ```
pub fn from_bytes_with(
    bytes: &[u8],
    flags: Flags,
    handler: &mut WarningHandler<'_>,
) -> (Document, Result<()>) {
    let mut doc = Document::new();
    let mut reader = SliceReader::new(bytes);
    let result = doc.load(&mut reader, flags, Some(handler));
    (doc, result)
}

/// Serializes a document to a byte vector in `encoding`.
///
/// # Examples
///
/// ```rust
/// use scef::{to_vec, Document, EncodingKind, Flags, Item};
///
/// let mut doc = Document::new();
/// doc.root_mut().push(Item::singlet_named("alpha"));
/// let bytes = to_vec(&mut doc, Flags::empty(), EncodingKind::Ansi).unwrap();
/// assert_eq!(&bytes, b"!SCEF:V=1\nalpha;");
/// ```
pub fn to_vec(doc: &mut Document, flags: Flags, encoding: EncodingKind) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    doc.save(&mut out, flags, 0, encoding)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_and_back() {
        let input = b"!SCEF:V=1\n<g: a; k = v; >";
        let (mut doc, result) = from_bytes(input, Flags::empty());
        assert_eq!(result, Ok(()));
        let out = to_vec(&mut doc, Flags::empty(), EncodingKind::Ansi).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn partial_tree_survives_failure() {
        let (doc, result) = from_bytes(b"!SCEF:V=1\na;<g: b", Flags::empty());
        assert_eq!(result, Err(ErrorKind::PrematureEnd));
        assert!(doc.root().find_singlet_by_name("a").is_some());
        assert!(doc.root().find_group_by_name("g").is_some());
    }
}
