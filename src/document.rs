//! The document façade: loading and saving.
//!
//! A [`Document`] owns the parsed tree, the detected properties (format
//! version and encoding), and the context of the last error. Loading
//! detects the encoding from the Byte-Order Mark, reads the optional
//! `!SCEF` header, and runs the grammar parser; saving writes the BOM and
//! header and runs the serializer.
//!
//! ## Examples
//!
//! ```rust
//! use scef::{Document, EncodingKind, Flags, SliceReader};
//!
//! let bytes = b"!SCEF:V=1\n<server: port = 8080; >";
//! let mut doc = Document::new();
//! doc.load(&mut SliceReader::new(bytes), Flags::empty(), None)
//!     .unwrap();
//!
//! assert_eq!(doc.properties().version, 1);
//! assert_eq!(doc.properties().encoding, EncodingKind::Ansi);
//!
//! let server = doc.root().find_group_by_name("server").unwrap();
//! let server = server.borrow();
//! let port = server
//!     .as_group()
//!     .unwrap()
//!     .children()
//!     .find_key_by_name("port")
//!     .unwrap();
//! assert_eq!(*port.borrow().as_keyed_value().unwrap().value(), "8080");
//!
//! let mut out = Vec::new();
//! doc.save(&mut out, Flags::empty(), 0, EncodingKind::Ansi).unwrap();
//! assert_eq!(&out, b"!SCEF:V=1\n<server: port = 8080; >");
//! ```

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use crate::de;
use crate::encoding::{detect_bom, Decoder, Encoder, EncodingKind};
use crate::error::{ErrorContext, ErrorKind, Result, WarnAction, WarningHandler};
use crate::header;
use crate::items::ItemList;
use crate::options::Flags;
use crate::ser;
use crate::stream::{InputStream, OutputStream, StreamStatus};

/// Properties detected on load or requested on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentProperties {
    /// Format version; 0 means not yet determined.
    pub version: u16,
    /// Stream text encoding.
    pub encoding: EncodingKind,
}

/// An SCEF document: properties, last-error context, and the root item
/// list.
#[derive(Debug, Default)]
pub struct Document {
    properties: DocumentProperties,
    last_error: ErrorContext,
    root: ItemList,
}

impl Document {
    /// Latest format version this library reads and writes.
    pub const SUPPORTED_VERSION: u16 = 1;

    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Document::default()
    }

    /// The document's detected (or last requested) properties.
    #[must_use]
    pub fn properties(&self) -> &DocumentProperties {
        &self.properties
    }

    /// Context of the most recent load/save failure or warning.
    #[must_use]
    pub fn last_error(&self) -> &ErrorContext {
        &self.last_error
    }

    /// The top-level item list.
    #[must_use]
    pub fn root(&self) -> &ItemList {
        &self.root
    }

    /// Mutable access to the top-level item list.
    pub fn root_mut(&mut self) -> &mut ItemList {
        &mut self.root
    }

    /// Resets properties, error context, and tree. Shared item handles
    /// held elsewhere keep their items alive, but the error context's weak
    /// references go stale.
    pub fn clear(&mut self) {
        self.properties = DocumentProperties::default();
        self.last_error.clear();
        self.root.clear();
    }

    /// Returns `true` when `version` can be read and written by this
    /// library.
    #[must_use]
    pub const fn supports_version(version: u16) -> bool {
        version <= Self::SUPPORTED_VERSION
    }

    /// Loads a document from `source`.
    ///
    /// The previous contents are cleared first. Recoverable anomalies are
    /// routed through `handler`; pass `None` to take the default
    /// continuation everywhere. On failure the returned code is also
    /// stored in [`last_error`](Document::last_error), together with the
    /// position and whatever part of the tree was built.
    pub fn load(
        &mut self,
        source: &mut dyn InputStream,
        flags: Flags,
        mut handler: Option<&mut WarningHandler<'_>>,
    ) -> Result<()> {
        self.clear();
        let result = self.load_inner(source, flags, handler.as_mut().map(|h| &mut **h));
        #[cfg(feature = "tracing")]
        match &result {
            Ok(()) => debug!(
                version = self.properties.version,
                items = self.root.len(),
                "document loaded"
            ),
            Err(code) => warn!(
                code = %code,
                line = self.last_error.line(),
                column = self.last_error.column(),
                "document load failed"
            ),
        }
        result
    }

    fn load_inner(
        &mut self,
        source: &mut dyn InputStream,
        flags: Flags,
        mut handler: Option<&mut WarningHandler<'_>>,
    ) -> Result<()> {
        // A document shorter than the 4-byte preamble cannot hold even an
        // empty header-less payload worth keeping.
        let start = source.position();
        let mut preamble = [0u8; 4];
        if source.read(&mut preamble) != 4 {
            let code = if source.status() == StreamStatus::EndOfStream {
                ErrorKind::BadFormat
            } else {
                ErrorKind::CannotRead
            };
            self.last_error.set_code(code);
            return Err(code);
        }

        let (encoding, bom_len) = detect_bom(&preamble);
        source.seek(start + bom_len);
        self.properties.encoding = encoding;

        #[cfg(feature = "tracing")]
        debug!(?encoding, bom_len, "encoding detected");

        self.last_error
            .set_format(ErrorKind::EncodingDetected, 0, encoding);
        if notify(&self.last_error, handler.as_mut().map(|h| &mut **h)) == WarnAction::Abort {
            return Err(ErrorKind::EncodingDetected);
        }

        // A stream length that cannot split into whole code units
        // guarantees a decode failure near the end.
        let width = encoding.code_unit_width();
        if width > 1 && source.remaining() % width != 0 {
            self.last_error.set_code(ErrorKind::BadPredictedEncoding);
            let action = notify(&self.last_error, handler.as_mut().map(|h| &mut **h));
            if action != WarnAction::Accept && action != WarnAction::Continue {
                return Err(ErrorKind::BadPredictedEncoding);
            }
        }

        let laxed = flags.contains(Flags::LAXED_ENCODING);
        let mut decoder = Decoder::new(source, encoding, laxed);

        let data_start = start + bom_len;
        let version = match header::read_header(&mut decoder, &mut self.last_error) {
            Ok(version) => version,
            Err(ErrorKind::NoHeader) => {
                if flags.contains(Flags::FORCE_HEADER) {
                    self.last_error.set_code(ErrorKind::NoHeader);
                    return Err(ErrorKind::NoHeader);
                }
                decoder.seek(data_start);
                decoder.reset_context();
                0
            }
            Err(other) => {
                self.last_error.set_code(other);
                return Err(other);
            }
        };

        if !Self::supports_version(version) {
            self.last_error
                .set_format(ErrorKind::UnsupportedVersion, version, encoding);
            return Err(ErrorKind::UnsupportedVersion);
        }

        #[cfg(feature = "tracing")]
        debug!(version, "format version detected");

        self.last_error
            .set_format(ErrorKind::VersionDetected, version, encoding);
        if notify(&self.last_error, handler.as_mut().map(|h| &mut **h)) == WarnAction::Abort {
            return Err(ErrorKind::VersionDetected);
        }

        // A header-less document parses as the latest known version.
        let version = if version == 0 {
            Self::SUPPORTED_VERSION
        } else {
            version
        };
        self.properties.version = version;

        match version {
            1 => de::parse(
                decoder,
                &mut self.root,
                flags,
                &mut self.last_error,
                handler.as_mut().map(|h| &mut **h),
            ),
            _ => {
                self.last_error.set_code(ErrorKind::UnknownInternal);
                Err(ErrorKind::UnknownInternal)
            }
        }
    }

    /// Saves the document to `sink`.
    ///
    /// A `version` of 0 selects the latest supported version. An
    /// `encoding` of [`EncodingKind::Unspecified`] selects UTF-8; ANSI
    /// writes no Byte-Order Mark.
    pub fn save(
        &mut self,
        sink: &mut dyn OutputStream,
        flags: Flags,
        version: u16,
        encoding: EncodingKind,
    ) -> Result<()> {
        self.last_error.clear();

        let version = if version == 0 {
            Self::SUPPORTED_VERSION
        } else if Self::supports_version(version) {
            version
        } else {
            self.last_error
                .set_format(ErrorKind::UnsupportedVersion, version, encoding);
            return Err(ErrorKind::UnsupportedVersion);
        };

        let encoding = if encoding == EncodingKind::Unspecified {
            EncodingKind::Utf8
        } else {
            encoding
        };

        if sink.write(encoding.bom()) != StreamStatus::Ok {
            self.last_error.set_code(ErrorKind::CannotWrite);
            return Err(ErrorKind::CannotWrite);
        }

        let laxed = flags.contains(Flags::LAXED_ENCODING);
        let mut encoder = Encoder::new(sink, encoding, laxed);

        if let Err(code) = header::write_header(&mut encoder, version) {
            self.last_error.set_code(code);
            return Err(code);
        }

        let result = ser::write(&self.root, encoder, flags, &mut self.last_error);
        #[cfg(feature = "tracing")]
        match &result {
            Ok(()) => debug!(version, ?encoding, "document saved"),
            Err(code) => warn!(code = %code, "document save failed"),
        }
        result
    }
}

fn notify(err: &ErrorContext, handler: Option<&mut WarningHandler<'_>>) -> WarnAction {
    match handler {
        Some(handler) => handler(err),
        None => WarnAction::Default,
    }
}
