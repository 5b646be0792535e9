//! The text encoding layer.
//!
//! SCEF documents may arrive in any of six concrete encodings, identified
//! by their Byte-Order Mark (or its absence, which means ANSI). This module
//! owns the BOM table, the per-encoding scalar decoders with line/column
//! tracking, and the matching encoders.
//!
//! Decoding comes in two strictness modes. Laxed decoding accepts anything
//! the bit patterns can express — UTF-8 sequences up to six bytes, UCS-4
//! words beyond U+10FFFF. Strict decoding (the default) additionally
//! enforces Unicode compliance: no surrogate code points, no scalar above
//! U+10FFFF, no overlong UTF-8 forms.
//!
//! The decoders hand out raw `u32` scalars rather than `char` because the
//! laxed modes can produce values `char` cannot hold.

use crate::error::{ErrorKind, Result};
use crate::stream::{InputStream, OutputStream, StreamStatus};
use crate::text::is_surrogate;

/// Text encoding of a document stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingKind {
    /// Not yet determined. Defaults to UTF-8 when saving.
    #[default]
    Unspecified,
    /// Raw single-byte stream, assumed to be an ASCII superset.
    Ansi,
    /// UTF-8.
    Utf8,
    /// UTF-16 little-endian.
    Utf16Le,
    /// UTF-16 big-endian.
    Utf16Be,
    /// UCS-4 (UTF-32) little-endian.
    Ucs4Le,
    /// UCS-4 (UTF-32) big-endian.
    Ucs4Be,
}

impl EncodingKind {
    /// Width of one code unit in bytes (1 for the byte encodings).
    #[must_use]
    pub fn code_unit_width(self) -> u64 {
        match self {
            EncodingKind::Utf16Le | EncodingKind::Utf16Be => 2,
            EncodingKind::Ucs4Le | EncodingKind::Ucs4Be => 4,
            _ => 1,
        }
    }

    /// The Byte-Order Mark written for this encoding; empty for ANSI and
    /// Unspecified.
    #[must_use]
    pub fn bom(self) -> &'static [u8] {
        match self {
            EncodingKind::Utf8 => &BOM_UTF8,
            EncodingKind::Utf16Le => &BOM_UTF16LE,
            EncodingKind::Utf16Be => &BOM_UTF16BE,
            EncodingKind::Ucs4Le => &BOM_UCS4LE,
            EncodingKind::Ucs4Be => &BOM_UCS4BE,
            _ => &[],
        }
    }
}

pub(crate) const BOM_UTF8: [u8; 3] = [0xEF, 0xBB, 0xBF];
pub(crate) const BOM_UTF16BE: [u8; 2] = [0xFE, 0xFF];
pub(crate) const BOM_UTF16LE: [u8; 2] = [0xFF, 0xFE];
pub(crate) const BOM_UCS4BE: [u8; 4] = [0x00, 0x00, 0xFE, 0xFF];
pub(crate) const BOM_UCS4LE: [u8; 4] = [0xFF, 0xFE, 0x00, 0x00];

/// Classifies a 4-byte preamble. Returns the detected encoding and the
/// number of BOM bytes to skip.
pub(crate) fn detect_bom(preamble: &[u8; 4]) -> (EncodingKind, u64) {
    if preamble[..3] == BOM_UTF8 {
        (EncodingKind::Utf8, 3)
    } else if *preamble == BOM_UCS4LE {
        (EncodingKind::Ucs4Le, 4)
    } else if *preamble == BOM_UCS4BE {
        (EncodingKind::Ucs4Be, 4)
    } else if preamble[..2] == BOM_UTF16LE {
        (EncodingKind::Utf16Le, 2)
    } else if preamble[..2] == BOM_UTF16BE {
        (EncodingKind::Utf16Be, 2)
    } else {
        (EncodingKind::Ansi, 0)
    }
}

#[inline]
pub(crate) fn is_unicode_compliant(scalar: u32) -> bool {
    scalar <= 0x10FFFF && !is_surrogate(scalar)
}

#[derive(Debug, Clone, Copy)]
enum DecodeMode {
    Ansi,
    Utf8 { strict: bool },
    Utf16 { big: bool },
    Ucs4 { big: bool, strict: bool },
}

/// Streams decoded scalars out of an [`InputStream`], tracking the line and
/// column of the most recently returned scalar.
///
/// `line` starts at 1 and advances lazily: the bookkeeping happens on the
/// read *after* a `\n` was returned, so position queries between reads
/// still describe the newline itself. `column` is the 1-based column of the
/// last returned scalar.
pub(crate) struct Decoder<'a> {
    reader: &'a mut dyn InputStream,
    mode: DecodeMode,
    line: u64,
    column: u64,
    last_char: u32,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(reader: &'a mut dyn InputStream, encoding: EncodingKind, laxed: bool) -> Self {
        let strict = !laxed;
        let mode = match encoding {
            EncodingKind::Utf8 => DecodeMode::Utf8 { strict },
            EncodingKind::Utf16Le => DecodeMode::Utf16 { big: false },
            EncodingKind::Utf16Be => DecodeMode::Utf16 { big: true },
            EncodingKind::Ucs4Le => DecodeMode::Ucs4 { big: false, strict },
            EncodingKind::Ucs4Be => DecodeMode::Ucs4 { big: true, strict },
            _ => DecodeMode::Ansi,
        };
        Decoder {
            reader,
            mode,
            line: 1,
            column: 0,
            last_char: 0,
        }
    }

    /// Line of the last returned scalar (1-based).
    pub(crate) fn line(&self) -> u64 {
        self.line
    }

    /// Column of the last returned scalar (1-based; 0 before the first
    /// scalar of a line).
    pub(crate) fn column(&self) -> u64 {
        self.column
    }

    /// The most recently returned scalar, 0 after an error.
    pub(crate) fn last_char(&self) -> u32 {
        self.last_char
    }

    /// Resets position tracking, for re-reading a rewound stream.
    pub(crate) fn reset_context(&mut self) {
        self.line = 1;
        self.column = 0;
        self.last_char = 0;
    }

    /// Moves the underlying stream; pair with
    /// [`reset_context`](Decoder::reset_context) when rewinding.
    pub(crate) fn seek(&mut self, pos: u64) {
        self.reader.seek(pos);
    }

    /// Decodes the next scalar, advancing position tracking.
    pub(crate) fn get_char(&mut self) -> Result<u32> {
        if self.last_char == u32::from(b'\n') {
            self.line += 1;
            self.column = 0;
        }
        match self.next_scalar() {
            Ok(scalar) => {
                self.last_char = scalar;
                self.column += 1;
                Ok(scalar)
            }
            Err(err) => {
                self.last_char = 0;
                Err(err)
            }
        }
    }

    /// Keeps decoding while `pred` answers `true`. On a normal return the
    /// scalar that stopped the loop is the current [`last_char`] and has
    /// already been counted into the position.
    ///
    /// [`last_char`]: Decoder::last_char
    pub(crate) fn read_while(&mut self, mut pred: impl FnMut(u32) -> bool) -> Result<()> {
        loop {
            self.get_char()?;
            if !pred(self.last_char) {
                return Ok(());
            }
        }
    }

    fn next_scalar(&mut self) -> Result<u32> {
        match self.mode {
            DecodeMode::Ansi => self.next_byte_scalar(),
            DecodeMode::Utf8 { strict } => self.next_utf8_scalar(strict),
            DecodeMode::Utf16 { big } => self.next_utf16_scalar(big),
            DecodeMode::Ucs4 { big, strict } => self.next_ucs4_scalar(big, strict),
        }
    }

    fn next_byte_scalar(&mut self) -> Result<u32> {
        let mut buf = [0u8; 1];
        if self.reader.read(&mut buf) != 1 {
            return Err(end_or_read_error(self.reader.status()));
        }
        Ok(u32::from(buf[0]))
    }

    fn next_utf8_scalar(&mut self, strict: bool) -> Result<u32> {
        let mut lead = [0u8; 1];
        if self.reader.read(&mut lead) != 1 {
            return Err(end_or_read_error(self.reader.status()));
        }
        let lead = lead[0];
        if lead & 0x80 == 0 {
            return Ok(u32::from(lead));
        }
        if lead & 0xC0 == 0x80 {
            // Stray continuation byte.
            return Err(ErrorKind::BadEncoding);
        }

        if lead & 0xE0 == 0xC0 {
            let mut tail = [0u8; 1];
            self.read_continuations(&mut tail)?;
            if strict && lead & 0x1F < 0x02 {
                return Err(ErrorKind::BadEncoding);
            }
            return Ok((u32::from(lead & 0x1F) << 6) | u32::from(tail[0] & 0x3F));
        }
        if lead & 0xF0 == 0xE0 {
            let mut tail = [0u8; 2];
            self.read_continuations(&mut tail)?;
            if strict && lead & 0x0F == 0 && tail[0] & 0x3F < 0x20 {
                return Err(ErrorKind::BadEncoding);
            }
            let scalar = (u32::from(lead & 0x0F) << 12)
                | (u32::from(tail[0] & 0x3F) << 6)
                | u32::from(tail[1] & 0x3F);
            if strict && is_surrogate(scalar) {
                return Err(ErrorKind::BadEncoding);
            }
            return Ok(scalar);
        }
        if lead & 0xF8 == 0xF0 {
            let mut tail = [0u8; 3];
            self.read_continuations(&mut tail)?;
            if strict && lead & 0x07 == 0 && tail[0] & 0x3F < 0x10 {
                return Err(ErrorKind::BadEncoding);
            }
            let scalar = (u32::from(lead & 0x07) << 18)
                | (u32::from(tail[0] & 0x3F) << 12)
                | (u32::from(tail[1] & 0x3F) << 6)
                | u32::from(tail[2] & 0x3F);
            if strict && scalar > 0x10FFFF {
                return Err(ErrorKind::BadEncoding);
            }
            return Ok(scalar);
        }
        if lead & 0xFC == 0xF8 {
            let mut tail = [0u8; 4];
            self.read_continuations(&mut tail)?;
            if strict {
                return Err(ErrorKind::BadEncoding);
            }
            return Ok((u32::from(lead & 0x03) << 24)
                | (u32::from(tail[0] & 0x3F) << 18)
                | (u32::from(tail[1] & 0x3F) << 12)
                | (u32::from(tail[2] & 0x3F) << 6)
                | u32::from(tail[3] & 0x3F));
        }
        if lead & 0xFE == 0xFC {
            let mut tail = [0u8; 5];
            self.read_continuations(&mut tail)?;
            if strict {
                return Err(ErrorKind::BadEncoding);
            }
            return Ok((u32::from(lead & 0x03) << 30)
                | (u32::from(tail[0] & 0x3F) << 24)
                | (u32::from(tail[1] & 0x3F) << 18)
                | (u32::from(tail[2] & 0x3F) << 12)
                | (u32::from(tail[3] & 0x3F) << 6)
                | u32::from(tail[4] & 0x3F));
        }
        if lead == 0xFE {
            let mut tail = [0u8; 6];
            self.read_continuations(&mut tail)?;
            if strict || tail[0] & 0x3F > 0x03 {
                return Err(ErrorKind::BadEncoding);
            }
            return Ok((u32::from(tail[0] & 0x03) << 30)
                | (u32::from(tail[1] & 0x3F) << 24)
                | (u32::from(tail[2] & 0x3F) << 18)
                | (u32::from(tail[3] & 0x3F) << 12)
                | (u32::from(tail[4] & 0x3F) << 6)
                | u32::from(tail[5] & 0x3F));
        }
        Err(ErrorKind::BadEncoding)
    }

    /// Reads the continuation bytes of a multi-byte sequence. On a
    /// malformed byte the reader is rewound so the next attempt starts on
    /// a clean sequence boundary.
    fn read_continuations(&mut self, buf: &mut [u8]) -> Result<()> {
        let got = self.reader.read(buf);
        if got != buf.len() {
            if self.reader.status() == StreamStatus::EndOfStream {
                for (idx, &byte) in buf[..got].iter().enumerate() {
                    if byte & 0xC0 != 0x80 {
                        self.reader.seek(self.reader.position() - (got - idx) as u64);
                        break;
                    }
                }
                return Err(ErrorKind::BadEncoding);
            }
            return Err(ErrorKind::CannotRead);
        }
        for (idx, &byte) in buf.iter().enumerate() {
            if byte & 0xC0 != 0x80 {
                self.reader
                    .seek(self.reader.position() - (buf.len() - idx) as u64);
                return Err(ErrorKind::BadEncoding);
            }
        }
        Ok(())
    }

    fn next_utf16_scalar(&mut self, big: bool) -> Result<u32> {
        let unit = match self.read_code_unit_2(big) {
            Ok(Some(unit)) => unit,
            Ok(None) => return Err(ErrorKind::EndOfStream),
            Err(err) => return Err(err),
        };
        if !is_surrogate(u32::from(unit)) {
            return Ok(u32::from(unit));
        }
        if unit & 0xFC00 != 0xD800 {
            // Lone low surrogate.
            return Err(ErrorKind::BadEncoding);
        }
        let low = match self.read_code_unit_2(big) {
            Ok(Some(low)) => low,
            Ok(None) => return Err(ErrorKind::BadEncoding),
            Err(err) => return Err(err),
        };
        if low & 0xFC00 != 0xDC00 {
            self.reader.seek(self.reader.position() - 2);
            return Err(ErrorKind::BadEncoding);
        }
        Ok(((u32::from(unit) & 0x03FF) << 10 | (u32::from(low) & 0x03FF)) + 0x10000)
    }

    /// Reads one 16-bit unit; `Ok(None)` means a clean end of stream.
    fn read_code_unit_2(&mut self, big: bool) -> Result<Option<u16>> {
        let mut buf = [0u8; 2];
        let got = self.reader.read(&mut buf);
        if got != 2 {
            if self.reader.status() == StreamStatus::EndOfStream {
                return if got == 0 {
                    Ok(None)
                } else {
                    Err(ErrorKind::BadEncoding)
                };
            }
            return Err(ErrorKind::CannotRead);
        }
        Ok(Some(if big {
            u16::from_be_bytes(buf)
        } else {
            u16::from_le_bytes(buf)
        }))
    }

    fn next_ucs4_scalar(&mut self, big: bool, strict: bool) -> Result<u32> {
        let mut buf = [0u8; 4];
        let got = self.reader.read(&mut buf);
        if got != 4 {
            if self.reader.status() == StreamStatus::EndOfStream {
                return Err(if got == 0 {
                    ErrorKind::EndOfStream
                } else {
                    ErrorKind::BadEncoding
                });
            }
            return Err(ErrorKind::CannotRead);
        }
        let scalar = if big {
            u32::from_be_bytes(buf)
        } else {
            u32::from_le_bytes(buf)
        };
        if strict && !is_unicode_compliant(scalar) {
            return Err(ErrorKind::BadEncoding);
        }
        Ok(scalar)
    }
}

fn end_or_read_error(status: StreamStatus) -> ErrorKind {
    if status == StreamStatus::EndOfStream {
        ErrorKind::EndOfStream
    } else {
        ErrorKind::CannotRead
    }
}

#[derive(Debug, Clone, Copy)]
enum EncodeMode {
    Ansi,
    Utf8 { strict: bool },
    Utf16 { big: bool },
    Ucs4 { big: bool, strict: bool },
}

/// Streams scalars into an [`OutputStream`] in the target encoding.
pub(crate) struct Encoder<'a> {
    writer: &'a mut dyn OutputStream,
    mode: EncodeMode,
}

impl<'a> Encoder<'a> {
    pub(crate) fn new(writer: &'a mut dyn OutputStream, encoding: EncodingKind, laxed: bool) -> Self {
        let strict = !laxed;
        let mode = match encoding {
            EncodingKind::Utf8 | EncodingKind::Unspecified => EncodeMode::Utf8 { strict },
            EncodingKind::Utf16Le => EncodeMode::Utf16 { big: false },
            EncodingKind::Utf16Be => EncodeMode::Utf16 { big: true },
            EncodingKind::Ucs4Le => EncodeMode::Ucs4 { big: false, strict },
            EncodingKind::Ucs4Be => EncodeMode::Ucs4 { big: true, strict },
            EncodingKind::Ansi => EncodeMode::Ansi,
        };
        Encoder { writer, mode }
    }

    /// Writes a single-byte control character, widened to the encoding's
    /// code unit.
    pub(crate) fn put_control(&mut self, byte: u8) -> Result<()> {
        match self.mode {
            EncodeMode::Ansi | EncodeMode::Utf8 { .. } => self.write_all(&[byte]),
            EncodeMode::Utf16 { big } => self.write_unit_2(u16::from(byte), big),
            EncodeMode::Ucs4 { big, .. } => self.write_unit_4(u32::from(byte), big),
        }
    }

    /// Writes one scalar.
    pub(crate) fn put_scalar(&mut self, scalar: u32) -> Result<()> {
        match self.mode {
            EncodeMode::Ansi => {
                // Laxed by nature: truncate to the low 8 bits.
                self.write_all(&[scalar as u8])
            }
            EncodeMode::Utf8 { strict } => {
                if strict && !is_unicode_compliant(scalar) {
                    return Err(ErrorKind::BadEncoding);
                }
                let mut buf = [0u8; 6];
                let len = encode_utf8_raw(scalar, &mut buf);
                self.write_all(&buf[..len])
            }
            EncodeMode::Utf16 { big } => {
                if scalar < 0x10000 {
                    self.write_unit_2(scalar as u16, big)
                } else if scalar <= 0x10FFFF {
                    let reduced = scalar - 0x10000;
                    self.write_unit_2((0xD800 | (reduced >> 10)) as u16, big)?;
                    self.write_unit_2((0xDC00 | (reduced & 0x03FF)) as u16, big)
                } else {
                    Err(ErrorKind::BadEncoding)
                }
            }
            EncodeMode::Ucs4 { big, strict } => {
                if strict && !is_unicode_compliant(scalar) {
                    return Err(ErrorKind::BadEncoding);
                }
                self.write_unit_4(scalar, big)
            }
        }
    }

    /// Writes every scalar of `text`.
    pub(crate) fn put_sequence(&mut self, text: &[u32]) -> Result<()> {
        for &scalar in text {
            self.put_scalar(scalar)?;
        }
        Ok(())
    }

    /// Writes stored spacing bytes, each byte as one code point.
    pub(crate) fn put_flat(&mut self, bytes: &[u8]) -> Result<()> {
        match self.mode {
            EncodeMode::Ansi | EncodeMode::Utf8 { .. } => self.write_all(bytes),
            EncodeMode::Utf16 { big } => {
                for &byte in bytes {
                    self.write_unit_2(u16::from(byte), big)?;
                }
                Ok(())
            }
            EncodeMode::Ucs4 { big, .. } => {
                for &byte in bytes {
                    self.write_unit_4(u32::from(byte), big)?;
                }
                Ok(())
            }
        }
    }

    /// Returns `true` when this encoding cannot carry `scalar` directly,
    /// so the serializer must fall back to an escape sequence.
    pub(crate) fn requires_escape(&self, scalar: u32) -> bool {
        match self.mode {
            EncodeMode::Ansi => scalar > 0xFF,
            EncodeMode::Utf8 { strict: false } => scalar > 0x10FFFF,
            EncodeMode::Utf8 { strict: true } | EncodeMode::Utf16 { .. } => {
                !is_unicode_compliant(scalar)
            }
            EncodeMode::Ucs4 { strict, .. } => strict && !is_unicode_compliant(scalar),
        }
    }

    /// Returns `true` when any scalar of `text` needs an escape fallback.
    pub(crate) fn requires_escape_sequence(&self, text: &[u32]) -> bool {
        text.iter().any(|&scalar| self.requires_escape(scalar))
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        match self.writer.write(bytes) {
            StreamStatus::Ok => Ok(()),
            _ => Err(ErrorKind::CannotWrite),
        }
    }

    fn write_unit_2(&mut self, unit: u16, big: bool) -> Result<()> {
        let bytes = if big {
            unit.to_be_bytes()
        } else {
            unit.to_le_bytes()
        };
        self.write_all(&bytes)
    }

    fn write_unit_4(&mut self, unit: u32, big: bool) -> Result<()> {
        let bytes = if big {
            unit.to_be_bytes()
        } else {
            unit.to_le_bytes()
        };
        self.write_all(&bytes)
    }
}

/// Encodes `scalar` as raw UTF-8, extended past U+10FFFF with the
/// historical 5- and 6-byte forms. Returns the number of bytes written.
fn encode_utf8_raw(scalar: u32, buf: &mut [u8; 6]) -> usize {
    if scalar < 0x80 {
        buf[0] = scalar as u8;
        1
    } else if scalar < 0x800 {
        buf[0] = 0xC0 | (scalar >> 6) as u8;
        buf[1] = 0x80 | (scalar & 0x3F) as u8;
        2
    } else if scalar < 0x10000 {
        buf[0] = 0xE0 | (scalar >> 12) as u8;
        buf[1] = 0x80 | ((scalar >> 6) & 0x3F) as u8;
        buf[2] = 0x80 | (scalar & 0x3F) as u8;
        3
    } else if scalar < 0x20_0000 {
        buf[0] = 0xF0 | (scalar >> 18) as u8;
        buf[1] = 0x80 | ((scalar >> 12) & 0x3F) as u8;
        buf[2] = 0x80 | ((scalar >> 6) & 0x3F) as u8;
        buf[3] = 0x80 | (scalar & 0x3F) as u8;
        4
    } else if scalar < 0x400_0000 {
        buf[0] = 0xF8 | (scalar >> 24) as u8;
        buf[1] = 0x80 | ((scalar >> 18) & 0x3F) as u8;
        buf[2] = 0x80 | ((scalar >> 12) & 0x3F) as u8;
        buf[3] = 0x80 | ((scalar >> 6) & 0x3F) as u8;
        buf[4] = 0x80 | (scalar & 0x3F) as u8;
        5
    } else {
        buf[0] = 0xFC | (scalar >> 30) as u8;
        buf[1] = 0x80 | ((scalar >> 24) & 0x3F) as u8;
        buf[2] = 0x80 | ((scalar >> 18) & 0x3F) as u8;
        buf[3] = 0x80 | ((scalar >> 12) & 0x3F) as u8;
        buf[4] = 0x80 | ((scalar >> 6) & 0x3F) as u8;
        buf[5] = 0x80 | (scalar & 0x3F) as u8;
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::SliceReader;

    fn decode_all(bytes: &[u8], encoding: EncodingKind, laxed: bool) -> Result<Vec<u32>> {
        let mut reader = SliceReader::new(bytes);
        let mut decoder = Decoder::new(&mut reader, encoding, laxed);
        let mut out = Vec::new();
        loop {
            match decoder.get_char() {
                Ok(scalar) => out.push(scalar),
                Err(ErrorKind::EndOfStream) => return Ok(out),
                Err(err) => return Err(err),
            }
        }
    }

    #[test]
    fn bom_table() {
        assert_eq!(
            detect_bom(&[0xEF, 0xBB, 0xBF, b'!']),
            (EncodingKind::Utf8, 3)
        );
        assert_eq!(
            detect_bom(&[0xFE, 0xFF, 0x00, b'!']),
            (EncodingKind::Utf16Be, 2)
        );
        assert_eq!(
            detect_bom(&[0xFF, 0xFE, 0x00, 0x00]),
            (EncodingKind::Ucs4Le, 4)
        );
        assert_eq!(
            detect_bom(&[0xFF, 0xFE, b'!', 0x00]),
            (EncodingKind::Utf16Le, 2)
        );
        assert_eq!(
            detect_bom(&[0x00, 0x00, 0xFE, 0xFF]),
            (EncodingKind::Ucs4Be, 4)
        );
        assert_eq!(detect_bom(&[b'a', b';', b' ', b' ']), (EncodingKind::Ansi, 0));
    }

    #[test]
    fn ansi_decodes_raw_bytes() {
        let scalars = decode_all(&[b'a', 0xE9, 0xFF], EncodingKind::Ansi, false).unwrap();
        assert_eq!(scalars, vec![0x61, 0xE9, 0xFF]);
    }

    #[test]
    fn utf8_decodes_multibyte() {
        let text = "a\u{E9}\u{1234}\u{10437}";
        let scalars = decode_all(text.as_bytes(), EncodingKind::Utf8, false).unwrap();
        assert_eq!(scalars, vec![0x61, 0xE9, 0x1234, 0x10437]);
    }

    #[test]
    fn utf8_strict_rejects_overlong() {
        // 0xC0 0xAF is an overlong encoding of '/'.
        assert_eq!(
            decode_all(&[0xC0, 0xAF], EncodingKind::Utf8, false),
            Err(ErrorKind::BadEncoding)
        );
        // Laxed mode decodes it anyway.
        assert_eq!(
            decode_all(&[0xC0, 0xAF], EncodingKind::Utf8, true),
            Ok(vec![0x2F])
        );
    }

    #[test]
    fn utf8_strict_rejects_surrogate_and_range() {
        // 0xED 0xA0 0x80 encodes U+D800.
        assert_eq!(
            decode_all(&[0xED, 0xA0, 0x80], EncodingKind::Utf8, false),
            Err(ErrorKind::BadEncoding)
        );
        // 0xF4 0x90 0x80 0x80 encodes U+110000.
        assert_eq!(
            decode_all(&[0xF4, 0x90, 0x80, 0x80], EncodingKind::Utf8, false),
            Err(ErrorKind::BadEncoding)
        );
        assert_eq!(
            decode_all(&[0xF4, 0x90, 0x80, 0x80], EncodingKind::Utf8, true),
            Ok(vec![0x110000])
        );
    }

    #[test]
    fn utf8_rewinds_on_broken_continuation() {
        // Lead byte promises two continuations; 'b' breaks the sequence.
        let bytes = [0xE2, 0x82, b'b', b'c'];
        let mut reader = SliceReader::new(&bytes);
        let mut decoder = Decoder::new(&mut reader, EncodingKind::Utf8, false);
        assert_eq!(decoder.get_char(), Err(ErrorKind::BadEncoding));
        // The next read starts at the byte that broke the sequence.
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn utf16_composes_surrogate_pairs() {
        // U+10437 in UTF-16LE: D801 DC37.
        let bytes = [0x01, 0xD8, 0x37, 0xDC];
        assert_eq!(
            decode_all(&bytes, EncodingKind::Utf16Le, false),
            Ok(vec![0x10437])
        );
        let bytes_be = [0xD8, 0x01, 0xDC, 0x37];
        assert_eq!(
            decode_all(&bytes_be, EncodingKind::Utf16Be, false),
            Ok(vec![0x10437])
        );
    }

    #[test]
    fn utf16_rejects_lone_surrogates() {
        let lone_low = [0x37, 0xDC];
        assert_eq!(
            decode_all(&lone_low, EncodingKind::Utf16Le, false),
            Err(ErrorKind::BadEncoding)
        );
        let high_then_bmp = [0x01, 0xD8, b'a', 0x00];
        assert_eq!(
            decode_all(&high_then_bmp, EncodingKind::Utf16Le, false),
            Err(ErrorKind::BadEncoding)
        );
    }

    #[test]
    fn ucs4_strict_rejects_noncompliant() {
        let beyond = 0x0012_3456u32.to_le_bytes();
        assert_eq!(
            decode_all(&beyond, EncodingKind::Ucs4Le, false),
            Err(ErrorKind::BadEncoding)
        );
        assert_eq!(
            decode_all(&beyond, EncodingKind::Ucs4Le, true),
            Ok(vec![0x123456])
        );
    }

    #[test]
    fn line_and_column_tracking() {
        let mut reader = SliceReader::new(b"ab\ncd");
        let mut decoder = Decoder::new(&mut reader, EncodingKind::Ansi, false);
        decoder.get_char().unwrap();
        assert_eq!((decoder.line(), decoder.column()), (1, 1));
        decoder.get_char().unwrap();
        assert_eq!((decoder.line(), decoder.column()), (1, 2));
        decoder.get_char().unwrap(); // the newline itself
        assert_eq!((decoder.line(), decoder.column()), (1, 3));
        decoder.get_char().unwrap(); // 'c', first of line 2
        assert_eq!((decoder.line(), decoder.column()), (2, 1));
    }

    #[test]
    fn read_while_stops_on_predicate() {
        let mut reader = SliceReader::new(b"   x");
        let mut decoder = Decoder::new(&mut reader, EncodingKind::Ansi, false);
        let mut seen = 0;
        decoder
            .read_while(|c| {
                if c == u32::from(b' ') {
                    seen += 1;
                    true
                } else {
                    false
                }
            })
            .unwrap();
        assert_eq!(seen, 3);
        assert_eq!(decoder.last_char(), u32::from(b'x'));
        assert_eq!(decoder.column(), 4);
    }

    fn encode_one(scalar: u32, encoding: EncodingKind, laxed: bool) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out, encoding, laxed);
        encoder.put_scalar(scalar)?;
        Ok(out)
    }

    #[test]
    fn encoders_roundtrip_with_decoders() {
        for &encoding in &[
            EncodingKind::Utf8,
            EncodingKind::Utf16Le,
            EncodingKind::Utf16Be,
            EncodingKind::Ucs4Le,
            EncodingKind::Ucs4Be,
        ] {
            for &scalar in &[0x41u32, 0xE9, 0x1234, 0x10437] {
                let bytes = encode_one(scalar, encoding, false).unwrap();
                assert_eq!(
                    decode_all(&bytes, encoding, false),
                    Ok(vec![scalar]),
                    "{encoding:?} {scalar:#x}"
                );
            }
        }
    }

    #[test]
    fn ansi_encoder_truncates() {
        assert_eq!(encode_one(0x1E9, EncodingKind::Ansi, true), Ok(vec![0xE9]));
    }

    #[test]
    fn strict_encoders_reject_noncompliant() {
        assert_eq!(
            encode_one(0xD800, EncodingKind::Utf8, false),
            Err(ErrorKind::BadEncoding)
        );
        assert_eq!(
            encode_one(0x110000, EncodingKind::Ucs4Le, false),
            Err(ErrorKind::BadEncoding)
        );
        // Laxed UCS-4 carries anything.
        assert_eq!(
            encode_one(0x110000, EncodingKind::Ucs4Le, true),
            Ok(0x0011_0000u32.to_le_bytes().to_vec())
        );
    }

    #[test]
    fn escape_capability_classification() {
        let mut out = Vec::new();
        let ansi = Encoder::new(&mut out, EncodingKind::Ansi, true);
        assert!(!ansi.requires_escape(0xFF));
        assert!(ansi.requires_escape(0x100));

        let mut out = Vec::new();
        let utf8 = Encoder::new(&mut out, EncodingKind::Utf8, true);
        assert!(!utf8.requires_escape(0x10FFFF));
        assert!(utf8.requires_escape(0x110000));

        let mut out = Vec::new();
        let ucs4 = Encoder::new(&mut out, EncodingKind::Ucs4Le, true);
        assert!(!ucs4.requires_escape(0xFFFF_FFFF));
    }

    #[test]
    fn put_flat_widens_bytes() {
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out, EncodingKind::Utf16Le, false);
        encoder.put_flat(b"\t ").unwrap();
        assert_eq!(out, vec![0x09, 0x00, 0x20, 0x00]);
    }
}
