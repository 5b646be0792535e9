//! The optional `!SCEF:V=<n>` document header.
//!
//! The header occupies the first non-blank line of a document:
//!
//! ```text
//! ! SCEF : V = <digits> LF
//! ```
//!
//! Letters are case-insensitive and every gap between tokens may hold a
//! run of horizontal spacing. The version is 1 to 5 decimal digits with no
//! leading zero. When the first non-whitespace character of the stream is
//! not `!`, the document simply has no header and parsing restarts from
//! the beginning of the (rewound) stream.

use crate::encoding::{Decoder, Encoder};
use crate::error::{ErrorContext, ErrorKind, Result};
use crate::text::{is_space, is_space_no_lf};

const MAX_VERSION_DIGITS: usize = 5;

fn is_digit(scalar: u32) -> bool {
    (0x30..=0x39).contains(&scalar)
}

/// Skips horizontal spacing and leaves the stopping scalar current.
/// Any stream problem mid-header, including a clean end, is a format
/// error.
fn skip_gap(decoder: &mut Decoder<'_>) -> Result<()> {
    decoder
        .read_while(is_space_no_lf)
        .map_err(|_| ErrorKind::BadFormat)
}

/// Reads the header line and returns the declared version.
///
/// Returns `Err(NoHeader)` when the document has none; the caller decides
/// whether that is fatal and rewinds the stream if not.
pub(crate) fn read_header(decoder: &mut Decoder<'_>, err: &mut ErrorContext) -> Result<u16> {
    // Find the first '!', skipping blank space (newlines included).
    match decoder.read_while(is_space) {
        Ok(()) => {}
        Err(ErrorKind::EndOfStream) => return Err(ErrorKind::NoHeader),
        Err(other) => return Err(other),
    }
    if decoder.last_char() != u32::from(b'!') {
        return Err(ErrorKind::NoHeader);
    }

    err.set_position(decoder.line(), 0);

    // The magic word, case-insensitive.
    skip_gap(decoder)?;
    for expected in [b'S', b'C', b'E', b'F'] {
        let scalar = if expected == b'S' {
            decoder.last_char()
        } else {
            decoder.get_char().map_err(|_| ErrorKind::BadFormat)?
        };
        if scalar != u32::from(expected) && scalar != u32::from(expected + 0x20) {
            return Err(ErrorKind::BadFormat);
        }
    }

    skip_gap(decoder)?;
    if decoder.last_char() != u32::from(b':') {
        return Err(ErrorKind::BadFormat);
    }

    skip_gap(decoder)?;
    if decoder.last_char() != u32::from(b'V') && decoder.last_char() != u32::from(b'v') {
        return Err(ErrorKind::BadFormat);
    }

    skip_gap(decoder)?;
    if decoder.last_char() != u32::from(b'=') {
        return Err(ErrorKind::BadFormat);
    }

    skip_gap(decoder)?;
    if !is_digit(decoder.last_char()) {
        return Err(ErrorKind::BadFormat);
    }
    if decoder.last_char() == u32::from(b'0') {
        return Err(ErrorKind::UnsupportedVersion);
    }

    let mut digits: Vec<u32> = vec![decoder.last_char()];
    decoder
        .read_while(|scalar| {
            if is_digit(scalar) && digits.len() < MAX_VERSION_DIGITS {
                digits.push(scalar);
                true
            } else {
                false
            }
        })
        .map_err(|_| ErrorKind::BadFormat)?;

    if !is_space(decoder.last_char()) {
        return Err(if is_digit(decoder.last_char()) {
            // A sixth digit can only overflow.
            ErrorKind::UnsupportedVersion
        } else {
            ErrorKind::BadFormat
        });
    }

    let mut version: u32 = 0;
    for scalar in digits {
        version = version * 10 + (scalar - 0x30);
    }
    let version = u16::try_from(version).map_err(|_| ErrorKind::UnsupportedVersion)?;

    // The line must close with a newline.
    if decoder.last_char() != u32::from(b'\n') {
        skip_gap(decoder)?;
        if decoder.last_char() != u32::from(b'\n') {
            return Err(ErrorKind::BadFormat);
        }
    }

    Ok(version)
}

/// Writes the canonical header line for `version`.
pub(crate) fn write_header(encoder: &mut Encoder<'_>, version: u16) -> Result<()> {
    encoder.put_flat(b"!SCEF:V=")?;
    let mut digits = [0u8; MAX_VERSION_DIGITS];
    let mut value = version;
    let mut at = MAX_VERSION_DIGITS;
    loop {
        at -= 1;
        digits[at] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    encoder.put_flat(&digits[at..])?;
    encoder.put_control(b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodingKind;
    use crate::stream::SliceReader;

    fn parse(input: &[u8]) -> Result<u16> {
        let mut reader = SliceReader::new(input);
        let mut decoder = Decoder::new(&mut reader, EncodingKind::Ansi, false);
        let mut err = ErrorContext::default();
        read_header(&mut decoder, &mut err)
    }

    #[test]
    fn well_formed() {
        assert_eq!(parse(b"!SCEF:V=1\n"), Ok(1));
    }

    #[test]
    fn case_and_space_tolerant() {
        assert_eq!(parse(b"  !  scef : v = 17  \n"), Ok(17));
        assert_eq!(parse(b"\n\n!Scef:V=65535\n"), Ok(65535));
    }

    #[test]
    fn no_header_when_first_char_is_not_bang() {
        assert_eq!(parse(b"<g:>"), Err(ErrorKind::NoHeader));
        assert_eq!(parse(b"   "), Err(ErrorKind::NoHeader));
        assert_eq!(parse(b""), Err(ErrorKind::NoHeader));
    }

    #[test]
    fn bad_magic_or_punctuation() {
        assert_eq!(parse(b"!SCEX:V=1\n"), Err(ErrorKind::BadFormat));
        assert_eq!(parse(b"!SCEF;V=1\n"), Err(ErrorKind::BadFormat));
        assert_eq!(parse(b"!SCEF:W=1\n"), Err(ErrorKind::BadFormat));
        assert_eq!(parse(b"!SCEF:V-1\n"), Err(ErrorKind::BadFormat));
        assert_eq!(parse(b"!SCEF:V=x\n"), Err(ErrorKind::BadFormat));
    }

    #[test]
    fn missing_line_feed() {
        assert_eq!(parse(b"!SCEF:V=1"), Err(ErrorKind::BadFormat));
        assert_eq!(parse(b"!SCEF:V=1 x\n"), Err(ErrorKind::BadFormat));
    }

    #[test]
    fn version_limits() {
        assert_eq!(parse(b"!SCEF:V=0\n"), Err(ErrorKind::UnsupportedVersion));
        assert_eq!(parse(b"!SCEF:V=01\n"), Err(ErrorKind::UnsupportedVersion));
        assert_eq!(parse(b"!SCEF:V=99999\n"), Err(ErrorKind::UnsupportedVersion));
        assert_eq!(parse(b"!SCEF:V=123456\n"), Err(ErrorKind::UnsupportedVersion));
        assert_eq!(parse(b"!SCEF:V=65535\n"), Ok(65535));
    }

    #[test]
    fn writes_canonical_line() {
        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out, EncodingKind::Utf8, false);
        write_header(&mut encoder, 1).unwrap();
        assert_eq!(out, b"!SCEF:V=1\n");

        let mut out = Vec::new();
        let mut encoder = Encoder::new(&mut out, EncodingKind::Utf8, false);
        write_header(&mut encoder, 40123).unwrap();
        assert_eq!(out, b"!SCEF:V=40123\n");
    }
}
