//! SCEF document parsing.
//!
//! A single-pass, character-driven state machine over a [`Decoder`]. The
//! parser's "current character" is always the most recently consumed
//! scalar; a canonical step consumes one scalar (advancing the tracked
//! line/column) and dispatches on it.
//!
//! ## Recovery
//!
//! The grammar is parsed forgivingly. Every recoverable anomaly — an
//! unexpected character, a malformed escape, a quoted string cut off by the
//! end of the stream — is reported to the warning callback before the
//! parser picks a continuation. The callback's [`WarnAction`] is mapped
//! per site: `Abort` always fails the parse, while `Default` picks the
//! conservative choice for the location (abort for structural damage
//! inside a group, accept for cosmetic slips).
//!
//! Positions are 1-based. An item's position is the line/column of the
//! character that opened it.

use std::rc::Rc;

use crate::encoding::Decoder;
use crate::error::{ErrorContext, ErrorKind, Result, WarnAction, WarningHandler};
use crate::items::{Item, ItemList, ItemRef, QuoteMode};
use crate::options::Flags;
use crate::text::{
    hex_digit, is_bad_code_point, is_danger, is_space, is_space_no_lf, Utf32String,
};

const LF: u32 = b'\n' as u32;
const TAB: u32 = b'\t' as u32;
const CR: u32 = b'\r' as u32;
const HASH: u32 = b'#' as u32;
const COMMA: u32 = b',' as u32;
const COLON: u32 = b':' as u32;
const SEMI: u32 = b';' as u32;
const OPEN: u32 = b'<' as u32;
const EQUALS: u32 = b'=' as u32;
const CLOSE: u32 = b'>' as u32;
const SINGLE: u32 = b'\'' as u32;
const DOUBLE: u32 = b'"' as u32;
const CARET: u32 = b'^' as u32;

/// Scalars that terminate a bare word.
fn ends_bare_word(scalar: u32) -> bool {
    matches!(
        scalar,
        0x20 | 0x22 | 0x23 | 0x27 | 0x2C | 0x3A | 0x3B | 0x3C | 0x3D | 0x3E
    ) || is_danger(scalar)
}

/// Runs the v1 grammar over `decoder`, appending parsed items to `root`.
///
/// Returns `Ok(())` when the stream was consumed to its end; the error
/// context is left cleared with the end-of-document position. On failure
/// the context describes the error and `root` keeps whatever was built.
pub(crate) fn parse(
    decoder: Decoder<'_>,
    root: &mut ItemList,
    flags: Flags,
    err: &mut ErrorContext,
    handler: Option<&mut WarningHandler<'_>>,
) -> Result<()> {
    let mut parser = Parser {
        decoder,
        err,
        handler,
        skip_spacers: flags.contains(Flags::DISABLE_SPACERS),
        skip_comments: flags.contains(Flags::DISABLE_COMMENTS),
    };
    parser.parse_root(root)
}

pub(crate) struct Parser<'d, 'e, 'h, 'c> {
    decoder: Decoder<'d>,
    err: &'e mut ErrorContext,
    handler: Option<&'h mut WarningHandler<'c>>,
    skip_spacers: bool,
    skip_comments: bool,
}

impl Parser<'_, '_, '_, '_> {
    fn cur(&self) -> u32 {
        self.decoder.last_char()
    }

    fn advance(&mut self) -> Result<()> {
        self.decoder.get_char().map(|_| ())
    }

    fn notify(&mut self) -> WarnAction {
        match self.handler.as_mut() {
            Some(handler) => handler(self.err),
            None => WarnAction::Default,
        }
    }

    /// Reports an unexpected character at the current position and returns
    /// the callback's answer.
    fn warn_invalid_char(&mut self, found: u32, expected: u32) -> WarnAction {
        self.err
            .set_position(self.decoder.line(), self.decoder.column());
        self.err.set_invalid_char(found, expected);
        self.notify()
    }

    /// Unexpected-character site where every answer except `Abort`
    /// continues.
    fn warn_invalid_char_lenient(&mut self, found: u32, expected: u32) -> Result<()> {
        match self.warn_invalid_char(found, expected) {
            WarnAction::Abort => Err(ErrorKind::InvalidChar),
            _ => Ok(()),
        }
    }

    /// Reports a premature end of stream and returns the callback's
    /// answer. The position points one column past the last scalar.
    fn warn_premature(&mut self, expected: u32) -> WarnAction {
        self.err
            .set_position(self.decoder.line(), self.decoder.column() + 1);
        self.err.set_premature_end(expected);
        self.notify()
    }

    /// Premature-end site where only `Abort` fails.
    fn warn_premature_lenient(&mut self, expected: u32) -> Result<()> {
        match self.warn_premature(expected) {
            WarnAction::Abort => Err(ErrorKind::PrematureEnd),
            _ => Ok(()),
        }
    }

    /// Premature-end site inside an open group: structural, so `Default`
    /// also fails.
    fn warn_premature_strict(&mut self, expected: u32) -> Result<()> {
        match self.warn_premature(expected) {
            WarnAction::Default | WarnAction::Abort => Err(ErrorKind::PrematureEnd),
            _ => Ok(()),
        }
    }

    /// A danger code point outside comment/quoted context. Always fatal.
    fn fatal_bad_format(&mut self) -> ErrorKind {
        self.err
            .set_position(self.decoder.line(), self.decoder.column());
        self.err.set_code(ErrorKind::BadFormat);
        ErrorKind::BadFormat
    }

    /// Collects inline spacing starting with the current scalar.
    fn read_spacing_from_current(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        if self.skip_spacers {
            return self.decoder.read_while(is_space_no_lf);
        }
        buf.push(self.cur() as u8);
        self.decoder.read_while(|scalar| {
            if is_space_no_lf(scalar) {
                buf.push(scalar as u8);
                true
            } else {
                false
            }
        })
    }

    /// Collects inline spacing beginning at the next scalar.
    fn read_spacing_after_current(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        if self.skip_spacers {
            return self.decoder.read_while(is_space_no_lf);
        }
        self.decoder.read_while(|scalar| {
            if is_space_no_lf(scalar) {
                buf.push(scalar as u8);
                true
            } else {
                false
            }
        })
    }

    /// Root item loop: dispatches until the stream ends.
    fn parse_root(&mut self, root: &mut ItemList) -> Result<()> {
        let mut step = self.advance();
        loop {
            match step {
                Ok(()) => {}
                Err(ErrorKind::EndOfStream) => {
                    self.err.clear();
                    self.err
                        .set_position(self.decoder.line(), self.decoder.column() + 1);
                    return Ok(());
                }
                Err(other) => {
                    if self.err.code() != Some(other) {
                        self.err.set_code(other);
                    }
                    return Err(other);
                }
            }

            let scalar = self.cur();
            step = match scalar {
                HASH => self.parse_comment(root),
                OPEN => {
                    let item = Item::group();
                    item.borrow_mut()
                        .set_position(self.decoder.line(), self.decoder.column());
                    root.push(item.clone());
                    self.parse_group(&item)
                }
                COMMA | SEMI => match self.warn_invalid_char(scalar, 0) {
                    WarnAction::Accept => {
                        let item = Item::singlet();
                        item.borrow_mut()
                            .set_position(self.decoder.line(), self.decoder.column());
                        root.push(item);
                        self.advance()
                    }
                    WarnAction::Abort => return Err(ErrorKind::InvalidChar),
                    _ => self.advance(),
                },
                EQUALS => match self.warn_invalid_char(EQUALS, 0) {
                    WarnAction::Default | WarnAction::Continue | WarnAction::Accept => {
                        let item = Item::keyed_value();
                        {
                            let mut borrowed = item.borrow_mut();
                            borrowed.set_position(self.decoder.line(), self.decoder.column());
                            borrowed
                                .as_keyed_value_mut()
                                .unwrap()
                                .set_value_column(self.decoder.column() + 1);
                        }
                        root.push(item.clone());
                        self.parse_keyed_value(&item, root)
                    }
                    WarnAction::Discard => self.advance(),
                    WarnAction::Abort => return Err(ErrorKind::InvalidChar),
                },
                COLON => match self.warn_invalid_char(COLON, 0) {
                    WarnAction::Abort => return Err(ErrorKind::InvalidChar),
                    _ => self.advance(),
                },
                CLOSE => match self.warn_invalid_char(CLOSE, 0) {
                    WarnAction::Continue | WarnAction::Accept | WarnAction::Discard => {
                        self.advance()
                    }
                    _ => return Err(ErrorKind::InvalidChar),
                },
                scalar if is_space(scalar) => self.parse_spacer(root),
                scalar if is_danger(scalar) => return Err(self.fatal_bad_format()),
                _ => self.parse_named_item(root),
            };
        }
    }

    /// Consumes a comment through its terminating newline. The scalar
    /// after the newline becomes current.
    fn parse_comment(&mut self, list: &mut ItemList) -> Result<()> {
        if self.skip_comments {
            self.decoder
                .read_while(|scalar| scalar != LF && !is_bad_code_point(scalar))?;
            if self.cur() != LF {
                return Err(self.fatal_bad_format());
            }
            return self.advance();
        }

        let item = Item::comment();
        item.borrow_mut()
            .set_position(self.decoder.line(), self.decoder.column());
        list.push(item.clone());

        let mut text = Utf32String::new();
        let step = self.decoder.read_while(|scalar| {
            if scalar == LF || is_bad_code_point(scalar) {
                false
            } else {
                text.push(scalar);
                true
            }
        });
        item.borrow_mut().as_comment_mut().unwrap().set_text(text);
        if let Err(err) = step {
            self.err.set_critical_item(Some(Rc::downgrade(&item)));
            return Err(err);
        }
        if self.cur() != LF {
            return Err(self.fatal_bad_format());
        }
        self.advance()
    }

    /// Consumes a run of whitespace into a spacer item.
    fn parse_spacer(&mut self, list: &mut ItemList) -> Result<()> {
        if self.skip_spacers {
            return self.decoder.read_while(is_space);
        }

        let item = Item::spacer();
        item.borrow_mut()
            .set_position(self.decoder.line(), self.decoder.column());
        list.push(item.clone());

        let mut lines = 0u64;
        let mut tail: Vec<u8> = Vec::new();
        if self.cur() == LF {
            lines = 1;
        } else {
            tail.push(self.cur() as u8);
        }
        let step = self.decoder.read_while(|scalar| {
            if is_space(scalar) {
                if scalar == LF {
                    lines += 1;
                    tail.clear();
                } else {
                    tail.push(scalar as u8);
                }
                true
            } else {
                false
            }
        });
        item.borrow_mut()
            .as_spacer_mut()
            .unwrap()
            .take_raw(lines, tail);
        step
    }

    /// Reads a name (bare or quoted), tracking the quoting mode that was
    /// used. On return the terminating scalar is current. Adjacent name
    /// tokens raise `MergedText` and, when tolerated, concatenate.
    fn read_name(&mut self, out: &mut Utf32String, quote: &mut QuoteMode) -> Result<()> {
        *quote = QuoteMode::Standard;
        let mut step = self.read_name_segment(out, quote);
        loop {
            step?;
            match self.cur() {
                LF | HASH | COMMA | COLON | SEMI | OPEN | EQUALS | CLOSE => return Ok(()),
                scalar if is_space_no_lf(scalar) => return Ok(()),
                scalar if is_bad_code_point(scalar) => return Ok(()),
                _ => {}
            }

            self.err
                .set_position(self.decoder.line(), self.decoder.column());
            self.err.set_code(ErrorKind::MergedText);
            match self.notify() {
                WarnAction::Default | WarnAction::Continue | WarnAction::Accept => {}
                WarnAction::Discard => return self.trash_sequence(),
                WarnAction::Abort => return Err(ErrorKind::MergedText),
            }
            step = self.read_name_segment(out, quote);
        }
    }

    fn read_name_segment(&mut self, out: &mut Utf32String, quote: &mut QuoteMode) -> Result<()> {
        match self.cur() {
            SINGLE => {
                *quote = QuoteMode::SingleQuoted;
                self.read_quoted(out, SINGLE)
            }
            DOUBLE => {
                *quote = QuoteMode::DoubleQuoted;
                self.read_quoted(out, DOUBLE)
            }
            scalar => {
                out.push(scalar);
                self.decoder.read_while(|scalar| {
                    if ends_bare_word(scalar) {
                        false
                    } else {
                        out.push(scalar);
                        true
                    }
                })
            }
        }
    }

    /// Reads the body of a quoted string; the opening quote is current on
    /// entry and the scalar after the closing quote is current on a clean
    /// return. A newline ends the string with a warning and stays
    /// current.
    fn read_quoted(&mut self, out: &mut Utf32String, quote: u32) -> Result<()> {
        loop {
            let mut step = self.decoder.read_while(|scalar| {
                if scalar == LF || scalar == quote || scalar == CARET || is_bad_code_point(scalar)
                {
                    false
                } else {
                    out.push(scalar);
                    true
                }
            });
            loop {
                if let Err(err) = step {
                    if err == ErrorKind::EndOfStream {
                        self.warn_premature_lenient(quote)?;
                    }
                    return Err(err);
                }
                match self.cur() {
                    LF => {
                        self.warn_invalid_char_lenient(LF, quote)?;
                        return Ok(());
                    }
                    scalar if scalar == quote => return self.advance(),
                    CARET => {
                        step = self.read_escape(out);
                    }
                    scalar => {
                        // Danger code points are tolerated inside quotes.
                        out.push(scalar);
                        break;
                    }
                }
            }
        }
    }

    /// Handles one `^` escape. The caret is current on entry; on a clean
    /// return the first scalar after the escape is current and unprocessed
    /// (the quoted-string loop takes it as ordinary text).
    fn read_escape(&mut self, out: &mut Utf32String) -> Result<()> {
        self.err
            .set_position(self.decoder.line(), self.decoder.column());
        let scalar = self.decoder.get_char()?;
        match scalar {
            SINGLE | DOUBLE | CARET => {
                out.push(scalar);
                self.advance()
            }
            scalar if scalar == b'n' as u32 => {
                out.push(LF);
                self.advance()
            }
            scalar if scalar == b't' as u32 => {
                out.push(TAB);
                self.advance()
            }
            scalar if scalar == b'r' as u32 => {
                out.push(CR);
                self.advance()
            }
            scalar if scalar == b'u' as u32 => self.read_hex_escape(out, b'u', 4),
            scalar if scalar == b'U' as u32 => self.read_hex_escape(out, b'U', 8),
            first if hex_digit(first).is_some() => self.read_byte_escape(out, first),
            unknown => {
                self.err.set_bad_escape(&[unknown]);
                match self.notify() {
                    WarnAction::Continue => {
                        // Keep the caret; the offender flows through as
                        // ordinary text.
                        out.push(CARET);
                        Ok(())
                    }
                    WarnAction::Default | WarnAction::Accept => Ok(()),
                    WarnAction::Discard => self.advance(),
                    WarnAction::Abort => Err(ErrorKind::BadEscape),
                }
            }
        }
    }

    /// `^XX`: exactly two hex digits forming one byte.
    fn read_byte_escape(&mut self, out: &mut Utf32String, first: u32) -> Result<()> {
        match self.decoder.get_char() {
            Ok(second) if hex_digit(second).is_some() => {
                out.push(hex_digit(first).unwrap() << 4 | hex_digit(second).unwrap());
                self.advance()
            }
            Ok(second) => {
                self.err.set_bad_escape(&[first, second]);
                match self.notify() {
                    WarnAction::Continue => {
                        out.push(CARET);
                        out.push(first);
                        Ok(())
                    }
                    WarnAction::Default | WarnAction::Accept => {
                        out.push(hex_digit(first).unwrap());
                        Ok(())
                    }
                    WarnAction::Discard => self.advance(),
                    WarnAction::Abort => Err(ErrorKind::BadEscape),
                }
            }
            Err(ErrorKind::EndOfStream) => {
                self.err.set_bad_escape(&[first]);
                match self.notify() {
                    WarnAction::Continue => {
                        out.push(CARET);
                        out.push(first);
                        Err(ErrorKind::EndOfStream)
                    }
                    WarnAction::Default | WarnAction::Accept => {
                        out.push(hex_digit(first).unwrap());
                        Err(ErrorKind::EndOfStream)
                    }
                    WarnAction::Discard => Err(ErrorKind::EndOfStream),
                    WarnAction::Abort => Err(ErrorKind::BadEscape),
                }
            }
            Err(other) => Err(other),
        }
    }

    /// `^uXXXX` / `^UXXXXXXXX`: a fixed-width hex code point.
    fn read_hex_escape(&mut self, out: &mut Utf32String, marker: u8, width: usize) -> Result<()> {
        let mut digits: Vec<u32> = Vec::with_capacity(width);
        let step = self.decoder.read_while(|scalar| {
            if hex_digit(scalar).is_some() {
                digits.push(scalar);
                digits.len() < width
            } else {
                false
            }
        });

        if digits.len() == width {
            out.push(hex_scalar_value(&digits));
            return self.advance();
        }

        match step {
            Ok(()) => {
                let mut reported = digits.clone();
                reported.push(self.cur());
                self.err.set_bad_escape(&reported);
                match self.notify() {
                    WarnAction::Continue => {
                        out.push(CARET);
                        out.push(u32::from(marker));
                        out.extend_from_slice(&digits);
                        Ok(())
                    }
                    WarnAction::Default | WarnAction::Accept => {
                        if !digits.is_empty() {
                            out.push(hex_scalar_value(&digits));
                        }
                        Ok(())
                    }
                    WarnAction::Discard => self.advance(),
                    WarnAction::Abort => Err(ErrorKind::BadEscape),
                }
            }
            Err(ErrorKind::EndOfStream) => {
                self.err.set_bad_escape(&digits);
                match self.notify() {
                    WarnAction::Continue => {
                        out.push(CARET);
                        out.push(u32::from(marker));
                        out.extend_from_slice(&digits);
                        Err(ErrorKind::EndOfStream)
                    }
                    WarnAction::Default | WarnAction::Accept => {
                        if !digits.is_empty() {
                            out.push(hex_scalar_value(&digits));
                        }
                        Err(ErrorKind::EndOfStream)
                    }
                    WarnAction::Discard => Err(ErrorKind::EndOfStream),
                    WarnAction::Abort => Err(ErrorKind::BadEscape),
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Discards the remainder of a merged token run.
    fn trash_sequence(&mut self) -> Result<()> {
        loop {
            match self.cur() {
                LF | HASH | COMMA | COLON | SEMI | OPEN | EQUALS | CLOSE => return Ok(()),
                scalar if is_space_no_lf(scalar) => return Ok(()),
                SINGLE => self.trash_quoted(SINGLE)?,
                DOUBLE => self.trash_quoted(DOUBLE)?,
                scalar if is_bad_code_point(scalar) => return Ok(()),
                _ => self
                    .decoder
                    .read_while(|scalar| !ends_bare_word(scalar))?,
            }
        }
    }

    fn trash_quoted(&mut self, quote: u32) -> Result<()> {
        loop {
            let mut step = self.decoder.read_while(|scalar| {
                scalar != LF && scalar != quote && scalar != CARET && !is_bad_code_point(scalar)
            });
            loop {
                step?;
                match self.cur() {
                    LF => return Ok(()),
                    scalar if scalar == quote => return self.advance(),
                    CARET => step = self.trash_escape(),
                    _ => break,
                }
            }
        }
    }

    fn trash_escape(&mut self) -> Result<()> {
        match self.decoder.get_char()? {
            SINGLE | DOUBLE | CARET => self.advance(),
            _ => Ok(()),
        }
    }

    /// An item starting with a name: resolves to a singlet or, when an
    /// `=` follows, a keyed value.
    fn parse_named_item(&mut self, list: &mut ItemList) -> Result<()> {
        let line = self.decoder.line();
        let column = self.decoder.column();

        let mut name = Utf32String::new();
        let mut quote = QuoteMode::Standard;
        if let Err(err) = self.read_name(&mut name, &mut quote) {
            if err == ErrorKind::EndOfStream {
                let item = Item::singlet();
                {
                    let mut borrowed = item.borrow_mut();
                    borrowed.set_position(line, column);
                    let singlet = borrowed.as_singlet_mut().unwrap();
                    singlet.set_name(name);
                    singlet.set_quote_mode(quote);
                }
                list.push(item.clone());
                self.err.set_critical_item(Some(Rc::downgrade(&item)));
                self.warn_premature_lenient(SEMI)?;
                self.err.set_critical_item(None);
            }
            return Err(err);
        }

        let mut spacing: Vec<u8> = Vec::new();
        let spacing_column = self.decoder.column();
        if is_space_no_lf(self.cur()) {
            if let Err(err) = self.read_spacing_from_current(&mut spacing) {
                let item = Item::singlet();
                {
                    let mut borrowed = item.borrow_mut();
                    borrowed.set_position(line, column);
                    let singlet = borrowed.as_singlet_mut().unwrap();
                    singlet.set_name(name);
                    singlet.set_quote_mode(quote);
                }
                list.push(item.clone());
                if err != ErrorKind::EndOfStream {
                    self.err.set_critical_item(Some(Rc::downgrade(&item)));
                }
                return Err(err);
            }
        }

        if self.cur() != EQUALS {
            let item = Item::singlet();
            {
                let mut borrowed = item.borrow_mut();
                borrowed.set_position(line, column);
                let singlet = borrowed.as_singlet_mut().unwrap();
                singlet.set_name(name);
                singlet.set_quote_mode(quote);
            }
            list.push(item.clone());

            match self.cur() {
                COLON => {
                    self.warn_invalid_char_lenient(COLON, SEMI)?;
                    item.borrow_mut()
                        .as_singlet_mut()
                        .unwrap()
                        .post_space
                        .take_raw(spacing);
                    return self.advance();
                }
                COMMA | SEMI => {
                    item.borrow_mut()
                        .as_singlet_mut()
                        .unwrap()
                        .post_space
                        .take_raw(spacing);
                    return self.advance();
                }
                LF => {
                    // Trailing spacing before the line break is dropped.
                    self.warn_invalid_char_lenient(LF, SEMI)?;
                    return Ok(());
                }
                other => {
                    if !spacing.is_empty() {
                        self.emit_spacer(list, line, spacing_column, spacing);
                    }
                    if is_danger(other) {
                        return Err(self.fatal_bad_format());
                    }
                    self.warn_invalid_char_lenient(other, SEMI)?;
                    return Ok(());
                }
            }
        }

        let item = Item::keyed_value();
        {
            let mut borrowed = item.borrow_mut();
            borrowed.set_position(line, column);
            let kv = borrowed.as_keyed_value_mut().unwrap();
            kv.set_name(name);
            kv.set_quote_mode(quote);
            kv.set_value_column(self.decoder.column() + 1);
            kv.pre_space.take_raw(spacing);
        }
        list.push(item.clone());
        self.parse_keyed_value(&item, list)
    }

    /// Parses the `= value ;` tail of a keyed value. The `=` is current on
    /// entry.
    fn parse_keyed_value(&mut self, item: &ItemRef, list: &mut ItemList) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));

        match self.advance() {
            Ok(()) => {}
            Err(ErrorKind::EndOfStream) => {
                self.warn_premature_lenient(SEMI)?;
                self.err.set_critical_item(None);
                return Err(ErrorKind::EndOfStream);
            }
            Err(other) => return Err(other),
        }

        let spacing_line = self.decoder.line();
        let spacing_column = self.decoder.column();
        let mut spacing: Vec<u8> = Vec::new();
        if is_space_no_lf(self.cur()) {
            match self.read_spacing_from_current(&mut spacing) {
                Ok(()) => {}
                Err(ErrorKind::EndOfStream) => {
                    self.warn_premature_lenient(SEMI)?;
                    self.err.set_critical_item(None);
                    return Err(ErrorKind::EndOfStream);
                }
                Err(other) => return Err(other),
            }
        }

        match self.cur() {
            COLON => {
                self.warn_invalid_char_lenient(COLON, SEMI)?;
                item.borrow_mut()
                    .as_keyed_value_mut()
                    .unwrap()
                    .mid_space
                    .take_raw(spacing);
                self.err.set_critical_item(None);
                return self.advance();
            }
            COMMA | SEMI => {
                item.borrow_mut()
                    .as_keyed_value_mut()
                    .unwrap()
                    .mid_space
                    .take_raw(spacing);
                self.err.set_critical_item(None);
                return self.advance();
            }
            HASH | OPEN | EQUALS | CLOSE => {
                if !spacing.is_empty() {
                    self.emit_spacer(list, spacing_line, spacing_column, spacing);
                }
                let found = self.cur();
                self.warn_invalid_char_lenient(found, SEMI)?;
                self.err.set_critical_item(None);
                return Ok(());
            }
            LF => {
                self.warn_invalid_char_lenient(LF, SEMI)?;
                self.err.set_critical_item(None);
                return Ok(());
            }
            scalar if is_danger(scalar) => return Err(self.fatal_bad_format()),
            _ => {}
        }

        item.borrow_mut()
            .as_keyed_value_mut()
            .unwrap()
            .mid_space
            .take_raw(spacing);

        // The value.
        let value_column = self.decoder.column();
        let mut value = Utf32String::new();
        let mut value_quote = QuoteMode::Standard;
        let step = self.read_name(&mut value, &mut value_quote);
        {
            let mut borrowed = item.borrow_mut();
            let kv = borrowed.as_keyed_value_mut().unwrap();
            kv.set_value(value);
            kv.set_value_quote_mode(value_quote);
            kv.set_value_column(value_column);
        }
        if let Err(err) = step {
            if err == ErrorKind::EndOfStream {
                self.warn_premature_lenient(SEMI)?;
                self.err.set_critical_item(None);
            }
            return Err(err);
        }

        let post_line = self.decoder.line();
        let post_column = self.decoder.column();
        let mut post: Vec<u8> = Vec::new();
        if is_space_no_lf(self.cur()) {
            match self.read_spacing_from_current(&mut post) {
                Ok(()) => {}
                Err(ErrorKind::EndOfStream) => {
                    self.warn_premature_lenient(SEMI)?;
                    self.err.set_critical_item(None);
                    return Err(ErrorKind::EndOfStream);
                }
                Err(other) => return Err(other),
            }
        }

        match self.cur() {
            COLON => {
                self.warn_invalid_char_lenient(COLON, SEMI)?;
                item.borrow_mut()
                    .as_keyed_value_mut()
                    .unwrap()
                    .post_space
                    .take_raw(post);
                self.err.set_critical_item(None);
                self.advance()
            }
            COMMA | SEMI => {
                item.borrow_mut()
                    .as_keyed_value_mut()
                    .unwrap()
                    .post_space
                    .take_raw(post);
                self.err.set_critical_item(None);
                self.advance()
            }
            LF => {
                self.warn_invalid_char_lenient(LF, SEMI)?;
                self.err.set_critical_item(None);
                Ok(())
            }
            other => {
                if !post.is_empty() {
                    self.emit_spacer(list, post_line, post_column, post);
                }
                self.warn_invalid_char_lenient(other, SEMI)?;
                self.err.set_critical_item(None);
                Ok(())
            }
        }
    }

    /// Spacing captured ahead of an unexpected character becomes a
    /// standalone spacer so the tree shape survives the recovery.
    fn emit_spacer(&mut self, list: &mut ItemList, line: u64, column: u64, spacing: Vec<u8>) {
        let spacer = Item::spacer();
        {
            let mut borrowed = spacer.borrow_mut();
            borrowed.set_position(line, column);
            borrowed.as_spacer_mut().unwrap().take_raw(0, spacing);
        }
        list.push(spacer);
    }

    /// Parses a group from just after its `<` through its closing `>`.
    fn parse_group(&mut self, item: &ItemRef) -> Result<()> {
        let weak = Rc::downgrade(item);
        self.err.set_critical_item(Some(weak.clone()));

        // Spacing between '<' and the name.
        let mut pre: Vec<u8> = Vec::new();
        match self.read_spacing_after_current(&mut pre) {
            Ok(()) => {}
            Err(ErrorKind::EndOfStream) => {
                self.warn_premature_strict(CLOSE)?;
                self.err.set_critical_item(None);
                return Err(ErrorKind::EndOfStream);
            }
            Err(other) => return Err(other),
        }
        item.borrow_mut()
            .as_group_mut()
            .unwrap()
            .pre_space
            .take_raw(pre);

        // The header: optional name, optional spacing, then ':'.
        let mut step: Result<()> = Ok(());
        match self.cur() {
            COLON => step = self.advance(),
            COMMA | SEMI => {
                let found = self.cur();
                self.warn_invalid_char_lenient(found, COLON)?;
                step = self.advance();
            }
            LF | EQUALS | OPEN | HASH => {
                let found = self.cur();
                self.warn_invalid_char_lenient(found, COLON)?;
                // The offending scalar opens the body.
            }
            CLOSE => {
                self.warn_invalid_char_lenient(CLOSE, COLON)?;
                self.err.set_critical_item(None);
                return Ok(());
            }
            scalar if is_danger(scalar) => return Err(self.fatal_bad_format()),
            _ => {
                let mut name = Utf32String::new();
                let mut quote = QuoteMode::Standard;
                let name_step = self.read_name(&mut name, &mut quote);
                {
                    let mut borrowed = item.borrow_mut();
                    let group = borrowed.as_group_mut().unwrap();
                    group.set_name(name);
                    group.set_quote_mode(quote);
                }
                if let Err(err) = name_step {
                    if err == ErrorKind::EndOfStream {
                        self.warn_premature_strict(CLOSE)?;
                        self.err.set_critical_item(None);
                    }
                    return Err(err);
                }

                match self.cur() {
                    COLON => step = self.advance(),
                    COMMA | SEMI => {
                        let found = self.cur();
                        self.warn_invalid_char_lenient(found, COLON)?;
                        step = self.advance();
                    }
                    CLOSE => {
                        self.warn_invalid_char_lenient(CLOSE, COLON)?;
                        self.err.set_critical_item(None);
                        return Ok(());
                    }
                    LF | EQUALS | OPEN | HASH => {
                        let found = self.cur();
                        self.warn_invalid_char_lenient(found, COLON)?;
                    }
                    scalar if is_space_no_lf(scalar) => {
                        let mut post: Vec<u8> = Vec::new();
                        match self.read_spacing_from_current(&mut post) {
                            Ok(()) => {}
                            Err(ErrorKind::EndOfStream) => {
                                self.warn_premature_strict(CLOSE)?;
                                self.err.set_critical_item(None);
                                return Err(ErrorKind::EndOfStream);
                            }
                            Err(other) => return Err(other),
                        }
                        item.borrow_mut()
                            .as_group_mut()
                            .unwrap()
                            .post_space
                            .take_raw(post);

                        if self.cur() == COLON {
                            step = self.advance();
                        } else if is_bad_code_point(self.cur()) {
                            return Err(self.fatal_bad_format());
                        } else {
                            let found = self.cur();
                            self.warn_invalid_char_lenient(found, COLON)?;
                        }
                    }
                    scalar if is_bad_code_point(scalar) => {
                        return Err(self.fatal_bad_format());
                    }
                    other => {
                        self.warn_invalid_char_lenient(other, COLON)?;
                    }
                }
            }
        }

        // The body.
        self.err.push_open_group(weak);
        self.err.set_critical_item(None);
        let mut children = ItemList::new();
        let result = self.parse_group_body(&mut children, step);
        *item.borrow_mut().as_group_mut().unwrap().children_mut() = children;
        result
    }

    fn parse_group_body(&mut self, children: &mut ItemList, first: Result<()>) -> Result<()> {
        let mut step = first;
        loop {
            match step {
                Ok(()) => {}
                Err(ErrorKind::EndOfStream) => {
                    self.warn_premature_strict(CLOSE)?;
                    self.err.pop_open_group();
                    return Err(ErrorKind::EndOfStream);
                }
                Err(other) => return Err(other),
            }

            let scalar = self.cur();
            step = match scalar {
                COLON => match self.warn_invalid_char(COLON, 0) {
                    WarnAction::Abort => return Err(ErrorKind::InvalidChar),
                    _ => self.advance(),
                },
                COMMA | SEMI => match self.warn_invalid_char(scalar, 0) {
                    WarnAction::Accept => {
                        let item = Item::singlet();
                        item.borrow_mut()
                            .set_position(self.decoder.line(), self.decoder.column());
                        children.push(item);
                        self.advance()
                    }
                    WarnAction::Abort => return Err(ErrorKind::InvalidChar),
                    _ => self.advance(),
                },
                EQUALS => match self.warn_invalid_char(EQUALS, 0) {
                    WarnAction::Default | WarnAction::Continue | WarnAction::Accept => {
                        let item = Item::keyed_value();
                        {
                            let mut borrowed = item.borrow_mut();
                            borrowed.set_position(self.decoder.line(), self.decoder.column());
                            borrowed
                                .as_keyed_value_mut()
                                .unwrap()
                                .set_value_column(self.decoder.column() + 1);
                        }
                        children.push(item.clone());
                        self.parse_keyed_value(&item, children)
                    }
                    WarnAction::Discard => self.advance(),
                    WarnAction::Abort => return Err(ErrorKind::InvalidChar),
                },
                OPEN => {
                    let item = Item::group();
                    item.borrow_mut()
                        .set_position(self.decoder.line(), self.decoder.column());
                    children.push(item.clone());
                    self.parse_group(&item)
                }
                CLOSE => {
                    self.err.pop_open_group();
                    return self.advance();
                }
                HASH => self.parse_comment(children),
                scalar if is_space(scalar) => self.parse_spacer(children),
                scalar if is_danger(scalar) => return Err(self.fatal_bad_format()),
                _ => self.parse_named_item(children),
            };
        }
    }
}

/// Folds hex-digit scalars into a value.
fn hex_scalar_value(digits: &[u32]) -> u32 {
    digits
        .iter()
        .fold(0u32, |acc, &digit| acc << 4 | hex_digit(digit).unwrap())
}
