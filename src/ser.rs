//! SCEF document serialization.
//!
//! The serializer walks a document tree and feeds an [`Encoder`]. One of
//! six list-writing strategies is selected up front from the save flags:
//!
//! | `DISABLE_COMMENTS` | spacing mode | strategy |
//! |---|---|---|
//! | no  | stored           | `All` |
//! | no  | auto             | `AutoSpace` |
//! | no  | none             | `NoSpace` |
//! | yes | stored           | `NoComment` |
//! | yes | auto             | `AutoNoComment` |
//! | yes | none             | `Compact` |
//!
//! `AUTO_SPACING` selects auto mode and wins over `DISABLE_SPACERS`.
//!
//! Stored-spacing modes reproduce the spacing captured at parse time, so a
//! load/save cycle with the same flags reproduces the input bytes. Auto
//! modes drop stored spacing and emit newline-plus-tab indentation derived
//! from nesting depth, capped at ten levels.

use std::rc::Rc;

use crate::encoding::Encoder;
use crate::error::{ErrorContext, Result};
use crate::items::{ItemKind, ItemList, ItemRef, QuoteMode, Spacer};
use crate::options::Flags;
use crate::text::{is_surrogate, Utf32String};

const MAX_LEVEL: u8 = 10;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    All,
    NoComment,
    NoSpace,
    AutoSpace,
    AutoNoComment,
    Compact,
}

/// Serializes `root` through `encoder` under `flags`.
pub(crate) fn write(
    root: &ItemList,
    encoder: Encoder<'_>,
    flags: Flags,
    err: &mut ErrorContext,
) -> Result<()> {
    let strategy = if flags.contains(Flags::DISABLE_COMMENTS) {
        if flags.contains(Flags::AUTO_SPACING) {
            Strategy::AutoNoComment
        } else if flags.contains(Flags::DISABLE_SPACERS) {
            Strategy::Compact
        } else {
            Strategy::NoComment
        }
    } else if flags.contains(Flags::AUTO_SPACING) {
        Strategy::AutoSpace
    } else if flags.contains(Flags::DISABLE_SPACERS) {
        Strategy::NoSpace
    } else {
        Strategy::All
    };

    let mut writer = Writer {
        encoder,
        err,
        strategy,
        auto_quote: flags.contains(Flags::AUTO_QUOTE),
    };
    match writer.write_list(root, 0) {
        Ok(()) => {
            writer.err.set_critical_item(None);
            Ok(())
        }
        Err(failure) => {
            if writer.err.code() != Some(failure) {
                writer.err.set_code(failure);
            }
            Err(failure)
        }
    }
}

struct Writer<'a, 'e> {
    encoder: Encoder<'a>,
    err: &'e mut ErrorContext,
    strategy: Strategy,
    auto_quote: bool,
}

impl Writer<'_, '_> {
    fn write_list(&mut self, list: &ItemList, level: u8) -> Result<()> {
        match self.strategy {
            Strategy::All => self.write_list_all(list, level),
            Strategy::NoComment => self.write_list_no_comment(list, level),
            Strategy::NoSpace => self.write_list_no_space(list, level),
            Strategy::AutoSpace => self.write_list_auto(list, level),
            Strategy::AutoNoComment => self.write_list_auto_no_comment(list, level),
            Strategy::Compact => self.write_list_compact(list, level),
        }
    }

    /// Stored spacing, comments kept. Two consecutive spacers merge: the
    /// earlier one emits only its newlines.
    fn write_list_all(&mut self, list: &ItemList, level: u8) -> Result<()> {
        for index in 0..list.len() {
            let item = list.get(index).expect("index in range");
            let body_kind = item.borrow().kind();
            match body_kind {
                ItemKind::Group => self.write_group_stored(item, level)?,
                ItemKind::Singlet => self.write_singlet_stored(item)?,
                ItemKind::KeyedValue => self.write_keyed_stored(item)?,
                ItemKind::Spacer => {
                    let merge = list
                        .get(index + 1)
                        .is_some_and(|next| next.borrow().as_spacer().is_some());
                    self.write_spacer_item(item, merge)?;
                }
                ItemKind::Comment => self.write_comment_terminated(item)?,
            }
        }
        Ok(())
    }

    /// Stored spacing, comments dropped. The spacer-merge lookahead skips
    /// the comments being dropped.
    fn write_list_no_comment(&mut self, list: &ItemList, level: u8) -> Result<()> {
        for index in 0..list.len() {
            let item = list.get(index).expect("index in range");
            let body_kind = item.borrow().kind();
            match body_kind {
                ItemKind::Group => self.write_group_stored(item, level)?,
                ItemKind::Singlet => self.write_singlet_stored(item)?,
                ItemKind::KeyedValue => self.write_keyed_stored(item)?,
                ItemKind::Spacer => {
                    let mut probe = index + 1;
                    while list
                        .get(probe)
                        .is_some_and(|next| next.borrow().as_comment().is_some())
                    {
                        probe += 1;
                    }
                    let merge = list
                        .get(probe)
                        .is_some_and(|next| next.borrow().as_spacer().is_some());
                    self.write_spacer_item(item, merge)?;
                }
                ItemKind::Comment => {}
            }
        }
        Ok(())
    }

    /// Structural delimiters only, comments kept on their own lines.
    fn write_list_no_space(&mut self, list: &ItemList, level: u8) -> Result<()> {
        for item in list.iter() {
            let body_kind = item.borrow().kind();
            match body_kind {
                ItemKind::Group => self.write_group_bare(item, level)?,
                ItemKind::Singlet => self.write_singlet_bare(item)?,
                ItemKind::KeyedValue => self.write_keyed_bare(item)?,
                ItemKind::Spacer => {}
                ItemKind::Comment => self.write_comment_terminated(item)?,
            }
        }
        Ok(())
    }

    /// Structural delimiters only.
    fn write_list_compact(&mut self, list: &ItemList, level: u8) -> Result<()> {
        for item in list.iter() {
            let body_kind = item.borrow().kind();
            match body_kind {
                ItemKind::Group => self.write_group_bare(item, level)?,
                ItemKind::Singlet => self.write_singlet_bare(item)?,
                ItemKind::KeyedValue => self.write_keyed_bare(item)?,
                ItemKind::Spacer | ItemKind::Comment => {}
            }
        }
        Ok(())
    }

    /// Derived indentation. A comment that sat on the same line as the
    /// preceding payload item stays inline after one space; any other
    /// comment gets its own indented line.
    fn write_list_auto(&mut self, list: &ItemList, level: u8) -> Result<()> {
        let mut wrote_item = false;
        let mut last_relevant = false;
        let mut last_line = 0u64;

        for item in list.iter() {
            let body_kind = item.borrow().kind();
            match body_kind {
                ItemKind::Group => {
                    wrote_item = true;
                    last_relevant = true;
                    last_line = item.borrow().position().line;
                    self.write_group_auto(item, level)?;
                }
                ItemKind::Singlet => {
                    wrote_item = true;
                    last_relevant = true;
                    last_line = item.borrow().position().line;
                    self.write_singlet_auto(item, level)?;
                }
                ItemKind::KeyedValue => {
                    wrote_item = true;
                    last_relevant = true;
                    last_line = item.borrow().position().line;
                    self.write_keyed_auto(item, level)?;
                }
                ItemKind::Spacer => {
                    if item.borrow().as_spacer().expect("spacer").lines() > 0 {
                        last_relevant = false;
                    }
                }
                ItemKind::Comment => {
                    if last_relevant && item.borrow().position().line == last_line {
                        self.put_control(b' ')?;
                    } else {
                        self.write_auto_indent(level)?;
                    }
                    last_relevant = false;
                    wrote_item = true;
                    self.write_comment_auto(item, level)?;
                }
            }
        }

        if wrote_item {
            self.put_control(b'\n')?;
            for _ in 1..level {
                self.put_control(b'\t')?;
            }
        }
        Ok(())
    }

    /// Derived indentation with comments and spacers dropped.
    fn write_list_auto_no_comment(&mut self, list: &ItemList, level: u8) -> Result<()> {
        let mut wrote_item = false;
        for item in list.iter() {
            let body_kind = item.borrow().kind();
            match body_kind {
                ItemKind::Group => {
                    wrote_item = true;
                    self.write_group_auto(item, level)?;
                }
                ItemKind::Singlet => {
                    wrote_item = true;
                    self.write_singlet_auto(item, level)?;
                }
                ItemKind::KeyedValue => {
                    wrote_item = true;
                    self.write_keyed_auto(item, level)?;
                }
                ItemKind::Spacer | ItemKind::Comment => {}
            }
        }

        if wrote_item {
            self.put_control(b'\n')?;
            for _ in 1..level {
                self.put_control(b'\t')?;
            }
        }
        Ok(())
    }

    fn write_group_stored(&mut self, item: &ItemRef, level: u8) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let group = borrowed.as_group().expect("group");
        self.put_control(b'<')?;
        self.encoder.put_flat(group.pre_space.as_bytes())?;
        self.write_name_optional(group.name(), group.quote_mode())?;
        self.encoder.put_flat(group.post_space.as_bytes())?;
        self.put_control(b':')?;

        self.err.push_open_group(Rc::downgrade(item));
        self.write_list(group.children(), next_level(level))?;
        self.err.pop_open_group();
        self.err.set_critical_item(Some(Rc::downgrade(item)));

        self.put_control(b'>')
    }

    fn write_group_auto(&mut self, item: &ItemRef, level: u8) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let group = borrowed.as_group().expect("group");
        self.write_auto_indent(level)?;
        self.put_control(b'<')?;
        self.write_name_optional(group.name(), group.quote_mode())?;
        self.put_control(b':')?;

        self.err.push_open_group(Rc::downgrade(item));
        self.write_list(group.children(), next_level(level))?;
        self.err.pop_open_group();
        self.err.set_critical_item(Some(Rc::downgrade(item)));

        self.put_control(b'>')
    }

    fn write_group_bare(&mut self, item: &ItemRef, level: u8) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let group = borrowed.as_group().expect("group");
        self.put_control(b'<')?;
        self.write_name_optional(group.name(), group.quote_mode())?;
        self.put_control(b':')?;

        self.err.push_open_group(Rc::downgrade(item));
        self.write_list(group.children(), next_level(level))?;
        self.err.pop_open_group();
        self.err.set_critical_item(Some(Rc::downgrade(item)));

        self.put_control(b'>')
    }

    fn write_singlet_stored(&mut self, item: &ItemRef) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let singlet = borrowed.as_singlet().expect("singlet");
        self.write_name(singlet.name(), singlet.quote_mode())?;
        self.encoder.put_flat(singlet.post_space.as_bytes())?;
        self.put_control(b';')
    }

    fn write_singlet_auto(&mut self, item: &ItemRef, level: u8) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let singlet = borrowed.as_singlet().expect("singlet");
        self.write_auto_indent(level)?;
        self.write_name(singlet.name(), singlet.quote_mode())?;
        self.put_control(b';')
    }

    fn write_singlet_bare(&mut self, item: &ItemRef) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let singlet = borrowed.as_singlet().expect("singlet");
        self.write_name(singlet.name(), singlet.quote_mode())?;
        self.put_control(b';')
    }

    fn write_keyed_stored(&mut self, item: &ItemRef) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let kv = borrowed.as_keyed_value().expect("keyed value");
        self.write_name(kv.name(), kv.quote_mode())?;
        self.encoder.put_flat(kv.pre_space.as_bytes())?;
        self.put_control(b'=')?;
        self.encoder.put_flat(kv.mid_space.as_bytes())?;
        self.write_name_optional(kv.value(), kv.value_quote_mode())?;
        self.encoder.put_flat(kv.post_space.as_bytes())?;
        self.put_control(b';')
    }

    fn write_keyed_auto(&mut self, item: &ItemRef, level: u8) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let kv = borrowed.as_keyed_value().expect("keyed value");
        self.write_auto_indent(level)?;
        self.write_name(kv.name(), kv.quote_mode())?;
        self.put_control(b' ')?;
        self.put_control(b'=')?;
        let write_value = if self.auto_quote {
            !kv.value().is_empty()
        } else {
            !kv.value().is_empty() || kv.value_quote_mode() != QuoteMode::Standard
        };
        if write_value {
            self.put_control(b' ')?;
            self.write_name(kv.value(), kv.value_quote_mode())?;
        }
        self.put_control(b';')
    }

    fn write_keyed_bare(&mut self, item: &ItemRef) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let kv = borrowed.as_keyed_value().expect("keyed value");
        self.write_name(kv.name(), kv.quote_mode())?;
        self.put_control(b'=')?;
        self.write_name_optional(kv.value(), kv.value_quote_mode())?;
        self.put_control(b';')
    }

    fn write_spacer_item(&mut self, item: &ItemRef, newlines_only: bool) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let spacer = borrowed.as_spacer().expect("spacer");
        self.write_spacer(spacer, newlines_only)
    }

    fn write_spacer(&mut self, spacer: &Spacer, newlines_only: bool) -> Result<()> {
        for _ in 0..spacer.lines() {
            self.put_control(b'\n')?;
        }
        if !newlines_only {
            self.encoder.put_flat(spacer.flat_spacing())?;
        }
        Ok(())
    }

    /// Writes a comment, splitting embedded newlines into one comment
    /// line per segment, each closed with `\n`.
    fn write_comment_terminated(&mut self, item: &ItemRef) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let comment = borrowed.as_comment().expect("comment");
        for segment in comment.text().as_slice().split(|&scalar| scalar == 0x0A) {
            self.put_control(b'#')?;
            self.encoder.put_sequence(segment)?;
            self.put_control(b'\n')?;
        }
        Ok(())
    }

    /// Auto-spacing comment: no trailing newline (the next item's
    /// pre-indent supplies it); embedded newlines still split, indented.
    fn write_comment_auto(&mut self, item: &ItemRef, level: u8) -> Result<()> {
        self.err.set_critical_item(Some(Rc::downgrade(item)));
        let borrowed = item.borrow();
        let comment = borrowed.as_comment().expect("comment");
        for (index, segment) in comment
            .text()
            .as_slice()
            .split(|&scalar| scalar == 0x0A)
            .enumerate()
        {
            if index > 0 {
                self.write_auto_indent(level)?;
            }
            self.put_control(b'#')?;
            self.encoder.put_sequence(segment)?;
        }
        Ok(())
    }

    fn write_auto_indent(&mut self, level: u8) -> Result<()> {
        self.put_control(b'\n')?;
        for _ in 0..level {
            self.put_control(b'\t')?;
        }
        Ok(())
    }

    /// Name in a position where an empty standard-quoted name is simply
    /// omitted (group names, keyed values).
    fn write_name_optional(&mut self, name: &Utf32String, quote: QuoteMode) -> Result<()> {
        if self.auto_quote {
            if !name.is_empty() {
                self.write_name_auto(name)?;
            }
        } else if !name.is_empty() || quote != QuoteMode::Standard {
            self.write_name_preferred(name, quote)?;
        }
        Ok(())
    }

    /// Name in a mandatory position.
    fn write_name(&mut self, name: &Utf32String, quote: QuoteMode) -> Result<()> {
        if self.auto_quote {
            self.write_name_auto(name)
        } else {
            self.write_name_preferred(name, quote)
        }
    }

    /// Ignores the stored quote mode: bare when possible, single-quoted
    /// otherwise.
    fn write_name_auto(&mut self, name: &Utf32String) -> Result<()> {
        if self.name_needs_escape(name) {
            self.put_control(b'\'')?;
            self.write_escaped(name.as_slice(), false)?;
            self.put_control(b'\'')
        } else {
            self.encoder.put_sequence(name.as_slice())
        }
    }

    /// Honors the stored quote mode; standard falls back to single quotes
    /// when the name cannot stand bare.
    fn write_name_preferred(&mut self, name: &Utf32String, quote: QuoteMode) -> Result<()> {
        match quote {
            QuoteMode::SingleQuoted => {
                self.put_control(b'\'')?;
                self.write_escaped(name.as_slice(), false)?;
                self.put_control(b'\'')
            }
            QuoteMode::DoubleQuoted => {
                self.put_control(b'"')?;
                self.write_escaped(name.as_slice(), true)?;
                self.put_control(b'"')
            }
            QuoteMode::Standard => self.write_name_auto(name),
        }
    }

    fn name_needs_escape(&self, name: &Utf32String) -> bool {
        name.is_empty()
            || name.as_slice().iter().any(|&scalar| scalar_needs_quote(scalar))
            || self.encoder.requires_escape_sequence(name.as_slice())
    }

    /// Escapes `text` for the active quote kind. Scalars the target
    /// encoding cannot carry are written as hex escapes.
    fn write_escaped(&mut self, text: &[u32], double: bool) -> Result<()> {
        let quote = if double {
            u32::from(b'"')
        } else {
            u32::from(b'\'')
        };
        for &scalar in text {
            match scalar {
                0x09 => {
                    if double {
                        self.put_pair(b'^', b't')?;
                    } else {
                        self.encoder.put_scalar(scalar)?;
                    }
                }
                0x0A => self.put_pair(b'^', b'n')?,
                0x0D => self.put_pair(b'^', b'r')?,
                scalar if scalar == quote || scalar == u32::from(b'^') => {
                    self.put_control(b'^')?;
                    self.encoder.put_scalar(scalar)?;
                }
                scalar if scalar < 0x20 => {
                    self.put_control(b'^')?;
                    self.write_hex(scalar, 2)?;
                }
                scalar if is_surrogate(scalar) => {
                    self.put_pair(b'^', b'u')?;
                    self.write_hex(scalar, 4)?;
                }
                scalar if self.encoder.requires_escape(scalar) => {
                    if scalar <= 0xFFFF {
                        self.put_pair(b'^', b'u')?;
                        self.write_hex(scalar, 4)?;
                    } else {
                        self.put_pair(b'^', b'U')?;
                        self.write_hex(scalar, 8)?;
                    }
                }
                scalar => self.encoder.put_scalar(scalar)?,
            }
        }
        Ok(())
    }

    fn write_hex(&mut self, value: u32, width: usize) -> Result<()> {
        for nibble in (0..width).rev() {
            self.put_control(HEX_DIGITS[((value >> (nibble * 4)) & 0xF) as usize])?;
        }
        Ok(())
    }

    fn put_control(&mut self, byte: u8) -> Result<()> {
        self.encoder.put_control(byte)
    }

    fn put_pair(&mut self, first: u8, second: u8) -> Result<()> {
        self.put_control(first)?;
        self.put_control(second)
    }
}

fn next_level(level: u8) -> u8 {
    if level < MAX_LEVEL {
        level + 1
    } else {
        level
    }
}

/// Scalars that disqualify a name from standing bare: the bare-word
/// exclusion set, control characters, surrogates.
fn scalar_needs_quote(scalar: u32) -> bool {
    if scalar < 0x24 {
        return scalar != u32::from(b'!');
    }
    if scalar < 0x3F {
        return scalar > 0x39 || scalar == u32::from(b'\'') || scalar == u32::from(b',');
    }
    is_surrogate(scalar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodingKind;
    use crate::items::Item;

    fn render(list: &ItemList, flags: Flags) -> Vec<u8> {
        let mut out = Vec::new();
        let encoder = Encoder::new(&mut out, EncodingKind::Utf8, false);
        let mut err = ErrorContext::default();
        write(list, encoder, flags, &mut err).expect("write");
        out
    }

    fn singlet(name: &str) -> ItemRef {
        Item::singlet_named(name)
    }

    #[test]
    fn compact_output() {
        let mut list = ItemList::new();
        let group = Item::group_named("g");
        group
            .borrow_mut()
            .as_group_mut()
            .unwrap()
            .children_mut()
            .push(Item::keyed_value_pair("k", "v"));
        list.push(group);
        list.push(Item::spacer());
        list.push(singlet("s"));

        let out = render(&list, Flags::DISABLE_SPACERS | Flags::DISABLE_COMMENTS);
        assert_eq!(out, b"<g:k=v;>s;");
    }

    #[test]
    fn auto_spacing_indents_by_nesting() {
        let mut list = ItemList::new();
        let group = Item::group_named("g");
        group
            .borrow_mut()
            .as_group_mut()
            .unwrap()
            .children_mut()
            .push(Item::keyed_value_pair("k", "v"));
        list.push(group);

        let out = render(&list, Flags::AUTO_SPACING);
        assert_eq!(out, b"\n<g:\n\tk = v;\n>\n");
    }

    #[test]
    fn auto_spacing_wins_over_disable_spacers() {
        let mut list = ItemList::new();
        list.push(singlet("a"));
        let auto_only = render(&list, Flags::AUTO_SPACING);
        let both = render(&list, Flags::AUTO_SPACING | Flags::DISABLE_SPACERS);
        assert_eq!(auto_only, both);
    }

    #[test]
    fn stored_spacing_reproduced() {
        let mut list = ItemList::new();
        let kv = Item::keyed_value_pair("k", "v");
        {
            let mut borrowed = kv.borrow_mut();
            let body = borrowed.as_keyed_value_mut().unwrap();
            body.pre_space.set(b" ");
            body.mid_space.set(b"\t");
        }
        list.push(kv);
        let out = render(&list, Flags::empty());
        assert_eq!(out, b"k =\tv;");
    }

    #[test]
    fn consecutive_spacers_merge() {
        let mut list = ItemList::new();
        let first = Item::spacer();
        first.borrow_mut().as_spacer_mut().unwrap().set_spacing(1, b"  ");
        let second = Item::spacer();
        second.borrow_mut().as_spacer_mut().unwrap().set_spacing(1, b"\t");
        list.push(first);
        list.push(second);
        list.push(singlet("a"));

        let out = render(&list, Flags::empty());
        // The first spacer keeps only its newline; its horizontal tail is
        // dropped in favor of the second spacer's.
        assert_eq!(out, b"\n\n\ta;");
    }

    #[test]
    fn names_quote_when_needed() {
        let mut list = ItemList::new();
        list.push(singlet("plain"));
        list.push(singlet("needs space"));
        list.push(singlet(""));
        let out = render(&list, Flags::AUTO_QUOTE);
        assert_eq!(out, b"plain;'needs space';'';");
    }

    #[test]
    fn stored_quote_mode_honored() {
        let mut list = ItemList::new();
        let item = singlet("word");
        item.borrow_mut()
            .as_singlet_mut()
            .unwrap()
            .set_quote_mode(QuoteMode::DoubleQuoted);
        list.push(item);
        let out = render(&list, Flags::empty());
        assert_eq!(out, b"\"word\";");
    }

    #[test]
    fn escape_emission() {
        let mut list = ItemList::new();
        let item = Item::singlet();
        {
            let mut borrowed = item.borrow_mut();
            let body = borrowed.as_singlet_mut().unwrap();
            let mut name = Utf32String::new();
            name.push(0x0A);
            name.push(u32::from(b'^'));
            name.push(0x01);
            name.push(0xD812); // surrogate half
            body.set_name(name);
            body.set_quote_mode(QuoteMode::SingleQuoted);
        }
        list.push(item);
        let out = render(&list, Flags::empty());
        assert_eq!(out, b"'^n^^^01^uD812';");
    }

    #[test]
    fn comment_splitting_terminates_each_line() {
        let mut list = ItemList::new();
        list.push(Item::comment_with_text("one\ntwo"));
        let out = render(&list, Flags::empty());
        assert_eq!(out, b"#one\n#two\n");
    }

    #[test]
    fn auto_comment_inline_vs_own_line() {
        let mut list = ItemList::new();
        let item = singlet("a");
        item.borrow_mut().set_position(3, 1);
        list.push(item);
        let inline = Item::comment_with_text(" tail");
        inline.borrow_mut().set_position(3, 4);
        list.push(inline);
        let own_line = Item::comment_with_text(" alone");
        own_line.borrow_mut().set_position(5, 1);
        list.push(own_line);

        let out = render(&list, Flags::AUTO_SPACING);
        assert_eq!(out, b"\na; # tail\n# alone\n");
    }

    #[test]
    fn deep_nesting_caps_indentation() {
        let mut list = ItemList::new();
        let mut current = Item::group_named("g0");
        list.push(current.clone());
        for depth in 1..14 {
            let child = Item::group_named(&format!("g{depth}"));
            current
                .borrow_mut()
                .as_group_mut()
                .unwrap()
                .children_mut()
                .push(child.clone());
            current = child;
        }
        current
            .borrow_mut()
            .as_group_mut()
            .unwrap()
            .children_mut()
            .push(singlet("leaf"));

        let out = render(&list, Flags::AUTO_SPACING);
        let text = String::from_utf8(out).unwrap();
        let max_tabs = text
            .lines()
            .map(|line| line.chars().take_while(|&c| c == '\t').count())
            .max()
            .unwrap();
        assert_eq!(max_tabs, 10);
    }
}
