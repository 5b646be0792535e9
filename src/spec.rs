//! SCEF Format Specification
//!
//! This module documents the SCEF (Structured Configuration Exchange
//! Format) text format as implemented by this library.
//!
//! # Overview
//!
//! SCEF is a hand-written configuration format. A document is an ordered
//! list of items; three kinds carry payload and two are cosmetic, so a
//! parser that keeps all five can reproduce the original file byte for
//! byte:
//!
//! | Item | Syntax | Purpose |
//! |------|--------|---------|
//! | Group | `<name: … >` | Named, nestable container |
//! | Singlet | `name;` | A lone value |
//! | Keyed value | `name = value;` | A key/value pair |
//! | Spacer | whitespace run | Preserved formatting |
//! | Comment | `# text` to end of line | Preserved commentary |
//!
//! # Header
//!
//! A document may begin with a single header line:
//!
//! ```text
//! !SCEF:V=1
//! ```
//!
//! Letters are case-insensitive and horizontal spacing may appear between
//! any two tokens (`  !  scef : v = 17  ` is valid). The version is 1–5
//! decimal digits, no leading zero, at most 65535. The line must end with
//! a line feed. A document without a header is parsed as the latest known
//! version unless the loader is told to require one.
//!
//! # Grammar (version 1)
//!
//! ```text
//! item        := group | singlet | keyed_value | comment | spacer
//! group       := '<' [spacing] [name] [spacing] ':' item* '>'
//! singlet     := name [spacing] (';' | ',')
//! keyed_value := name [spacing] '=' [spacing] value [spacing] (';' | ',')
//! comment     := '#' text-to-end-of-line LF
//! spacer      := one or more space/newline characters
//! name, value := bare_word | 'single quoted' | "double quoted"
//! ```
//!
//! `,` terminates a singlet or keyed value exactly like `;`. A `:` in
//! terminator position is tolerated with a warning.
//!
//! ## Bare words
//!
//! A bare word may not contain any of
//!
//! ```text
//! space  "  #  '  ,  :  ;  <  =  >
//! ```
//!
//! nor any control character below U+0020. The spacing-class controls
//! (HT, LF, VT, FF, CR) terminate the word; the remaining controls — the
//! *danger code points* — are fatal outside comments and quoted strings.
//!
//! ## Quoted strings
//!
//! Single-quoted strings run to the next `'`, double-quoted strings to
//! the next `"`, in both cases on the same line: a raw line feed inside a
//! quoted string is an error. `^` introduces an escape sequence:
//!
//! | Escape | Meaning |
//! |--------|---------|
//! | `^'` `^"` `^^` | The literal character |
//! | `^n` `^t` `^r` | LF, HT, CR |
//! | `^XX` | One byte, two hex digits |
//! | `^uXXXX` | A 16-bit code point |
//! | `^UXXXXXXXX` | A 32-bit code point |
//!
//! # Encodings
//!
//! Seven encodings are recognized, identified by the Byte-Order Mark:
//!
//! | Prefix | Encoding |
//! |--------|----------|
//! | `EF BB BF` | UTF-8 |
//! | `FE FF` | UTF-16 big-endian |
//! | `FF FE 00 00` | UCS-4 little-endian |
//! | `FF FE` (otherwise) | UTF-16 little-endian |
//! | `00 00 FE FF` | UCS-4 big-endian |
//! | anything else | ANSI, starting at offset 0 |
//!
//! ANSI is a raw byte stream assumed to be an ASCII superset; no
//! assumption is made about the upper half. Laxed decoding
//! ([`Flags::LAXED_ENCODING`](crate::Flags::LAXED_ENCODING)) additionally
//! admits scalars outside the Unicode range where the bit patterns allow
//! them.
//!
//! # Formatting on save
//!
//! With no flags set, stored spacing and comments are written back
//! verbatim. [`Flags::AUTO_SPACING`](crate::Flags::AUTO_SPACING) discards
//! stored spacing and indents by nesting depth with tabs (capped at ten
//! levels); [`Flags::AUTO_QUOTE`](crate::Flags::AUTO_QUOTE) re-derives
//! quoting, using bare names where possible and single quotes otherwise.
//! Names that cannot stand bare — empty, containing an excluded
//! character, or containing a scalar the target encoding cannot carry —
//! are written quoted with escapes.
//!
//! # Limitations
//!
//! - Values are uninterpreted text; numeric conversion is the caller's
//!   concern.
//! - Multi-line logical values are an application-level convention (use a
//!   list of values).
//! - One document per thread of execution; item handles are not `Send`.

// This module contains only documentation; no implementation code
