//! Behavior flags for loading and saving documents.
//!
//! A single [`Flags`] bitset drives both directions. Loading honors
//! `DISABLE_SPACERS`, `DISABLE_COMMENTS`, `LAXED_ENCODING`, and
//! `FORCE_HEADER`; saving honors `DISABLE_SPACERS`, `DISABLE_COMMENTS`,
//! `LAXED_ENCODING`, `AUTO_SPACING`, and `AUTO_QUOTE`. Flags that do not
//! apply to an operation are ignored by it.
//!
//! ## Examples
//!
//! ```rust
//! use scef::Flags;
//!
//! // Preserve everything (the default).
//! let keep_all = Flags::empty();
//!
//! // Reformat on save: drop stored spacing, indent automatically,
//! // re-derive quoting.
//! let tidy = Flags::AUTO_SPACING | Flags::AUTO_QUOTE;
//! assert!(tidy.contains(Flags::AUTO_QUOTE));
//!
//! // Refuse headerless documents on load.
//! let strict = Flags::FORCE_HEADER;
//! assert!(!strict.contains(Flags::AUTO_SPACING));
//! ```

bitflags::bitflags! {
    /// Load/save behavior flags.
    ///
    /// `DISABLE_SPACERS` and `AUTO_SPACING` are mutually exclusive in
    /// intent; when both are set, `AUTO_SPACING` wins.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u8 {
        /// Drop all spacing information. On load, spacing is consumed but
        /// no spacer items are produced; on save, stored spacing is not
        /// written.
        const DISABLE_SPACERS = 0x01;

        /// Drop all comments. On load, comments are consumed but no
        /// comment items are produced; on save, comment items are skipped.
        const DISABLE_COMMENTS = 0x02;

        /// Relax encoding rules. For example, UTF-8 scalars outside the
        /// Unicode range decode without error instead of reporting
        /// `BadEncoding`.
        const LAXED_ENCODING = 0x04;

        /// Save only: ignore stored spacing and emit newlines plus
        /// tab indentation derived from nesting depth.
        const AUTO_SPACING = 0x10;

        /// Save only: ignore stored quotation hints and pick the quoting
        /// each name actually needs.
        const AUTO_QUOTE = 0x20;

        /// Load only: fail with `NoHeader` when the document has no
        /// `!SCEF` header line.
        const FORCE_HEADER = 0x80;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_flags() {
        let flags = Flags::empty();
        assert!(!flags.contains(Flags::DISABLE_SPACERS));
        assert!(!flags.contains(Flags::AUTO_SPACING));
    }

    #[test]
    fn flags_combine() {
        let flags = Flags::DISABLE_SPACERS | Flags::DISABLE_COMMENTS;
        assert!(flags.contains(Flags::DISABLE_SPACERS));
        assert!(flags.contains(Flags::DISABLE_COMMENTS));
        assert!(!flags.contains(Flags::LAXED_ENCODING));
    }
}
