//! The in-memory document tree.
//!
//! A loaded document is an ordered list of items. Three item kinds carry
//! payload — [`Group`] (nestable, named container), [`Singlet`] (a lone
//! name), and [`KeyedValue`] (`name = value`) — and two are cosmetic:
//! [`Spacer`] (a preserved run of whitespace) and [`Comment`]. Keeping the
//! cosmetic kinds in the tree is what lets a load/save cycle reproduce the
//! original bytes.
//!
//! Items are shared handles ([`ItemRef`]), so a lookup like
//! [`ItemList::find_group_by_name`] returns a handle that stays valid while
//! the document lives, and the error context can point at the item that was
//! being built when something went wrong without owning it.
//!
//! ## Examples
//!
//! ```rust
//! use scef::{Item, ItemList, KindMask};
//!
//! let mut list = ItemList::new();
//! list.push(Item::singlet_named("alpha"));
//! list.push(Item::spacer());
//! list.push(Item::keyed_value_pair("key", "value"));
//!
//! assert_eq!(list.len(), 3);
//! // Filtered iteration skips the spacer.
//! assert_eq!(list.iter_masked(KindMask::BASIC).count(), 2);
//!
//! let key = list.find_key_by_name("key").unwrap();
//! assert_eq!(key.borrow().as_keyed_value().unwrap().value(), "value");
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::text::{is_space_no_lf, Utf32String};

/// How a name or value was quoted on load, or should be quoted on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteMode {
    /// No quotes. On save, falls back to single quotes when the text
    /// cannot stand bare.
    #[default]
    Standard,
    /// Single-quote marks: `'text'`.
    SingleQuoted,
    /// Double-quote marks: `"text"`.
    DoubleQuoted,
}

/// Discriminates the five item kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Named, nestable container.
    Group,
    /// A lone name terminated by `;` or `,`.
    Singlet,
    /// A `name = value;` pair.
    KeyedValue,
    /// A preserved run of whitespace.
    Spacer,
    /// A `#` comment running to end of line.
    Comment,
}

impl ItemKind {
    /// The mask bit selecting this kind in filtered iteration.
    #[must_use]
    pub const fn mask(self) -> KindMask {
        match self {
            ItemKind::Group => KindMask::GROUP,
            ItemKind::Singlet => KindMask::SINGLET,
            ItemKind::KeyedValue => KindMask::KEYED_VALUE,
            ItemKind::Spacer => KindMask::SPACER,
            ItemKind::Comment => KindMask::COMMENT,
        }
    }
}

bitflags::bitflags! {
    /// Selects item kinds for filtered iteration over an [`ItemList`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KindMask: u8 {
        /// Groups.
        const GROUP = 0x01;
        /// Singlets.
        const SINGLET = 0x02;
        /// Keyed values.
        const KEYED_VALUE = 0x04;
        /// Spacers.
        const SPACER = 0x10;
        /// Comments.
        const COMMENT = 0x20;
        /// The payload kinds: groups, singlets, keyed values.
        const BASIC = 0x07;
        /// The cosmetic kinds: spacers and comments.
        const COSMETIC = 0x30;
        /// Every kind.
        const ALL = 0xFF;
    }
}

/// Line/column of the character that opened an item. Both are 1-based; 0
/// means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// 1-based line.
    pub line: u64,
    /// 1-based column.
    pub column: u64,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(line: u64, column: u64) -> Self {
        Position { line, column }
    }
}

/// A run of horizontal spacing attached to an item (before or after a
/// name, around an `=` sign).
///
/// Setters sanitize: any byte that is not horizontal spacing becomes a
/// plain space, so a spacer can never smuggle structural characters into
/// the output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InlineSpace(Vec<u8>);

impl InlineSpace {
    /// Creates an empty run.
    #[must_use]
    pub fn new() -> Self {
        InlineSpace(Vec::new())
    }

    /// The spacing bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns `true` when no spacing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replaces the run, sanitizing non-spacing bytes to `' '`.
    pub fn set(&mut self, spacing: &[u8]) {
        self.0.clear();
        self.append(spacing);
    }

    /// Appends to the run, sanitizing non-spacing bytes to `' '`.
    pub fn append(&mut self, spacing: &[u8]) {
        self.0.extend(spacing.iter().map(|&b| {
            if is_space_no_lf(u32::from(b)) {
                b
            } else {
                b' '
            }
        }));
    }

    /// Removes all stored spacing.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub(crate) fn take_raw(&mut self, bytes: Vec<u8>) {
        self.0 = bytes;
    }
}

/// Named, nestable container delimited by `<` `:` … `>`.
#[derive(Debug, Default)]
pub struct Group {
    name: Utf32String,
    quote: QuoteMode,
    /// Spacing between `<` and the name.
    pub pre_space: InlineSpace,
    /// Spacing between the name and `:`.
    pub post_space: InlineSpace,
    children: ItemList,
}

impl Group {
    /// The group name.
    #[must_use]
    pub fn name(&self) -> &Utf32String {
        &self.name
    }

    /// Replaces the group name.
    pub fn set_name(&mut self, name: impl Into<Utf32String>) {
        self.name = name.into();
    }

    /// How the name was (or should be) quoted.
    #[must_use]
    pub fn quote_mode(&self) -> QuoteMode {
        self.quote
    }

    /// Requests a quoting mode for the name on save.
    pub fn set_quote_mode(&mut self, mode: QuoteMode) {
        self.quote = mode;
    }

    /// The group's child items.
    #[must_use]
    pub fn children(&self) -> &ItemList {
        &self.children
    }

    /// Mutable access to the group's child items.
    pub fn children_mut(&mut self) -> &mut ItemList {
        &mut self.children
    }
}

/// A lone name terminated by `;` or `,`.
#[derive(Debug, Default)]
pub struct Singlet {
    name: Utf32String,
    quote: QuoteMode,
    /// Spacing between the name and its terminator.
    pub post_space: InlineSpace,
}

impl Singlet {
    /// The singlet name.
    #[must_use]
    pub fn name(&self) -> &Utf32String {
        &self.name
    }

    /// Replaces the name.
    pub fn set_name(&mut self, name: impl Into<Utf32String>) {
        self.name = name.into();
    }

    /// How the name was (or should be) quoted.
    #[must_use]
    pub fn quote_mode(&self) -> QuoteMode {
        self.quote
    }

    /// Requests a quoting mode for the name on save.
    pub fn set_quote_mode(&mut self, mode: QuoteMode) {
        self.quote = mode;
    }
}

/// A `name = value;` pair. The trailing `;` is implicit.
#[derive(Debug, Default)]
pub struct KeyedValue {
    name: Utf32String,
    quote: QuoteMode,
    value: Utf32String,
    value_quote: QuoteMode,
    value_column: u64,
    /// Spacing between the name and `=`.
    pub pre_space: InlineSpace,
    /// Spacing between `=` and the value.
    pub mid_space: InlineSpace,
    /// Spacing between the value and `;`.
    pub post_space: InlineSpace,
}

impl KeyedValue {
    /// The key name.
    #[must_use]
    pub fn name(&self) -> &Utf32String {
        &self.name
    }

    /// Replaces the key name.
    pub fn set_name(&mut self, name: impl Into<Utf32String>) {
        self.name = name.into();
    }

    /// How the key was (or should be) quoted.
    #[must_use]
    pub fn quote_mode(&self) -> QuoteMode {
        self.quote
    }

    /// Requests a quoting mode for the key on save.
    pub fn set_quote_mode(&mut self, mode: QuoteMode) {
        self.quote = mode;
    }

    /// The value text.
    #[must_use]
    pub fn value(&self) -> &Utf32String {
        &self.value
    }

    /// Replaces the value text.
    pub fn set_value(&mut self, value: impl Into<Utf32String>) {
        self.value = value.into();
    }

    /// How the value was (or should be) quoted.
    #[must_use]
    pub fn value_quote_mode(&self) -> QuoteMode {
        self.value_quote
    }

    /// Requests a quoting mode for the value on save.
    pub fn set_value_quote_mode(&mut self, mode: QuoteMode) {
        self.value_quote = mode;
    }

    /// Column of the first value character (1-based; 0 when unset).
    #[must_use]
    pub fn value_column(&self) -> u64 {
        self.value_column
    }

    /// Records the column of the first value character.
    pub fn set_value_column(&mut self, column: u64) {
        self.value_column = column;
    }
}

/// A preserved run of whitespace: a newline count plus the horizontal tail
/// after the last newline.
///
/// On save, contiguous spacers merge, spacing at end of file is
/// suppressed, and horizontal spacing immediately before a line break is
/// suppressed.
#[derive(Debug, Default)]
pub struct Spacer {
    lines: u64,
    space: Vec<u8>,
}

impl Spacer {
    /// Number of newlines in the run.
    #[must_use]
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Horizontal spacing after the last newline.
    #[must_use]
    pub fn flat_spacing(&self) -> &[u8] {
        &self.space
    }

    /// Replaces the run, sanitizing non-spacing bytes to `' '`.
    pub fn set_spacing(&mut self, lines: u64, spacing: &[u8]) {
        self.lines = lines;
        self.space.clear();
        self.space.extend(spacing.iter().map(|&b| {
            if is_space_no_lf(u32::from(b)) {
                b
            } else {
                b' '
            }
        }));
    }

    /// Removes all stored spacing.
    pub fn clear(&mut self) {
        self.lines = 0;
        self.space.clear();
    }

    pub(crate) fn take_raw(&mut self, lines: u64, space: Vec<u8>) {
        self.lines = lines;
        self.space = space;
    }
}

/// A `#` comment. The text never contains `\n`; the trailing newline is
/// implicit and re-added on save.
#[derive(Debug, Default)]
pub struct Comment {
    text: Utf32String,
}

impl Comment {
    /// The comment text, without the leading `#` or trailing newline.
    #[must_use]
    pub fn text(&self) -> &Utf32String {
        &self.text
    }

    /// Replaces the comment text.
    pub fn set_text(&mut self, text: impl Into<Utf32String>) {
        self.text = text.into();
    }
}

/// The payload of an [`Item`].
#[derive(Debug)]
pub enum ItemBody {
    /// See [`Group`].
    Group(Group),
    /// See [`Singlet`].
    Singlet(Singlet),
    /// See [`KeyedValue`].
    KeyedValue(KeyedValue),
    /// See [`Spacer`].
    Spacer(Spacer),
    /// See [`Comment`].
    Comment(Comment),
}

/// One entry of a document tree: a position plus a kind-specific body.
#[derive(Debug)]
pub struct Item {
    position: Position,
    body: ItemBody,
}

/// Shared handle to an item. Documents are single-threaded by design, so
/// handles are `Rc`-based and deliberately not `Send`.
pub type ItemRef = Rc<RefCell<Item>>;

/// Weak counterpart of [`ItemRef`], used by the error context.
pub type WeakItemRef = Weak<RefCell<Item>>;

impl Item {
    fn make(body: ItemBody) -> ItemRef {
        Rc::new(RefCell::new(Item {
            position: Position::default(),
            body,
        }))
    }

    /// Creates an empty group.
    #[must_use]
    pub fn group() -> ItemRef {
        Self::make(ItemBody::Group(Group::default()))
    }

    /// Creates a group with `name`.
    #[must_use]
    pub fn group_named(name: &str) -> ItemRef {
        let mut group = Group::default();
        group.set_name(name);
        Self::make(ItemBody::Group(group))
    }

    /// Creates an empty singlet.
    #[must_use]
    pub fn singlet() -> ItemRef {
        Self::make(ItemBody::Singlet(Singlet::default()))
    }

    /// Creates a singlet with `name`.
    #[must_use]
    pub fn singlet_named(name: &str) -> ItemRef {
        let mut singlet = Singlet::default();
        singlet.set_name(name);
        Self::make(ItemBody::Singlet(singlet))
    }

    /// Creates an empty keyed value.
    #[must_use]
    pub fn keyed_value() -> ItemRef {
        Self::make(ItemBody::KeyedValue(KeyedValue::default()))
    }

    /// Creates a keyed value with `name` and `value`.
    #[must_use]
    pub fn keyed_value_pair(name: &str, value: &str) -> ItemRef {
        let mut kv = KeyedValue::default();
        kv.set_name(name);
        kv.set_value(value);
        Self::make(ItemBody::KeyedValue(kv))
    }

    /// Creates an empty spacer.
    #[must_use]
    pub fn spacer() -> ItemRef {
        Self::make(ItemBody::Spacer(Spacer::default()))
    }

    /// Creates an empty comment.
    #[must_use]
    pub fn comment() -> ItemRef {
        Self::make(ItemBody::Comment(Comment::default()))
    }

    /// Creates a comment with `text`.
    #[must_use]
    pub fn comment_with_text(text: &str) -> ItemRef {
        let mut comment = Comment::default();
        comment.set_text(text);
        Self::make(ItemBody::Comment(comment))
    }

    /// The item's kind.
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self.body {
            ItemBody::Group(_) => ItemKind::Group,
            ItemBody::Singlet(_) => ItemKind::Singlet,
            ItemBody::KeyedValue(_) => ItemKind::KeyedValue,
            ItemBody::Spacer(_) => ItemKind::Spacer,
            ItemBody::Comment(_) => ItemKind::Comment,
        }
    }

    /// Position of the character that opened the item.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Records the item's source position.
    pub fn set_position(&mut self, line: u64, column: u64) {
        self.position = Position::new(line, column);
    }

    /// The kind-specific body.
    #[must_use]
    pub fn body(&self) -> &ItemBody {
        &self.body
    }

    /// Mutable access to the kind-specific body.
    pub fn body_mut(&mut self) -> &mut ItemBody {
        &mut self.body
    }

    /// Returns the group body, if this item is a group.
    #[must_use]
    pub fn as_group(&self) -> Option<&Group> {
        match &self.body {
            ItemBody::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Mutable variant of [`Item::as_group`].
    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.body {
            ItemBody::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Returns the singlet body, if this item is a singlet.
    #[must_use]
    pub fn as_singlet(&self) -> Option<&Singlet> {
        match &self.body {
            ItemBody::Singlet(singlet) => Some(singlet),
            _ => None,
        }
    }

    /// Mutable variant of [`Item::as_singlet`].
    pub fn as_singlet_mut(&mut self) -> Option<&mut Singlet> {
        match &mut self.body {
            ItemBody::Singlet(singlet) => Some(singlet),
            _ => None,
        }
    }

    /// Returns the keyed-value body, if this item is a keyed value.
    #[must_use]
    pub fn as_keyed_value(&self) -> Option<&KeyedValue> {
        match &self.body {
            ItemBody::KeyedValue(kv) => Some(kv),
            _ => None,
        }
    }

    /// Mutable variant of [`Item::as_keyed_value`].
    pub fn as_keyed_value_mut(&mut self) -> Option<&mut KeyedValue> {
        match &mut self.body {
            ItemBody::KeyedValue(kv) => Some(kv),
            _ => None,
        }
    }

    /// Returns the spacer body, if this item is a spacer.
    #[must_use]
    pub fn as_spacer(&self) -> Option<&Spacer> {
        match &self.body {
            ItemBody::Spacer(spacer) => Some(spacer),
            _ => None,
        }
    }

    /// Mutable variant of [`Item::as_spacer`].
    pub fn as_spacer_mut(&mut self) -> Option<&mut Spacer> {
        match &mut self.body {
            ItemBody::Spacer(spacer) => Some(spacer),
            _ => None,
        }
    }

    /// Returns the comment body, if this item is a comment.
    #[must_use]
    pub fn as_comment(&self) -> Option<&Comment> {
        match &self.body {
            ItemBody::Comment(comment) => Some(comment),
            _ => None,
        }
    }

    /// Mutable variant of [`Item::as_comment`].
    pub fn as_comment_mut(&mut self) -> Option<&mut Comment> {
        match &mut self.body {
            ItemBody::Comment(comment) => Some(comment),
            _ => None,
        }
    }
}

/// Ordered list of items; insertion order is document order.
#[derive(Debug, Default)]
pub struct ItemList(Vec<ItemRef>);

impl ItemList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        ItemList(Vec::new())
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the list holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The item at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ItemRef> {
        self.0.get(index)
    }

    /// Appends an item.
    pub fn push(&mut self, item: ItemRef) {
        self.0.push(item);
    }

    /// Removes all items.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Iterates over every item in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, ItemRef> {
        self.0.iter()
    }

    /// Iterates over the items whose kind is selected by `mask`.
    pub fn iter_masked(&self, mask: KindMask) -> impl Iterator<Item = &ItemRef> {
        self.0
            .iter()
            .filter(move |item| mask.intersects(item.borrow().kind().mask()))
    }

    /// First group whose name equals `name`.
    #[must_use]
    pub fn find_group_by_name(&self, name: &str) -> Option<ItemRef> {
        self.0
            .iter()
            .find(|item| {
                item.borrow()
                    .as_group()
                    .is_some_and(|group| *group.name() == *name)
            })
            .cloned()
    }

    /// First singlet whose name equals `name`.
    #[must_use]
    pub fn find_singlet_by_name(&self, name: &str) -> Option<ItemRef> {
        self.0
            .iter()
            .find(|item| {
                item.borrow()
                    .as_singlet()
                    .is_some_and(|singlet| *singlet.name() == *name)
            })
            .cloned()
    }

    /// First keyed value whose name equals `name`.
    #[must_use]
    pub fn find_key_by_name(&self, name: &str) -> Option<ItemRef> {
        self.0
            .iter()
            .find(|item| {
                item.borrow()
                    .as_keyed_value()
                    .is_some_and(|kv| *kv.name() == *name)
            })
            .cloned()
    }
}

impl<'a> IntoIterator for &'a ItemList {
    type Item = &'a ItemRef;
    type IntoIter = std::slice::Iter<'a, ItemRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_kinds() {
        assert_eq!(Item::group().borrow().kind(), ItemKind::Group);
        assert_eq!(Item::singlet().borrow().kind(), ItemKind::Singlet);
        assert_eq!(Item::keyed_value().borrow().kind(), ItemKind::KeyedValue);
        assert_eq!(Item::spacer().borrow().kind(), ItemKind::Spacer);
        assert_eq!(Item::comment().borrow().kind(), ItemKind::Comment);
    }

    #[test]
    fn inline_space_sanitizes() {
        let mut space = InlineSpace::new();
        space.set(b" \tx\r");
        assert_eq!(space.as_bytes(), b" \t \r");
    }

    #[test]
    fn spacer_sanitizes_and_counts_lines() {
        let mut item = Item::spacer();
        item.borrow_mut()
            .as_spacer_mut()
            .unwrap()
            .set_spacing(2, b"\t\nz");
        let borrowed = item.borrow();
        let spacer = borrowed.as_spacer().unwrap();
        assert_eq!(spacer.lines(), 2);
        assert_eq!(spacer.flat_spacing(), b"\t  ");
    }

    #[test]
    fn masked_iteration() {
        let mut list = ItemList::new();
        list.push(Item::group_named("g"));
        list.push(Item::spacer());
        list.push(Item::comment_with_text("c"));
        list.push(Item::singlet_named("s"));

        assert_eq!(list.iter_masked(KindMask::BASIC).count(), 2);
        assert_eq!(list.iter_masked(KindMask::COSMETIC).count(), 2);
        assert_eq!(list.iter_masked(KindMask::ALL).count(), 4);
        assert_eq!(list.iter_masked(KindMask::COMMENT).count(), 1);
    }

    #[test]
    fn find_by_name_matches_kind_and_name() {
        let mut list = ItemList::new();
        list.push(Item::singlet_named("shared"));
        list.push(Item::group_named("shared"));
        list.push(Item::keyed_value_pair("shared", "v"));

        let group = list.find_group_by_name("shared").unwrap();
        assert_eq!(group.borrow().kind(), ItemKind::Group);
        let singlet = list.find_singlet_by_name("shared").unwrap();
        assert_eq!(singlet.borrow().kind(), ItemKind::Singlet);
        let key = list.find_key_by_name("shared").unwrap();
        assert_eq!(key.borrow().kind(), ItemKind::KeyedValue);
        assert!(list.find_group_by_name("absent").is_none());
    }

    #[test]
    fn positions_are_stored() {
        let item = Item::singlet_named("x");
        item.borrow_mut().set_position(4, 2);
        assert_eq!(item.borrow().position(), Position::new(4, 2));
    }
}
