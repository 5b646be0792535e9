//! Property-based tests for the round-trip guarantees.
//!
//! These complement the scenario tests by checking the format invariants
//! across generated documents: serialize/parse/serialize is a fixpoint,
//! escapes are idempotent, and parsed positions never run backwards.

use proptest::prelude::*;
use scef::{
    from_bytes, to_vec, Document, EncodingKind, Flags, Item, ItemList, ItemRef, QuoteMode,
};

#[derive(Debug, Clone)]
enum Node {
    Singlet(String, u8),
    Keyed(String, String, u8, u8),
    Comment(String),
    Group(String, u8, Vec<Node>),
}

fn quote_mode(selector: u8) -> QuoteMode {
    match selector % 3 {
        0 => QuoteMode::Standard,
        1 => QuoteMode::SingleQuoted,
        _ => QuoteMode::DoubleQuoted,
    }
}

fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..10).prop_map(String::from_iter)
}

fn comment_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        any::<char>().prop_filter("no controls in comments", |c| *c >= ' ' || *c == '\t'),
        0..10,
    )
    .prop_map(String::from_iter)
}

fn node() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        (text(), any::<u8>()).prop_map(|(name, q)| Node::Singlet(name, q)),
        (text(), text(), any::<u8>(), any::<u8>())
            .prop_map(|(name, value, q, vq)| Node::Keyed(name, value, q, vq)),
        comment_text().prop_map(Node::Comment),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        (text(), any::<u8>(), prop::collection::vec(inner, 0..4))
            .prop_map(|(name, q, children)| Node::Group(name, q, children))
    })
}

fn build_item(node: &Node) -> ItemRef {
    match node {
        Node::Singlet(name, q) => {
            let item = Item::singlet_named(name);
            item.borrow_mut()
                .as_singlet_mut()
                .unwrap()
                .set_quote_mode(quote_mode(*q));
            item
        }
        Node::Keyed(name, value, q, vq) => {
            let item = Item::keyed_value_pair(name, value);
            {
                let mut borrowed = item.borrow_mut();
                let kv = borrowed.as_keyed_value_mut().unwrap();
                kv.set_quote_mode(quote_mode(*q));
                kv.set_value_quote_mode(quote_mode(*vq));
            }
            item
        }
        Node::Comment(text) => Item::comment_with_text(text),
        Node::Group(name, q, children) => {
            let item = Item::group_named(name);
            {
                let mut borrowed = item.borrow_mut();
                let group = borrowed.as_group_mut().unwrap();
                group.set_quote_mode(quote_mode(*q));
                for child in children {
                    group.children_mut().push(build_item(child));
                }
            }
            item
        }
    }
}

fn build_document(nodes: &[Node]) -> Document {
    let mut doc = Document::new();
    for node in nodes {
        doc.root_mut().push(build_item(node));
    }
    doc
}

/// Compares payload structure: kinds, names, values, comment text.
/// Quoting may canonicalize across a round trip, spacing may not exist,
/// so neither participates.
fn same_shape(a: &ItemList, b: &ItemList) -> bool {
    if a.len() != b.len() {
        return false;
    }
    for (left, right) in a.iter().zip(b.iter()) {
        let left = left.borrow();
        let right = right.borrow();
        if left.kind() != right.kind() {
            return false;
        }
        let matches = match (left.body(), right.body()) {
            (scef::ItemBody::Singlet(l), scef::ItemBody::Singlet(r)) => l.name() == r.name(),
            (scef::ItemBody::KeyedValue(l), scef::ItemBody::KeyedValue(r)) => {
                l.name() == r.name() && l.value() == r.value()
            }
            (scef::ItemBody::Comment(l), scef::ItemBody::Comment(r)) => l.text() == r.text(),
            (scef::ItemBody::Group(l), scef::ItemBody::Group(r)) => {
                l.name() == r.name() && same_shape(l.children(), r.children())
            }
            (scef::ItemBody::Spacer(l), scef::ItemBody::Spacer(r)) => {
                l.lines() == r.lines() && l.flat_spacing() == r.flat_spacing()
            }
            _ => false,
        };
        if !matches {
            return false;
        }
    }
    true
}

fn assert_monotonic(list: &ItemList) {
    let mut last = (0u64, 0u64);
    for item in list.iter() {
        let borrowed = item.borrow();
        let pos = (borrowed.position().line, borrowed.position().column);
        assert!(pos >= last, "positions regressed: {last:?} -> {pos:?}");
        last = pos;
        if let Some(group) = borrowed.as_group() {
            assert_monotonic(group.children());
        }
    }
}

proptest! {
    #[test]
    fn serialize_parse_serialize_is_a_fixpoint(nodes in prop::collection::vec(node(), 0..6)) {
        let mut doc = build_document(&nodes);
        let first = to_vec(&mut doc, Flags::empty(), EncodingKind::Utf8).unwrap();

        let (mut reloaded, result) = from_bytes(&first, Flags::empty());
        prop_assert_eq!(result, Ok(()));
        prop_assert!(same_shape(doc.root(), reloaded.root()));

        let second = to_vec(&mut reloaded, Flags::empty(), EncodingKind::Utf8).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn quoted_text_roundtrips_exactly(name in text(), selector in any::<u8>()) {
        let mut doc = Document::new();
        let item = Item::singlet_named(&name);
        item.borrow_mut()
            .as_singlet_mut()
            .unwrap()
            .set_quote_mode(quote_mode(selector));
        doc.root_mut().push(item);

        let bytes = to_vec(&mut doc, Flags::empty(), EncodingKind::Utf8).unwrap();
        let (reloaded, result) = from_bytes(&bytes, Flags::empty());
        prop_assert_eq!(result, Ok(()));
        prop_assert_eq!(reloaded.root().len(), 1);
        let reparsed = reloaded.root().get(0).unwrap().borrow();
        prop_assert_eq!(reparsed.as_singlet().unwrap().name(), &scef::Utf32String::from(name.as_str()));
    }

    #[test]
    fn positions_never_regress(nodes in prop::collection::vec(node(), 0..6)) {
        let mut doc = build_document(&nodes);
        let bytes = to_vec(&mut doc, Flags::AUTO_SPACING, EncodingKind::Utf8).unwrap();
        let (reloaded, result) = from_bytes(&bytes, Flags::empty());
        prop_assert_eq!(result, Ok(()));
        assert_monotonic(reloaded.root());
    }

    #[test]
    fn every_encoding_preserves_the_tree(nodes in prop::collection::vec(node(), 0..4)) {
        let mut doc = build_document(&nodes);
        for encoding in [
            EncodingKind::Utf8,
            EncodingKind::Utf16Le,
            EncodingKind::Utf16Be,
            EncodingKind::Ucs4Le,
            EncodingKind::Ucs4Be,
        ] {
            let bytes = to_vec(&mut doc, Flags::empty(), encoding).unwrap();
            let (reloaded, result) = from_bytes(&bytes, Flags::empty());
            prop_assert_eq!(result, Ok(()), "{:?}", encoding);
            prop_assert!(same_shape(doc.root(), reloaded.root()), "{:?}", encoding);
        }
    }

    #[test]
    fn no_emitted_spacer_is_empty(nodes in prop::collection::vec(node(), 0..6)) {
        let mut doc = build_document(&nodes);
        let bytes = to_vec(&mut doc, Flags::AUTO_SPACING, EncodingKind::Utf8).unwrap();
        let (reloaded, result) = from_bytes(&bytes, Flags::empty());
        prop_assert_eq!(result, Ok(()));

        fn check(list: &ItemList) {
            for item in list.iter() {
                let borrowed = item.borrow();
                if let Some(spacer) = borrowed.as_spacer() {
                    assert!(spacer.lines() > 0 || !spacer.flat_spacing().is_empty());
                }
                if let Some(group) = borrowed.as_group() {
                    check(group.children());
                }
            }
        }
        check(reloaded.root());
    }
}
