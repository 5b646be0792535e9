use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scef::{from_bytes, to_vec, EncodingKind, Flags};

/// Builds a realistic configuration document with `groups` top-level
/// groups of `keys` keyed values each, commented and indented.
fn sample_document(groups: usize, keys: usize) -> Vec<u8> {
    let mut text = String::from("!SCEF:V=1\n");
    for g in 0..groups {
        text.push_str(&format!("# section {g}\n<section_{g}:\n"));
        for k in 0..keys {
            text.push_str(&format!("\tkey_{k} = value_{g}_{k};\n"));
        }
        text.push_str("\t'quoted name' = \"quoted value\";\n>\n");
    }
    text.into_bytes()
}

fn benchmark_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for size in [4usize, 16, 64].iter() {
        let bytes = sample_document(*size, 16);
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| from_bytes(black_box(bytes), Flags::empty()))
        });
    }
    group.finish();
}

fn benchmark_parse_stripped(c: &mut Criterion) {
    let bytes = sample_document(16, 16);
    c.bench_function("parse_no_cosmetics", |b| {
        b.iter(|| {
            from_bytes(
                black_box(&bytes),
                Flags::DISABLE_SPACERS | Flags::DISABLE_COMMENTS,
            )
        })
    });
}

fn benchmark_serialize(c: &mut Criterion) {
    let bytes = sample_document(16, 16);
    let (mut doc, result) = from_bytes(&bytes, Flags::empty());
    result.expect("benchmark document parses");

    c.bench_function("serialize_stored", |b| {
        b.iter(|| to_vec(black_box(&mut doc), Flags::empty(), EncodingKind::Utf8))
    });

    c.bench_function("serialize_auto", |b| {
        b.iter(|| {
            to_vec(
                black_box(&mut doc),
                Flags::AUTO_SPACING | Flags::AUTO_QUOTE,
                EncodingKind::Utf8,
            )
        })
    });
}

fn benchmark_wide_encodings(c: &mut Criterion) {
    let bytes = sample_document(8, 8);
    let (mut doc, result) = from_bytes(&bytes, Flags::empty());
    result.expect("benchmark document parses");
    let utf16 = to_vec(&mut doc, Flags::empty(), EncodingKind::Utf16Le).unwrap();

    c.bench_function("parse_utf16le", |b| {
        b.iter(|| from_bytes(black_box(&utf16), Flags::empty()))
    });
}

criterion_group!(
    benches,
    benchmark_parse,
    benchmark_parse_stripped,
    benchmark_serialize,
    benchmark_wide_encodings
);
criterion_main!(benches);
