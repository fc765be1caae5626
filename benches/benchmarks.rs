//! Performance benchmarks for the wsock frame codec.
//!
//! Run with: `cargo bench`

use bytes::{Bytes, BytesMut};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use wsock::protocol::handshake::compute_accept_key;
use wsock::protocol::mask::{apply_mask, apply_mask_fast};
use wsock::protocol::{Frame, MessageAssembler, OpCode, Utf8Validator};
use wsock::{Limits, MessageFragmenter};

const KEY: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];
const SIZES: [usize; 3] = [10, 1024, 65536];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

// =============================================================================
// Frame Encoding / Decoding
// =============================================================================

fn bench_frame_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encoding");

    for size in SIZES {
        let frame = Frame::binary(vec![0xAB; size]);
        let masked = frame.clone().with_mask(KEY);
        let mut buf = BytesMut::with_capacity(size + 14);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("unmasked", size), &frame, |b, frame| {
            b.iter(|| {
                buf.clear();
                frame.encode(black_box(&mut buf));
            })
        });
        group.bench_with_input(BenchmarkId::new("masked", size), &masked, |b, frame| {
            b.iter(|| {
                buf.clear();
                frame.encode(black_box(&mut buf));
            })
        });
    }

    group.finish();
}

fn bench_frame_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decoding");
    let rt = runtime();

    for size in SIZES {
        let wire = Frame::binary(vec![0xAB; size]).with_mask(KEY).to_bytes();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("masked", size), &wire, |b, wire| {
            b.iter(|| {
                let mut reader = &wire[..];
                rt.block_on(Frame::decode(black_box(&mut reader), usize::MAX))
                    .unwrap()
            })
        });
    }

    group.finish();
}

// =============================================================================
// Masking
// =============================================================================

fn bench_masking(c: &mut Criterion) {
    let mut group = c.benchmark_group("masking");

    for size in [64, 1024, 65536] {
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(BenchmarkId::new("apply_mask", size), |b| {
            let mut data = vec![0xAB; size];
            b.iter(|| apply_mask(black_box(&mut data), KEY))
        });

        group.bench_function(BenchmarkId::new("apply_mask_fast", size), |b| {
            let mut data = vec![0xAB; size];
            b.iter(|| apply_mask_fast(black_box(&mut data), KEY))
        });
    }

    group.finish();
}

// =============================================================================
// UTF-8 / Handshake
// =============================================================================

fn bench_utf8(c: &mut Criterion) {
    let mut group = c.benchmark_group("utf8");
    let text = "Hello 世界 🌍 ".repeat(1024);
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("fragmented_1kb_chunks", |b| {
        b.iter(|| {
            let mut validator = Utf8Validator::new();
            let chunks: Vec<_> = text.as_bytes().chunks(1000).collect();
            let last = chunks.len() - 1;
            for (i, chunk) in chunks.into_iter().enumerate() {
                validator.feed(black_box(chunk), i == last).unwrap();
            }
        })
    });

    group.finish();
}

fn bench_handshake(c: &mut Criterion) {
    c.bench_function("compute_accept_key", |b| {
        b.iter(|| compute_accept_key(black_box("dGhlIHNhbXBsZSBub25jZQ==")))
    });
}

// =============================================================================
// Message Reassembly
// =============================================================================

fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassembly");
    let payload = Bytes::from(vec![0xAB; 65536]);
    group.throughput(Throughput::Bytes(65536));

    group.bench_function("single_frame_64kb", |b| {
        b.iter(|| {
            let mut assembler = MessageAssembler::new(Limits::default());
            let frame = Frame::new(true, OpCode::Binary, payload.clone()).with_mask(KEY);
            assembler.push(frame).unwrap()
        })
    });

    group.bench_function("16_fragments_64kb", |b| {
        b.iter(|| {
            let mut assembler = MessageAssembler::new(Limits::default());
            let mut last = None;
            for frame in MessageFragmenter::new(payload.clone(), OpCode::Binary, 4096).unwrap() {
                last = Some(assembler.push(frame.with_mask(KEY)).unwrap());
            }
            last
        })
    });

    group.finish();
}

// =============================================================================
// Criterion Setup
// =============================================================================

criterion_group!(
    benches,
    bench_frame_encoding,
    bench_frame_decoding,
    bench_masking,
    bench_utf8,
    bench_handshake,
    bench_reassembly
);

criterion_main!(benches);
