use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use plugin_tool_stream::limits::{MAX_CHUNK_BYTES, ReassemblyLimits};
use plugin_tool_stream::models::ToolInvokeMessage;
use plugin_tool_stream::streaming::{EventStreamDecoder, reassemble_iter};
use serde_json::json;
use std::hint::black_box;

fn chunked_blob(id: &str, total: usize) -> Vec<ToolInvokeMessage> {
    let piece = vec![0xABu8; MAX_CHUNK_BYTES];
    let count = total.div_ceil(MAX_CHUNK_BYTES);
    (0..count)
        .map(|i| ToolInvokeMessage::blob_chunk(id, total, piece.clone(), i + 1 == count))
        .collect()
}

fn benchmark_reassembly(c: &mut Criterion) {
    let total = 1024 * 1024;
    let messages = chunked_blob("bench", total);

    let mut group = c.benchmark_group("reassembly");
    group.throughput(Throughput::Bytes(total as u64));
    group.bench_function("one_mib_blob", |b| {
        b.iter(|| {
            let out: Vec<_> = reassemble_iter(
                messages.iter().cloned().map(Ok),
                ReassemblyLimits::default(),
            )
            .collect();
            black_box(out)
        });
    });
    group.finish();
}

fn benchmark_passthrough(c: &mut Criterion) {
    let messages: Vec<_> = (0..1000)
        .map(|i| ToolInvokeMessage::other("text", json!({ "text": format!("line {}", i) })))
        .collect();

    let mut group = c.benchmark_group("passthrough");
    group.throughput(Throughput::Elements(messages.len() as u64));
    group.bench_function("text_messages", |b| {
        b.iter(|| {
            let out: Vec<_> = reassemble_iter(
                messages.iter().cloned().map(Ok),
                ReassemblyLimits::default(),
            )
            .collect();
            black_box(out)
        });
    });
    group.finish();
}

fn benchmark_decoder(c: &mut Criterion) {
    let lines: String = chunked_blob("wire", 256 * 1024)
        .iter()
        .map(|m| {
            let envelope = json!({"code": 0, "message": "", "data": m});
            format!("data: {}\n\n", envelope)
        })
        .collect();
    let bytes = lines.into_bytes();

    let mut group = c.benchmark_group("decoder");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("blob_chunk_lines", |b| {
        b.iter(|| {
            let mut decoder = EventStreamDecoder::<ToolInvokeMessage>::new();
            for piece in bytes.chunks(4096) {
                black_box(decoder.feed(piece));
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_reassembly,
    benchmark_passthrough,
    benchmark_decoder
);
criterion_main!(benches);
