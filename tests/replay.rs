use bytes::Bytes;
use futures::{StreamExt, stream};
use plugin_tool_stream::{
    limits::ReassemblyLimits,
    models::{MessagePayload, ToolInvokeMessage},
    streaming::{EventStreamDecoder, decode_stream, reassemble_iter, reassemble_stream},
};
use serde_json::json;

const RECORDED: &[u8] = include_bytes!("fixtures/tool_invoke_stream.txt");

fn expected_image() -> Vec<u8> {
    (0..40).flat_map(|_| 0u8..=255).collect()
}

async fn replay(chunk_size: usize) -> Vec<ToolInvokeMessage> {
    let pieces: Vec<Result<Bytes, std::io::Error>> = RECORDED
        .chunks(chunk_size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();

    reassemble_stream(
        decode_stream(stream::iter(pieces)),
        ReassemblyLimits::default(),
    )
    .map(|r| r.unwrap())
    .collect()
    .await
}

#[tokio::test]
async fn test_recorded_stream_reassembles() {
    let out = replay(4096).await;

    let kinds: Vec<_> = out.iter().map(|m| m.kind().to_string()).collect();
    assert_eq!(kinds, vec!["text", "log", "blob", "blob", "json"]);

    let image = out[2].as_blob().unwrap();
    assert_eq!(image.len(), 10240);
    assert_eq!(image.as_ref(), expected_image().as_slice());
    assert_eq!(
        out[2].meta,
        Some(json!({"mime_type": "image/png", "filename": "chart.png"}))
    );

    let doc = out[3].as_blob().unwrap();
    assert_eq!(doc.as_ref(), "quarterly report\n".repeat(10).as_bytes());
}

#[tokio::test]
async fn test_network_split_does_not_change_output() {
    let coarse = replay(RECORDED.len()).await;
    let fine = replay(7).await;
    assert_eq!(coarse, fine);
}

#[tokio::test]
async fn test_passthrough_messages_verbatim() {
    let out = replay(1024).await;

    match &out[1].payload {
        MessagePayload::Other { kind, message } => {
            assert_eq!(kind, "log");
            assert_eq!(message["label"], "render");
        }
        other => panic!("expected log message, got {:?}", other),
    }
    assert_eq!(
        serde_json::to_value(&out[4]).unwrap(),
        json!({"type": "json", "message": {"json_object": {"rows": 3}}, "meta": null})
    );
}

#[test]
fn test_blocking_decode_and_reassemble() {
    let mut decoder = EventStreamDecoder::<ToolInvokeMessage>::new();
    let mut messages = decoder.feed(RECORDED);
    messages.extend(decoder.finish().transpose());
    assert_eq!(messages.len(), 8);

    let out: Vec<_> = reassemble_iter(messages, ReassemblyLimits::default())
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(out.len(), 5);
    assert!(out.iter().all(|m| !m.is_blob_chunk()));
}

#[tokio::test]
async fn test_daemon_error_keeps_earlier_messages_from_same_read() {
    let body = concat!(
        "data: {\"code\":0,\"message\":\"\",\"data\":{\"type\":\"text\",\"message\":{\"text\":\"before\"}}}\n",
        "data: {\"code\":-500,\"message\":\"boom\",\"data\":null}\n",
        "data: {\"code\":0,\"message\":\"\",\"data\":{\"type\":\"text\",\"message\":{\"text\":\"after\"}}}\n",
    );
    let pieces = vec![Ok::<_, std::io::Error>(Bytes::from_static(body.as_bytes()))];

    let out: Vec<_> = reassemble_stream(
        decode_stream(stream::iter(pieces)),
        ReassemblyLimits::default(),
    )
    .collect()
    .await;

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].as_ref().unwrap().kind(), "text");
    assert!(out[1].as_ref().unwrap_err().to_string().contains("boom"));
}
