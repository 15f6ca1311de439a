//! Unit tests for chunk-boundary independence of the inbound pipeline.
//!
//! The same bytes must produce the same snapshots and the same refusal
//! replies however the socket happens to split them.

use bytes::BytesMut;
use onyx_link::accumulator::PollAccumulator;
use onyx_link::models::cuelist::ActiveCuelistSet;
use onyx_link::telnet::codec::ConsoleCodec;
use onyx_link::telnet::negotiator::{DO, DONT, IAC, SB, SE, WILL, WONT};
use tokio_util::codec::Decoder;

/// Run `chunks` through a fresh codec and accumulator.
fn run(chunks: &[&[u8]]) -> (Vec<Vec<u32>>, Vec<u8>) {
    let mut codec = ConsoleCodec::new();
    let mut acc = PollAccumulator::default();
    let mut snapshots = Vec::new();
    let mut replies = Vec::new();

    for chunk in chunks {
        let mut buf = BytesMut::from(*chunk);
        if let Some(decoded) = codec.decode(&mut buf).expect("decode") {
            replies.extend(decoded.replies);
            snapshots.extend(acc.push(&decoded.text).iter().map(ActiveCuelistSet::to_vec));
        }
    }
    (snapshots, replies)
}

fn stream() -> Vec<u8> {
    let mut bytes = vec![IAC, WILL, 1, IAC, DO, 3];
    bytes.extend_from_slice(b"200 Ok\r\n00005Main");
    bytes.extend_from_slice(&[IAC, SB, 24, 1, IAC, SE]);
    bytes.extend_from_slice(b" Stage\r\n000");
    bytes.extend_from_slice(&[IAC, WONT, 5]);
    bytes.extend_from_slice(b"12House\r\n.\r\n");
    bytes
}

#[test]
fn whole_stream_yields_reference_result() {
    let bytes = stream();
    let (snapshots, replies) = run(&[bytes.as_slice()]);

    assert_eq!(snapshots, vec![vec![5, 12]]);
    assert_eq!(replies, vec![IAC, DONT, 1, IAC, WONT, 3]);
}

#[test]
fn every_two_way_split_gives_same_result() {
    let bytes = stream();
    let expected = run(&[bytes.as_slice()]);

    for cut in 0..=bytes.len() {
        let (head, tail) = bytes.split_at(cut);
        assert_eq!(run(&[head, tail]), expected, "split at {cut}");
    }
}

#[test]
fn byte_at_a_time_gives_same_result() {
    let bytes = stream();
    let expected = run(&[bytes.as_slice()]);

    let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
    assert_eq!(run(&chunks), expected);
}

#[test]
fn escaped_iac_survives_as_data() {
    let (snapshots, replies) = run(&[&[b'0', b'0', b'0', b'0', b'9', IAC, IAC][..], &b"\r\n.\r\n"[..]]);

    assert_eq!(snapshots, vec![vec![9]]);
    assert!(replies.is_empty());
}
