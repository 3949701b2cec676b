//! Integration tests for the v2 framing decoder.

use bytes::Bytes;
use longeron_core::arena::RecvArena;
use longeron_core::buffer::RecvQueue;
use longeron_core::msg::Msg;
use longeron_zmtp::decoder::{DecoderOptions, V2Decoder};
use longeron_zmtp::error::ZmtpError;
use longeron_zmtp::utils::{encode_frame, WIRE_COMMAND, WIRE_MORE};
use proptest::prelude::*;

fn queue_from(bytes: &[u8]) -> RecvQueue {
    let mut q = RecvQueue::new();
    q.push(Bytes::copy_from_slice(bytes));
    q
}

fn drain(decoder: &mut V2Decoder, src: &mut RecvQueue) -> Vec<Msg> {
    let mut out = Vec::new();
    while let Some(msg) = decoder.decode(src).expect("well-formed input") {
        out.push(msg);
    }
    out
}

/// Decode `wire` with each segment cut to `chunk` bytes.
fn drain_chunked(wire: &[u8], chunk: usize) -> Vec<Msg> {
    let mut decoder = V2Decoder::new(DecoderOptions::default());
    let mut q = RecvQueue::new();
    let mut out = Vec::new();
    for piece in wire.chunks(chunk) {
        q.push(Bytes::copy_from_slice(piece));
        out.extend(drain(&mut decoder, &mut q));
    }
    out
}

#[test]
fn short_frame() {
    let wire = hex::decode("000548656c6c6f").unwrap();
    let msgs = drain(
        &mut V2Decoder::new(DecoderOptions::default()),
        &mut queue_from(&wire),
    );

    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].flags(), 0);
    assert_eq!(msgs[0].data(), b"Hello");
}

#[test]
fn two_frames_first_with_more() {
    let wire = hex::decode("010341424300024445").unwrap();
    let msgs = drain(
        &mut V2Decoder::new(DecoderOptions::default()),
        &mut queue_from(&wire),
    );

    assert_eq!(msgs.len(), 2);
    assert!(msgs[0].more());
    assert_eq!(msgs[0].data(), b"ABC");
    assert!(!msgs[1].more());
    assert_eq!(msgs[1].data(), b"DE");
}

#[test]
fn large_form_with_small_size_is_tolerated() {
    let wire = hex::decode("02000000000000000548656c6c6f").unwrap();
    let msgs = drain(
        &mut V2Decoder::new(DecoderOptions::default()),
        &mut queue_from(&wire),
    );

    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].flags(), 0);
    assert_eq!(msgs[0].data(), b"Hello");
}

#[test]
fn command_frame() {
    let wire = hex::decode("04012a").unwrap();
    let msgs = drain(
        &mut V2Decoder::new(DecoderOptions::default()),
        &mut queue_from(&wire),
    );

    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].is_command());
    assert!(!msgs[0].more());
    assert_eq!(msgs[0].data(), &[0x2a]);
}

#[test]
fn empty_payload_applies_flags() {
    let wire = hex::decode("01000000").unwrap();
    let msgs = drain(
        &mut V2Decoder::new(DecoderOptions::default()),
        &mut queue_from(&wire),
    );

    assert_eq!(msgs.len(), 2);
    assert!(msgs[0].more());
    assert_eq!(msgs[0].size(), 0);
    assert_eq!(msgs[1].flags(), 0);
    assert_eq!(msgs[1].size(), 0);
}

#[test]
fn reserved_flag_bits_are_ignored() {
    // 0xF8 are undefined in v2; a peer setting them is not an error.
    let mut wire = vec![0xF8 | WIRE_MORE];
    wire.extend_from_slice(&[0x02, b'o', b'k']);
    let msgs = drain(
        &mut V2Decoder::new(DecoderOptions::default()),
        &mut queue_from(&wire),
    );

    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].flags(), Msg::MORE);
    assert_eq!(msgs[0].data(), b"ok");
}

#[test]
fn size_255_short_form_and_256_large_form() {
    let small = vec![0xaa; 255];
    let big = vec![0xbb; 256];
    let mut wire = encode_frame(0, &small).to_vec();
    wire.extend_from_slice(&encode_frame(0, &big));

    let msgs = drain(
        &mut V2Decoder::new(DecoderOptions::default()),
        &mut queue_from(&wire),
    );

    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].data(), &small[..]);
    assert_eq!(msgs[1].data(), &big[..]);
}

#[test]
fn max_msg_size_boundary() {
    let opts = DecoderOptions::default().with_max_msg_size(Some(16));

    // Exactly at the limit: accepted.
    let wire = encode_frame(0, &[0x11; 16]);
    let msgs = drain(&mut V2Decoder::new(opts.clone()), &mut queue_from(&wire));
    assert_eq!(msgs[0].size(), 16);

    // One past the limit: rejected.
    let wire = encode_frame(0, &[0x11; 17]);
    let err = V2Decoder::new(opts)
        .decode(&mut queue_from(&wire))
        .unwrap_err();
    assert_eq!(err, ZmtpError::TooLarge { size: 17, max: 16 });
}

#[test]
fn decoder_is_resettable_after_too_large() {
    let mut decoder =
        V2Decoder::new(DecoderOptions::default().with_max_msg_size(Some(8)));

    let wire = encode_frame(0, &[0x22; 9]);
    assert!(decoder.decode(&mut queue_from(&wire)).is_err());

    decoder.reset();
    assert!(!decoder.has_more());

    let wire = encode_frame(WIRE_COMMAND, b"ok");
    let msgs = drain(&mut decoder, &mut queue_from(&wire));
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].data(), b"ok");
}

#[test]
fn absurd_size_claim_fails_cleanly() {
    // 8-byte size of u64::MAX: the reservation must fail, not abort.
    let mut wire = vec![0x02];
    wire.extend_from_slice(&u64::MAX.to_be_bytes());

    let err = V2Decoder::new(DecoderOptions::default())
        .decode(&mut queue_from(&wire))
        .unwrap_err();
    assert!(matches!(
        err,
        ZmtpError::OutOfMemory(_) | ZmtpError::TooLarge { .. }
    ));
}

#[test]
fn byte_at_a_time_equals_all_at_once() {
    let mut wire = Vec::new();
    wire.extend_from_slice(&encode_frame(WIRE_MORE, b"ABC"));
    wire.extend_from_slice(&encode_frame(0, b""));
    wire.extend_from_slice(&encode_frame(WIRE_COMMAND, &[0x2a; 300]));
    wire.extend_from_slice(&encode_frame(0, b"tail"));

    let reference = drain_chunked(&wire, wire.len());
    for chunk in [1, 2, 3, 7, 64] {
        let got = drain_chunked(&wire, chunk);
        assert_eq!(got.len(), reference.len(), "chunk size {chunk}");
        for (a, b) in got.iter().zip(&reference) {
            assert_eq!(a.flags(), b.flags(), "chunk size {chunk}");
            assert_eq!(a.data(), b.data(), "chunk size {chunk}");
        }
    }
}

#[test]
fn partial_frame_reports_in_progress() {
    let mut decoder = V2Decoder::new(DecoderOptions::default());
    let mut q = queue_from(&[0x00, 0x05, b'H', b'e']);

    assert!(decoder.decode(&mut q).unwrap().is_none());
    assert!(decoder.has_more());

    q.push(Bytes::from_static(b"llo"));
    let msg = decoder.decode(&mut q).unwrap().unwrap();
    assert_eq!(msg.data(), b"Hello");
    assert!(!decoder.has_more());
}

#[test]
fn zero_copy_payload_points_into_the_arena() {
    let mut arena = RecvArena::new();
    let mut slab = arena.alloc(64);
    let wire = encode_frame(0, b"Hello");
    slab.write(&wire);
    let seg = slab.freeze();
    let range = seg.as_ptr() as usize..seg.as_ptr() as usize + seg.len();

    let mut q = RecvQueue::new();
    q.push(seg);
    let msg = V2Decoder::new(DecoderOptions::default())
        .decode(&mut q)
        .unwrap()
        .unwrap();

    assert!(msg.is_shared());
    assert_eq!(msg.data(), b"Hello");
    assert!(range.contains(&(msg.data().as_ptr() as usize)));
}

#[test]
fn zero_copy_disabled_yields_an_owned_copy() {
    let seg = encode_frame(0, b"Hello");
    let payload_ptr = seg.as_ptr() as usize + 2;

    let mut q = RecvQueue::new();
    q.push(seg);
    let msg = V2Decoder::new(DecoderOptions::default().with_zero_copy(false))
        .decode(&mut q)
        .unwrap()
        .unwrap();

    assert!(!msg.is_shared());
    assert_eq!(msg.data(), b"Hello");
    assert_ne!(msg.data().as_ptr() as usize, payload_ptr);
}

#[test]
fn straddling_payload_is_reassembled_not_shared() {
    // Frame split across two segments: the payload must be copied even
    // with zero-copy enabled, because the segments are different arena
    // fills.
    let wire = encode_frame(0, b"HelloWorld");
    let mut q = RecvQueue::new();
    q.push(Bytes::copy_from_slice(&wire[..6]));
    q.push(Bytes::copy_from_slice(&wire[6..]));

    let msg = V2Decoder::new(DecoderOptions::default())
        .decode(&mut q)
        .unwrap()
        .unwrap();

    assert!(!msg.is_shared());
    assert_eq!(msg.data(), b"HelloWorld");
}

#[test]
fn arena_refcount_returns_to_sentinel_after_close() {
    let mut arena = RecvArena::new();
    let mut slab = arena.alloc(64);
    let mut wire = encode_frame(0, b"one").to_vec();
    wire.extend_from_slice(&encode_frame(0, b"two"));
    slab.write(&wire);

    let mut q = RecvQueue::new();
    q.push(slab.freeze());

    let mut decoder = V2Decoder::new(DecoderOptions::default());
    let msgs = drain(&mut decoder, &mut q);
    assert_eq!(msgs.len(), 2);
    assert!(msgs.iter().all(Msg::is_shared));
    assert_eq!(arena.live_refs(), 2); // arena + the chunk owner

    drop(q);
    assert_eq!(arena.live_refs(), 2); // messages still pin the chunk

    drop(msgs);
    assert_eq!(arena.live_refs(), 1); // back to decoder-owned
}

proptest! {
    /// Any chunking of a well-formed stream yields the same messages.
    #[test]
    fn chunking_invariance(
        payloads in prop::collection::vec(
            (prop::collection::vec(any::<u8>(), 0..300), any::<bool>(), any::<bool>()),
            1..5,
        ),
        splits in prop::collection::vec(1usize..48, 1..16),
    ) {
        let mut wire = Vec::new();
        for (payload, more, command) in &payloads {
            let mut flags = 0;
            if *more {
                flags |= WIRE_MORE;
            }
            if *command {
                flags |= WIRE_COMMAND;
            }
            wire.extend_from_slice(&encode_frame(flags, payload));
        }

        let reference = drain_chunked(&wire, wire.len());
        prop_assert_eq!(reference.len(), payloads.len());

        let mut decoder = V2Decoder::new(DecoderOptions::default());
        let mut q = RecvQueue::new();
        let mut got = Vec::new();
        let mut offset = 0;
        let mut split_iter = splits.iter().cycle();
        while offset < wire.len() {
            let take = (*split_iter.next().unwrap()).min(wire.len() - offset);
            q.push(Bytes::copy_from_slice(&wire[offset..offset + take]));
            offset += take;
            got.extend(drain(&mut decoder, &mut q));
        }

        prop_assert_eq!(got.len(), reference.len());
        for (a, b) in got.iter().zip(&reference) {
            prop_assert_eq!(a.flags(), b.flags());
            prop_assert_eq!(a.data(), b.data());
        }
    }
}
