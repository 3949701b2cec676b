#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use longeron_core::buffer::RecvQueue;
use longeron_zmtp::decoder::{DecoderOptions, V2Decoder};
use longeron_zmtp::error::ZmtpError;

// Keep size claims bounded so oversized frames fail fast and
// deterministically instead of reserving fuzz-driven allocations.
const MAX_MSG_SIZE: usize = 1 << 20;

fuzz_target!(|data: &[u8]| {
    let Some((seed, stream)) = data.split_first() else {
        return;
    };

    // Reference run: the whole stream as one segment.
    let reference = run(stream, stream.len().max(1));

    // Chunked run: segment size derived from the seed byte.
    let step = (*seed as usize % 7) + 1;
    let chunked = run(stream, step);

    // Chunking must never change what the decoder produces.
    assert_eq!(reference, chunked);
});

type Outcome = (Vec<(u8, Vec<u8>)>, Option<ZmtpError>);

fn run(stream: &[u8], step: usize) -> Outcome {
    let mut decoder =
        V2Decoder::new(DecoderOptions::default().with_max_msg_size(Some(MAX_MSG_SIZE)));
    let mut q = RecvQueue::new();
    let mut out = Vec::new();

    for chunk in stream.chunks(step) {
        q.push(Bytes::copy_from_slice(chunk));
        loop {
            match decoder.decode(&mut q) {
                Ok(Some(msg)) => out.push((msg.flags(), msg.data().to_vec())),
                Ok(None) => break,
                Err(e) => return (out, Some(e)),
            }
        }
    }

    (out, None)
}
