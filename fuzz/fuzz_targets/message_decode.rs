//! Fuzz target for chat line decoding
//!
//! Feeds arbitrary text to the decoder. Chat is shared with untrusted
//! players, so every input must either decode, be ignored, or return an
//! error.
//!
//! # Invariants
//!
//! - `decode` never panics
//! - Anything that decodes re-encodes to a line that decodes to the same
//!   message

#![no_main]

use libfuzzer_sys::fuzz_target;
use lootsync_proto::decode;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);

    if let Ok(Some(message)) = decode(&line) {
        let encoded = message.encode();
        match decode(&encoded) {
            Ok(Some(again)) => assert_eq!(again, message, "re-encoding changed {encoded:?}"),
            other => panic!("re-encoded line {encoded:?} failed to decode: {other:?}"),
        }
    }
});
