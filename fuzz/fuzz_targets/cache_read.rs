//! Fuzz target for index cache deserialization.
//!
//! Any input must either fail with an error or produce a store that
//! serializes back to the same logical contents.
//!
//! Run with: cargo +nightly fuzz run cache_read

#![no_main]

use datscope::index::cache::{read_index, write_index};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(store) = read_index(data) else {
        return;
    };
    let mut bytes = Vec::new();
    if write_index(&mut bytes, &store).is_ok() {
        let again = read_index(&bytes[..]).expect("re-encoded cache must parse");
        assert!(again.same_contents(&store));
    }
});
