//! Fuzz target for DatArchive::open and entry classification.
//!
//! Opens arbitrary bytes as an archive and, when that succeeds, peeks and
//! classifies every entry the file table describes. Looks for panics or
//! hangs in the header parser and the dispatch validators.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use datscope::dat::{DatArchive, EntrySource};
use datscope::format::{FileReader, identify_file_type, resolve};
use datscope::index::categorize;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // The payloads themselves go straight to the classifier
    let file_type = identify_file_type(data);
    let _ = resolve(file_type, data);
    let _ = categorize(0, file_type, data);

    let Ok(mut archive) = DatArchive::open(Cursor::new(data)) else {
        return;
    };
    for entry_id in 0..archive.entry_count().min(1024) {
        if let Ok(head) = archive.peek_entry(entry_id, 256) {
            let hint = identify_file_type(&head);
            let kind = resolve(hint, &head);
            assert!(kind.accepts(&head));
            let reader = FileReader::for_data(head, hint);
            let _ = reader.image_header();
        }
    }
});
