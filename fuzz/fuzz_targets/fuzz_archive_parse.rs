#![no_main]

use kres_rs::{validate_archive_bytes, Archive, ArchiveReader};
use libfuzzer_sys::fuzz_target;
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    // Whole-buffer decode - should never panic
    let _ = validate_archive_bytes(data);
    let _ = Archive::from_bytes(data.to_vec());

    // Lazy in-memory reader - should never panic
    if let Ok(mut reader) = ArchiveReader::from_bytes(data) {
        if let Ok(names) = reader.filenames() {
            for (id, name) in names {
                let _ = reader.extract_by_id(id);
                let _ = reader.read_file(&name);
            }
        }
        let _ = reader.contains("test.txt");
        let _ = reader.contains("../../../etc/passwd");
    }

    // Streaming path over the same bytes
    let mut temp_file = match NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };
    if temp_file.write_all(data).is_err() || temp_file.flush().is_err() {
        return;
    }
    let _ = Archive::load(temp_file.path());
});
