//! Property tests for round trips, integrity and collision handling

use kres_rs::{validate_entry, Archive, ArchiveReader, Entry, KresError};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;

fn entries_strategy() -> impl Strategy<Value = Vec<Entry>> {
    btree_map("[a-z0-9_./-]{1,24}", vec(any::<u8>(), 0..256), 0..12).prop_map(|files| {
        files
            .into_iter()
            .map(|(name, data)| Entry::new(name, data).unwrap())
            .collect()
    })
}

proptest! {
    #[test]
    fn roundtrip_preserves_entries(
        entries in entries_strategy(),
        user in proptest::option::of(vec(any::<u8>(), 0..64)),
    ) {
        let archive = Archive::build(entries.clone(), user.as_deref()).unwrap();
        let parsed = Archive::from_bytes(archive.to_bytes()).unwrap();

        prop_assert_eq!(parsed.entries(), &entries[..]);
        prop_assert_eq!(parsed.user_data(), user.as_deref().unwrap_or_default());
        prop_assert_eq!(parsed.header().entry_count(), entries.len() as u64);
    }

    #[test]
    fn lazy_reader_matches_full_decode(entries in entries_strategy()) {
        let bytes = Archive::build(entries.clone(), None).unwrap().to_bytes();
        let mut reader = ArchiveReader::from_bytes(&bytes).unwrap();
        for entry in &entries {
            let extracted = reader.extract_by_id(entry.id()).unwrap();
            prop_assert_eq!(&extracted, entry);
        }
    }

    #[test]
    fn single_byte_flip_breaks_integrity(
        data in vec(any::<u8>(), 1..512),
        index in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let mut entry = Entry::new("payload.bin", data).unwrap();
        prop_assert!(validate_entry(&entry));

        let i = index.index(entry.data.len());
        entry.data[i] ^= mask;
        prop_assert!(!validate_entry(&entry));
    }

    #[test]
    fn conflicting_payloads_are_rejected(
        name in "[a-z]{1,12}",
        first in vec(any::<u8>(), 0..64),
        second in vec(any::<u8>(), 0..64),
    ) {
        let mut archive = Archive::new();
        archive.append_file(&name, &first).unwrap();
        let result = archive.append_file(&name, &second);

        if first == second {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(matches!(result, Err(KresError::DuplicateEntry { .. })), "expected DuplicateEntry");
        }
        prop_assert_eq!(archive.len(), 1);
        prop_assert_eq!(&archive.entry(&name).unwrap().data, &first);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in vec(any::<u8>(), 0..512)) {
        let _ = Archive::from_bytes(bytes.clone());
        if let Ok(mut reader) = ArchiveReader::from_bytes(&bytes) {
            let _ = reader.filenames();
        }
    }
}
