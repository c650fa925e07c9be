//! Generate seed corpus for fuzzing

use kres_rs::{Archive, Entry};
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let corpus_dir = "fuzz/corpus/fuzz_archive_parse";
    fs::create_dir_all(corpus_dir)?;

    println!("Generating seed corpus...");

    let seeds: Vec<(&str, Archive)> = vec![
        ("seed_empty.kres", Archive::build(Vec::new(), None)?),
        (
            "seed_single_small.kres",
            Archive::build(vec![Entry::new("test.txt", b"Hello, World!".to_vec())?], None)?,
        ),
        (
            "seed_multiple.kres",
            Archive::build(
                vec![
                    Entry::new("test.txt", b"hello".to_vec())?,
                    Entry::new("foo.bar", b"foo".to_vec())?,
                    Entry::new("data/nested.bin", vec![0xAB; 300])?,
                ],
                Some(b"user section"),
            )?,
        ),
        (
            "seed_user_only.kres",
            Archive::build(Vec::new(), Some(br#"{"name":"seed"}"#))?,
        ),
    ];

    for (name, archive) in seeds {
        let path = format!("{}/{}", corpus_dir, name);
        archive.write_to_file(&path)?;
        println!("Generated: {}", path);
    }

    Ok(())
}
