//! ZIP bundle validation and extraction.
//!
//! Uploaded bundles are plain zip files with the application laid out flat
//! at the archive root. Validation checks the size and the magic header
//! before any extraction work starts; extraction then unpacks every entry
//! under the destination directory, creating intermediate directories as
//! needed.

pub mod error;

pub use error::ArchiveError;
pub use error::ArchiveResult;

use std::fs;
use std::io;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Magic sequences a zip file may start with: local file header, empty
/// archive, and spanned archive markers.
const ZIP_MAGICS: [[u8; 4]; 3] = [
    [0x50, 0x4b, 0x03, 0x04],
    [0x50, 0x4b, 0x05, 0x06],
    [0x50, 0x4b, 0x07, 0x08],
];

/// Validate and extract a zip archive into `dest_dir`.
///
/// Entry paths are preserved relative to the destination; entries that
/// would escape it are rejected. A failed entry aborts the extraction and
/// leaves the partially extracted tree as-is; the caller decides whether
/// to discard the destination.
///
/// # Errors
///
/// - `ArchiveError::TooSmall` when the file is under 4 bytes
/// - `ArchiveError::InvalidFormat` when the magic header is not a zip
/// - `ArchiveError::Malformed` when the zip structure cannot be parsed
/// - `ArchiveError::ExtractionFailed` when writing an entry fails
pub async fn extract(archive_path: &Path, dest_dir: &Path) -> ArchiveResult<()> {
    check_magic(archive_path)?;

    let file = fs::File::open(archive_path).map_err(|source| ArchiveError::FileRead {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive =
        zip::ZipArchive::new(BufReader::new(file)).map_err(|source| ArchiveError::Malformed {
            path: archive_path.to_path_buf(),
            source,
        })?;

    fs::create_dir_all(dest_dir).map_err(|source| ArchiveError::ExtractionFailed {
        entry: dest_dir.display().to_string(),
        source,
    })?;

    debug!(
        archive = %archive_path.display(),
        entries = archive.len(),
        "extracting archive"
    );

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|source| ArchiveError::Malformed {
                path: archive_path.to_path_buf(),
                source,
            })?;

        let entry_name = entry.name().to_string();
        let Some(relative) = entry.enclosed_name() else {
            return Err(ArchiveError::ExtractionFailed {
                entry: entry_name,
                source: io::Error::other("entry path escapes the destination directory"),
            });
        };
        let dest = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&dest).map_err(|source| ArchiveError::ExtractionFailed {
                entry: entry_name,
                source,
            })?;
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| ArchiveError::ExtractionFailed {
                entry: entry_name.clone(),
                source,
            })?;
        }
        let mut out = fs::File::create(&dest).map_err(|source| ArchiveError::ExtractionFailed {
            entry: entry_name.clone(),
            source,
        })?;
        io::copy(&mut entry, &mut out).map_err(|source| ArchiveError::ExtractionFailed {
            entry: entry_name,
            source,
        })?;
    }

    Ok(())
}

/// Check the size and the first four bytes of the file against the zip
/// magic allowlist.
fn check_magic(path: &Path) -> ArchiveResult<()> {
    let metadata = fs::metadata(path).map_err(|source| ArchiveError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.len() < 4 {
        return Err(ArchiveError::TooSmall {
            size: metadata.len(),
        });
    }

    let mut file = fs::File::open(path).map_err(|source| ArchiveError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)
        .map_err(|source| ArchiveError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

    if !ZIP_MAGICS.contains(&magic) {
        let magic = magic.iter().map(|b| format!("{b:02x}")).collect();
        return Err(ArchiveError::InvalidFormat { magic });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = fs::File::create(path).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start entry");
            writer.write_all(content.as_bytes()).expect("write entry");
        }
        writer.finish().expect("finish zip");
    }

    #[tokio::test]
    async fn test_rejects_tiny_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("tiny.zip");
        fs::write(&path, b"PK\x03").expect("setup");

        let err = extract(&path, &dir.path().join("out"))
            .await
            .expect_err("3-byte file must be rejected");
        assert!(matches!(err, ArchiveError::TooSmall { size: 3 }));
    }

    #[tokio::test]
    async fn test_rejects_wrong_magic() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bogus.zip");
        fs::write(&path, [0u8; 10]).expect("setup");

        let err = extract(&path, &dir.path().join("out"))
            .await
            .expect_err("zero magic must be rejected");
        match err {
            ArchiveError::InvalidFormat { magic } => assert_eq!(magic, "00000000"),
            other => panic!("expected InvalidFormat, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejects_missing_file() {
        let dir = tempdir().expect("temp dir");
        let err = extract(&dir.path().join("missing.zip"), &dir.path().join("out"))
            .await
            .expect_err("missing archive must fail");
        assert!(matches!(err, ArchiveError::FileRead { .. }));
    }

    #[tokio::test]
    async fn test_extracts_entries_with_nested_paths() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("app.zip");
        write_zip(
            &path,
            &[
                ("index.js", "console.log('hi');"),
                ("src/lib/util.js", "module.exports = {};"),
                ("package.json", "{\"name\":\"app\"}"),
            ],
        );

        let out = dir.path().join("out");
        extract(&path, &out).await.expect("extraction should succeed");

        assert_eq!(
            fs::read_to_string(out.join("index.js")).expect("read"),
            "console.log('hi');"
        );
        assert_eq!(
            fs::read_to_string(out.join("src/lib/util.js")).expect("read"),
            "module.exports = {};"
        );
        assert!(out.join("package.json").exists());
    }

    #[tokio::test]
    async fn test_extracts_into_missing_destination() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("app.zip");
        write_zip(&path, &[("a.txt", "a")]);

        let out = dir.path().join("deep/nested/out");
        extract(&path, &out).await.expect("extraction should succeed");
        assert!(out.join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_magic_header_of_real_zip_is_accepted() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("app.zip");
        write_zip(&path, &[("a.txt", "a")]);

        let mut magic = [0u8; 4];
        let mut file = fs::File::open(&path).expect("open");
        file.read_exact(&mut magic).expect("read magic");
        assert_eq!(magic, [0x50, 0x4b, 0x03, 0x04]);

        check_magic(&path).expect("real zip magic should pass");
    }
}
