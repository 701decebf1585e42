//! Turns an uploaded file into document text.
//!
//! A plain JSON upload is passed through untouched. A ZIP upload is buffered in
//! memory and scanned in central-directory order for the first entry whose path
//! ends in `.json` and contains `content`; that entry's bytes become the text.
//! When several entries qualify the first one wins, which depends on how the
//! archive was written.

use std::io::{Cursor, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::LoadError;

pub const ZIP_MIME: &str = "application/zip";
pub const JSON_MIME: &str = "application/json";

const DATA_EXTENSION: &str = ".json";
const ENTRY_MARKER: &str = "content";

/// A file handed over by the user.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// Declared MIME type, when the picker provides one.
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Archive,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub path: String,
    pub size: u64,
    pub matches: bool,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime: Option<&str>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), mime: mime.map(str::to_string), bytes }
    }

    /// Read a file from disk. No MIME type is declared, so detection goes by name.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, mime: None, bytes })
    }

    pub fn kind(&self) -> Option<FileKind> {
        let mime = self.mime.as_deref();
        if mime == Some(ZIP_MIME) || self.name.ends_with(".zip") {
            Some(FileKind::Archive)
        } else if mime == Some(JSON_MIME) || self.name.ends_with(DATA_EXTENSION) {
            Some(FileKind::Document)
        } else {
            None
        }
    }
}

/// Whether an archive path names the export's data document.
pub fn is_data_entry(path: &str) -> bool {
    path.ends_with(DATA_EXTENSION) && path.contains(ENTRY_MARKER)
}

pub fn load(file: &UploadedFile) -> Result<String, LoadError> {
    match file.kind() {
        Some(FileKind::Document) => {
            debug!(name = %file.name, bytes = file.bytes.len(), "plain document upload");
            std::str::from_utf8(&file.bytes)
                .map(str::to_owned)
                .map_err(|e| LoadError::MalformedDocument(format!("not valid UTF-8: {e}")))
        }
        Some(FileKind::Archive) => extract_data_entry(&file.bytes),
        None => Err(LoadError::UnsupportedFormat(file.name.clone())),
    }
}

/// Run [`load`] on the blocking pool. The file is moved in and dropped there.
pub async fn load_async(file: UploadedFile) -> Result<String, LoadError> {
    tokio::task::spawn_blocking(move || load(&file))
        .await
        .map_err(|e| LoadError::CorruptArchive(format!("load task failed: {e}")))?
}

pub fn extract_data_entry(bytes: &[u8]) -> Result<String, LoadError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let total = archive.len();
    for i in 0..total {
        let mut entry = archive.by_index(i)?;
        let path = entry.name().to_string();
        if !is_data_entry(&path) {
            debug!(%path, "skipping archive entry");
            continue;
        }
        info!(%path, index = i, total, "selected data entry");
        // entry.size() is whatever the archive claims
        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .map_err(|e| LoadError::CorruptArchive(format!("{path}: {e}")))?;
        return into_text(buf);
    }
    Err(LoadError::NoMatchingEntry(total))
}

/// Every entry of an archive in iteration order, flagging the one `load` would pick.
pub fn archive_entries(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, LoadError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut selected = false;
    let mut out = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let path = entry.name().to_string();
        let matches = !selected && is_data_entry(&path);
        selected |= matches;
        out.push(ArchiveEntry { path, size: entry.size(), matches });
    }
    Ok(out)
}

fn into_text(bytes: Vec<u8>) -> Result<String, LoadError> {
    String::from_utf8(bytes)
        .map_err(|e| LoadError::MalformedDocument(format!("not valid UTF-8: {e}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, body) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn picks_the_content_entry() {
        let bytes = zip_with(&[
            ("export/media.json", r#"{"wrong": true}"#),
            ("export/content_2024.json", r#"{"likes": [1, 2, 3]}"#),
        ]);
        let file = UploadedFile::new("export.zip", None, bytes);
        assert_eq!(load(&file).unwrap(), r#"{"likes": [1, 2, 3]}"#);
    }

    #[test]
    fn first_match_wins() {
        let bytes = zip_with(&[
            ("a/content_1.json", "first"),
            ("b/content_2.json", "second"),
        ]);
        assert_eq!(extract_data_entry(&bytes).unwrap(), "first");
    }

    #[test]
    fn no_content_entry() {
        let bytes = zip_with(&[("export/media.json", "{}"), ("export/readme.txt", "hi")]);
        let file = UploadedFile::new("export.zip", Some(ZIP_MIME), bytes);
        assert!(matches!(load(&file), Err(LoadError::NoMatchingEntry(2))));
    }

    #[test]
    fn marker_and_extension_are_case_sensitive() {
        assert!(is_data_entry("your_activity/content/posts_1.json"));
        assert!(!is_data_entry("export/Content.json"));
        assert!(!is_data_entry("export/content.JSON"));
        assert!(!is_data_entry("content/photo.jpg"));
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = !0u32;
        for &b in data {
            crc ^= b as u32;
            for _ in 0..8 {
                crc = if crc & 1 == 1 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }

    /// A single stored entry whose central directory claims, through a zip64
    /// extra field, an uncompressed size far beyond what the archive holds.
    fn zip_with_inflated_size(name: &str, body: &[u8], declared: u64) -> Vec<u8> {
        let crc = crc32(body);
        let len = body.len() as u32;
        let mut out = Vec::new();

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&0u16.to_le_bytes()); // time
        out.extend_from_slice(&0x21u16.to_le_bytes()); // 1980-01-01
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(body);

        let cd_offset = out.len() as u32;
        out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version made by
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0x21u16.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes()); // size lives in the zip64 field
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&12u16.to_le_bytes()); // extra length
        out.extend_from_slice(&0u16.to_le_bytes()); // comment length
        out.extend_from_slice(&0u16.to_le_bytes()); // disk
        out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&0x0001u16.to_le_bytes());
        out.extend_from_slice(&8u16.to_le_bytes());
        out.extend_from_slice(&declared.to_le_bytes());
        let cd_size = out.len() as u32 - cd_offset;

        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    #[test]
    fn declared_size_is_not_trusted() {
        let body = br#"{"likes": [1]}"#;
        let bytes = zip_with_inflated_size("content.json", body, u64::MAX / 2);
        let file = UploadedFile::new("export.zip", None, bytes);
        match load(&file) {
            Ok(text) => assert_eq!(text.as_bytes(), body),
            Err(e) => assert!(matches!(e, LoadError::CorruptArchive(_)), "{e:?}"),
        }
    }

    #[test]
    fn declared_zip_type_beats_json_name() {
        let bytes = zip_with(&[("content.json", r#"{"stories": []}"#)]);
        let file = UploadedFile::new("data.json", Some(ZIP_MIME), bytes);
        assert_eq!(file.kind(), Some(FileKind::Archive));
        assert_eq!(load(&file).unwrap(), r#"{"stories": []}"#);

        let json = UploadedFile::new("data.json", Some(JSON_MIME), b"{}".to_vec());
        assert_eq!(json.kind(), Some(FileKind::Document));
        let zip_name = UploadedFile::new("export.zip", Some(JSON_MIME), b"{}".to_vec());
        assert_eq!(zip_name.kind(), Some(FileKind::Archive));
    }

    #[test]
    fn extensions_are_case_sensitive() {
        let upper = UploadedFile::new("EXPORT.ZIP", None, zip_with(&[("content.json", "{}")]));
        assert_eq!(upper.kind(), None);
        assert!(matches!(load(&upper), Err(LoadError::UnsupportedFormat(ref n)) if n == "EXPORT.ZIP"));
        assert_eq!(UploadedFile::new("DATA.JSON", None, b"{}".to_vec()).kind(), None);
        // a declared type still rescues an upper-case name
        assert_eq!(UploadedFile::new("EXPORT.ZIP", Some(ZIP_MIME), Vec::new()).kind(), Some(FileKind::Archive));
    }

    #[test]
    fn plain_json_is_returned_unchanged() {
        let text = "{ \"stories\": [ {} ] }\n";
        let by_name = UploadedFile::new("data.json", None, text.as_bytes().to_vec());
        assert_eq!(load(&by_name).unwrap(), text);
        // Declared type wins even when the name says nothing.
        let by_mime = UploadedFile::new("blob", Some(JSON_MIME), text.as_bytes().to_vec());
        assert_eq!(load(&by_mime).unwrap(), text);
    }

    #[test]
    fn json_named_payload_is_not_unzipped() {
        let text = "PK\u{3}\u{4} looks like a zip header";
        let file = UploadedFile::new("data.json", None, text.as_bytes().to_vec());
        assert_eq!(load(&file).unwrap(), text);

        let invalid = UploadedFile::new("data.json", None, vec![0xff, 0xfe, 0x00]);
        assert!(matches!(load(&invalid), Err(LoadError::MalformedDocument(_))));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let file = UploadedFile::new("photo.png", Some("image/png"), vec![0x89, 0x50]);
        assert!(matches!(load(&file), Err(LoadError::UnsupportedFormat(ref n)) if n == "photo.png"));
    }

    #[test]
    fn garbage_zip_is_corrupt() {
        let file = UploadedFile::new("export.zip", None, b"definitely not a zip".to_vec());
        assert!(matches!(load(&file), Err(LoadError::CorruptArchive(_))));
    }

    #[test]
    fn entries_flag_only_the_selected_one() {
        let bytes = zip_with(&[
            ("x/media.json", "{}"),
            ("x/content_a.json", "{}"),
            ("x/content_b.json", "{}"),
        ]);
        let entries = archive_entries(&bytes).unwrap();
        let flags: Vec<bool> = entries.iter().map(|e| e.matches).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(entries[1].path, "x/content_a.json");
    }

    #[tokio::test]
    async fn loads_archive_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("export.zip");
        std::fs::write(&path, zip_with(&[("content.json", r#"{"likes": []}"#)])).unwrap();
        let file = UploadedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "export.zip");
        assert_eq!(file.kind(), Some(FileKind::Archive));
        assert_eq!(load_async(file).await.unwrap(), r#"{"likes": []}"#);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(UploadedFile::from_path(&tmp.path().join("nope.zip")).await.is_err());
    }
}
