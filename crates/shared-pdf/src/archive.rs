//! ZIP bundle unpacking
//!
//! Turns an uploaded archive into `InvoiceEntry` values in central-directory
//! order. Entries are read fully into memory; no files are written.

use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use shared_types::InvoiceEntry;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::ArchiveError;

/// Per-entry cap on uncompressed size (20 MiB)
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 20 * 1024 * 1024;

/// Drop `..`, `.`, root and drive components so names cannot escape the archive.
///
/// Returns None if nothing is left (e.g. just "..").
fn sanitize_name(raw: &str) -> Option<String> {
    let normalized = raw.replace('\\', "/");
    let mut sanitized = PathBuf::new();
    for component in Path::new(&normalized).components() {
        if let Component::Normal(part) = component {
            sanitized.push(part);
        }
    }

    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized.to_string_lossy().into_owned())
    }
}

/// macOS resource forks and dotfiles ride along in archives built by Finder.
fn is_metadata_entry(name: &str) -> bool {
    if name.starts_with("__MACOSX/") {
        return true;
    }
    name.rsplit('/').next().is_some_and(|base| base.starts_with('.'))
}

fn entry_error_reason(err: &ZipError) -> String {
    match err {
        ZipError::UnsupportedArchive(msg) if msg.to_lowercase().contains("password") => {
            "entry is password-protected".to_string()
        }
        other => format!("entry could not be read: {other}"),
    }
}

/// Unpack every file entry of a ZIP archive.
///
/// Only an unreadable archive as a whole is an error. A single entry that
/// is too large, encrypted or corrupt comes back as an `InvoiceEntry` with
/// `oversized` or `unreadable` set, so the caller can report it per invoice.
///
/// # Errors
/// - `ArchiveError::Empty` for zero-length input
/// - `ArchiveError::InvalidZip` when the central directory cannot be read
pub fn unpack_zip(bytes: &[u8], max_entry_size: u64) -> Result<Vec<InvoiceEntry>, ArchiveError> {
    if bytes.is_empty() {
        return Err(ArchiveError::Empty);
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        // Raw access reads the header only, so encrypted entries can be named
        let (raw_name, is_dir, encrypted) = {
            let header = archive.by_index_raw(i)?;
            (header.name().to_string(), header.is_dir(), header.encrypted())
        };

        if is_dir {
            continue;
        }

        let Some(name) = sanitize_name(&raw_name) else {
            warn!("Skipping invalid archive path: {raw_name}");
            continue;
        };

        if is_metadata_entry(&name) {
            debug!("Skipping metadata entry: {name}");
            continue;
        }

        if encrypted {
            warn!("Entry {name} is password-protected");
            entries.push(InvoiceEntry::unreadable(name, "entry is password-protected"));
            continue;
        }

        let zip_file = match archive.by_index(i) {
            Ok(file) => file,
            Err(e) => {
                let reason = entry_error_reason(&e);
                warn!("Entry {name}: {reason}");
                entries.push(InvoiceEntry::unreadable(name, reason));
                continue;
            }
        };

        // Declared sizes can lie; cap the actual read as well.
        let mut contents = Vec::new();
        let read = match zip_file
            .take(max_entry_size.saturating_add(1))
            .read_to_end(&mut contents)
        {
            Ok(read) => read,
            Err(e) => {
                warn!("Entry {name} is corrupt: {e}");
                entries.push(InvoiceEntry::unreadable(
                    name,
                    format!("entry data is corrupt: {e}"),
                ));
                continue;
            }
        };

        if read as u64 > max_entry_size {
            warn!("Entry {name} exceeds {max_entry_size} bytes, contents dropped");
            entries.push(InvoiceEntry::oversized(name));
            continue;
        }

        entries.push(InvoiceEntry::new(name, contents));
    }

    debug!("Unpacked {} entries from archive", entries.len());
    Ok(entries)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sanitized_names_never_escape(raw in "[a-z./\\\\]{0,24}") {
            if let Some(name) = sanitize_name(&raw) {
                prop_assert!(!name.starts_with('/'));
                prop_assert!(name.split('/').all(|part| part != ".." && part != "."));
            }
        }

        #[test]
        fn unpack_never_panics_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = unpack_zip(&bytes, DEFAULT_MAX_ENTRY_SIZE);
        }
    }
}
