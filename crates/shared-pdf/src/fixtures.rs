//! In-memory document builders for tests
//!
//! Enabled for this crate's own tests and, through the `fixtures` feature,
//! for dependants' dev-dependencies.

use std::io::{Cursor, Write};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use zip::unstable::write::FileOptionsExt;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Build a single-page PDF with each line drawn in Helvetica.
pub fn text_pdf(lines: &[&str]) -> Vec<u8> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![50.into(), 750.into()]),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("Td", vec![0.into(), (-16).into()]));
        }
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
    }
    operations.push(Operation::new("ET", vec![]));

    build_pdf(Content { operations })
}

/// Build a structurally valid PDF whose only page draws nothing.
pub fn blank_pdf() -> Vec<u8> {
    build_pdf(Content { operations: vec![] })
}

fn build_pdf(content: Content) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let encoded = content.encode().expect("content stream encodes");
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("pdf serializes");
    buffer
}

/// Build a ZIP archive holding `(name, contents)` pairs in the given order.
///
/// Names ending in `/` become directory entries.
pub fn zip_of(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).expect("directory entry");
        } else {
            writer.start_file(*name, options).expect("file entry");
            writer.write_all(contents).expect("entry contents");
        }
    }

    writer.finish().expect("zip finishes").into_inner()
}

/// Password used for entries written by `zip_with_locked`
pub const FIXTURE_PASSWORD: &[u8] = b"fixture-password";

/// Like `zip_of`, but entries named in `locked` are ZipCrypto-encrypted.
pub fn zip_with_locked(entries: &[(&str, Vec<u8>)], locked: &[&str]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, contents) in entries {
        let options = if locked.contains(name) {
            SimpleFileOptions::default().with_deprecated_encryption(FIXTURE_PASSWORD)
        } else {
            SimpleFileOptions::default()
        };
        writer.start_file(*name, options).expect("file entry");
        writer.write_all(contents).expect("entry contents");
    }

    writer.finish().expect("zip finishes").into_inner()
}

/// Stored (uncompressed) archive whose `corrupt` entry has one payload
/// byte flipped, so its checksum no longer matches.
///
/// The corrupt entry's contents must not occur earlier in the archive.
pub fn zip_with_corrupt(entries: &[(&str, Vec<u8>)], corrupt: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, contents) in entries {
        writer.start_file(*name, options).expect("file entry");
        writer.write_all(contents).expect("entry contents");
    }
    let mut bytes = writer.finish().expect("zip finishes").into_inner();

    let (_, payload) = entries
        .iter()
        .find(|(name, _)| *name == corrupt)
        .expect("corrupt entry is listed");
    let offset = bytes
        .windows(payload.len())
        .position(|window| window == payload.as_slice())
        .expect("payload stored verbatim");
    bytes[offset] ^= 0xFF;
    bytes
}
