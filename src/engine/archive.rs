// src/engine/archive.rs
//
// Archive packaging: bundle the ordered successful outputs of a batch into
// one zip blob, each entry named by its derived output filename.

use crate::engine::pipeline::Converted;
use crate::error::{ConvertError, Result};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Package `outputs` into a zip archive held in memory.
///
/// An empty input produces a valid empty archive. Entries keep input order.
/// Assembly failures are batch-scoped and do not invalidate per-item
/// results the caller already holds.
pub fn package(outputs: &[Converted]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    // Most entries are already-compressed image streams; deflate still wins
    // a little on container overhead and keeps the archive universal.
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for output in outputs {
        writer
            .start_file(&output.output_name, options)
            .map_err(|e| {
                ConvertError::archive_failed(format!(
                    "failed to start entry '{}': {e}",
                    output.output_name
                ))
            })?;
        writer.write_all(&output.bytes).map_err(|e| {
            ConvertError::archive_failed(format!(
                "failed to write entry '{}': {e}",
                output.output_name
            ))
        })?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| ConvertError::archive_failed(format!("failed to finalize archive: {e}")))?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn converted(name: &str, bytes: &[u8]) -> Converted {
        Converted {
            bytes: bytes.to_vec(),
            output_name: name.to_string(),
            source_name: format!("src-{name}"),
        }
    }

    #[test]
    fn test_package_names_entries_by_output_name() {
        let outputs = vec![
            converted("one.jpg", b"alpha"),
            converted("two.png", b"beta"),
        ];
        let blob = package(&outputs).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(blob)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut first = String::new();
        archive
            .by_name("one.jpg")
            .unwrap()
            .read_to_string(&mut first)
            .unwrap();
        assert_eq!(first, "alpha");

        let mut second = String::new();
        archive
            .by_name("two.png")
            .unwrap()
            .read_to_string(&mut second)
            .unwrap();
        assert_eq!(second, "beta");
    }

    #[test]
    fn test_package_preserves_order() {
        let outputs = vec![
            converted("z.jpg", b"1"),
            converted("a.jpg", b"2"),
            converted("m.jpg", b"3"),
        ];
        let blob = package(&outputs).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(blob)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["z.jpg", "a.jpg", "m.jpg"]);
    }

    #[test]
    fn test_empty_input_yields_empty_archive() {
        let blob = package(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(blob)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
