//! Loading the gzip-compressed JSON record dump

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{ExportError, Result};
use crate::record::Record;

/// Read a gzip file, decompress it and parse the content as a JSON array
/// of records, preserving element order.
///
/// The whole input is decompressed and parsed up front; only the workbook
/// side of the pipeline streams.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut json = String::new();
    decoder
        .read_to_string(&mut json)
        .map_err(|err| ExportError::Decompression {
            path: path.display().to_string(),
            detail: err.to_string(),
        })?;

    let records: Vec<Record> = serde_json::from_str(&json)?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap();
        path
    }

    #[test]
    fn loads_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = gzip_file(
            &dir,
            "input.json.gzip",
            br#"[{"id":1,"myString1":"a","myNumericString":"007","myString2":"b",
                 "amount":12.5,"myDate1":"2024-01-01","myDate2":"2024-01-02"},
                {"id":2,"myString1":"c","myNumericString":"008","myString2":"d",
                 "amount":1.25,"myDate1":"2024-02-01","myDate2":"2024-02-02"}]"#,
        );

        let records = load(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].id, 2);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load("/nonexistent/input.json.gzip").unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[test]
    fn corrupt_gzip_is_a_decompression_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json.gzip");
        std::fs::write(&path, b"this is not a gzip stream").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ExportError::Decompression { .. }));
    }

    #[test]
    fn non_array_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = gzip_file(&dir, "object.json.gzip", br#"{"id":1}"#);

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ExportError::Parse(_)));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = gzip_file(&dir, "garbage.json.gzip", b"[{");

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ExportError::Parse(_)));
    }
}
