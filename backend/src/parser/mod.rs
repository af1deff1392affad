//! CSV loader with encoding and delimiter auto-detection.
//!
//! Turns raw bytes into a [`RawTable`]. Header names are kept exactly as
//! written and rows in file order; nothing survey-specific happens here.

use std::io::Read;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::RawTable;

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed header and rows
    pub table: RawTable,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: u8,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the specified encoding.
///
/// A leading UTF-8 byte order mark is dropped so the first header name
/// compares equal to what the user sees.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .map_err(|e| CsvError::EncodingError(e.to_string()))?,
        // windows-1252 agrees with ISO-8859-1 on every printable code point
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        // Fallback: UTF-8 with lossy conversion
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    if text.starts_with('\u{feff}') {
        Ok(text['\u{feff}'.len_utf8()..].to_string())
    } else {
        Ok(text)
    }
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Falls back to a comma when the header holds a single column.
pub fn detect_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [b',', b';', b'\t', b'|'];
    let mut best_sep = b',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep as char).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse delimited text from a reader.
///
/// Quoting follows RFC 4180. A data row whose field count differs from the
/// header is rejected; blank lines are skipped.
pub fn parse_csv<R: Read>(reader: R, delimiter: u8) -> CsvResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::EmptyFile);
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable::new(headers, rows))
}

/// Parse a string with an explicit delimiter.
pub fn parse_str(content: &str, delimiter: u8) -> CsvResult<RawTable> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }
    parse_csv(content.as_bytes(), delimiter)
}

/// Parse CSV bytes, detecting the encoding and (unless given) the delimiter.
pub fn parse_bytes_auto(bytes: &[u8], delimiter: Option<u8>) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let table = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_csv_file_auto("/path/to/file.csv", None)?;
/// println!("Encoding: {}, Rows: {}", result.encoding, result.table.len());
/// ```
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P, delimiter: Option<u8>) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes, delimiter)
}

/// Printable form of a delimiter byte.
pub fn format_delimiter(d: u8) -> String {
    match d {
        b'\t' => "TAB".to_string(),
        c => (c as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let table = parse_str("name,age\nAlice,30\nBob,25", b',').unwrap();

        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "name"), Some("Alice"));
        assert_eq!(table.cell(1, "age"), Some("25"));
    }

    #[test]
    fn test_header_names_kept_verbatim() {
        let table = parse_str("Q4,Q9#1_1, Q2 \nA,Good,x", b',').unwrap();
        assert_eq!(table.headers, vec!["Q4", "Q9#1_1", " Q2 "]);
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name,value\n\"Doe, Jane\",\"Very Good\"\n";
        let table = parse_str(csv, b',').unwrap();

        assert_eq!(table.cell(0, "name"), Some("Doe, Jane"));
        assert_eq!(table.cell(0, "value"), Some("Very Good"));
    }

    #[test]
    fn test_multiline_quoted_cell() {
        let csv = "q,a\n\"line one\nline two\",x\n";
        let table = parse_str(csv, b',').unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, "q"), Some("line one\nline two"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_str("a,b\n1,2\n\n3,4\n", b',').unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_missing_values() {
        let table = parse_str("a,b,c\n1,,3", b',').unwrap();

        assert_eq!(table.cell(0, "a"), Some("1"));
        assert_eq!(table.cell(0, "b"), Some(""));
        assert_eq!(table.cell(0, "c"), Some("3"));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let err = parse_str("a,b\n1,2\n1,2,3\n", b',').unwrap_err();
        match err {
            CsvError::ParseError { message, .. } => {
                assert!(message.contains("expected 2 fields, found 3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_short_row_rejected() {
        let err = parse_str("Q1,Q2,Q3\nJane,x\n", b',').unwrap_err();
        assert!(matches!(err, CsvError::ParseError { .. }));
        assert!(err.to_string().contains("expected 3 fields, found 2"));
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_str("", b','), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_str("  \n\n", b','), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), b'|');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_bytes_auto(b"name;age\nAlice;30\nBob;25", None).unwrap();

        assert_eq!(result.delimiter, b';');
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.table.len(), 2);
        assert_eq!(result.table.headers, vec!["name", "age"]);
    }

    #[test]
    fn test_explicit_delimiter_wins() {
        let result = parse_bytes_auto(b"a;b,c\n1;2,3", Some(b',')).unwrap();
        assert_eq!(result.table.headers, vec!["a;b", "c"]);
    }

    #[test]
    fn test_bom_stripped() {
        let result = parse_bytes_auto(b"\xEF\xBB\xBFQ1,Q2\nx,y", None).unwrap();
        assert_eq!(result.table.headers[0], "Q1");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_latin1_upper_half_kept() {
        // ½ and ¤ differ between ISO-8859-1 and ISO-8859-15
        let decoded = decode_content(&[0xBD, 0xA4], "iso-8859-1").unwrap();
        assert_eq!(decoded, "½¤");
    }

    #[test]
    fn test_file_auto() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, "Q1,Q2\nJane,yes\n").unwrap();

        let result = parse_csv_file_auto(&path, None).unwrap();
        assert_eq!(result.table.cell(0, "Q2"), Some("yes"));

        let missing = parse_csv_file_auto(dir.path().join("nope.csv"), None);
        assert!(matches!(missing, Err(CsvError::IoError(_))));
    }
}
