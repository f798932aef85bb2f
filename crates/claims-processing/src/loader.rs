//! File loading and saving for claims tables.
//!
//! The delimiter is picked from the extension: `.csv` is comma separated,
//! `.tsv` tab separated and `.txt` uses the given delimiter (pipe by
//! default, as in the raw insurance extracts). Parquet files are read
//! as-is.

use crate::error::{ProcessingError, Result, ResultExt};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Delimiter assumed for `.txt` extracts when none is given.
pub const DEFAULT_TXT_DELIMITER: u8 = b'|';

/// Rows scanned to infer column types.
const INFER_SCHEMA_ROWS: usize = 1000;

/// Load a table from `path`.
///
/// `delimiter` only applies to `.txt` files.
pub fn load_table(path: impl AsRef<Path>, delimiter: Option<u8>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ProcessingError::FileNotFound(path.display().to_string()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let df = match extension.as_str() {
        "csv" => read_delimited(path, b',')?,
        "tsv" => read_delimited(path, b'\t')?,
        "txt" => read_delimited(path, delimiter.unwrap_or(DEFAULT_TXT_DELIMITER))?,
        "parquet" => {
            let file = File::open(path)?;
            ParquetReader::new(file)
                .finish()
                .context(format!("Failed to read parquet file {}", path.display()))?
        }
        other => {
            return Err(ProcessingError::UnsupportedFormat(if other.is_empty() {
                path.display().to_string()
            } else {
                format!(".{}", other)
            }));
        }
    };

    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

fn read_delimited(path: &Path, separator: u8) -> Result<DataFrame> {
    debug!(
        "Reading {} with separator {:?}",
        path.display(),
        separator as char
    );
    CsvReadOptions::default()
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_has_header(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_quote_char(Some(b'"')),
        )
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
        .context(format!("Failed to read {}", path.display()))
}

/// Write `df` to a comma-separated file with a header row.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)?;
    info!("Table saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("claims-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_pipe_delimited_txt() {
        let path = temp_file(
            "pipe.txt",
            "PolicyID|TotalPremium|TotalClaims\n1|21.9|0.0\n2|100.5|250.0\n",
        );
        let df = load_table(&path, None).unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("TotalClaims").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_load_txt_with_custom_delimiter() {
        let path = temp_file("semi.txt", "a;b\n1;2\n");
        let df = load_table(&path, Some(b';')).unwrap();
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_load_csv() {
        let path = temp_file("plain.csv", "make,TotalClaims\nToyota,10\nFord,0\n");
        let df = load_table(&path, None).unwrap();
        assert_eq!(df.shape(), (2, 2));
    }

    #[test]
    fn test_missing_file() {
        let err = load_table("/definitely/not/here.csv", None).unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn test_unsupported_extension() {
        let path = temp_file("book.xlsx", "not really excel");
        let err = load_table(&path, None).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
        assert!(err.to_string().contains(".xlsx"));
    }

    #[test]
    fn test_write_csv_round_trip() {
        let mut df = df!["a" => [1i64, 2], "b" => ["x", "y"]].unwrap();
        let dir = std::env::temp_dir().join(format!("claims-writer-{}", std::process::id()));
        let path = dir.join("out.csv");
        write_csv(&mut df, &path).unwrap();

        let loaded = load_table(&path, None).unwrap();
        assert_eq!(loaded.shape(), (2, 2));
    }
}
