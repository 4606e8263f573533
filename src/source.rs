use crate::config::Options;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// One CSV line keyed by the header names, in column order.
pub type RawRow = Vec<(String, String)>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Directory {0} does not exist")]
    DirectoryNotExist(String),
    #[error("Error listing CSV directory: {0}")]
    ReadDir(#[from] walkdir::Error),
    #[error("Error reading CSV file: {0}")]
    CSVRead(#[from] csv::Error),
}

/// CSV files directly inside `directory`, hidden files excluded, sorted by
/// file name.
pub fn discover_csv_files(directory: &Path) -> Result<Vec<PathBuf>, SourceError> {
    if !directory.is_dir() {
        return Err(SourceError::DirectoryNotExist(
            directory.to_string_lossy().into(),
        ));
    }

    let mut files = vec![];
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy();
        if file_name.ends_with(".csv") && !file_name.starts_with('.') && entry.path().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// `Product_export.csv` becomes `Product`. Every occurrence of `.csv` and of
/// `strip` is removed, not just a suffix.
pub fn collection_name(file_name: &str, strip: &str) -> String {
    let name = file_name.replace(".csv", "");
    if strip.is_empty() {
        return name;
    }
    name.replace(strip, "")
}

pub struct RowReader<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    record: StringRecord,
}

impl RowReader<File> {
    pub fn from_path(path: &Path, options: &Options) -> Result<RowReader<File>, SourceError> {
        let reader = reader_builder(options).from_path(path)?;
        RowReader::new(reader)
    }
}

impl<R: Read> RowReader<R> {
    pub fn from_reader(reader: R, options: &Options) -> Result<RowReader<R>, SourceError> {
        RowReader::new(reader_builder(options).from_reader(reader))
    }

    fn new(mut reader: csv::Reader<R>) -> Result<RowReader<R>, SourceError> {
        let headers = reader.headers()?.iter().map(|h| h.to_owned()).collect();
        Ok(RowReader {
            reader,
            headers,
            record: StringRecord::new(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn current_row(&self) -> RawRow {
        if self.record.len() > self.headers.len() {
            let line = self.record.position().map(|p| p.line()).unwrap_or_default();
            log::warn!(
                "Line {line} has {} fields but the header has {}, extra fields dropped",
                self.record.len(),
                self.headers.len()
            );
        }

        self.headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                let value = self.record.get(index).unwrap_or("");
                (header.clone(), value.to_owned())
            })
            .collect()
    }
}

impl<R: Read> Iterator for RowReader<R> {
    type Item = Result<RawRow, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(Ok(self.current_row())),
            Ok(false) => None,
            Err(error) => Some(Err(error.into())),
        }
    }
}

fn reader_builder(options: &Options) -> ReaderBuilder {
    let mut reader_builder = ReaderBuilder::new();

    reader_builder
        .delimiter(options.delimiter.unwrap_or(b','))
        .quote(options.quote.unwrap_or(b'"'))
        .flexible(true);

    reader_builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pairs(row: &RawRow) -> Vec<(&str, &str)> {
        row.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    #[test]
    fn collection_names() {
        assert_eq!(collection_name("Product_export.csv", "_export"), "Product");
        assert_eq!(collection_name("alerts.csv", "_export"), "alerts");
        assert_eq!(collection_name("a_export_b_export.csv", "_export"), "a_b");
        assert_eq!(collection_name("backup.csv.csv", "_export"), "backup");
        assert_eq!(collection_name("Review_export.csv", ""), "Review_export");
    }

    #[test]
    fn discover() {
        let tmp_dir = TempDir::new().unwrap();
        let tmp = tmp_dir.path();
        for name in ["b.csv", "a_export.csv", ".hidden.csv", "notes.txt", "data.csv.bak"] {
            std::fs::write(tmp.join(name), "id\n1\n").unwrap();
        }
        std::fs::create_dir_all(tmp.join("nested.csv")).unwrap();
        std::fs::create_dir_all(tmp.join("sub")).unwrap();
        std::fs::write(tmp.join("sub/deep.csv"), "id\n1\n").unwrap();

        let files = discover_csv_files(tmp).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_export.csv", "b.csv"]);
    }

    #[test]
    fn discover_missing_directory() {
        let error = discover_csv_files(Path::new("fixtures/does_not_exist")).unwrap_err();
        assert!(matches!(error, SourceError::DirectoryNotExist(_)));
    }

    #[test]
    fn read_rows() {
        let options = Options::builder().build();
        let reader =
            RowReader::from_path(Path::new("fixtures/shop/Product_export.csv"), &options).unwrap();
        assert_eq!(
            reader.headers(),
            ["id", "name", "price", "quantity", "in_stock", "created_at", "purchased_date", "notes"]
        );
        let rows: Vec<RawRow> = reader.map(|row| row.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            pairs(&rows[0]),
            vec![
                ("id", "1"),
                ("name", "Kettle"),
                ("price", "19.99"),
                ("quantity", "5"),
                ("in_stock", "True"),
                ("created_at", "2024-01-15T10:30:00Z"),
                ("purchased_date", "2025-07-21"),
                ("notes", ""),
            ]
        );
    }

    #[test]
    fn ragged_rows() {
        let options = Options::builder().build();
        let data = "a,b,c\n1,2\n1,2,3,4\n";
        let rows: Vec<RawRow> = RowReader::from_reader(data.as_bytes(), &options)
            .unwrap()
            .map(|row| row.unwrap())
            .collect();
        assert_eq!(pairs(&rows[0]), vec![("a", "1"), ("b", "2"), ("c", "")]);
        assert_eq!(pairs(&rows[1]), vec![("a", "1"), ("b", "2"), ("c", "3")]);
    }

    #[test]
    fn delimiter_and_quotes() {
        let options = Options::builder().delimiter(Some(b';')).build();
        let data = "name;comment\nKettle;\"boils; fast\"\n";
        let rows: Vec<RawRow> = RowReader::from_reader(data.as_bytes(), &options)
            .unwrap()
            .map(|row| row.unwrap())
            .collect();
        assert_eq!(pairs(&rows[0]), vec![("name", "Kettle"), ("comment", "boils; fast")]);
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let options = Options::builder().build();
        let data: &[u8] = b"name\n\xff\xfe\n";
        let mut reader = RowReader::from_reader(data, &options).unwrap();
        assert!(matches!(reader.next(), Some(Err(SourceError::CSVRead(_)))));
    }
}
