//! Dataset loading and persistence of the cleaned table.

use crate::error::{CleaningError, Result};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Base URL of the public seaborn dataset repository.
pub const SEABORN_DATA_URL: &str = "https://raw.githubusercontent.com/mwaskom/seaborn-data/master";

/// Where the raw table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// A named seaborn dataset, cached as `<data_home>/<name>.csv`.
    Named(String),
    /// An explicit CSV file.
    File(PathBuf),
}

impl DatasetSource {
    /// Human-readable name used in logs and errors.
    pub fn display_name(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Load the raw table from `source`.
///
/// Named datasets are read from `data_home`; when the cached file is absent
/// and the `remote` feature is enabled it is downloaded first.
pub fn load_dataset(source: &DatasetSource, data_home: &Path) -> Result<DataFrame> {
    let name = source.display_name();
    let path = match source {
        DatasetSource::File(path) => path.clone(),
        DatasetSource::Named(dataset) => resolve_named(dataset, data_home)?,
    };

    let df = load_csv_with_fallbacks(&path).map_err(|e| CleaningError::load(&name, e))?;
    info!(
        "Loaded dataset '{}': {} rows x {} columns",
        name,
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Location of the cached copy of a named dataset.
pub fn cached_dataset_path(dataset: &str, data_home: &Path) -> PathBuf {
    data_home.join(format!("{}.csv", dataset))
}

fn resolve_named(dataset: &str, data_home: &Path) -> Result<PathBuf> {
    let path = cached_dataset_path(dataset, data_home);
    if path.exists() {
        debug!("Using cached dataset at {}", path.display());
        return Ok(path);
    }

    #[cfg(feature = "remote")]
    {
        download_dataset(dataset, &path)?;
        Ok(path)
    }

    #[cfg(not(feature = "remote"))]
    {
        Err(CleaningError::load(
            dataset,
            format!("{} not found and remote download is disabled", path.display()),
        ))
    }
}

#[cfg(feature = "remote")]
fn download_dataset(dataset: &str, target: &Path) -> Result<()> {
    use reqwest::blocking::Client;
    use std::time::Duration;

    let url = format!("{}/{}.csv", SEABORN_DATA_URL, dataset);
    info!("Downloading dataset '{}' from {}", dataset, url);

    let client = Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| CleaningError::load(dataset, format!("failed to build HTTP client: {}", e)))?;

    let response = client
        .get(&url)
        .send()
        .map_err(|e| CleaningError::load(dataset, e))?;
    if !response.status().is_success() {
        return Err(CleaningError::load(
            dataset,
            format!("download returned HTTP {}", response.status()),
        ));
    }
    let body = response
        .bytes()
        .map_err(|e| CleaningError::load(dataset, e))?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| CleaningError::load(dataset, e))?;
    }
    fs::write(target, &body).map_err(|e| CleaningError::load(dataset, e))?;
    info!("Cached dataset at {}", target.display());

    Ok(())
}

/// Read a CSV file, retrying with looser settings on parse failure.
pub fn load_csv_with_fallbacks(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(CleaningError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    // Strategy 1: standard loading with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Standard loading failed: {}", e),
    }

    // Strategy 2: without quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(None))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Loading without quotes failed: {}", e),
    }

    // Strategy 3: pre-clean content
    let content = fs::read_to_string(path)?;
    let cursor = Cursor::new(clean_csv_content(&content));
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .into_reader_with_file_handle(cursor)
        .finish()?;
    Ok(df)
}

fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the cleaned table as a comma-delimited CSV with a header row.
///
/// Any existing file at `path` is overwritten and missing parent
/// directories are created.
pub fn write_cleaned_csv(df: &DataFrame, path: &Path) -> Result<()> {
    let write_error = |reason: String| CleaningError::Write {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
    }

    let mut file = File::create(path).map_err(|e| write_error(e.to_string()))?;
    let mut output = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(&mut output)
        .map_err(|e| write_error(e.to_string()))?;

    info!(
        "Cleaned dataset saved to {} ({} rows x {} columns)",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_csv_reads_missing_cells_as_null() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small.csv");
        fs::write(&path, "age,embarked\n22,S\n,C\n35,\n").unwrap();

        let df = load_csv_with_fallbacks(&path).unwrap();

        assert_eq!(df.shape(), (3, 2));
        assert_eq!(df.column("age").unwrap().null_count(), 1);
        assert_eq!(df.column("embarked").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_dataset_missing_file_is_load_error() {
        let dir = TempDir::new().unwrap();
        let source = DatasetSource::File(dir.path().join("absent.csv"));

        let err = load_dataset(&source, dir.path()).unwrap_err();
        assert_eq!(err.error_code(), "LOAD_FAILED");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_named_dataset_uses_cached_copy() {
        let dir = TempDir::new().unwrap();
        fs::write(
            cached_dataset_path("titanic", dir.path()),
            "survived,sex\n0,male\n1,female\n",
        )
        .unwrap();

        let df = load_dataset(&DatasetSource::Named("titanic".to_string()), dir.path()).unwrap();
        assert_eq!(df.shape(), (2, 2));
    }

    #[test]
    fn test_write_cleaned_csv_overwrites_and_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("titanic_cleaned.csv");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale content\n").unwrap();

        let df = df![
            "age" => [22.0, 38.0],
            "sex" => ["male", "female"],
        ]
        .unwrap();
        write_cleaned_csv(&df, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("age,sex"));
        assert_eq!(content.lines().count(), 3);
        assert!(!content.contains("stale"));
    }

    #[test]
    fn test_write_cleaned_csv_round_trips_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("cleaned.csv");
        let df = df![
            "fare" => [7.25, 71.28, 8.05],
            "alone" => [false, false, true],
        ]
        .unwrap();

        write_cleaned_csv(&df, &path).unwrap();
        let reloaded = load_csv_with_fallbacks(&path).unwrap();

        assert_eq!(reloaded.shape(), df.shape());
        assert_eq!(reloaded.column("alone").unwrap().dtype(), &DataType::Boolean);
    }

    #[test]
    fn test_write_into_file_path_parent_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let path = blocker.join("titanic_cleaned.csv");

        let df = df!["a" => [1i64]].unwrap();
        let err = write_cleaned_csv(&df, &path).unwrap_err();
        assert_eq!(err.error_code(), "WRITE_FAILED");
    }

    #[test]
    fn test_clean_csv_content_drops_blank_lines() {
        let cleaned = clean_csv_content("a,b\n\n1,2\n   \n3,4");
        assert_eq!(cleaned, "a,b\n1,2\n3,4");
    }
}
