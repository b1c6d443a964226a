//! CSV loading for training tables

use crate::error::{ForecastError, ForecastResult};
use crate::models::{Series, SERIES_LEN};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Read a numeric table with a header row; every row must have `width` columns
pub fn load_table(path: &Path, width: usize) -> ForecastResult<Vec<Vec<f64>>> {
    let file = File::open(path).map_err(|e| ForecastError::io(path, e))?;
    read_table(BufReader::new(file), width)
        .map_err(|e| annotate(e, &path.display().to_string()))
}

/// Read a table of full `SERIES_LEN`-point series
pub fn load_series(path: &Path) -> ForecastResult<Vec<Series>> {
    load_table(path, SERIES_LEN)?
        .into_iter()
        .map(|row| {
            Series::new(row).ok_or_else(|| {
                ForecastError::TrainingData(format!("{}: malformed series row", path.display()))
            })
        })
        .collect()
}

/// Parse a numeric table from any reader
pub fn read_table<R: Read>(reader: R, width: usize) -> ForecastResult<Vec<Vec<f64>>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ForecastError::TrainingData(e.to_string()))?;
        if record.len() != width {
            return Err(ForecastError::TrainingData(format!(
                "row {} has {} columns, expected {}",
                idx + 1,
                record.len(),
                width
            )));
        }

        let row = record
            .iter()
            .enumerate()
            .map(|(col, field)| {
                field
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        ForecastError::TrainingData(format!(
                            "row {} column {}: '{}' is not a number",
                            idx + 1,
                            col + 1,
                            field
                        ))
                    })
            })
            .collect::<ForecastResult<Vec<f64>>>()?;
        rows.push(row);
    }

    Ok(rows)
}

fn annotate(err: ForecastError, source: &str) -> ForecastError {
    match err {
        ForecastError::TrainingData(msg) => {
            ForecastError::TrainingData(format!("{}: {}", source, msg))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_table() {
        let csv = "a,b,c\n1,2,3\n4.5, 5 ,6\n";
        let rows = read_table(csv.as_bytes(), 3).unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0, 3.0], vec![4.5, 5.0, 6.0]]);
    }

    #[test]
    fn test_read_table_wrong_width() {
        let csv = "a,b\n1,2\n";
        let err = read_table(csv.as_bytes(), 3).unwrap_err();
        assert!(err.to_string().contains("expected 3"));
    }

    #[test]
    fn test_read_table_non_numeric() {
        let csv = "a,b\n1,x\n";
        let err = read_table(csv.as_bytes(), 2).unwrap_err();
        assert!(err.to_string().contains("'x' is not a number"));
    }

    #[test]
    fn test_load_series_file() {
        let mut file = NamedTempFile::new().unwrap();
        let header: Vec<String> = (1..=SERIES_LEN).map(|d| format!("day{}", d)).collect();
        writeln!(file, "{}", header.join(",")).unwrap();
        let row: Vec<String> = (0..SERIES_LEN).map(|d| d.to_string()).collect();
        writeln!(file, "{}", row.join(",")).unwrap();

        let series = load_series(file.path()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].values()[29], 29.0);
    }

    #[test]
    fn test_missing_file() {
        let err = load_table(Path::new("/nonexistent/table.csv"), 7).unwrap_err();
        assert!(matches!(err, ForecastError::Io { .. }));
    }
}
