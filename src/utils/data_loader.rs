//! Employee file loading
//!
//! The file is read through polars with every column as text; each field is
//! then parsed explicitly so a failure can name its row and column.

use crate::dataset::{EmployeeRecord, EmployeeTable};
use crate::error::{Result, RetentionError};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Columns the loader requires; others are ignored
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "employee_id",
    "company_id",
    "seniority",
    "salary",
    "dept",
    "join_date",
    "quit_date",
];

/// Tokens read as a missing `quit_date`
const NULL_TOKENS: [&str; 6] = ["", "na", "nan", "nat", "null", "none"];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Loader for the employee retention CSV
pub struct EmployeeLoader {
    /// Field separator
    delimiter: u8,
}

impl Default for EmployeeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EmployeeLoader {
    /// Create a new loader for comma separated files
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Set the field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read the raw file with every column as a string
    pub fn load_raw(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| RetentionError::DataError(format!("{}: {}", path.display(), e)))
    }

    /// Load, parse and index the employee records
    pub fn load(&self, path: &Path) -> Result<EmployeeTable> {
        let start = Instant::now();
        let df = self.load_raw(path)?;
        let table = Self::parse_frame(&df)?;

        info!(
            path = %path.display(),
            rows = table.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded employee records"
        );
        Ok(table)
    }

    /// Convert an all-string frame into typed records
    pub fn parse_frame(df: &DataFrame) -> Result<EmployeeTable> {
        let columns: Vec<Vec<Option<&str>>> = REQUIRED_COLUMNS
            .iter()
            .map(|&name| {
                let column = df
                    .column(name)
                    .map_err(|_| RetentionError::MissingColumn(name.to_string()))?;
                let values = column
                    .str()
                    .map_err(|e| RetentionError::DataError(format!("column '{}': {}", name, e)))?;
                Ok(values.into_iter().collect())
            })
            .collect::<Result<_>>()?;

        let [ids, companies, seniorities, salaries, depts, joins, quits] = match columns.as_slice() {
            [a, b, c, d, e, f, g] => [a, b, c, d, e, f, g],
            _ => return Err(RetentionError::DataError("unexpected column layout".to_string())),
        };

        let records = (0..df.height())
            .map(|i| {
                let row = i + 1;
                Ok(EmployeeRecord {
                    employee_id: parse_integral(row, "employee_id", ids[i])?,
                    company_id: parse_integral(row, "company_id", companies[i])?,
                    seniority: parse_integral(row, "seniority", seniorities[i])?,
                    salary: parse_float(row, "salary", salaries[i])?,
                    dept: required(row, "dept", depts[i])?.to_string(),
                    join_date: parse_date(row, "join_date", required(row, "join_date", joins[i])?)?,
                    quit_date: match quits[i].map(str::trim) {
                        Some(raw) if !is_null_token(raw) => Some(parse_date(row, "quit_date", raw)?),
                        _ => None,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        EmployeeTable::new(records)
    }
}

fn is_null_token(raw: &str) -> bool {
    NULL_TOKENS.iter().any(|t| raw.eq_ignore_ascii_case(t))
}

fn required<'a>(row: usize, column: &str, raw: Option<&'a str>) -> Result<&'a str> {
    match raw.map(str::trim) {
        Some(value) if !is_null_token(value) => Ok(value),
        _ => Err(RetentionError::load(row, column, "missing value")),
    }
}

fn parse_float(row: usize, column: &str, raw: Option<&str>) -> Result<f64> {
    let value = required(row, column, raw)?;
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RetentionError::load(row, column, format!("not a number: '{}'", value)))
}

/// Integer column that may have been exported as `13021.0`
fn parse_integral(row: usize, column: &str, raw: Option<&str>) -> Result<i64> {
    let value = required(row, column, raw)?;
    if let Ok(parsed) = value.parse::<i64>() {
        return Ok(parsed);
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
        _ => Err(RetentionError::load(row, column, format!("not an integer: '{}'", value))),
    }
}

/// `YYYY-MM-DD`, tolerating a trailing time component
fn parse_date(row: usize, column: &str, raw: &str) -> Result<NaiveDate> {
    let date_part = match raw.char_indices().nth(10) {
        Some((idx, ' ' | 'T')) => &raw[..idx],
        _ => raw,
    };
    NaiveDate::parse_from_str(date_part, DATE_FORMAT)
        .map_err(|e| RetentionError::load(row, column, format!("invalid date '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "employee_id,company_id,dept,seniority,salary,join_date,quit_date";

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = write_csv(&[
            "13021.0,7,customer_service,28,89000.0,2014-03-24,2015-10-30",
            "825355.0,7,marketing,20,183000.0,2013-04-29,2014-04-04",
            "927315.0,4,marketing,14,101000.0,2014-10-13,",
        ]);
        let table = EmployeeLoader::new().load(file.path()).unwrap();

        assert_eq!(table.len(), 3);
        let first = &table.records()[0];
        assert_eq!(first.employee_id, 13021);
        assert_eq!(first.dept, "customer_service");
        assert_eq!(first.salary, 89000.0);
        assert_eq!(first.quit_date, NaiveDate::from_ymd_opt(2015, 10, 30));
        assert!(table.get(927315).unwrap().quit_date.is_none());
    }

    #[test]
    fn test_null_tokens_and_timestamps() {
        let file = write_csv(&[
            "1,1,sales,3,50000,2013-01-01 00:00:00,NaN",
            "2,1,sales,3,50000,2013-01-01,NA",
            "3,1,sales,3,50000,2013-01-01,2014-02-02T00:00:00",
        ]);
        let table = EmployeeLoader::new().load(file.path()).unwrap();

        assert!(table.get(1).unwrap().quit_date.is_none());
        assert!(table.get(2).unwrap().quit_date.is_none());
        assert_eq!(table.get(3).unwrap().quit_date, NaiveDate::from_ymd_opt(2014, 2, 2));
        assert_eq!(table.get(1).unwrap().join_date, NaiveDate::from_ymd_opt(2013, 1, 1).unwrap());
    }

    #[test]
    fn test_bad_date_names_row_and_column() {
        let file = write_csv(&[
            "1,1,sales,3,50000,2013-01-01,",
            "2,1,sales,3,50000,2013-13-01,",
        ]);
        let err = EmployeeLoader::new().load(file.path()).unwrap_err();
        match err {
            RetentionError::Load { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "join_date");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_fractional_id_rejected() {
        let file = write_csv(&["1.5,1,sales,3,50000,2013-01-01,"]);
        let err = EmployeeLoader::new().load(file.path()).unwrap_err();
        assert!(matches!(err, RetentionError::Load { ref column, .. } if column == "employee_id"));
    }

    #[test]
    fn test_missing_column() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "employee_id,company_id,dept,seniority,join_date,quit_date").unwrap();
        writeln!(file, "1,1,sales,3,2013-01-01,").unwrap();
        file.flush().unwrap();

        let err = EmployeeLoader::new().load(file.path()).unwrap_err();
        assert!(matches!(err, RetentionError::MissingColumn(ref c) if c == "salary"));
    }

    #[test]
    fn test_duplicate_employee() {
        let file = write_csv(&[
            "4,1,sales,3,50000,2013-01-01,",
            "4,2,design,5,60000,2012-01-01,",
        ]);
        let err = EmployeeLoader::new().load(file.path()).unwrap_err();
        assert!(matches!(err, RetentionError::DuplicateEmployee(4)));
    }

    #[test]
    fn test_missing_file() {
        let err = EmployeeLoader::new()
            .load(Path::new("/nonexistent/employee_retention_data.csv"))
            .unwrap_err();
        assert!(matches!(err, RetentionError::IoError(_)));
    }

    #[test]
    fn test_semicolon_delimiter() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "{}", HEADER.replace(',', ";")).unwrap();
        writeln!(file, "1;1;sales;3;50000;2013-01-01;").unwrap();
        file.flush().unwrap();

        let table = EmployeeLoader::new().with_delimiter(b';').load(file.path()).unwrap();
        assert_eq!(table.len(), 1);
    }
}
