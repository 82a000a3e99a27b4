//! Synthetic employee files shared by the integration tests

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::io::Write;
use tempfile::NamedTempFile;

pub const HEADER: &str = "employee_id,company_id,dept,seniority,salary,join_date,quit_date";

const DEPTS: [&str; 6] = [
    "customer_service",
    "data_science",
    "design",
    "engineer",
    "marketing",
    "sales",
];

/// Reference date used for generated records
pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 12, 13).unwrap()
}

/// `n` rows of plausible employee data, plus two seniority outliers
pub fn synthetic_rows(n: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let first_join = NaiveDate::from_ymd_opt(2011, 1, 24).unwrap();

    let mut rows: Vec<String> = (0..n)
        .map(|i| {
            let employee_id = 1000 + i as i64 * 7;
            let company_id = rng.gen_range(1..=4);
            let dept = DEPTS[rng.gen_range(0..DEPTS.len())];
            let seniority = rng.gen_range(1..30);
            let salary = (rng.gen_range(4..26) * 10_000) as f64;
            let join = first_join + Duration::days(rng.gen_range(0..1700));

            // lower salaries quit more often
            let quit_prob = if salary < 120_000.0 { 0.7 } else { 0.3 };
            let quit = if rng.gen_bool(quit_prob) {
                let date = join + Duration::days(rng.gen_range(120..900));
                (date < reference_date()).then_some(date)
            } else {
                None
            };

            format!(
                "{}.0,{},{},{},{:.1},{},{}",
                employee_id,
                company_id,
                dept,
                seniority,
                salary,
                join,
                quit.map(|d| d.to_string()).unwrap_or_default()
            )
        })
        .collect();

    rows.push("1.0,1,sales,98,80000.0,2013-01-01,".to_string());
    rows.push("2.0,2,engineer,99,180000.0,2012-06-01,2013-06-01".to_string());
    rows
}

pub fn write_csv(rows: &[String]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}
