//! SQLite Database capability and the ordered multi-file load protocol.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use diesel::{Connection, SqliteConnection, connection::SimpleConnection};
use tempfile::TempDir;

use etl_core::{
    database::{Database, DatabaseError, SqliteDatabase},
    stages::{ClearMode, LoadJob, export_jobs, run_load_jobs},
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn make_db(dir: &TempDir, name: &str, schema_sql: &str) -> String {
    let url = dir.path().join(name).to_string_lossy().to_string();
    let mut conn = SqliteConnection::establish(&url).expect("establish");
    conn.batch_execute(schema_sql).expect("schema");
    url
}

fn write_csv(path: &Path, lines: &[&str]) {
    fs::write(path, format!("{}\n", lines.join("\n"))).expect("write csv");
}

#[test]
fn bulk_load_counts_and_per_date_deletes() {
    let dir = TempDir::new().unwrap();
    let url = make_db(
        &dir,
        "wh.db",
        "CREATE TABLE fact_product_price (product TEXT, price TEXT, load_date TEXT);",
    );
    let csv_path = dir.path().join("facts.csv");
    write_csv(
        &csv_path,
        &[
            "product,price,load_date",
            "cabbage,12000,2025-01-05",
            "carrot,18500,2025-01-05",
            "tomato,25000,2025-01-06",
        ],
    );

    let mut db = SqliteDatabase::new(&url, None);
    assert_eq!(db.bulk_load_csv("fact_product_price", &csv_path).unwrap(), 3);
    assert_eq!(db.count_rows("fact_product_price").unwrap(), 3);
    assert_eq!(
        db.count_rows_for_date("fact_product_price", date(2025, 1, 5)).unwrap(),
        2
    );

    assert_eq!(
        db.delete_rows_for_date("fact_product_price", date(2025, 1, 5)).unwrap(),
        2
    );
    assert_eq!(db.count_rows("fact_product_price").unwrap(), 1);
}

#[test]
fn bulk_load_rejects_hostile_headers() {
    let dir = TempDir::new().unwrap();
    let url = make_db(&dir, "wh.db", "CREATE TABLE t (a TEXT);");
    let csv_path = dir.path().join("bad.csv");
    write_csv(&csv_path, &["a); DROP TABLE t;--", "1"]);

    let mut db = SqliteDatabase::new(&url, None);
    let err = db.bulk_load_csv("t", &csv_path).unwrap_err();
    assert!(matches!(err, DatabaseError::InvalidIdentifier(_)));
}

#[test]
fn procedure_scripts_receive_date_and_clean_flag() {
    let dir = TempDir::new().unwrap();
    let url = make_db(&dir, "wh.db", "CREATE TABLE marks (load_date TEXT, cleaned TEXT);");

    let procedures = dir.path().join("procedures");
    fs::create_dir_all(&procedures).unwrap();
    fs::write(
        procedures.join("refresh_weekly_aggregate.sql"),
        "DELETE FROM marks;\nINSERT INTO marks (load_date, cleaned) VALUES (:run_date, :clean);\n",
    )
    .unwrap();

    let mut db = SqliteDatabase::new(&url, Some(procedures));
    db.call_procedure("refresh_weekly_aggregate", date(2025, 1, 5), Some(true))
        .unwrap();

    assert_eq!(db.count_rows("marks").unwrap(), 1);
    assert_eq!(db.count_rows_for_date("marks", date(2025, 1, 5)).unwrap(), 1);
}

#[test]
fn unknown_procedures_are_reported_by_name() {
    let dir = TempDir::new().unwrap();
    let url = make_db(&dir, "wh.db", "CREATE TABLE t (a TEXT);");

    let mut db = SqliteDatabase::new(&url, Some(dir.path().join("procedures")));
    let err = db
        .call_procedure("no_such_procedure", date(2025, 1, 5), None)
        .unwrap_err();
    match err {
        DatabaseError::UnknownProcedure(name) => assert_eq!(name, "no_such_procedure"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn export_roundtrips_through_csv() {
    let dir = TempDir::new().unwrap();
    let url = make_db(
        &dir,
        "stg.db",
        "CREATE TABLE exp_fact (product TEXT, price TEXT, load_date TEXT);
         INSERT INTO exp_fact VALUES ('cabbage', '12000', '2025-01-05');
         INSERT INTO exp_fact VALUES ('carrot', '18500', '2025-01-06');",
    );
    let out = dir.path().join("export_fact_2025-01-05.csv");

    let mut db = SqliteDatabase::new(&url, None);
    assert_eq!(db.export_table_csv("exp_fact", None, &out).unwrap(), 2);

    let text = fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("product,price,load_date"));
    assert_eq!(lines.next(), Some("cabbage,12000,2025-01-05"));

    let filtered = dir.path().join("export_fact_filtered.csv");
    assert_eq!(
        db.export_table_csv("exp_fact", Some(date(2025, 1, 6)), &filtered).unwrap(),
        1
    );
}

fn job_list() -> [LoadJob; 3] {
    [
        LoadJob {
            source_table: "exp_first",
            target_table: "t_first",
            file_stem: "j1",
            clear: ClearMode::Truncate,
        },
        LoadJob {
            source_table: "exp_second",
            target_table: "t_second",
            file_stem: "j2",
            clear: ClearMode::Append,
        },
        LoadJob {
            source_table: "exp_third",
            target_table: "t_third",
            file_stem: "j3",
            clear: ClearMode::Truncate,
        },
    ]
}

#[test]
fn missing_csv_aborts_the_job_list_without_rollback() {
    let dir = TempDir::new().unwrap();
    let url = make_db(
        &dir,
        "mart.db",
        "CREATE TABLE t_first (v TEXT, load_date TEXT);
         INSERT INTO t_first VALUES ('stale', '2024-12-01');
         CREATE TABLE t_second (v TEXT, load_date TEXT);
         CREATE TABLE t_third (v TEXT, load_date TEXT);
         INSERT INTO t_third VALUES ('sentinel', '2024-12-01');",
    );
    let temp = dir.path().join("temp");
    fs::create_dir_all(&temp).unwrap();
    let day = date(2025, 1, 5);

    // CSVs for jobs 1 and 3 exist; job 2's is missing.
    write_csv(&temp.join("j1_2025-01-05.csv"), &["v,load_date", "fresh,2025-01-05"]);
    write_csv(&temp.join("j3_2025-01-05.csv"), &["v,load_date", "never,2025-01-05"]);

    let mut db = SqliteDatabase::new(&url, None);
    let err = run_load_jobs(&mut db, &job_list(), day, &temp).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("j2_2025-01-05.csv"), "error names job 2's file: {message}");
    assert!(message.contains("t_second"));

    // Job 1 was applied and is not rolled back: the stale row is gone.
    assert_eq!(db.count_rows("t_first").unwrap(), 1);
    assert_eq!(db.count_rows_for_date("t_first", day).unwrap(), 1);
    // Job 3 was never attempted: the sentinel row survived untouched.
    assert_eq!(db.count_rows("t_third").unwrap(), 1);
    assert_eq!(db.count_rows_for_date("t_third", date(2024, 12, 1)).unwrap(), 1);
}

#[test]
fn export_then_load_moves_rows_between_stores() {
    let dir = TempDir::new().unwrap();
    let source_url = make_db(
        &dir,
        "stg.db",
        "CREATE TABLE exp_first (v TEXT, load_date TEXT);
         INSERT INTO exp_first VALUES ('a', '2025-01-05');
         CREATE TABLE exp_second (v TEXT, load_date TEXT);
         INSERT INTO exp_second VALUES ('b', '2025-01-05');
         INSERT INTO exp_second VALUES ('c', '2025-01-05');
         CREATE TABLE exp_third (v TEXT, load_date TEXT);",
    );
    let target_url = make_db(
        &dir,
        "mart.db",
        "CREATE TABLE t_first (v TEXT, load_date TEXT);
         CREATE TABLE t_second (v TEXT, load_date TEXT);
         CREATE TABLE t_third (v TEXT, load_date TEXT);",
    );
    let temp = dir.path().join("temp");
    fs::create_dir_all(&temp).unwrap();
    let day = date(2025, 1, 5);

    let mut source = SqliteDatabase::new(&source_url, None);
    let mut target = SqliteDatabase::new(&target_url, None);

    let exported = export_jobs(&mut source, &job_list(), day, &temp).unwrap();
    assert_eq!(exported, 3);

    let loaded = run_load_jobs(&mut target, &job_list(), day, &temp).unwrap();
    assert_eq!(loaded, 3);
    assert_eq!(target.count_rows("t_second").unwrap(), 2);
    assert_eq!(target.count_rows("t_third").unwrap(), 0);
}

#[test]
fn clean_temp_csvs_only_touches_the_dates_files() {
    let dir = TempDir::new().unwrap();
    let temp: PathBuf = dir.path().join("temp");
    fs::create_dir_all(&temp).unwrap();
    write_csv(&temp.join("export_fact_2025-01-05.csv"), &["v", "1"]);
    write_csv(&temp.join("export_fact_2025-01-06.csv"), &["v", "1"]);
    fs::write(temp.join("notes_2025-01-05.txt"), "keep me").unwrap();

    let removed = etl_core::stages::clean_temp_csvs(&temp, date(2025, 1, 5)).unwrap();
    assert_eq!(removed, 1);
    assert!(temp.join("export_fact_2025-01-06.csv").exists());
    assert!(temp.join("notes_2025-01-05.txt").exists());
}
