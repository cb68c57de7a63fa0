use std::fs;

use genconsole_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_nested_output_dir() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("exports").join("branding");
    assert!(!nested.exists());
    ensure_output_dir(&nested).unwrap();
    assert!(nested.is_dir());
}

#[test]
fn rewriting_a_snapshot_replaces_its_content() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("branding.ron", "(phase: Generating)").unwrap();
    let second = writer.write("branding.ron", b"(phase: Completed)").unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "(phase: Completed)");
    let entries = fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(entries, 1, "no temp files left behind");
}

#[test]
fn file_in_place_of_dir_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("logo.svg", "<svg/>");
    assert!(matches!(result, Err(PersistError::OutputDir(_))));
    assert!(!file_path.with_file_name("logo.svg").exists());
}
