use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn run_chunkmap(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chunkmap"))
        .args(args)
        .output()
        .expect("Failed to execute chunkmap")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path is UTF-8")
}

#[test]
fn test_square_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("numbers.txt");
    let output = dir.path().join("squares.txt");

    let numbers: Vec<String> = (1..=1000).map(|n| n.to_string()).collect();
    fs::write(&input, numbers.join("\n")).expect("Failed to create input");

    // Small batches force several mapper calls
    let result = run_chunkmap(&[
        path_str(&input),
        "-o",
        path_str(&output),
        "-b",
        "64",
        "-q",
    ]);

    if !result.status.success() {
        eprintln!("stdout: {}", String::from_utf8_lossy(&result.stdout));
        eprintln!("stderr: {}", String::from_utf8_lossy(&result.stderr));
        panic!("chunkmap failed");
    }

    let text = fs::read_to_string(&output).expect("Failed to read output file");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1000);
    assert_eq!(lines[0], "1");
    assert_eq!(lines[6], "49");
    assert_eq!(lines[999], "1000000");
}

#[test]
fn test_default_output_path_and_sequential_flag() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("words.txt");
    fs::write(&input, "abc\nHello\nxyz\n").unwrap();

    let result = run_chunkmap(&[path_str(&input), "-f", "upper", "--sequential", "-q"]);
    assert!(result.status.success());

    let text = fs::read_to_string(dir.path().join("words.out")).unwrap();
    assert_eq!(text, "ABC\nHELLO\nXYZ\n");
}

#[test]
fn test_bad_line_reports_line_number() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mixed.txt");
    let output = dir.path().join("mixed.out");
    fs::write(&input, "1\n2\nnope\n4\n5\n6\n").unwrap();

    let result = run_chunkmap(&[path_str(&input), "-o", path_str(&output), "-q"]);
    assert!(!result.status.success());

    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("line 3"), "stderr: {}", stderr);
    assert!(stderr.contains("parallel map failed in chunk 1"), "stderr: {}", stderr);
}

#[test]
fn test_empty_input_produces_empty_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.txt");
    let output = dir.path().join("empty.out");
    fs::write(&input, "").unwrap();

    let result = run_chunkmap(&[path_str(&input), "-o", path_str(&output), "-q"]);
    assert!(result.status.success());
    assert_eq!(fs::read_to_string(&output).unwrap(), "");
}

#[test]
fn test_rejects_same_input_and_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("same.txt");
    fs::write(&input, "1\n").unwrap();

    let result = run_chunkmap(&[path_str(&input), "-o", path_str(&input), "-q"]);
    assert!(!result.status.success());
    assert_eq!(fs::read_to_string(&input).unwrap(), "1\n");
}

#[test]
fn test_status_line_uses_flag_name() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("words.txt");
    fs::write(&input, "abc\n").unwrap();

    let result = run_chunkmap(&[path_str(&input), "-f", "reverse"]);
    assert!(result.status.success());

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Mapping reverse over"), "stdout: {}", stdout);
}
