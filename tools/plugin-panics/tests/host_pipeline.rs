use plugin_panics::run_with_runtime;
use plugin_panics::runtime::{FakeFileSystem, FakeTerminal, FileSystem, ProductionRuntime};
use plugin_panics::template::REPORT_OVERHEAD_LINES;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

fn runtime_with_files(
    files: Vec<(&str, String)>,
) -> (ProductionRuntime, FakeFileSystem, FakeTerminal) {
    let fs = FakeFileSystem::default();
    for (path, content) in files {
        fs.write_string(Path::new(path), &content).expect("seed file");
    }
    let terminal = FakeTerminal::default();
    let runtime = ProductionRuntime {
        file_system: Arc::new(fs.clone()),
        terminal: Arc::new(terminal.clone()),
    };
    (runtime, fs, terminal)
}

fn args(values: &[&str]) -> Vec<OsString> {
    std::iter::once("plugin-panics")
        .chain(values.iter().copied())
        .map(OsString::from)
        .collect()
}

#[test]
fn two_line_panic_is_reported_verbatim() {
    let (runtime, _fs, terminal) = runtime_with_files(vec![(
        "/work/test.stderr",
        "[INFO] starting\npanic: test\n  stack info\n".to_string(),
    )]);
    let code = run_with_runtime(
        &args(&["--plugin", "test=test.stderr"]),
        Path::new("/work"),
        &runtime,
    )
    .expect("run");
    assert_eq!(code, 0);

    let lines = terminal.written_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("Stack trace from the test plugin:\n\npanic: test\n  stack info\n\n"));
}

#[test]
fn flood_is_truncated_in_the_written_report() {
    let mut capture = String::from("panic: flood\n");
    for i in 0..5_000 {
        capture.push_str(&format!("LINE: {i}\n"));
    }
    let (runtime, fs, _terminal) = runtime_with_files(vec![
        ("/work/flood.stderr", capture),
        ("/work/cfg.toml", "[capture]\nmax_lines = 30\n".to_string()),
    ]);

    run_with_runtime(
        &args(&[
            "--config",
            "cfg.toml",
            "--report",
            "out/crash.log",
            "--plugin",
            "flood=flood.stderr",
        ]),
        Path::new("/work"),
        &runtime,
    )
    .expect("run");

    let report = fs.read_to_string(Path::new("/work/out/crash.log")).expect("report");
    assert!(report.lines().count() <= 30 + REPORT_OVERHEAD_LINES);
    assert!(report.contains("panic: flood\nLINE: 0\n"));
    assert!(report.contains("... 4971 lines omitted ..."));
    assert!(report.contains("LINE: 4999\n"));
}

#[test]
fn reports_follow_command_line_order() {
    let (runtime, _fs, terminal) = runtime_with_files(vec![
        ("/w/b.stderr", "panic: b\n".to_string()),
        ("/w/a.stderr", "fatal error: a\n".to_string()),
    ]);
    run_with_runtime(
        &args(&["--plugin", "bravo=b.stderr", "--plugin", "alpha=a.stderr"]),
        Path::new("/w"),
        &runtime,
    )
    .expect("run");

    let lines = terminal.written_lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("bravo plugin"));
    assert!(lines[1].contains("alpha plugin"));
}

#[test]
fn same_plugin_named_twice_merges_into_one_report() {
    let (runtime, _fs, terminal) = runtime_with_files(vec![
        ("/w/out", "panic: shared\n".to_string()),
        ("/w/err", "ignored\n".to_string()),
    ]);
    run_with_runtime(
        &args(&["--plugin", "p=out", "--plugin", "p=err"]),
        Path::new("/w"),
        &runtime,
    )
    .expect("run");
    assert_eq!(terminal.written_lines().len(), 1);
}

#[test]
fn missing_capture_file_is_an_error() {
    let (runtime, _fs, terminal) = runtime_with_files(vec![]);
    let err = run_with_runtime(&args(&["--plugin", "p=nope"]), Path::new("/w"), &runtime)
        .expect_err("missing");
    assert!(format!("{err}").contains("missing file"));
    assert!(terminal.written_lines().is_empty());
}

#[test]
fn invalid_utf8_capture_does_not_hide_other_reports() {
    let (runtime, fs, terminal) = runtime_with_files(vec![(
        "/w/good.stderr",
        "panic: good\n  main.go:7\n".to_string(),
    )]);
    fs.write_bytes(
        "/w/bad.stderr",
        b"[INFO] boot\npanic: bad \xff\xfe\r\ngoroutine 1 [running]:\r\n".to_vec(),
    );

    let code = run_with_runtime(
        &args(&["--plugin", "good=good.stderr", "--plugin", "bad=bad.stderr"]),
        Path::new("/w"),
        &runtime,
    )
    .expect("run");
    assert_eq!(code, 0);

    let lines = terminal.written_lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("good plugin"));
    assert!(lines[1].contains("panic: bad \u{fffd}\u{fffd}\ngoroutine 1 [running]:\n"));
    assert!(!lines[1].contains('\r'));
}
