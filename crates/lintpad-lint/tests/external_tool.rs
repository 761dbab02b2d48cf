#![cfg(unix)]

use lintpad_core::Severity;
use lintpad_lint::{
    AnalysisError, AnalysisRequest, AnalysisRunner, CancelToken, ColumnBase, DiagnosticsSession,
    ExternalTool, InputMode, OutputFormat, SessionEvent, ToolConfig,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn sh(script: &str) -> ToolConfig {
    ToolConfig::new(
        "sh",
        vec![
            "-c".to_string(),
            script.to_string(),
            "sh".to_string(),
            "{file}".to_string(),
            "{language}".to_string(),
        ],
    )
}

fn request(text: &str) -> AnalysisRequest {
    AnalysisRequest {
        version: 1,
        text: text.to_string(),
        language: "python".to_string(),
    }
}

#[test]
fn test_json_output_from_temp_file_tool() {
    let mut config = sh(
        r#"test -f "$1" && test "$2" = python && printf '%s' '[{"type": "error", "line": 2, "column": 4, "message": "bad", "message-id": "E0001", "symbol": "syntax-error"}]'"#,
    );
    config.file_suffix = Some(".py".to_string());
    let tool = ExternalTool::new(config);

    let diagnostics = tool
        .run(&request("a = 1\nb = (\n"), &CancelToken::new())
        .unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, Some(4)));
    assert_eq!(diagnostics[0].symbol.as_deref(), Some("syntax-error"));
}

#[test]
fn test_text_output_reads_the_analyzed_file() {
    let mut config = sh(
        r#"grep -n TODO "$1" | cut -d: -f1 | while read n; do echo "x.py:$n: warning (W0511, fixme) todo found"; done"#,
    );
    config.output = OutputFormat::Text;
    let tool = ExternalTool::new(config);

    let diagnostics = tool
        .run(&request("a = 1\n# TODO later\nb = 2\n# TODO\n"), &CancelToken::new())
        .unwrap();
    let lines: Vec<usize> = diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![1, 3]);
    assert!(diagnostics.iter().all(|d| d.code.as_deref() == Some("W0511")));
}

#[test]
fn test_stdin_input() {
    let mut config = ToolConfig::new(
        "sh",
        vec![
            "-c".to_string(),
            r#"n=0; while IFS= read -r l; do n=$((n+1)); case "$l" in *print*) echo "-:$n:1: convention uses print";; esac; done"#.to_string(),
        ],
    );
    config.input = InputMode::Stdin;
    config.output = OutputFormat::Text;
    config.column_base = ColumnBase::One;
    let tool = ExternalTool::new(config);

    let diagnostics = tool
        .run(&request("x = 1\nprint(x)\n"), &CancelToken::new())
        .unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Convention);
    assert_eq!((diagnostics[0].line, diagnostics[0].column), (1, Some(0)));
    assert_eq!(diagnostics[0].message, "uses print");
}

#[test]
fn test_rejected_exit_code() {
    let tool = ExternalTool::new(sh("echo broken >&2; exit 3"));
    let error = tool.run(&request("x"), &CancelToken::new()).unwrap_err();
    assert_eq!(
        error,
        AnalysisError::UnexpectedExit {
            code: Some(3),
            stderr: "broken".to_string()
        }
    );
}

#[test]
fn test_accepted_nonzero_exit_code() {
    let mut config = sh("echo '[]'; exit 4");
    config.accepted_exit_codes = (0..=31).collect();
    let tool = ExternalTool::new(config);
    assert_eq!(tool.run(&request("x"), &CancelToken::new()).unwrap(), vec![]);
}

#[test]
fn test_missing_module_with_accepted_exit_fails() {
    let mut config = sh("echo '/usr/bin/python3: No module named pylint' >&2; exit 1");
    config.accepted_exit_codes = (0..=31).collect();
    let tool = ExternalTool::new(config);

    assert_eq!(tool.check_available(), Ok(()));
    assert_eq!(
        tool.run(&request("import os\n"), &CancelToken::new()),
        Err(AnalysisError::Unavailable(
            "/usr/bin/python3: No module named pylint".to_string()
        ))
    );
}

#[test]
fn test_silent_accepted_nonzero_exit_fails() {
    let mut config = sh("echo 'internal error' >&2; exit 2");
    config.accepted_exit_codes = (0..=31).collect();
    let tool = ExternalTool::new(config);
    assert_eq!(
        tool.run(&request("x"), &CancelToken::new()),
        Err(AnalysisError::UnexpectedExit {
            code: Some(2),
            stderr: "internal error".to_string()
        })
    );
}

#[test]
fn test_silent_clean_exit_has_no_diagnostics() {
    let mut config = sh("exit 0");
    config.output = OutputFormat::Text;
    let tool = ExternalTool::new(config);
    assert_eq!(tool.run(&request("x"), &CancelToken::new()), Ok(vec![]));
}

#[test]
fn test_inherited_output_pipe_does_not_outlive_deadline() {
    let tool =
        ExternalTool::new(sh("sleep 10 & echo '[]'")).with_timeout(Duration::from_millis(300));
    let started = Instant::now();
    assert_eq!(
        tool.run(&request("x"), &CancelToken::new()),
        Err(AnalysisError::Timeout(Duration::from_millis(300)))
    );
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_slow_tool_is_killed_on_timeout() {
    let tool = ExternalTool::new(sh("sleep 10")).with_timeout(Duration::from_millis(100));
    let started = Instant::now();
    let error = tool.run(&request("x"), &CancelToken::new()).unwrap_err();
    assert_eq!(error, AnalysisError::Timeout(Duration::from_millis(100)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_cancel_kills_running_tool() {
    let tool = ExternalTool::new(sh("sleep 10"));
    let cancel = CancelToken::new();
    let trip = cancel.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        trip.cancel();
    });
    let started = Instant::now();
    assert_eq!(
        tool.run(&request("x"), &cancel).unwrap_err(),
        AnalysisError::Cancelled
    );
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_session_with_external_tool() {
    let tool = ExternalTool::new(sh(
        r#"printf '%s' '[{"type": "warning", "line": 1, "column": 0, "message": "w"}]'"#,
    ));
    let mut session = DiagnosticsSession::new(Arc::new(tool));
    let handle = session.request(request("import os\n"));
    let events = session.wait(Duration::from_secs(5));
    assert!(matches!(
        &events[..],
        [SessionEvent::Completed { handle: h, diagnostics, .. }] if *h == handle && diagnostics.len() == 1
    ));
}
