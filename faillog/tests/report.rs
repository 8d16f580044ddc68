use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("faillog-{}-{name}", std::process::id()))
}

#[tokio::test]
async fn report_json_lines_to_log_file() -> eyre::Result<()> {
    let log = scratch("tests.log");
    let config = scratch("faillog.toml");
    let input = scratch("failures.jsonl");
    let _ = std::fs::remove_file(&log);

    std::fs::write(
        &config,
        format!(
            r#"
channel = "ci"
report_url = "http://ci.example.com"

[handlers.StreamHandler]
path = {log:?}
"#
        ),
    )?;
    std::fs::write(
        &input,
        [
            r##"{"type": "plain", "id": "UserCest:testCreate", "name": "UserCest:testCreate", "outcome": "error", "message": "connection refused", "trace": "#0 UserCest.php(7)"}"##,
            r#"{"type": "scenario", "id": "LoginCest:testLogin", "name": "LoginCest:testLogin", "outcome": "incomplete", "message": "element not found", "scenario": {"feature": "login", "steps": [{"action": "am on page", "executed": true}, {"action": "click button", "executed": false}]}}"#,
        ]
        .join("\n"),
    )?;

    faillog::App::new()
        .run_from([
            "faillog".into(),
            "report".into(),
            "--input".into(),
            input.clone().into_os_string(),
            "--config".into(),
            config.clone().into_os_string(),
        ])
        .await?;

    let written = std::fs::read_to_string(&log)?;
    for path in [&log, &config, &input] {
        std::fs::remove_file(path)?;
    }

    let lines: Vec<_> = written.lines().collect();
    assert_eq!(lines.len(), 6, "{written}");
    assert!(lines[0].contains("] ci.ERROR: Test UserCest:testCreate failed. "), "{written}");
    assert_eq!(lines[1], "Message: connection refused.");
    assert!(lines[2].starts_with("Trace: #0 UserCest.php(7) {\"Report   HTML   Screenshot\":"));
    assert!(lines[2].contains("<http://ci.example.com/report.html|  Link>"));
    assert!(lines[3].contains("] ci.WARNING: Test LoginCest:testLogin failed. "), "{written}");
    assert_eq!(
        lines[4],
        "Message: Tried to login but failed when I wanted to click button (element not found)."
    );
    assert!(lines[5].starts_with("Trace:  {\"Report   HTML   Screenshot\":"), "{written}");
    Ok(())
}
