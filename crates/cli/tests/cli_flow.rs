use apidesk_test_support::TestServer;
use serde_json::{Value, json};
use std::path::Path;
use std::process::Output;
use tokio::process::Command;

async fn apidesk(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_apidesk"))
        .arg("--config")
        .arg(config)
        .arg("--no-color")
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .await
        .expect("run apidesk")
}

fn stdout_json(out: &Output) -> Value {
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("stdout is JSON")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn import_test_and_history_round_trip() {
    let server = TestServer::spawn_echo().await.expect("server");
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("config.json");
    let history = dir.path().join("history.jsonl");
    let import_doc = dir.path().join("import.json");
    let bundle = dir.path().join("bundle.json");
    let report = dir.path().join("report.json");

    let out = apidesk(
        &config,
        &["config", "set", "historyPath", history.to_str().expect("utf8 path")],
    )
    .await;
    assert_eq!(stdout_json(&out)["historyPath"], history.to_str().expect("utf8 path"));

    std::fs::write(
        &import_doc,
        json!({
            "name": "Echo",
            "base_url": server.base_url(),
            "endpoints": [
                {"name": "Create", "path": "/items", "method": "POST",
                 "headers": {"X-Source": "import"}, "body_template": {"n": 1}}
            ]
        })
        .to_string(),
    )
    .expect("write import");

    let out = apidesk(
        &config,
        &[
            "import",
            import_doc.to_str().expect("utf8 path"),
            "--out",
            bundle.to_str().expect("utf8 path"),
        ],
    )
    .await;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let written: Value =
        serde_json::from_slice(&std::fs::read(&bundle).expect("bundle")).expect("bundle json");
    let api_id = written["api"]["id"].as_str().expect("api id").to_string();

    let out = apidesk(
        &config,
        &[
            "test",
            "--bundle",
            bundle.to_str().expect("utf8 path"),
            "--endpoint",
            "create",
            "-H",
            "X-Extra: yes",
            "--report",
            report.to_str().expect("utf8 path"),
            "--json",
        ],
    )
    .await;
    let result = stdout_json(&out);
    assert_eq!(result["success"], true);
    assert_eq!(result["status"], 200);
    let echoed: Value =
        serde_json::from_str(result["body_text"].as_str().expect("body")).expect("echo json");
    assert_eq!(echoed["path"], "/items");
    assert_eq!(echoed["headers"]["x-source"], "import");
    assert_eq!(echoed["headers"]["x-extra"], "yes");
    assert_eq!(echoed["body"], r#"{"n":1}"#);

    let report: Value =
        serde_json::from_slice(&std::fs::read(&report).expect("report")).expect("report json");
    assert_eq!(report["api"], "Echo");
    assert_eq!(report["request"]["method"], "POST");
    assert_eq!(report["response"]["status"], 200);

    let out = apidesk(&config, &["history", &api_id, "--json"]).await;
    let entries = stdout_json(&out);
    assert_eq!(entries.as_array().map(Vec::len), Some(1));
    assert_eq!(entries[0]["api_id"], api_id.as_str());
    assert!(
        entries[0]["result"]["curl_equivalent"]
            .as_str()
            .is_some_and(|c| c.starts_with("curl -X POST"))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn curl_parse_and_render_are_inverse() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("config.json");
    let command = dir.path().join("cmd.txt");
    std::fs::write(
        &command,
        r#"curl -X PUT "https://api.test/items/7" -H "Accept: application/json" -d '{"name":"it'\''s"}'"#,
    )
    .expect("write");

    let out = apidesk(&config, &["curl", "parse", command.to_str().expect("utf8 path")]).await;
    let request = stdout_json(&out);
    assert_eq!(request["method"], "PUT");
    assert_eq!(request["url"], "https://api.test/items/7");
    assert_eq!(request["body"], r#"{"name":"it's"}"#);

    let request_file = dir.path().join("request.json");
    std::fs::write(&request_file, request.to_string()).expect("write");
    let out = apidesk(&config, &["curl", "render", request_file.to_str().expect("utf8 path")]).await;
    assert!(out.status.success());
    let rendered = String::from_utf8(out.stdout).expect("utf8");
    assert_eq!(
        rendered.trim_end(),
        std::fs::read_to_string(&command).expect("read")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_targets_exit_nonzero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("config.json");
    let url = apidesk_test_support::refused_url().expect("port");
    let curl = format!(r#"curl "{url}/x""#);

    let out = apidesk(&config, &["test", "--curl", &curl, "--no-history", "--json"]).await;
    assert!(!out.status.success());
    let result: Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(result["success"], false);
    assert_eq!(result["status"], 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ad_hoc_curl_is_sent_as_written() {
    let server = TestServer::spawn_echo().await.expect("server");
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("config.json");
    let curl = format!(
        r#"curl -X POST "{}" -H "X-Mode: raw" -d 'a=1&b=2'"#,
        server.url("/form?flag")
    );

    let out = apidesk(&config, &["test", "--curl", &curl, "--no-history", "--json"]).await;
    let result = stdout_json(&out);
    let echoed: Value =
        serde_json::from_str(result["body_text"].as_str().expect("body")).expect("echo json");
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["path"], "/form");
    assert_eq!(echoed["query"], "flag");
    assert_eq!(echoed["body"], "a=1&b=2");
    assert_eq!(echoed["headers"]["x-mode"], "raw");
    assert!(echoed["headers"].get("content-type").is_none());
    assert_eq!(result["curl_equivalent"], curl.as_str());
}
