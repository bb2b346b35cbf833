//! End-to-end tests for the `codesearch` binary.
//!
//! A mock ollama server runs on a background thread and embeds text as a
//! bag of hashed words, so files sharing words with the query rank first.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const DIMS: usize = 64;

/// Query text the mock server never answers.
const HANG_QUERY: &str = "stall";

fn codesearch_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_codesearch"))
}

/// FNV-1a bucket per lowercased word.
fn mock_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let h = word
            .to_ascii_lowercase()
            .bytes()
            .fold(0x811c_9dc5u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193));
        v[(h as usize) % DIMS] += 1.0;
    }
    v
}

async fn embed(State(calls): State<Arc<AtomicUsize>>, Json(body): Json<Value>) -> Json<Value> {
    calls.fetch_add(1, Ordering::SeqCst);
    let input = body["input"].as_str().unwrap_or_default();
    if input == HANG_QUERY {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
    }
    Json(json!({ "model": body["model"], "embeddings": [mock_vector(input)] }))
}

/// Start the mock server; returns its base URL and a request counter.
fn spawn_mock_ollama() -> (String, Arc<AtomicUsize>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let state = calls.clone();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let app = Router::new()
                .route("/api/embed", post(embed))
                .with_state(state);
            axum::serve(listener, app).await.unwrap();
        });
    });

    (format!("http://{}", addr), calls)
}

struct TestEnv {
    _tmp: TempDir,
    root: PathBuf,
    src: PathBuf,
    config: PathBuf,
}

fn setup_test_env(ollama_url: &str) -> TestEnv {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let src = root.join("src");
    fs::create_dir_all(src.join("pkg")).unwrap();
    fs::create_dir_all(src.join(".cache")).unwrap();
    fs::write(src.join("a.go"), "package retry\n\nfunc backoff() {}\n").unwrap();
    fs::write(src.join("pkg/b.go"), "package parser\n\nfunc tokens() {}\n").unwrap();
    fs::write(src.join("notes.md"), "retry backoff notes").unwrap();
    fs::write(src.join(".cache/x.go"), "package retry").unwrap();

    let config = root.join("codesearch.toml");
    fs::write(
        &config,
        format!(
            r#"[db]
dir = "{}/data"

[embedding]
timeout_secs = 5
max_retries = 0

[providers.ollama]
url = "{}"
"#,
            root.display(),
            ollama_url
        ),
    )
    .unwrap();

    TestEnv {
        _tmp: tmp,
        root,
        src,
        config,
    }
}

fn run(env: &TestEnv, args: &[&str]) -> Output {
    Command::new(codesearch_binary())
        .arg("--config")
        .arg(&env.config)
        .arg("--progress")
        .arg("off")
        .args(args)
        .env("RUST_LOG", "warn")
        .current_dir(&env.root)
        .output()
        .expect("failed to run codesearch")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn build(env: &TestEnv) -> Output {
    run(
        env,
        &["build", "demo", path_str(&env.src), "ollama", "mock-embed", "go"],
    )
}

#[test]
fn test_build_sync_find_round() {
    let (url, calls) = spawn_mock_ollama();
    let env = setup_test_env(&url);

    let output = build(&env);
    assert!(output.status.success(), "build failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("added: 2"), "stdout: {}", out);
    assert!(out.contains("Project 'demo' built successfully"));
    assert!(env.root.join("data/demo.db").is_file());
    // Dimension sample plus one request per .go file.
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let output = run(&env, &["find", "demo", "retry", "backoff"]);
    assert!(output.status.success(), "find failed: {}", stderr(&output));
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "Searching for: retry backoff");
    assert_eq!(lines[1], "Found 1 files");
    assert!(lines[2].starts_with("/a.go \t (0.577"), "line: {}", lines[2]);

    fs::remove_file(env.src.join("pkg/b.go")).unwrap();
    fs::write(env.src.join("c.go"), "package cache\n\nfunc evict() {}\n").unwrap();
    let output = run(&env, &["sync", "demo"]);
    assert!(output.status.success(), "sync failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("added: 1"), "stdout: {}", out);
    assert!(out.contains("updated: 1"));
    assert!(out.contains("removed: 1"));
    assert!(out.contains("Project 'demo' synced successfully"));

    let output = run(
        &env,
        &["find", "demo", "cache", "evict", "--json", "--mode", "similar"],
    );
    assert!(output.status.success(), "find failed: {}", stderr(&output));
    let parsed: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["query"], "cache evict");
    assert_eq!(parsed["mode"], "similar");
    let paths: Vec<&str> = parsed["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths[0], "/c.go");
    assert!(!paths.contains(&"/pkg/b.go"));
}

#[test]
fn test_rebuild_replaces_index() {
    let (url, _calls) = spawn_mock_ollama();
    let env = setup_test_env(&url);

    assert!(build(&env).status.success());
    fs::remove_file(env.src.join("a.go")).unwrap();
    let output = build(&env);
    assert!(output.status.success(), "rebuild failed: {}", stderr(&output));
    assert!(stdout(&output).contains("added: 1"));

    let output = run(&env, &["find", "demo", "parser", "--json"]);
    let parsed: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let results = parsed["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["path"], "/pkg/b.go");
}

#[test]
fn test_sync_unknown_alias_fails() {
    let env = setup_test_env("http://127.0.0.1:9");
    let output = run(&env, &["sync", "missing"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("project 'missing' not found"), "stderr: {}", err);
}

#[test]
fn test_find_unknown_alias_fails() {
    let env = setup_test_env("http://127.0.0.1:9");
    let output = run(&env, &["find", "missing", "anything"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not found"));
}

#[test]
fn test_unknown_provider_fails_before_io() {
    let env = setup_test_env("http://127.0.0.1:9");
    let output = run(
        &env,
        &["build", "demo", path_str(&env.src), "openai", "text-embedding-3-small"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unsupported embedding provider: 'openai'"));
    assert!(!env.root.join("data").exists());
}

#[test]
fn test_blank_query_fails() {
    let env = setup_test_env("http://127.0.0.1:9");
    let output = run(&env, &["find", "demo", "   "]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("search query must not be empty"));
}

#[test]
fn test_build_with_unreachable_provider_fails() {
    let env = setup_test_env("http://127.0.0.1:9");
    let output = build(&env);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("error generating embedding for dimensions"));
}

#[cfg(unix)]
#[test]
fn test_interrupt_stops_pending_find() {
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let (url, _calls) = spawn_mock_ollama();
    let env = setup_test_env(&url);
    assert!(build(&env).status.success());

    // Long request timeout so only the interrupt can end the query.
    let config = fs::read_to_string(&env.config)
        .unwrap()
        .replace("timeout_secs = 5", "timeout_secs = 120");
    fs::write(&env.config, config).unwrap();

    let mut child = Command::new(codesearch_binary())
        .arg("--config")
        .arg(&env.config)
        .args(["--progress", "off", "find", "demo", HANG_QUERY])
        .env("RUST_LOG", "warn")
        .current_dir(&env.root)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    std::thread::sleep(Duration::from_millis(1500));
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(8);
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break exit;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("find still running 8s after SIGINT");
        }
        std::thread::sleep(Duration::from_millis(100));
    };

    assert!(!exit.success());
    let output = child.wait_with_output().unwrap();
    assert!(stderr(&output).contains("Error: interrupted"), "stderr: {}", stderr(&output));
}
