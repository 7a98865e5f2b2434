use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn lexfuse_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("lexfuse");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[cache]
path = "{}/data/lexfuse.sqlite"

[retrieval]
top_k = 10
"#,
        root.display()
    );

    let config_path = config_dir.join("lexfuse.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_lexfuse(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = lexfuse_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run lexfuse binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

const RESPONSE: &str = "\
## SUMMARY
CRR and CRD IV diverge on minimum risk weights.

## CONTRADICTIONS
1. **CRR Article 124 vs CRD IV Article 79** - Severity: HIGH. CRR says \"Risk weight shall not be lower than 35%\" while CRD IV says \"Minimum risk weight of 25%\".
2. CRR Article 124 only, no counterpart.

## OVERLAPS
1. GDPR Article 32 & NIS2 Article 21 - Type: COMPLEMENTARY - Confidence: 0.8

## RECOMMENDATIONS
1. Apply the stricter floor.
";

#[test]
fn test_init_creates_cache() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_lexfuse(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/lexfuse.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_lexfuse(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_lexfuse(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_cache_stats_on_empty_cache() {
    let (_tmp, config_path) = setup_test_env();
    run_lexfuse(&config_path, &["init"]);

    let (stdout, stderr, success) = run_lexfuse(&config_path, &["cache", "stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Entries:     0"));
    assert!(stdout.contains("Total hits:  0"));
}

#[test]
fn test_cache_clear_with_prefix() {
    let (_tmp, config_path) = setup_test_env();
    run_lexfuse(&config_path, &["init"]);

    let (stdout, stderr, success) =
        run_lexfuse(&config_path, &["cache", "clear", "--prefix", "analyze:"]);
    assert!(success, "clear failed: {}", stderr);
    assert!(stdout.contains("Removed 0 cache entries with prefix 'analyze:'"));
}

#[test]
fn test_parse_saved_response() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("response.txt");
    fs::write(&file, RESPONSE).unwrap();

    let (stdout, stderr, success) =
        run_lexfuse(&config_path, &["parse", file.to_str().unwrap()]);
    assert!(success, "parse failed: {}", stderr);
    assert!(stdout.contains("Contradictions: 1"));
    assert!(stdout.contains("[High] CRR Article 124 vs CRD IV Article 79"));
    assert!(stdout.contains("Overlaps: 1"));
    assert!(stdout.contains("(1 finding(s) could not be parsed)"));
    assert!(stderr.contains("CONTRADICTIONS finding 2"));
}

#[test]
fn test_parse_json_output() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("response.txt");
    fs::write(&file, RESPONSE).unwrap();

    let (stdout, stderr, success) =
        run_lexfuse(&config_path, &["parse", file.to_str().unwrap(), "--json"]);
    assert!(success, "parse failed: {}", stderr);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["contradictions"][0]["severity"], "High");
    assert_eq!(json["overlaps"][0]["type"], "Complementary");
    assert_eq!(json["overlaps"][0]["confidence_score"], 0.8);
    assert_eq!(json["parse_warnings"], 1);
}

#[test]
fn test_retrieve_requires_embedding_provider() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_lexfuse(&config_path, &["retrieve", "capital requirements"]);
    assert!(!success);
    assert!(stderr.contains("embedding.provider"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_lexfuse(&tmp.path().join("nope.toml"), &["cache", "stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
