use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

const SCORES: &str = r#"[
  {"country": "India", "year": 2023, "infrastructure": 62, "necessity": 70, "resource": 55,
   "artificial_support": 48, "ecological": 66, "economic": 52, "emissions": 71},
  {"country": "DEU", "year": 2023, "infrastructure": 20, "necessity": 25, "resource": 30,
   "artificial_support": 35, "ecological": 22, "economic": 28, "emissions": 18}
]"#;

fn setup_project() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::write(root.join("scores.json"), SCORES).unwrap();
    fs::create_dir_all(root.join("knowledge/India")).unwrap();
    fs::write(
        root.join("knowledge/overview.md"),
        "Global coal demand reached a plateau as renewable capacity additions accelerated across Asia.",
    )
    .unwrap();
    fs::write(
        root.join("knowledge/India/power.txt"),
        "India relies on coal for roughly seventy percent of its electricity generation today.",
    )
    .unwrap();
    fs::write(
        root.join("fvi.toml"),
        r#"
[paths]
scores = "scores.json"
corpus = "knowledge"
index = "out/index.json"

[embedding]
dimension = 64

[retrieval]
min_relevance = -1.0
"#,
    )
    .unwrap();
    temp
}

fn fvi(root: &std::path::Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("fvi").expect("binary");
    cmd.current_dir(root).arg("--quiet");
    cmd
}

fn run_json(root: &std::path::Path, args: &[&str]) -> Value {
    let output = fvi(root).args(args).arg("--json").output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn score_reports_composite_and_breakdown() {
    let temp = setup_project();
    let body = run_json(temp.path(), &["score", "IND", "--persona", "investor"]);
    assert_eq!(body["entity_id"], "India");
    assert_eq!(body["persona_id"], "investor");
    assert_eq!(body["contributions"].as_object().unwrap().len(), 7);
    assert_eq!(body["generation"], 1);
}

#[test]
fn unknown_entity_exits_with_envelope() {
    let temp = setup_project();
    let output = fvi(temp.path())
        .args(["score", "Atlantis", "--json"])
        .output()
        .expect("command run");
    assert!(!output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["code"], "unknown_entity");
    assert_eq!(body["status"], 404);
}

#[test]
fn rank_orders_entities() {
    let temp = setup_project();
    let body = run_json(temp.path(), &["rank", "--persona", "analyst"]);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["entity_id"], "Germany");
    assert_eq!(rows[0]["rank"], 1);
}

#[test]
fn build_index_then_query_context() {
    let temp = setup_project();
    let root = temp.path();

    let stats = run_json(root, &["build-index"]);
    assert_eq!(stats["knowledge_chunks"], 2);
    assert_eq!(stats["assessment_chunks"], 2);
    assert!(root.join("out/index.json").exists());

    let context = run_json(root, &["context", "How dependent is India on coal power?"]);
    assert_eq!(context["entity_id"], "India");
    assert_eq!(context["score"]["entity_id"], "India");
    let sources: Vec<&str> = context["passages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["source_document"].as_str().unwrap())
        .collect();
    assert!(sources.contains(&"India/power.txt"));
    assert!(!sources.contains(&"assessment/Germany"));
}

#[test]
fn context_reflects_scores_changed_after_build() {
    let temp = setup_project();
    let root = temp.path();
    run_json(root, &["build-index"]);

    fs::write(
        root.join("scores.json"),
        SCORES.replace("\"infrastructure\": 62", "\"infrastructure\": 97"),
    )
    .unwrap();

    let context = run_json(root, &["context", "coal outlook", "--entity", "India"]);
    let assessment = context["passages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["source_document"] == "assessment/India")
        .expect("assessment passage");
    assert!(assessment["text"].as_str().unwrap().contains("- Infrastructure: 97.00"));
}

#[test]
fn compare_unknown_entity_uses_the_envelope() {
    let temp = setup_project();
    let output = fvi(temp.path())
        .args(["compare", "Atlantis", "--json"])
        .output()
        .expect("command run");
    assert!(!output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["code"], "unknown_entity");

    let rows = run_json(temp.path(), &["compare", "IND"]);
    assert_eq!(rows.as_array().unwrap().len(), 5);
    assert_eq!(rows[0]["entity_id"], "India");
}

#[test]
fn context_without_index_explains_next_step() {
    let temp = setup_project();
    fvi(temp.path())
        .args(["context", "coal outlook"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fvi build-index"));
}

#[test]
fn check_summarizes_the_load() {
    let temp = setup_project();
    fvi(temp.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("accepted 14"));
}
