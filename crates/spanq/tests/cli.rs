//! CLI integration tests for spanq commands.
//!
//! These tests focus on exit codes and the JSON output, not on table layout
//! which may change.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Helper to create a temp directory for tests.
fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

/// Helper to run `spanq` with HOME isolated to the provided directory.
fn spanq(home: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("spanq").unwrap();
    cmd.env("HOME", home).env_remove("SPANQ_LOG").current_dir(home);
    cmd
}

/// Writes a three-document corpus with one `np` element and returns its file name.
fn write_corpus(dir: &Path) -> &'static str {
    let corpus = r#"[
        {"text": "the black cat sat on the mat", "tags": [{"name": "np", "start": 1, "end": 3}]},
        {"text": "a cat and a dog"},
        {"text": "The Cat slept"}
    ]"#;
    fs::write(dir.join("corpus.json"), corpus).unwrap();
    "corpus.json"
}

/// Runs a command expected to succeed and parses its stdout as JSON.
fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

mod search {
    use super::*;

    #[test]
    fn lists_hits_as_table() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        spanq(dir.path())
            .args(["search", corpus, "cat"])
            .assert()
            .success()
            .stdout(predicate::str::contains("3 hits in 3 documents"))
            .stdout(predicate::str::contains("black"));
    }

    #[test]
    fn json_includes_context_and_totals() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        let json = json_output(spanq(dir.path()).args(["search", corpus, "cat", "--json"]));

        assert_eq!(json["total_hits"], 3);
        assert_eq!(json["total_docs"], 3);
        let first = &json["hits"][0];
        assert_eq!(first["doc"], 0);
        assert_eq!(first["start"], 2);
        assert_eq!(first["end"], 3);
        assert_eq!(first["left"], "the black");
        assert_eq!(first["text"], "cat");
        assert_eq!(first["right"], "sat on the mat");
    }

    #[test]
    fn no_hits_is_not_an_error() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        spanq(dir.path())
            .args(["search", corpus, "giraffe"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No hits found."));
    }

    #[test]
    fn sorts_in_reverse() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        let json = json_output(spanq(dir.path()).args([
            "search", corpus, "cat", "--sort", "doc", "--reverse", "--json",
        ]));

        let docs: Vec<_> = json["hits"]
            .as_array()
            .unwrap()
            .iter()
            .map(|hit| hit["doc"].as_u64().unwrap())
            .collect();
        assert_eq!(docs, vec![2, 1, 0]);
    }

    #[test]
    fn pages_through_hits() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        let json = json_output(spanq(dir.path()).args([
            "search", corpus, "cat", "--first", "1", "-n", "1", "--json",
        ]));

        assert_eq!(json["hits"].as_array().unwrap().len(), 1);
        assert_eq!(json["hits"][0]["doc"], 1);
        assert_eq!(json["window"]["first"], 1);
        assert_eq!(json["window"]["has_next"], true);
        assert_eq!(json["total_hits"], 3);
    }

    #[test]
    fn window_beyond_results_fails() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        spanq(dir.path())
            .args(["search", corpus, "cat", "--first", "5"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("beyond 3 hits"));
    }

    #[test]
    fn negative_window_start_fails() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        spanq(dir.path())
            .args(["search", corpus, "cat", "--first", "-1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("negative"));
    }

    #[test]
    fn seeded_samples_repeat() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());
        let args = [
            "search", corpus, "cat", "--sample", "2", "--seed", "7", "--json",
        ];

        let first = json_output(spanq(dir.path()).args(args));
        let second = json_output(spanq(dir.path()).args(args));

        assert_eq!(first["hits"].as_array().unwrap().len(), 2);
        assert_eq!(first["hits"], second["hits"]);
    }

    #[test]
    fn groups_by_property() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        let json = json_output(spanq(dir.path()).args([
            "search",
            corpus,
            "cat",
            "--group-by",
            "hit:word:s",
            "--json",
        ]));

        assert_eq!(json["total_hits"], 3);
        let groups = json["groups"].as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["identity"], "cat");
        assert_eq!(groups[0]["hits"], 2);
        assert_eq!(groups[1]["identity"], "Cat");
    }

    #[test]
    fn groups_by_document() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        let json = json_output(spanq(dir.path()).args(["search", corpus, "a", "--docs", "--json"]));

        assert_eq!(json["total_hits"], 2);
        let docs = json["docs"].as_array().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["doc"], 1);
        assert_eq!(docs[0]["hits"], 2);
    }

    #[test]
    fn relation_queries_from_file() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());
        fs::write(
            dir.path().join("query.json"),
            r#"{"position_filter": {
                "producer": {"term": {"value": "cat"}},
                "filter": {"tag": {"name": "np"}},
                "op": "within"
            }}"#,
        )
        .unwrap();

        let json = json_output(spanq(dir.path()).args([
            "search",
            corpus,
            "@query.json",
            "--json",
        ]));

        assert_eq!(json["total_hits"], 1);
        assert_eq!(json["hits"][0]["doc"], 0);
    }

    #[test]
    fn invalid_query_fails() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        spanq(dir.path())
            .args(["search", corpus, r#"{"nope": 1}"#])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid query"));
    }

    #[test]
    fn unknown_sort_property_fails() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        spanq(dir.path())
            .args(["search", corpus, "cat", "--sort", "hit:lemma"])
            .assert()
            .failure();
    }

    #[test]
    fn missing_corpus_fails() {
        let dir = temp_dir();

        spanq(dir.path())
            .args(["search", "missing.json", "cat"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to read"));
    }

    #[test]
    fn window_size_comes_from_config() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());
        fs::write(
            dir.path().join(".spanq.toml"),
            "[results]\ndefault_window_size = 1\n",
        )
        .unwrap();

        let json = json_output(spanq(dir.path()).args(["search", corpus, "cat", "--json"]));

        assert_eq!(json["hits"].as_array().unwrap().len(), 1);
        assert_eq!(json["window"]["has_next"], true);
    }
}

mod collocations {
    use super::*;

    #[test]
    fn counts_terms_around_hits() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        let json = json_output(spanq(dir.path()).args(["collocations", corpus, "cat", "-i", "--json"]));

        let items = json["items"].as_array().unwrap();
        assert_eq!(items[0]["term"], "the");
        assert_eq!(items[0]["count"], 3);
        assert_eq!(items[1]["term"], "a");
        assert_eq!(items[1]["count"], 2);
    }

    #[test]
    fn table_output() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        spanq(dir.path())
            .args(["collocations", corpus, "cat", "-c", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Term"))
            .stdout(predicate::str::contains("black"));
    }

    #[test]
    fn unknown_annotation_fails() {
        let dir = temp_dir();
        let corpus = write_corpus(dir.path());

        spanq(dir.path())
            .args(["collocations", corpus, "cat", "-a", "lemma"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown annotation"));
    }
}

mod init {
    use super::*;

    #[test]
    fn creates_config_file() {
        let dir = temp_dir();

        spanq(dir.path()).arg("init").assert().success();

        let contents = fs::read_to_string(dir.path().join(".spanq.toml")).unwrap();
        assert!(contents.contains("# [limits]"));
    }

    #[test]
    fn fails_if_config_exists() {
        let dir = temp_dir();
        fs::write(dir.path().join(".spanq.toml"), "existing").unwrap();

        spanq(dir.path())
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn force_overwrites_config() {
        let dir = temp_dir();
        fs::write(dir.path().join(".spanq.toml"), "existing").unwrap();

        spanq(dir.path()).args(["init", "--force"]).assert().success();

        let contents = fs::read_to_string(dir.path().join(".spanq.toml")).unwrap();
        assert!(contents.contains("# [cache]"));
    }
}

mod config {
    use super::*;

    #[test]
    fn shows_defaults() {
        let dir = temp_dir();

        spanq(dir.path())
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("[limits]"))
            .stdout(predicate::str::contains("max_hits_to_process = 5000000"))
            .stdout(predicate::str::contains("no configuration files found"));
    }

    #[test]
    fn lists_merged_files() {
        let dir = temp_dir();
        fs::write(dir.path().join(".spanq.toml"), "root = true\n").unwrap();
        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join(".spanq.toml"),
            "[results]\ndefault_group_cap = 3\n",
        )
        .unwrap();

        let output = spanq(dir.path())
            .current_dir(&project)
            .arg("config")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let stdout = String::from_utf8(output).unwrap();

        let inner = stdout.find("project/.spanq.toml").unwrap();
        let root = stdout.find("(root)").unwrap();
        assert!(inner < root);
        assert!(stdout.contains("default_group_cap = 3"));
    }

    #[test]
    fn shows_overrides() {
        let dir = temp_dir();
        fs::write(
            dir.path().join(".spanq.toml"),
            "[cache]\nworker_threads = 2\n",
        )
        .unwrap();

        spanq(dir.path())
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("worker_threads = 2"));
    }

    #[test]
    fn invalid_config_fails() {
        let dir = temp_dir();
        fs::write(dir.path().join(".spanq.toml"), "[limits\n").unwrap();

        spanq(dir.path()).arg("config").assert().failure();
    }
}
