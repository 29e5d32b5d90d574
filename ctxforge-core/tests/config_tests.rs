//! Layered configuration: parse errors, precedence, and atomic save.

use assert_fs::prelude::*;
use ctxforge_core::{
    config::{self, GeneratorKind},
    CoreError, ForgeConfig,
};
use predicates::prelude::predicate;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn corrupt_repo_config_returns_parse_error_with_path() {
    let repo = assert_fs::TempDir::new().expect("tempdir");
    repo.child(".ctxforge/config.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(repo.path(), None).unwrap_err();
    assert!(matches!(err, CoreError::ConfigParse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn unknown_key_is_rejected() {
    let repo = assert_fs::TempDir::new().expect("tempdir");
    repo.child(".ctxforge/config.yaml")
        .write_str("artifact_rot: docs\n")
        .expect("write");

    let err = config::load_at(repo.path(), None).unwrap_err();
    assert!(matches!(err, CoreError::ConfigParse { .. }), "got: {err}");
}

#[test]
fn empty_file_means_defaults() {
    let repo = assert_fs::TempDir::new().expect("tempdir");
    repo.child(".ctxforge/config.yaml").write_str("\n").expect("write");
    let loaded = config::load_at(repo.path(), None).expect("load");
    assert_eq!(loaded, ForgeConfig::default());
}

// ---------------------------------------------------------------------------
// 2. Layer precedence
// ---------------------------------------------------------------------------

#[test]
fn repo_layer_overrides_user_layer_key_by_key() {
    let repo = assert_fs::TempDir::new().expect("repo");
    let user = assert_fs::TempDir::new().expect("user");

    user.child("ctxforge/config.yaml")
        .write_str("generator:\n  kind: llm\n  model: user-model\nstale_tolerance_secs: 30\n")
        .expect("write user");
    repo.child(".ctxforge/config.yaml")
        .write_str("artifact_root: docs-ai\ngenerator:\n  model: repo-model\n")
        .expect("write repo");

    let loaded = config::load_at(repo.path(), Some(user.path())).expect("load");
    assert_eq!(loaded.artifact_root, PathBuf::from("docs-ai"));
    assert_eq!(loaded.stale_tolerance_secs, 30);
    assert_eq!(loaded.generator.kind, GeneratorKind::Llm);
    assert_eq!(loaded.generator.model, "repo-model");
    assert_eq!(loaded.generator.max_tokens, 2048);
}

// ---------------------------------------------------------------------------
// 3. Save
// ---------------------------------------------------------------------------

#[test]
fn save_then_load_roundtrips() {
    let repo = assert_fs::TempDir::new().expect("tempdir");
    let mut cfg = ForgeConfig::default();
    cfg.ignore = vec!["fixtures".to_string()];
    cfg.source_roots = vec!["crates".to_string()];
    config::save_at(repo.path(), &cfg).expect("save");

    repo.child(".ctxforge/config.yaml")
        .assert(predicate::str::contains("fixtures"));
    repo.child(".ctxforge/config.yaml.tmp")
        .assert(predicate::path::missing());

    let loaded = config::load_at(repo.path(), None).expect("load");
    assert_eq!(loaded, cfg);
}
