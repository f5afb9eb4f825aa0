#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
registry: repo
image_name: app
canary_version: canary
release_version: v2.0.0
architectures: [amd64, arm]
default_arch: amd64
"#;

/// dockflow.yaml と dist/<arch>、Dockerfile テンプレートを持つプロジェクト
fn project(archs: &[&str]) -> TempDir {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("dockflow.yaml"), CONFIG).unwrap();
    fs::write(
        root.path().join("Dockerfile.tera"),
        "FROM scratch\nLABEL arch={{ arch }}\n",
    )
    .unwrap();
    for arch in archs {
        fs::create_dir_all(root.path().join("dist").join(arch)).unwrap();
    }
    root
}

/// 設定を上書きする環境変数（テストを実行する環境の値を持ち込まない）
const DOCKFLOW_ENV: [&str; 11] = [
    "DOCKFLOW_CONFIG_PATH",
    "DOCKFLOW_REGISTRY",
    "DOCKFLOW_IMAGE_NAME",
    "DOCKFLOW_CANARY_VERSION",
    "DOCKFLOW_RELEASE_VERSION",
    "DOCKFLOW_ARCHITECTURES",
    "DOCKFLOW_DEFAULT_ARCH",
    "DOCKFLOW_DIST_DIR",
    "DOCKFLOW_DOCKERFILE_TEMPLATE",
    "DOCKFLOW_ENGINE",
    "DOCKFLOW_REGISTRY_CLI",
];

fn dock(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dock").unwrap();
    cmd.current_dir(dir);
    for key in DOCKFLOW_ENV {
        cmd.env_remove(key);
    }
    cmd.arg("--config").arg("dockflow.yaml");
    cmd
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("dock").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("push"))
        .stdout(predicate::str::contains("release"))
        .stdout(predicate::str::contains("plan"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("dock").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dockflow"));
}

#[test]
fn test_build_help_lists_channel_flags() {
    let mut cmd = Command::cargo_bin("dock").unwrap();
    cmd.args(["build", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--canary"))
        .stdout(predicate::str::contains("--pr"))
        .stdout(predicate::str::contains("--cross"));
}

#[test]
fn test_plan_single_arch_canary() {
    let root = project(&[]);
    dock(root.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("repo/app-amd64:canary"))
        .stdout(predicate::str::contains("render-dockerfile"))
        .stdout(predicate::str::contains("build-image"))
        .stdout(predicate::str::contains("push").not());
}

#[test]
fn test_plan_pr_without_number_falls_back_to_canary() {
    let root = project(&[]);
    dock(root.path())
        .args(["plan", "--pr", "--cross"])
        .assert()
        .success()
        .stdout(predicate::str::contains("repo/app-amd64:canary"))
        .stdout(predicate::str::contains("repo/app-arm:canary"));
}

#[test]
fn test_plan_pr_unusable_as_tag_falls_back_to_canary() {
    let root = project(&[]);
    for value in ["feature/x", "bad tag"] {
        dock(root.path())
            .args(["plan", "--pr", value])
            .assert()
            .success()
            .stdout(predicate::str::contains("repo/app-amd64:canary"));
    }
}

#[test]
fn test_plan_pr_with_dash_value_falls_back_to_canary() {
    let root = project(&[]);
    dock(root.path())
        .args(["plan", "--pr", "-x"])
        .assert()
        .success()
        .stdout(predicate::str::contains("repo/app-amd64:canary"));
}

#[test]
fn test_inherited_environment_is_cleared() {
    let root = project(&[]);
    temp_env::with_vars(
        [
            ("DOCKFLOW_IMAGE_NAME", Some("leaked")),
            ("DOCKFLOW_RELEASE_VERSION", Some("v9.9.9")),
            ("DOCKFLOW_DIST_DIR", Some("elsewhere")),
        ],
        || {
            dock(root.path())
                .args(["plan", "--release"])
                .assert()
                .success()
                .stdout(predicate::str::contains("repo/app-amd64:v2.0.0"))
                .stdout(predicate::str::contains("dist/amd64"));
        },
    );
}

#[test]
fn test_plan_pr_beats_canary() {
    let root = project(&[]);
    dock(root.path())
        .args(["plan", "--canary", "--pr", "77", "--push"])
        .assert()
        .success()
        .stdout(predicate::str::contains("repo/app-amd64:77"))
        .stdout(predicate::str::contains("push ← build-image"));
}

#[test]
fn test_plan_release_json() {
    let root = project(&[]);
    dock(root.path())
        .args(["plan", "--release", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"image\": \"repo/app-amd64:v2.0.0\""))
        .stdout(predicate::str::contains("\"image\": \"repo/app-arm:v2.0.0\""))
        .stdout(predicate::str::contains("\"name\": \"render-dockerfile:arm\""));
}

#[test]
fn test_dry_run_cross_push() {
    let root = project(&["amd64", "arm"]);
    dock(root.path())
        .args(["--dry-run", "push", "--canary", "--cross"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "$ docker build --rm=true --tag repo/app-amd64:canary dist/amd64",
        ))
        .stdout(predicate::str::contains(
            "$ docker build --rm=true --tag repo/app-arm:canary dist/arm",
        ))
        .stdout(predicate::str::contains("$ docker push repo/app-arm:canary"));

    assert!(root.path().join("dist/arm/Dockerfile").exists());
}

#[test]
fn test_env_override_beats_config_file() {
    let root = project(&["amd64"]);
    dock(root.path())
        .env("DOCKFLOW_ENGINE", "podman")
        .args(["--dry-run", "build"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "$ podman build --rm=true --tag repo/app-amd64:canary dist/amd64",
        ));
}

#[test]
fn test_missing_context_fails_with_stage_name() {
    // arm の出力ディレクトリがない
    let root = project(&["amd64"]);
    dock(root.path())
        .args(["--dry-run", "build", "--cross"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("render-dockerfile:arm"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let root = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("dock").unwrap();
    cmd.current_dir(root.path())
        .args(["--config", "nope.yaml", "plan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.yaml"));
}

#[test]
fn test_missing_engine_prints_guidance() {
    let root = project(&["amd64"]);
    dock(root.path())
        .env("DOCKFLOW_ENGINE", "dockflow-missing-engine")
        .arg("build")
        .assert()
        .failure()
        .stdout(predicate::str::contains("コマンドを起動できませんでした"))
        .stdout(predicate::str::contains("DOCKFLOW_ENGINE"));
}
