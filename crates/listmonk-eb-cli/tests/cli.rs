//! End-to-end tests for the listmonk-eb binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const ACCOUNT: &str = "123456789012";
const CERTIFICATE: &str = "arn:aws:acm:us-east-1:123456789012:certificate/abc-123";

fn bundle() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").expect("write bundle");
    dir
}

/// A command isolated from the caller's environment and config file
fn listmonk_eb(bundle: &Path) -> Command {
    let mut cmd = Command::cargo_bin("listmonk-eb").expect("binary built");
    cmd.env_remove("CDK_DEFAULT_ACCOUNT")
        .env_remove("ACM_CERT_ARN")
        .env_remove("LISTMONK_IMAGE_TAG")
        .env_remove("RUST_LOG")
        .env("LISTMONK_EB_CONFIG", "/nonexistent/listmonk-eb/config.toml")
        .arg("--bundle-dir")
        .arg(bundle)
        .args(["--account", ACCOUNT]);
    cmd
}

#[test]
fn missing_certificate_fails_before_synthesis() {
    let bundle = bundle();
    let out = tempfile::tempdir().expect("tempdir");
    listmonk_eb(bundle.path())
        .arg("synth")
        .arg("--out-dir")
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("AcmCertArn"));
    assert!(!out.path().join("template.json").exists());
}

#[test]
fn synth_writes_template_and_plan() {
    let bundle = bundle();
    let out = tempfile::tempdir().expect("tempdir");
    listmonk_eb(bundle.path())
        .args(["--certificate-arn", CERTIFICATE])
        .arg("synth")
        .arg("--out-dir")
        .arg(out.path())
        .assert()
        .success();

    let template = std::fs::read_to_string(out.path().join("template.json")).expect("template");
    let template: serde_json::Value = serde_json::from_str(&template).expect("template json");
    assert!(template["Resources"].as_object().is_some_and(|r| !r.is_empty()));
    assert!(template["Outputs"].get("DbEndpoint").is_some());
    assert!(out.path().join("plan.json").exists());
}

#[test]
fn certificate_from_environment() {
    let bundle = bundle();
    listmonk_eb(bundle.path())
        .env("ACM_CERT_ARN", CERTIFICATE)
        .args(["--output", "json", "outputs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VpcId"))
        .stdout(predicate::str::contains("DbSecretArn"));
}

#[test]
fn graph_lists_vpc_in_first_wave() {
    let bundle = bundle();
    listmonk_eb(bundle.path())
        .args(["--certificate-arn", CERTIFICATE, "graph"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AWS::EC2::VPC"))
        .stdout(predicate::str::contains("AWS::ElasticBeanstalk::Environment"));
}

#[test]
fn diff_against_own_plan_is_empty() {
    let bundle = bundle();
    let out = tempfile::tempdir().expect("tempdir");
    listmonk_eb(bundle.path())
        .args(["--certificate-arn", CERTIFICATE, "synth", "--out-dir"])
        .arg(out.path())
        .assert()
        .success();

    listmonk_eb(bundle.path())
        .args(["--certificate-arn", CERTIFICATE, "diff", "--previous"])
        .arg(out.path().join("plan.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes"));
}

#[test]
fn diff_reports_new_image_tag() {
    let bundle = bundle();
    let out = tempfile::tempdir().expect("tempdir");
    listmonk_eb(bundle.path())
        .args(["--certificate-arn", CERTIFICATE, "synth", "--out-dir"])
        .arg(out.path())
        .assert()
        .success();

    listmonk_eb(bundle.path())
        .args(["--certificate-arn", CERTIFICATE, "--image-tag", "v5.1.0"])
        .args(["diff", "--previous"])
        .arg(out.path().join("plan.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("replace"))
        .stdout(predicate::str::contains("AWS::ElasticBeanstalk::ApplicationVersion"));
}

#[test]
fn destroy_check_blocked_by_cluster() {
    let bundle = bundle();
    listmonk_eb(bundle.path())
        .args(["--certificate-arn", CERTIFICATE, "destroy-check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deletion protection"));
}

#[test]
fn config_file_supplies_parameters() {
    let bundle = bundle();
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        format!("[stack]\ncertificate_arn = \"{CERTIFICATE}\"\nimage_tag = \"v5.2.0\"\n"),
    )
    .expect("write config");

    listmonk_eb(bundle.path())
        .env("LISTMONK_EB_CONFIG", &config)
        .args(["--output", "json", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("v5.2.0"));
}
