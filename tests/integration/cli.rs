use std::fs;

use anyhow::Result;
use expect_test::expect;
use indoc::indoc;
use tempfile::tempdir;

use crate::{API_KEY, ENDPOINT, init, momento_lambda_stack};

const VARS: &[(&str, &str)] = &[(API_KEY, "k1"), (ENDPOINT, "https://e1")];

#[test]
fn synth_writes_files() -> Result<()> {
    let tmpdir = tempdir()?;
    init(tmpdir.path())?;

    let output = momento_lambda_stack(tmpdir.path(), VARS, ["synth"])?;
    assert!(output.status.success());

    let out_dir = tmpdir.path().join("cdk.out");
    for file in [
        "manifest.json",
        "MomentoLambdaStack.template.json",
        "MomentoLambdaStack.assets.json",
    ] {
        assert!(out_dir.join(file).is_file(), "{file} is missing");
    }

    let template_path = out_dir.join("MomentoLambdaStack.template.json");
    let template: serde_json::Value = serde_json::from_str(&fs::read_to_string(template_path)?)?;
    let function = &template["Resources"]["MomentoDockerLambda"]["Properties"];
    assert_eq!(function["MemorySize"], 128);
    assert_eq!(function["Timeout"], 30);
    assert_eq!(
        function["Environment"]["Variables"],
        serde_json::json!({ "MOMENTO_API_KEY": "k1", "MOMENTO_ENDPOINT": "https://e1" })
    );
    Ok(())
}

#[test]
fn synth_to_custom_output() -> Result<()> {
    let tmpdir = tempdir()?;
    init(tmpdir.path())?;

    let output = momento_lambda_stack(
        tmpdir.path(),
        VARS,
        [
            "--stack-id",
            "Demo",
            "--description",
            "cache demo",
            "--tag",
            "team=cache",
            "synth",
            "--output",
            "out",
        ],
    )?;
    assert!(output.status.success());

    let template_path = tmpdir.path().join("out/Demo.template.json");
    let template: serde_json::Value = serde_json::from_str(&fs::read_to_string(template_path)?)?;
    assert_eq!(template["Description"], "cache demo");
    assert_eq!(
        template["Resources"]["MomentoDockerLambda"]["Properties"]["Tags"],
        serde_json::json!([{ "Key": "team", "Value": "cache" }])
    );
    Ok(())
}

#[test]
fn synth_without_dockerfile_fails() -> Result<()> {
    let tmpdir = tempdir()?;

    let output = momento_lambda_stack(tmpdir.path(), VARS, ["synth"])?;

    assert!(!output.status.success());
    assert!(!tmpdir.path().join("cdk.out").exists());
    Ok(())
}

#[test]
fn synth_rejects_invalid_stack_id() -> Result<()> {
    let tmpdir = tempdir()?;
    init(tmpdir.path())?;

    for id in ["../escaped", "a/b"] {
        let output = momento_lambda_stack(tmpdir.path(), VARS, ["--stack-id", id, "synth"])?;

        assert!(!output.status.success(), "{id} was accepted");
    }
    assert!(!tmpdir.path().join("cdk.out").exists());
    assert!(!tmpdir.path().join("escaped.template.json").exists());
    Ok(())
}

#[test]
fn missing_api_key() -> Result<()> {
    let tmpdir = tempdir()?;
    init(tmpdir.path())?;

    let output = momento_lambda_stack(tmpdir.path(), &[(ENDPOINT, "https://e1")], ["synth"])?;

    assert!(!output.status.success());
    let expected = expect![[r#"
        The environment variable MOMENTO_API_KEY must be set.
    "#]];
    expected.assert_eq(&String::from_utf8_lossy(&output.stderr));
    assert!(!tmpdir.path().join("cdk.out").exists());
    Ok(())
}

#[test]
fn missing_both_reports_api_key() -> Result<()> {
    let tmpdir = tempdir()?;

    let output = momento_lambda_stack(tmpdir.path(), &[], ["validate"])?;

    assert!(!output.status.success());
    let expected = expect![[r#"
        The environment variable MOMENTO_API_KEY must be set.
    "#]];
    expected.assert_eq(&String::from_utf8_lossy(&output.stderr));
    Ok(())
}

#[test]
fn empty_endpoint_is_missing() -> Result<()> {
    let tmpdir = tempdir()?;

    let vars = [(API_KEY, "k1"), (ENDPOINT, "")];
    let output = momento_lambda_stack(tmpdir.path(), &vars, ["validate"])?;

    assert!(!output.status.success());
    let expected = expect![[r#"
        The environment variable MOMENTO_ENDPOINT must be set.
    "#]];
    expected.assert_eq(&String::from_utf8_lossy(&output.stderr));
    Ok(())
}

#[test]
fn validate_succeeds() -> Result<()> {
    let tmpdir = tempdir()?;

    let output = momento_lambda_stack(tmpdir.path(), VARS, ["validate"])?;

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stderr), "Configuration is valid\n");
    Ok(())
}

#[test]
fn describe_masks_api_key() -> Result<()> {
    let tmpdir = tempdir()?;

    let output = momento_lambda_stack(tmpdir.path(), VARS, ["describe"])?;

    assert!(output.status.success());
    let expected = indoc! {r#"
        {
          "name": "MomentoDockerLambda",
          "imageSource": "docker",
          "memoryMB": 128,
          "timeoutSeconds": 30,
          "environment": {
            "MOMENTO_API_KEY": "****",
            "MOMENTO_ENDPOINT": "https://e1"
          }
        }
    "#};
    assert_eq!(String::from_utf8_lossy(&output.stdout), expected);
    Ok(())
}

#[test]
fn describe_shows_secrets() -> Result<()> {
    let tmpdir = tempdir()?;

    let output = momento_lambda_stack(tmpdir.path(), VARS, ["describe", "--show-secrets"])?;

    assert!(output.status.success());
    let descriptor: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(descriptor["environment"]["MOMENTO_API_KEY"], "k1");
    Ok(())
}
