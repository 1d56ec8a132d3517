#![cfg(unix)]

use anyhow::Result;
use cli_harness::{
    deploy, CommandRunner, DeployPlan, HarnessConfig, HarnessError, Sandbox, VerifyPolicy,
    Workspace,
};
use serial_test::serial;
use std::env;
use std::fs;

#[test]
#[serial]
fn echo_hello_in_scope_succeeds_with_output() -> Result<()> {
    let mut sandbox = Sandbox::new()?;

    let result = sandbox.exec("echo hello")?;

    assert_eq!(result.exit_code(), Some(0));
    assert!(result.output.contains("hello"));
    assert!(sandbox.done().is_none());
    Ok(())
}

#[test]
#[serial]
fn exit_status_three_is_returned_not_raised() -> Result<()> {
    let sandbox = Sandbox::new()?;

    let result = sandbox.exec("echo failing >&2; exit 3")?;

    assert_eq!(result.exit_code(), Some(3));
    assert!(!result.success());
    assert_eq!(result.output.trim(), "failing");
    Ok(())
}

#[test]
#[serial]
fn commands_run_from_workspace_root_with_search_paths() -> Result<()> {
    let sandbox = Sandbox::new()?;

    let result = sandbox.exec("pwd; echo \"$RUBYLIB\"; echo \"$RUBYPATH\"")?;
    let lines: Vec<&str> = result.output.lines().collect();

    assert_eq!(lines[0], sandbox.root().to_string_lossy());
    assert_eq!(lines[1], sandbox.layout().lib().to_string_lossy());
    assert_eq!(lines[2], sandbox.layout().bin().to_string_lossy());
    Ok(())
}

#[test]
#[serial]
fn child_does_not_see_denylisted_host_variables() -> Result<()> {
    env::set_var("RUBYOPT", "-rhost_setup");
    let sandbox = Sandbox::new()?;

    let result = sandbox.exec("echo \"opt=[${RUBYOPT:-}]\"")?;

    assert_eq!(result.output.trim(), "opt=[]");
    assert_eq!(env::var("RUBYOPT")?, "-rhost_setup");
    env::remove_var("RUBYOPT");
    Ok(())
}

#[test]
#[serial]
fn filesystem_side_effects_land_in_workspace() -> Result<()> {
    let mut sandbox = Sandbox::new()?;

    let result = sandbox.context_exec("mkdir", &["-p", "my project/src"])?;

    assert!(result.success());
    assert!(sandbox.root().join("my project").join("src").is_dir());

    let root = sandbox.root().to_path_buf();
    assert!(sandbox.done().is_none());
    assert!(!root.exists());
    assert!(sandbox.done().is_none());
    Ok(())
}

#[test]
#[serial]
fn runner_can_be_used_inside_explicit_context() -> Result<()> {
    let sandbox = Sandbox::new()?;
    fs::write(sandbox.root().join("input.txt"), "alpha\nbeta\n")?;

    let count = sandbox.with_context(|| -> Result<String> {
        let result = CommandRunner::new().run("wc -l < input.txt")?;
        Ok(result.output.trim().to_string())
    })?;

    assert_eq!(count, "2");
    Ok(())
}

#[test]
#[serial]
fn strict_deploy_writes_manifest_and_stops_on_failed_check() -> Result<()> {
    let sandbox = Sandbox::new()?;
    let plan = DeployPlan {
        manifest: Some("source \"https://rubygems.org\"\n".to_string()),
        install: Some("mkdir -p {install_dir}/marker".to_string()),
        checks: vec!["exit 4".to_string(), "echo never".to_string()],
        ..DeployPlan::default()
    };

    let err = sandbox.deploy(&plan).unwrap_err();

    match err {
        HarnessError::DeployFailed {
            command, status, ..
        } => {
            assert_eq!(command, "exit 4");
            assert_eq!(status, cli_harness::ExitOutcome::Code(4));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(sandbox.root().join("Gemfile").is_file());
    assert!(sandbox.layout().install_dir().join("marker").is_dir());
    Ok(())
}

#[test]
#[serial]
fn deploy_keeps_install_inside_workspace_under_spaced_parent() -> Result<()> {
    let parent = tempfile::Builder::new().prefix("with space ").tempdir()?;
    let stray = parent.path().parent().unwrap().join("with");
    let stray_before = stray.exists();
    let ws = Workspace::create_in(parent.path(), &HarnessConfig::default())?;
    let plan = DeployPlan {
        install: Some("mkdir -p {install_dir}/marker".to_string()),
        ..DeployPlan::default()
    };

    let report = deploy::deploy(&ws, &HarnessConfig::default(), &CommandRunner::new(), &plan)?;

    assert!(report.all_succeeded());
    assert!(ws.install_dir().join("marker").is_dir());
    assert_eq!(stray.exists(), stray_before);
    Ok(())
}

#[test]
#[serial]
fn lenient_deploy_reports_every_step() -> Result<()> {
    let sandbox = Sandbox::new()?;
    let plan = DeployPlan {
        checks: vec!["exit 4".to_string(), "echo still-ran".to_string()],
        verify: VerifyPolicy::Lenient,
        ..DeployPlan::default()
    };

    let report = sandbox.deploy(&plan)?;

    assert_eq!(report.steps.len(), 2);
    assert!(!report.all_succeeded());
    assert_eq!(report.steps[0].result.exit_code(), Some(4));
    assert_eq!(report.steps[1].result.output.trim(), "still-ran");
    assert!(!sandbox.root().join("Gemfile").exists());
    Ok(())
}

#[test]
fn plan_loads_from_yaml_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("plan.yaml");
    fs::write(
        &path,
        "manifestName: package.json\nmanifest: '{}'\ninstall: npm install --prefix {install_dir}\nverify: lenient\n",
    )?;

    let plan = DeployPlan::from_yaml_file(&path)?;

    assert_eq!(plan.manifest_name, "package.json");
    assert_eq!(plan.verify, VerifyPolicy::Lenient);
    assert!(plan.install.unwrap().contains("{install_dir}"));
    Ok(())
}

#[test]
fn dropped_workspace_is_removed() -> Result<()> {
    let root = Workspace::create()?.root().to_path_buf();
    assert!(!root.exists());
    Ok(())
}
