// tests/config_validation.rs

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tfapply::config::{RawRequestFile, RequestFile, load_and_validate};
use tfapply::errors::ApplyError;
use tfapply::request::ModuleSource;
use tfapply::types::{ScalarValue, parse_duration};

type TestResult = Result<(), Box<dyn Error>>;

fn parse(toml_src: &str) -> Result<RequestFile, ApplyError> {
    let raw: RawRequestFile = toml::from_str(toml_src)?;
    RequestFile::try_from(raw)
}

fn validation_message(toml_src: &str) -> String {
    match parse(toml_src) {
        Err(ApplyError::Validation(msg)) => msg,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn full_request_file_parses() -> TestResult {
    let file = parse(
        r#"
        [settings]
        install_dir = "/opt/terraform"
        log_drain_grace = "500ms"

        [[provider.registry]]
        host = "app.terraform.io"
        token = "secret"

        [[provider.extra_file]]
        path = "providers.tf"
        content = "provider \"null\" {}"

        [module]
        terraform_version = " 1.5.7 "
        source = "weakpixel/test-module/tfcli"
        version = "0.0.2"

        [module.vars]
        string_var = "Hello"
        count = 3
        enabled = true

        [module.backend_config]
        bucket = "state"

        [module.envs]
        TF_LOG = "DEBUG"

        [[module.extra_file]]
        path = "generated/backend.tf"
        content = "terraform {}"
        cleanup = true
        "#,
    )?;

    assert_eq!(file.settings.install_dir, Some(PathBuf::from("/opt/terraform")));
    assert_eq!(file.settings.log_drain_grace, Duration::from_millis(500));
    assert_eq!(file.settings.plan_file, ".tfapply.tfplan");

    assert_eq!(file.provider.registry.len(), 1);
    assert_eq!(file.provider.extra_files[0].path, "providers.tf");
    assert!(!file.provider.extra_files[0].force);

    let req = &file.request;
    assert_eq!(req.terraform_version.as_deref(), Some("1.5.7"));
    assert_eq!(
        req.module,
        ModuleSource::Remote {
            source: "weakpixel/test-module/tfcli".to_string(),
            version: "0.0.2".to_string(),
        }
    );
    assert_eq!(req.vars.get("count"), Some(&ScalarValue::Integer(3)));
    assert_eq!(req.vars.get("enabled"), Some(&ScalarValue::Bool(true)));
    assert_eq!(req.backend_config.len(), 1);
    assert_eq!(req.envs.len(), 1);
    assert!(req.extra_files[0].cleanup);
    assert_eq!(req.extra_files[0].content, b"terraform {}".to_vec());
    Ok(())
}

#[test]
fn defaults_apply_when_sections_missing() -> TestResult {
    let file = parse(
        r#"
        [module]
        module_path = "/srv/modules/net"
        "#,
    )?;

    assert_eq!(file.settings.log_drain_grace, Duration::from_secs(2));
    assert_eq!(file.settings.install_dir, None);
    assert!(file.provider.registry.is_empty());
    assert_eq!(file.request.terraform_version, None);
    assert!(file.request.module.is_local());
    Ok(())
}

#[test]
fn module_location_is_required() {
    let msg = validation_message("[module]\n");
    assert!(msg.contains("please provide either 'source' or 'module_path'"), "{msg}");
}

#[test]
fn source_and_module_path_are_exclusive() {
    let msg = validation_message(
        r#"
        [module]
        source = "org/mod"
        version = "1.0.0"
        module_path = "./mod"
        "#,
    );
    assert!(msg.contains("not both"), "{msg}");
}

#[test]
fn source_needs_version() {
    let msg = validation_message(
        r#"
        [module]
        source = "org/mod"
        "#,
    );
    assert!(msg.contains("'version' is required"), "{msg}");
}

#[test]
fn version_without_source_is_rejected() {
    let msg = validation_message(
        r#"
        [module]
        module_path = "./mod"
        version = "1.0.0"
        "#,
    );
    assert!(msg.contains("only valid together with 'source'"), "{msg}");
}

#[test]
fn invalid_variable_name_is_rejected() {
    let msg = validation_message(
        r#"
        [module]
        source = "org/mod"
        version = "1.0.0"

        [module.vars]
        "1bad" = "x"
        "#,
    );
    assert!(msg.contains("'1bad'"), "{msg}");
}

#[test]
fn extra_file_must_stay_inside_module() {
    let msg = validation_message(
        r#"
        [module]
        source = "org/mod"
        version = "1.0.0"

        [[module.extra_file]]
        path = "../escape.tf"
        content = ""
        "#,
    );
    assert!(msg.contains("must not contain '..'"), "{msg}");

    let msg = validation_message(
        r#"
        [module]
        source = "org/mod"
        version = "1.0.0"

        [[provider.extra_file]]
        path = "/etc/passwd"
        content = ""
        "#,
    );
    assert!(msg.contains("must be relative"), "{msg}");
}

#[test]
fn empty_registry_host_is_rejected() {
    let msg = validation_message(
        r#"
        [[provider.registry]]
        host = " "
        token = "t"

        [module]
        source = "org/mod"
        version = "1.0.0"
        "#,
    );
    assert!(msg.contains("empty host"), "{msg}");
}

#[test]
fn bad_settings_are_config_errors() {
    let err = parse(
        r#"
        [settings]
        log_drain_grace = "soon"

        [module]
        module_path = "./mod"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ApplyError::ConfigError(_)), "got {err:?}");

    let err = parse(
        r#"
        [settings]
        plan_file = "plans/out.tfplan"

        [module]
        module_path = "./mod"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ApplyError::ConfigError(_)), "got {err:?}");
}

#[test]
fn oversized_drain_grace_is_rejected() {
    for grace in ["307445734561825861m", "5124095576030432h"] {
        let err = parse(&format!(
            r#"
            [settings]
            log_drain_grace = "{grace}"

            [module]
            module_path = "./mod"
            "#
        ))
        .unwrap_err();
        match err {
            ApplyError::ConfigError(msg) => assert!(msg.contains("too large"), "got {msg}"),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}

#[test]
fn drain_grace_units() {
    assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
    assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    assert!(parse_duration("3").is_err());
    assert!(parse_duration("3d").is_err());
}

#[test]
fn missing_module_section_is_a_parse_error() {
    let err = parse("[settings]\n").unwrap_err();
    assert!(matches!(err, ApplyError::TomlError(_)), "got {err:?}");
}

#[test]
fn relative_module_path_resolves_against_request_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("tfapply.toml");
    fs::write(&config, "[module]\nmodule_path = \"modules/net\"\n")?;

    let file = load_and_validate(&config)?;

    assert_eq!(
        file.request.module,
        ModuleSource::Local(dir.path().join("modules/net"))
    );
    Ok(())
}
