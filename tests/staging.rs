// tests/staging.rs

mod common;
use crate::common::{init_tracing, local_module, read_string};

use std::collections::BTreeSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use proptest::prelude::*;
use tfapply::errors::ApplyError;
use tfapply::fs::FileSystem;
use tfapply::fs::mock::MockFileSystem;
use tfapply::request::AuxiliaryFileSpec;
use tfapply::staging::{FileStager, target_path};
use tfapply_test_utils::builders::extra_file;

type TestResult = Result<(), Box<dyn Error>>;

fn mock_stager() -> (MockFileSystem, FileStager) {
    let fs = MockFileSystem::new();
    fs.add_dir("/mod");
    let stager = FileStager::new(Arc::new(fs.clone()));
    (fs, stager)
}

#[test]
fn writes_files_into_module_dir() -> TestResult {
    init_tracing();
    let (fs, stager) = mock_stager();

    stager.write(
        Path::new("/mod"),
        &[extra_file("backend.tf", "terraform {}"), extra_file("a.auto.tfvars", "x = 1")],
    )?;

    assert_eq!(fs.file("/mod/backend.tf"), Some(b"terraform {}".to_vec()));
    assert_eq!(fs.file("/mod/a.auto.tfvars"), Some(b"x = 1".to_vec()));
    assert_eq!(fs.write_count(), 2);
    Ok(())
}

#[test]
fn nested_path_creates_missing_directories() -> TestResult {
    let (fs, stager) = mock_stager();

    stager.write(
        Path::new("/mod"),
        &[extra_file("config/env/dev/override.tf", "locals {}")],
    )?;

    assert!(fs.exists(Path::new("/mod/config/env/dev")));
    assert_eq!(
        fs.read(Path::new("/mod/config/env/dev/override.tf"))?,
        b"locals {}".to_vec()
    );
    Ok(())
}

#[test]
fn conflict_rejects_whole_batch() {
    let (fs, stager) = mock_stager();
    fs.add_file("/mod/main.tf", "module main");

    let err = stager
        .write(
            Path::new("/mod"),
            &[extra_file("a.tf", "a"), extra_file("main.tf", "ours")],
        )
        .unwrap_err();

    match err {
        ApplyError::FileConflict { path } => assert_eq!(path, PathBuf::from("main.tf")),
        other => panic!("expected FileConflict, got {other:?}"),
    }
    assert_eq!(fs.write_count(), 0, "nothing may be written on conflict");
    assert_eq!(fs.file("/mod/a.tf"), None);
    assert_eq!(fs.file("/mod/main.tf"), Some(b"module main".to_vec()));
}

#[test]
fn conflict_message_names_path_and_force() {
    let (fs, stager) = mock_stager();
    fs.add_file("/mod/providers.tf", "x");

    let err = stager
        .write(Path::new("/mod"), &[extra_file("providers.tf", "y")])
        .unwrap_err();
    let msg = err.to_string();

    assert!(msg.contains("providers.tf"), "message: {msg}");
    assert!(msg.contains("Use 'force' to overwrite file"), "message: {msg}");
}

#[test]
fn forced_file_overwrites_existing() -> TestResult {
    let (fs, stager) = mock_stager();
    fs.add_file("/mod/main.tf", "module main");

    stager.write(
        Path::new("/mod"),
        &[extra_file("main.tf", "replaced").force(true)],
    )?;

    assert_eq!(fs.file("/mod/main.tf"), Some(b"replaced".to_vec()));
    Ok(())
}

#[test]
fn cleanup_removes_only_marked_files() -> TestResult {
    let (fs, stager) = mock_stager();
    let files = vec![
        extra_file("tmp.tf", "tmp").cleanup(true),
        extra_file("keep.tf", "keep"),
    ];

    stager.write(Path::new("/mod"), &files)?;
    stager.cleanup(Path::new("/mod"), &files);

    assert_eq!(fs.file("/mod/tmp.tf"), None);
    assert_eq!(fs.file("/mod/keep.tf"), Some(b"keep".to_vec()));
    Ok(())
}

#[test]
fn cleanup_ignores_missing_files() {
    let (_fs, stager) = mock_stager();
    // Never written; must not panic or error.
    stager.cleanup(Path::new("/mod"), &[extra_file("gone.tf", "").cleanup(true)]);
}

#[test]
fn real_filesystem_roundtrip() -> TestResult {
    init_tracing();
    let dir = local_module("# module\n");
    let stager = FileStager::default();
    let files = vec![
        extra_file("nested/extra.tf", "# extra\n").cleanup(true),
        extra_file("main.tf", "# forced\n").force(true),
    ];

    stager.write(dir.path(), &files)?;
    assert_eq!(read_string(dir.path().join("nested").join("extra.tf")), "# extra\n");
    assert_eq!(read_string(dir.path().join("main.tf")), "# forced\n");

    stager.cleanup(dir.path(), &files);
    assert!(!dir.path().join("nested").join("extra.tf").exists());
    assert!(dir.path().join("main.tf").exists());
    Ok(())
}

#[test]
fn target_path_uses_native_separators() {
    let joined = target_path(Path::new("/mod"), "a/b/c.tf");
    assert_eq!(joined, Path::new("/mod").join("a").join("b").join("c.tf"));

    let dotted = target_path(Path::new("/mod"), "./x.tf");
    assert_eq!(dotted, Path::new("/mod").join("x.tf"));
}

fn batch_strategy() -> impl Strategy<Value = (Vec<AuxiliaryFileSpec>, BTreeSet<String>)> {
    proptest::collection::btree_set("[a-z]{1,8}", 1..6).prop_flat_map(|names| {
        let n = names.len();
        (
            Just(names),
            proptest::collection::vec(any::<bool>(), n),
            proptest::collection::vec(any::<bool>(), n),
        )
            .prop_map(|(names, existing, forced)| {
                let mut specs = Vec::new();
                let mut present = BTreeSet::new();
                for ((name, exists), force) in names.into_iter().zip(existing).zip(forced) {
                    let path = format!("{name}.tf");
                    if exists {
                        present.insert(path.clone());
                    }
                    specs.push(extra_file(&path, "generated").force(force));
                }
                (specs, present)
            })
    })
}

proptest! {
    #[test]
    fn staging_is_all_or_nothing((specs, present) in batch_strategy()) {
        let (fs, stager) = mock_stager();
        for path in &present {
            fs.add_file(format!("/mod/{path}"), "module");
        }

        let blocked = specs.iter().any(|s| !s.force && present.contains(&s.path));
        let result = stager.write(Path::new("/mod"), &specs);

        if blocked {
            let is_conflict = matches!(result, Err(ApplyError::FileConflict { .. }));
            prop_assert!(is_conflict);
            prop_assert_eq!(fs.write_count(), 0);
            for path in &present {
                prop_assert_eq!(fs.file(format!("/mod/{path}")), Some(b"module".to_vec()));
            }
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(fs.write_count(), specs.len());
            for spec in &specs {
                prop_assert_eq!(fs.file(format!("/mod/{}", spec.path)), Some(b"generated".to_vec()));
            }
        }
    }
}
