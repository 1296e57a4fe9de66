// tests/state.rs

use std::collections::BTreeMap;
use std::error::Error;

use tfapply::state::ResourceState;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn missing_state_file_is_empty() -> TestResult {
    let dir = tempfile::tempdir()?;
    let state = ResourceState::load(dir.path().join("tfapply.state.toml"))?;
    assert!(state.is_empty());
    assert!(state.outputs.is_empty());
    Ok(())
}

#[test]
fn saved_state_loads_back() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tfapply.state.toml");
    let state = ResourceState::new(
        "org/mod:1.0.0",
        BTreeMap::from([
            ("x".to_string(), "Hello".to_string()),
            ("list".to_string(), r#"["a","b"]"#.to_string()),
        ]),
    );

    state.save(&path)?;
    assert_eq!(ResourceState::load(&path)?, state);
    Ok(())
}

#[test]
fn clear_forgets_everything() {
    let mut state = ResourceState::new(
        "org/mod:1.0.0",
        BTreeMap::from([("x".to_string(), "Hello".to_string())]),
    );
    state.clear();
    assert_eq!(state, ResourceState::default());
}

#[test]
fn toml_rendering_lists_id_and_outputs() -> TestResult {
    let state = ResourceState::new(
        "org/mod:1.0.0",
        BTreeMap::from([("x".to_string(), "Hello".to_string())]),
    );
    let rendered = state.to_toml()?;

    assert!(rendered.contains(r#"id = "org/mod:1.0.0""#), "{rendered}");
    assert!(rendered.contains("[outputs]"), "{rendered}");
    assert!(rendered.contains(r#"x = "Hello""#), "{rendered}");
    Ok(())
}
