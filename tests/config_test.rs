use cocoa::config::*;
use tempfile::TempDir;

fn lookup(name: &str) -> Option<String> {
    match name {
        "JAVA_HOME" => Some("/opt/jdk".to_string()),
        _ => None,
    }
}

#[test]
fn test_missing_file_loads_empty_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let store = ConfigStore::load(&path).unwrap();
    assert_eq!(store.path(), Some(path.as_path()));
    assert!(store.get("analysis", "java").is_none());
}

#[test]
fn test_set_save_keeps_raw_value() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut store = ConfigStore::load(&path).unwrap();
    store.set("analysis", "java", "${JAVA_HOME}/bin/java");
    store.set("analysis", "eager", true);
    store.save().unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("${JAVA_HOME}/bin/java"));

    let reloaded = ConfigStore::load(&path).unwrap();
    let java = reloaded.get_with("analysis", "java", lookup).unwrap();
    assert_eq!(java.as_str(), Some("/opt/jdk/bin/java"));
    assert_eq!(
        reloaded.get("analysis", "eager").and_then(|v| v.as_bool()),
        Some(true)
    );
}

#[test]
fn test_save_without_backing_file_fails() {
    let store = ConfigStore::empty();
    assert!(store.save().is_err());
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[analysis\njava = ").unwrap();
    assert!(ConfigStore::load(&path).is_err());
}

#[test]
fn test_settings_from_store() {
    let store = ConfigStore::from_toml_str(
        r#"
        [analysis]
        analysis_json = "/data/analysis.json"
        analysis_level = 1
        exclude = ["generated/**"]
        "#,
    )
    .unwrap();
    let settings = ToolboxSettings::from_store(&store).unwrap();
    assert_eq!(
        settings.analysis_json.as_deref(),
        Some(std::path::Path::new("/data/analysis.json"))
    );
    assert_eq!(settings.analysis_level, 1);
    assert_eq!(settings.java, "java");
    assert!(settings.is_excluded("generated/Foo.java"));
    assert!(!settings.is_excluded("target/Foo.java"));
}

#[test]
fn test_settings_reject_bad_values() {
    let store = ConfigStore::from_toml_str("[analysis]\nanalysis_level = 5\n").unwrap();
    assert!(ToolboxSettings::from_store(&store).is_err());

    let store = ConfigStore::from_toml_str("[analysis]\neager = \"yes\"\n").unwrap();
    assert!(ToolboxSettings::from_store(&store).is_err());
}

#[test]
fn test_output_dir_is_stable_per_project() {
    let settings = ToolboxSettings::default();
    let a = settings.output_dir_for(std::path::Path::new("/work/a"));
    let b = settings.output_dir_for(std::path::Path::new("/work/b"));
    assert_ne!(a, b);
    assert_eq!(a, settings.output_dir_for(std::path::Path::new("/work/a")));
    assert_eq!(project_fingerprint(std::path::Path::new("/work/a")).len(), 16);
}
