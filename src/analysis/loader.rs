//! Locating, producing, and reading the analyzer's `analysis.json`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tracing::{debug, info};
use walkdir::WalkDir;

use super::models::RawApplication;
use crate::config::ToolboxSettings;
use crate::errors::{CocoaError, Result};

/// File name the analyzer writes its model to.
pub const ANALYSIS_FILENAME: &str = "analysis.json";

/// Loads the raw analyzer output for `project_root`.
///
/// Looks for existing output first (explicit setting, then the project root,
/// then the output directory). When nothing exists and an analyzer jar is
/// configured, runs it. A project with no Java sources and no analyzer
/// yields an empty model.
pub fn load_application(project_root: &Path, settings: &ToolboxSettings) -> Result<RawApplication> {
    if !project_root.is_dir() {
        return Err(CocoaError::analysis(format!(
            "project path '{}' is not a directory",
            project_root.display()
        )));
    }

    if let Some(explicit) = &settings.analysis_json {
        if !explicit.is_file() {
            return Err(CocoaError::analysis(format!(
                "configured analysis output '{}' does not exist",
                explicit.display()
            )));
        }
        return read_application(explicit);
    }

    let output_dir = settings.output_dir_for(project_root);
    if !settings.eager {
        if let Some(existing) = find_existing_output(project_root, &output_dir) {
            return read_application(&existing);
        }
    }

    if let Some(jar) = &settings.codeanalyzer_jar {
        let produced = run_codeanalyzer(jar, project_root, &output_dir, settings)?;
        return read_application(&produced);
    }

    let sources = count_java_sources(project_root, settings);
    if sources == 0 {
        info!(project = %project_root.display(), "no Java sources found; using an empty model");
        return Ok(RawApplication::default());
    }

    Err(CocoaError::analysis(format!(
        "found {} Java source file(s) in '{}' but no {} and no analyzer configured \
         (set analysis.codeanalyzer_jar or analysis.analysis_json)",
        sources,
        project_root.display(),
        ANALYSIS_FILENAME
    )))
}

fn find_existing_output(project_root: &Path, output_dir: &Path) -> Option<PathBuf> {
    [project_root.join(ANALYSIS_FILENAME), output_dir.join(ANALYSIS_FILENAME)]
        .into_iter()
        .find(|p| p.is_file())
}

/// Parses an `analysis.json` file.
pub fn read_application(path: &Path) -> Result<RawApplication> {
    let start = Instant::now();
    let contents = fs::read_to_string(path).map_err(|e| {
        CocoaError::analysis(format!("failed to read '{}': {}", path.display(), e))
    })?;
    let app: RawApplication = serde_json::from_str(&contents).map_err(|e| {
        CocoaError::analysis(format!("failed to parse '{}': {}", path.display(), e))
    })?;
    debug!(
        path = %path.display(),
        files = app.symbol_table.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "read analyzer output"
    );
    Ok(app)
}

/// Runs the analyzer jar and returns the path of the produced model.
fn run_codeanalyzer(
    jar: &Path,
    project_root: &Path,
    output_dir: &Path,
    settings: &ToolboxSettings,
) -> Result<PathBuf> {
    if !jar.is_file() {
        return Err(CocoaError::analysis(format!(
            "analyzer jar '{}' does not exist",
            jar.display()
        )));
    }
    fs::create_dir_all(output_dir)?;

    info!(
        jar = %jar.display(),
        project = %project_root.display(),
        output = %output_dir.display(),
        level = settings.analysis_level,
        "running analyzer"
    );
    let start = Instant::now();
    let output = Command::new(&settings.java)
        .arg("-jar")
        .arg(jar)
        .arg("--input")
        .arg(project_root)
        .arg("--output")
        .arg(output_dir)
        .arg("--analysis-level")
        .arg(settings.analysis_level.to_string())
        .output()
        .map_err(|e| {
            CocoaError::analysis(format!("failed to launch '{}': {}", settings.java, e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CocoaError::analysis(format!(
            "analyzer exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let produced = output_dir.join(ANALYSIS_FILENAME);
    if !produced.is_file() {
        return Err(CocoaError::analysis(format!(
            "analyzer finished but '{}' was not written",
            produced.display()
        )));
    }
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "analyzer finished");
    Ok(produced)
}

/// Counts `.java` files under `project_root`, skipping hidden directories and
/// paths matched by the configured exclude patterns.
pub fn count_java_sources(project_root: &Path, settings: &ToolboxSettings) -> usize {
    WalkDir::new(project_root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "java"))
        .filter(|e| {
            e.path()
                .strip_prefix(project_root)
                .map(|rel| !settings.is_excluded(&rel.to_string_lossy()))
                .unwrap_or(false)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn isolated_settings(dir: &Path) -> ToolboxSettings {
        ToolboxSettings {
            output_dir: Some(dir.join("out-cache")),
            ..ToolboxSettings::default()
        }
    }

    #[test]
    fn test_empty_project_yields_empty_model() {
        let dir = TempDir::new().unwrap();
        let app = load_application(dir.path(), &isolated_settings(dir.path())).unwrap();
        assert!(app.symbol_table.is_empty());
    }

    #[test]
    fn test_sources_without_analyzer_fail() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.java"), "class A {}").unwrap();
        let err = load_application(dir.path(), &isolated_settings(dir.path())).unwrap_err();
        assert!(err.to_string().contains("1 Java source"));
    }

    #[test]
    fn test_excluded_sources_not_counted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("build/gen")).unwrap();
        fs::write(dir.path().join("build/gen/A.java"), "class A {}").unwrap();
        fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join(".hidden/B.java"), "class B {}").unwrap();
        let settings = isolated_settings(dir.path());
        assert_eq!(count_java_sources(dir.path(), &settings), 0);
    }

    #[test]
    fn test_project_root_output_preferred() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.java"), "class A {}").unwrap();
        fs::write(
            dir.path().join(ANALYSIS_FILENAME),
            r#"{"symbol_table": {"A.java": {"file_path": "A.java"}}}"#,
        )
        .unwrap();
        let app = load_application(dir.path(), &isolated_settings(dir.path())).unwrap();
        assert_eq!(app.symbol_table.len(), 1);
        assert!(app.call_graph.is_none());
    }

    #[test]
    fn test_missing_project_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(load_application(&missing, &isolated_settings(dir.path())).is_err());
    }
}
