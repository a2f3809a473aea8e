//! Integration tests for conversion and restoration.
//!
//! Tests cover:
//! - Convert then restore round trip
//! - Deleted user entries recorded with a reason
//! - Sanitized logs with and without defaults
//! - Idempotent recreate/preserve actions
//! - Partial failure isolation
//! - Conflict detection

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use templatize::core::categorizer::FileCategorizer;
use templatize::core::converter::convert_project;
use templatize::core::engine::{RestorationEngine, RestoreOptions, RestoreOutcome};
use templatize::core::processor::RestorationProcessor;
use templatize::core::prompter::InputSource;
use templatize::core::undo_log::{read_undo_log, UndoLogOptions};
use templatize::models::conversion::{
    ConversionAction, ConversionAnalysis, ConversionPlan, DetectedPlaceholder,
};
use templatize::models::restoration::{Action, ConflictType, RestorationMode, RestorationPlan};
use templatize::models::undo_log::{ProjectType, Replacement, UndoLog, UndoLogMetadata};
use templatize::{Error, Result};
use tempfile::TempDir;

/// Input that is always closed.
struct NoInput;

impl InputSource for NoInput {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn confirm(&mut self, _prompt: &str, _default: bool) -> Result<Option<bool>> {
        Ok(None)
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap()
}

fn silent_options(root: &Path) -> RestoreOptions {
    let mut options = RestoreOptions::new(root);
    options.yes = true;
    options.silent = true;
    options
}

fn empty_log() -> UndoLog {
    UndoLog {
        version: "1.0.0".to_string(),
        metadata: UndoLogMetadata {
            tool_version: "0.1.0".to_string(),
            project_type: ProjectType::Generic,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            placeholder_format: "{{PLACEHOLDER}}".to_string(),
        },
        original_values: BTreeMap::new(),
        file_operations: vec![],
        sanitized: false,
        sanitization_map: BTreeMap::new(),
    }
}

fn plan_of(log: &UndoLog, actions: Vec<Action>) -> RestorationPlan<'_> {
    RestorationPlan {
        undo_log: log,
        mode: RestorationMode::Full,
        actions,
        missing_values: vec![],
        warnings: vec![],
        resolved_values: BTreeMap::new(),
    }
}

// ========== ROUND TRIP ==========

#[tokio::test]
async fn test_convert_then_restore_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let package = "{\n  \"name\": \"acme-app\",\n  \"version\": \"1.0.0\"\n}\n";
    let readme = "# acme-app\n\nWelcome to acme-app.\n";
    let env = "API_URL=http://localhost:8787\n";
    write(root, "package.json", package);
    write(root, "README.md", readme);
    write(root, ".env", env);
    write(root, "node_modules/left-pad/index.js", "module.exports = 1;\n");

    let plan = ConversionPlan {
        analysis: ConversionAnalysis {
            project_type: ProjectType::ViteReact,
            placeholders: vec![DetectedPlaceholder {
                placeholder: "{{PROJECT_NAME}}".to_string(),
                value: "acme-app".to_string(),
            }],
        },
        actions: vec![
            ConversionAction::Modify {
                file: PathBuf::from("package.json"),
                replacements: vec![Replacement::new("acme-app", "{{PROJECT_NAME}}")],
            },
            ConversionAction::Modify {
                file: PathBuf::from("README.md"),
                replacements: vec![Replacement::new("acme-app", "{{PROJECT_NAME}}")],
            },
            ConversionAction::Delete {
                path: PathBuf::from(".env"),
            },
            ConversionAction::Delete {
                path: PathBuf::from("node_modules"),
            },
            ConversionAction::Create {
                path: PathBuf::from("SETUP.md"),
                content: "# Setup\n".to_string(),
            },
        ],
    };

    let (undo_log, report) = convert_project(
        FileCategorizer::new(root),
        &plan,
        &UndoLogOptions::default(),
        &root.join(".template-undo.json"),
    )
    .await
    .unwrap();

    assert!(report.success());
    assert_eq!(undo_log.file_operations.len(), 5);
    assert!(read(root, "package.json").contains("{{PROJECT_NAME}}"));
    assert!(!root.join(".env").exists());
    assert!(!root.join("node_modules").exists());

    let mut input = NoInput;
    let mut engine = RestorationEngine::new(silent_options(root), &mut input);
    let outcome = engine.restore().await.unwrap();

    let result = match outcome {
        RestoreOutcome::Completed { result, .. } => result,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(read(root, "package.json"), package);
    assert_eq!(read(root, "README.md"), readme);
    assert_eq!(read(root, ".env"), env);
    assert!(root.join("node_modules").is_dir());
    assert_eq!(std::fs::read_dir(root.join("node_modules")).unwrap().count(), 0);
    assert_eq!(read(root, "SETUP.md"), "# Setup\n");
    assert!(result
        .cleanup_guidance
        .iter()
        .any(|g| g.contains("npm install")));
}

#[tokio::test]
async fn test_modified_file_restored_from_reversed_replacements() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "package.json", r#"{"name": "{{PROJECT_NAME}}"}"#);
    write(
        root,
        ".template-undo.json",
        r#"{
            "version": "1.0.0",
            "metadata": {
                "toolVersion": "0.1.0",
                "projectType": "generic",
                "timestamp": "2024-01-01T00:00:00Z",
                "placeholderFormat": "{{PLACEHOLDER}}"
            },
            "originalValues": {"{{PROJECT_NAME}}": "acme-app"},
            "fileOperations": [{
                "type": "modified",
                "path": "package.json",
                "category": "modified",
                "restorationAction": "restore-content",
                "originalContent": null,
                "fileSize": 20,
                "placeholderReplacements": [{"from": "acme-app", "to": "{{PROJECT_NAME}}"}]
            }]
        }"#,
    );

    let mut input = NoInput;
    let mut engine = RestorationEngine::new(silent_options(root), &mut input);
    let outcome = engine.restore().await.unwrap();

    assert!(matches!(outcome, RestoreOutcome::Completed { ref result, .. } if result.success));
    let restored = read(root, "package.json");
    assert!(restored.contains("acme-app"));
    assert!(!restored.contains("{{PROJECT_NAME}}"));
}

#[tokio::test]
async fn test_round_trip_keeps_literal_placeholder_text() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let readme = "# acme-app\nTemplates use {{PROJECT_NAME}} tokens.\n";
    write(root, "README.md", readme);

    let plan = ConversionPlan {
        analysis: ConversionAnalysis {
            project_type: ProjectType::Generic,
            placeholders: vec![DetectedPlaceholder {
                placeholder: "{{PROJECT_NAME}}".to_string(),
                value: "acme-app".to_string(),
            }],
        },
        actions: vec![ConversionAction::Modify {
            file: PathBuf::from("README.md"),
            replacements: vec![Replacement::new("acme-app", "{{PROJECT_NAME}}")],
        }],
    };
    convert_project(
        FileCategorizer::new(root),
        &plan,
        &UndoLogOptions::default(),
        &root.join(".template-undo.json"),
    )
    .await
    .unwrap();
    assert_eq!(
        read(root, "README.md"),
        "# {{PROJECT_NAME}}\nTemplates use {{PROJECT_NAME}} tokens.\n"
    );

    let mut input = NoInput;
    let mut engine = RestorationEngine::new(silent_options(root), &mut input);
    let outcome = engine.restore().await.unwrap();

    assert!(matches!(outcome, RestoreOutcome::Completed { ref result, .. } if result.success));
    assert_eq!(read(root, "README.md"), readme);
}

#[tokio::test]
async fn test_deleted_user_directory_log_is_readable() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, ".vscode/settings.json", "{\"editor.tabSize\": 2}\n");

    let plan = ConversionPlan {
        analysis: ConversionAnalysis {
            project_type: ProjectType::Generic,
            placeholders: vec![],
        },
        actions: vec![ConversionAction::Delete {
            path: PathBuf::from(".vscode"),
        }],
    };
    let log_path = root.join(".template-undo.json");
    let (undo_log, report) = convert_project(
        FileCategorizer::new(root),
        &plan,
        &UndoLogOptions::default(),
        &log_path,
    )
    .await
    .unwrap();
    assert!(report.success());
    assert!(!root.join(".vscode").exists());

    let op = &undo_log.file_operations[0];
    assert!(op.original_content.is_none());
    assert!(op.warnings.iter().any(|w| w.contains("not recorded")));

    let loaded = read_undo_log(&log_path).await.unwrap();
    assert_eq!(loaded.file_operations[0].warnings, op.warnings);
}

// ========== SANITIZED LOGS ==========

const SANITIZED_LOG: &str = r#"{
    "version": "1.0.0",
    "metadata": {
        "toolVersion": "0.1.0",
        "projectType": "cf-d1",
        "timestamp": "2024-01-01T00:00:00Z",
        "placeholderFormat": "{{PLACEHOLDER}}"
    },
    "originalValues": {
        "{{PROJECT_NAME}}": "acme-app",
        "{{ACCOUNT_ID}}": "[SANITIZED_ACCOUNT_ID]"
    },
    "fileOperations": [{
        "type": "modified",
        "path": "wrangler.toml",
        "category": "modified",
        "restorationAction": "restore-content",
        "originalContent": "name = \"acme-app\"\naccount_id = \"[SANITIZED_ACCOUNT_ID]\"\n",
        "fileSize": 64,
        "placeholderReplacements": [
            {"from": "acme-app", "to": "{{PROJECT_NAME}}"},
            {"from": "[SANITIZED_ACCOUNT_ID]", "to": "{{ACCOUNT_ID}}"}
        ]
    }],
    "sanitized": true,
    "sanitizationMap": {"accountIds": ["originalValues.{{ACCOUNT_ID}}"]}
}"#;

fn sanitized_project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), ".template-undo.json", SANITIZED_LOG);
    write(
        temp_dir.path(),
        "wrangler.toml",
        "name = \"{{PROJECT_NAME}}\"\naccount_id = \"{{ACCOUNT_ID}}\"\n",
    );
    temp_dir
}

#[tokio::test]
async fn test_sanitized_log_without_defaults_reports_missing() {
    let temp_dir = sanitized_project();
    let root = temp_dir.path();

    let mut input = NoInput;
    let mut engine = RestorationEngine::new(silent_options(root), &mut input);

    match engine.restore().await {
        Err(Error::MissingRestorationValues(missing)) => {
            assert_eq!(missing, vec!["{{ACCOUNT_ID}}".to_string()]);
        }
        other => panic!("expected missing values, got {:?}", other.map(|_| ())),
    }
    assert!(read(root, "wrangler.toml").contains("{{ACCOUNT_ID}}"));
}

#[tokio::test]
async fn test_sanitized_log_dry_run_lists_missing() {
    let temp_dir = sanitized_project();
    let mut options = silent_options(temp_dir.path());
    options.dry_run = true;

    let mut input = NoInput;
    let mut engine = RestorationEngine::new(options, &mut input);
    match engine.restore().await.unwrap() {
        RestoreOutcome::DryRun(preview) => {
            assert_eq!(preview.mode, RestorationMode::Sanitized);
            assert_eq!(preview.missing_values, vec!["{{ACCOUNT_ID}}".to_string()]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_sanitized_log_restored_with_defaults() {
    let temp_dir = sanitized_project();
    let root = temp_dir.path();
    write(
        root,
        ".restore-defaults.json",
        r#"{"defaults": {"{{ACCOUNT_ID}}": "0123456789abcdef0123456789abcdef"}}"#,
    );

    let mut input = NoInput;
    let mut engine = RestorationEngine::new(silent_options(root), &mut input);
    let outcome = engine.restore().await.unwrap();

    assert!(matches!(outcome, RestoreOutcome::Completed { ref result, .. } if result.success));
    assert_eq!(
        read(root, "wrangler.toml"),
        "name = \"acme-app\"\naccount_id = \"0123456789abcdef0123456789abcdef\"\n"
    );
}

#[tokio::test]
async fn test_closed_input_cancels_prompting() {
    let temp_dir = sanitized_project();
    let mut options = RestoreOptions::new(temp_dir.path());
    options.yes = true;

    let mut input = NoInput;
    let mut engine = RestorationEngine::new(options, &mut input);
    assert!(matches!(
        engine.restore().await,
        Err(Error::PromptCancelled(_))
    ));
}

// ========== PROCESSOR PROPERTIES ==========

#[tokio::test]
async fn test_idempotent_actions_leave_targets_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, ".env", "A=1\n");
    std::fs::create_dir_all(root.join("node_modules")).unwrap();
    write(root, "SETUP.md", "# Setup\n");

    let log = empty_log();
    let plan = plan_of(
        &log,
        vec![
            Action::RecreateFile {
                path: PathBuf::from(".env"),
                content: Some("A=1\n".to_string()),
            },
            Action::RecreateDirectory {
                path: PathBuf::from("node_modules"),
                regeneration_command: Some("npm install".to_string()),
            },
            Action::PreserveFile {
                path: PathBuf::from("SETUP.md"),
            },
        ],
    );

    let modified_before = std::fs::metadata(root.join(".env")).unwrap().modified().unwrap();
    let result = RestorationProcessor::new(root)
        .execute_plan_with_safety(&plan)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.actions_executed, 3);
    assert!(result.action_results[0].skipped);
    assert!(result.action_results[1].skipped);
    assert_eq!(read(root, ".env"), "A=1\n");
    assert_eq!(
        std::fs::metadata(root.join(".env")).unwrap().modified().unwrap(),
        modified_before
    );
}

#[tokio::test]
async fn test_partial_failure_isolation_at_any_position() {
    for failing_at in 0..4 {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let mut actions = Vec::new();
        for i in 0..3 {
            let name = format!("file{}.txt", i);
            write(root, &name, "template");
            actions.push(Action::RestoreFile {
                path: PathBuf::from(&name),
                content: Some(format!("original {}", i)),
                placeholder_replacements: vec![],
            });
        }
        actions.insert(
            failing_at,
            Action::RestoreFile {
                path: PathBuf::from("does-not-exist.txt"),
                content: Some("x".to_string()),
                placeholder_replacements: vec![],
            },
        );

        let log = empty_log();
        let plan = plan_of(&log, actions);
        let processor = RestorationProcessor::with_options(
            root,
            templatize::core::processor::ProcessorOptions {
                rollback_on_failure: false,
                ..Default::default()
            },
        );
        let result = processor.execute_plan_with_safety(&plan).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.actions_executed, 3);
        assert_eq!(result.failed_count(), 1);
        assert_eq!(result.failures().next().unwrap().index, failing_at);
        for i in 0..3 {
            assert_eq!(read(root, &format!("file{}.txt", i)), format!("original {}", i));
        }
        assert!(result
            .cleanup_guidance
            .iter()
            .any(|g| g.contains("does-not-exist.txt")));
    }
}

// ========== CONFLICTS ==========

#[tokio::test]
async fn test_conflict_detection() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "README.md", "# something else\n");
    write(root, "package.json", "{}");

    let log = empty_log();
    let plan = plan_of(
        &log,
        vec![
            Action::RecreateFile {
                path: PathBuf::from("README.md"),
                content: Some("# acme-app\n".to_string()),
            },
            Action::RestoreFile {
                path: PathBuf::from("package.json"),
                content: Some(r#"{"name":"acme-app"}"#.to_string()),
                placeholder_replacements: vec![],
            },
        ],
    );

    let conflicts = RestorationProcessor::new(root).detect_conflicts(&plan).await;

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].path, PathBuf::from("README.md"));
    assert_eq!(conflicts[0].conflict_type, ConflictType::ContentConflict);
}

#[tokio::test]
async fn test_conflict_blocks_restore_without_backups() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, ".env", "LOCAL=1\n");
    write(
        root,
        ".template-undo.json",
        r#"{
            "version": "1.0.0",
            "metadata": {
                "toolVersion": "0.1.0",
                "projectType": "generic",
                "timestamp": "2024-01-01T00:00:00Z",
                "placeholderFormat": "{{PLACEHOLDER}}"
            },
            "originalValues": {},
            "fileOperations": [{
                "type": "deleted",
                "path": ".env",
                "category": "userCreated",
                "restorationAction": "restore-content",
                "originalContent": "API_KEY=abc\n"
            }]
        }"#,
    );

    let mut options = silent_options(root);
    options.processor.create_backups = false;
    let mut input = NoInput;
    let mut engine = RestorationEngine::new(options, &mut input);

    assert!(matches!(
        engine.restore().await,
        Err(Error::RestorationConflict(_))
    ));
    assert_eq!(read(root, ".env"), "LOCAL=1\n");
}
