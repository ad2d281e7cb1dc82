//! Integration tests for the section-scoped mutation engine.
//!
//! Every test works on a document inside its own temporary directory.

use plandoc::config::GuardConfig;
use plandoc::engine::MutationEngine;
use plandoc::error::{EngineError, ErrorCode};
use plandoc::types::{LOOP_REQUIRED_HEADERS, ORA_TASKS_HEADER, USER_TASKS_HEADER};
use std::path::PathBuf;
use tempfile::TempDir;

const PLAN: &str = "\
# Plan

Intro text that must survive.

## Tasks

### User-Defined Tasks
- [ ] Write docs
  id: docs
  added_by: user
  status: pending
  source: roadmap

### Ora-Suggested Tasks
- [ ] Refactor parser
  id: parser
  added_by: agent
  status: pending
  source: review

```markdown
### User-Defined Tasks
- [ ] not a real task
```

## Notes
Keep me.
";

fn setup(content: &str) -> (TempDir, MutationEngine, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let engine = MutationEngine::new(dir.path().join(".backups"), GuardConfig::default());
    let path = dir.path().join("plan.md");
    std::fs::write(&path, content).expect("Failed to write document");
    (dir, engine, path)
}

fn read(path: &PathBuf) -> String {
    std::fs::read_to_string(path).expect("document should exist")
}

// ---------------------------------------------------------------------------
// append_to_section
// ---------------------------------------------------------------------------

mod append_tests {
    use super::*;

    #[test]
    fn append_only_changes_the_target_section() {
        let (_dir, engine, path) = setup(PLAN);
        let block = "- [ ] New task\n  id: new";
        engine
            .append_to_section(&path, USER_TASKS_HEADER, block, Some("new"))
            .expect("append should succeed");

        let after = read(&path);
        let expected = PLAN.replacen(
            "  source: roadmap\n",
            "  source: roadmap\n- [ ] New task\n  id: new\n",
            1,
        );
        assert_eq!(after, expected);
    }

    #[test]
    fn headers_inside_code_fences_are_ignored() {
        let (_dir, engine, path) = setup(PLAN);
        engine
            .append_to_section(&path, ORA_TASKS_HEADER, "- extra", None)
            .expect("append should succeed");

        // The fenced header neither starts nor ends a section.
        let after = read(&path);
        assert!(after.contains("- [ ] not a real task\n```\n- extra\n\n## Notes"));
        assert_eq!(after.matches("- extra").count(), 1);
    }

    #[test]
    fn missing_section_reports_the_header() {
        let (_dir, engine, path) = setup(PLAN);
        let err = engine
            .append_to_section(&path, "## 🔧 Tasks", "- x", None)
            .expect_err("section is absent");
        assert_eq!(err.code(), ErrorCode::SectionNotFound);
        assert_eq!(read(&path), PLAN);
    }
}

// ---------------------------------------------------------------------------
// replace_in_section
// ---------------------------------------------------------------------------

mod replace_tests {
    use super::*;

    #[test]
    fn stale_old_text_fails_without_writing() {
        let (_dir, engine, path) = setup(PLAN);
        let before = std::fs::metadata(&path).unwrap().modified().unwrap();

        let err = engine
            .replace_in_section(
                &path,
                USER_TASKS_HEADER,
                "- [ ] Write docs\n  id: docs\n  status: done",
                "whatever",
                Some("docs"),
            )
            .expect_err("old text does not match");
        assert!(matches!(err, EngineError::BlockNotFound { .. }));
        assert_eq!(read(&path), PLAN);
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn text_in_other_sections_is_not_matched() {
        let (_dir, engine, path) = setup(PLAN);
        let err = engine
            .replace_in_section(&path, USER_TASKS_HEADER, "Refactor parser", "x", None)
            .expect_err("text lives in the other section");
        assert_eq!(err.code(), ErrorCode::BlockNotFound);
    }

    #[test]
    fn deleting_then_restoring_is_identity() {
        let (_dir, engine, path) = setup(PLAN);
        let record = "- [ ] Write docs\n  id: docs\n  added_by: user\n  status: pending\n  source: roadmap\n";

        engine
            .replace_in_section(&path, USER_TASKS_HEADER, record, "", None)
            .expect("delete should succeed");
        assert!(!read(&path).contains("Write docs"));

        engine
            .replace_in_section(&path, USER_TASKS_HEADER, "", record, None)
            .expect("append should succeed");
        assert_eq!(read(&path), PLAN);
    }
}

// ---------------------------------------------------------------------------
// replace_record
// ---------------------------------------------------------------------------

mod record_tests {
    use super::*;

    #[test]
    fn record_is_found_by_id_not_text() {
        let drifted = PLAN.replace("  status: pending\n  source: roadmap", "  status:    pending\n  source: roadmap");
        let (_dir, engine, path) = setup(&drifted);

        engine
            .replace_record(
                &path,
                USER_TASKS_HEADER,
                "docs",
                "- [x] Write docs\n  id: docs\n  added_by: user\n  status: done\n  source: roadmap",
            )
            .expect("record should be found by id");

        let after = read(&path);
        assert!(after.contains("- [x] Write docs\n  id: docs"));
        assert!(after.contains("- [ ] Refactor parser"));
    }

    #[test]
    fn unknown_id_is_block_not_found() {
        let (_dir, engine, path) = setup(PLAN);
        let err = engine
            .replace_record(&path, ORA_TASKS_HEADER, "docs", "x")
            .expect_err("docs lives in the user section");
        match err {
            EngineError::BlockNotFound { record_id, header, .. } => {
                assert_eq!(record_id.as_deref(), Some("docs"));
                assert_eq!(header, ORA_TASKS_HEADER);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// validate_markdown_schema
// ---------------------------------------------------------------------------

mod schema_tests {
    use super::*;

    #[test]
    fn all_missing_headers_are_listed() {
        let (_dir, engine, path) = setup("# loop-1\n\n## 🧾 Execution Log\n");
        let report = engine
            .validate_markdown_schema(&path, LOOP_REQUIRED_HEADERS, None)
            .expect("validation should run");
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["## 🔧 Tasks", "## 💬 Chat"]);

        let err = report.into_result(&path).expect_err("report is invalid");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "SCHEMA_INVALID");
        assert_eq!(json["details"]["missing"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn complete_document_is_valid() {
        let (_dir, engine, path) = setup(PLAN);
        let report = engine
            .validate_markdown_schema(&path, &[USER_TASKS_HEADER, ORA_TASKS_HEADER], None)
            .expect("validation should run");
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }
}
