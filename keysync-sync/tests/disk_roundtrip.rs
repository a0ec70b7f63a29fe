use std::fs;
use std::sync::Mutex;

use async_trait::async_trait;
use keysync_core::{AnalyzeResponse, GenerateResponse, Keymap, KeymapChanges, ParseResponse};
use keysync_sync::{
    DiskFileAccess, LogReporter, ServiceError, SkipReason, SyncCoordinator, SyncOutcome, SyncPaths,
    TranslationService,
};
use serde_json::json;
use tempfile::TempDir;

/// Line-oriented stand-in for the translation service: every non-empty native
/// line is one binding, the shared file is the same lines prefixed with `- `.
#[derive(Default)]
struct LineService {
    ops: Mutex<Vec<&'static str>>,
}

impl LineService {
    fn ops(&self) -> Vec<&'static str> {
        self.ops.lock().unwrap().clone()
    }
}

fn lines(keymap: &Keymap) -> Vec<String> {
    keymap
        .0
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl TranslationService for LineService {
    async fn analyze_editor_config(
        &self,
        native_content: &str,
        baseline: Option<&Keymap>,
    ) -> Result<AnalyzeResponse, ServiceError> {
        self.ops.lock().unwrap().push("analyze");
        let current: Vec<String> = native_content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        let before = baseline.map(lines).unwrap_or_default();
        let added = current
            .iter()
            .filter(|l| !before.contains(l))
            .map(|l| json!(l).into())
            .collect();
        let removed = before
            .iter()
            .filter(|l| !current.contains(l))
            .map(|l| json!(l).into())
            .collect();
        Ok(AnalyzeResponse {
            keymap: Some(Keymap(json!(current))),
            changes: Some(KeymapChanges {
                add: added,
                remove: removed,
                update: vec![],
            }),
        })
    }

    async fn generate_keymap(&self, keymap: &Keymap) -> Result<GenerateResponse, ServiceError> {
        self.ops.lock().unwrap().push("generate_keymap");
        let content = lines(keymap)
            .iter()
            .map(|l| format!("- {l}\n"))
            .collect();
        Ok(GenerateResponse { content })
    }

    async fn parse_keymap(&self, content: &str) -> Result<ParseResponse, ServiceError> {
        self.ops.lock().unwrap().push("parse");
        let entries: Vec<&str> = content
            .lines()
            .filter_map(|l| l.strip_prefix("- "))
            .collect();
        Ok(ParseResponse {
            keymap: Some(Keymap(json!(entries))),
        })
    }

    async fn generate_editor_config(
        &self,
        keymap: &Keymap,
        _current_native_content: &str,
    ) -> Result<GenerateResponse, ServiceError> {
        self.ops.lock().unwrap().push("generate_editor_config");
        let content = lines(keymap).iter().map(|l| format!("{l}\n")).collect();
        Ok(GenerateResponse { content })
    }
}

fn setup(root: &TempDir) -> SyncCoordinator<DiskFileAccess, LineService, LogReporter> {
    let _ = env_logger::builder().is_test(true).try_init();
    SyncCoordinator::new(
        SyncPaths {
            native: root.path().join("editor").join("keybindings.conf"),
            shared: root.path().join(".config").join("keymap").join("keymap.yaml"),
        },
        "test-editor",
        DiskFileAccess::new(),
        LineService::default(),
        LogReporter,
    )
}

#[tokio::test]
async fn bootstrap_creates_shared_file_and_its_directories() {
    let root = TempDir::new().expect("root");
    let coordinator = setup(&root);
    let native = coordinator.paths().native.clone();
    fs::create_dir_all(native.parent().unwrap()).unwrap();
    fs::write(&native, "ctrl+s save\nctrl+q quit\n").unwrap();

    let outcome = coordinator.initialize_if_needed().await;

    assert!(
        matches!(outcome, SyncOutcome::Written { ref summary, .. } if summary == "2 added"),
        "got {outcome:?}"
    );
    let shared = fs::read_to_string(&coordinator.paths().shared).expect("shared written");
    assert_eq!(shared, "- ctrl+s save\n- ctrl+q quit\n");

    // Second bootstrap finds the shared file and does nothing.
    assert_eq!(
        coordinator.initialize_if_needed().await,
        SyncOutcome::Skipped(SkipReason::NotNeeded)
    );
}

#[tokio::test]
async fn edits_flow_both_ways_without_feedback_loops() {
    let root = TempDir::new().expect("root");
    let coordinator = setup(&root);
    let native = coordinator.paths().native.clone();
    let shared = coordinator.paths().shared.clone();
    fs::create_dir_all(native.parent().unwrap()).unwrap();
    fs::write(&native, "ctrl+s save\n").unwrap();

    coordinator.on_native_file_changed().await;
    // The watcher would now report the shared write back to us.
    assert_eq!(
        coordinator.on_shared_file_changed().await,
        SyncOutcome::Skipped(SkipReason::Echo)
    );

    // Another editor edits the shared keymap.
    fs::write(&shared, "- ctrl+s save\n- ctrl+p palette\n").unwrap();
    let outcome = coordinator.on_shared_file_changed().await;
    assert!(matches!(outcome, SyncOutcome::Written { .. }), "got {outcome:?}");
    assert_eq!(
        fs::read_to_string(&native).unwrap(),
        "ctrl+s save\nctrl+p palette\n"
    );

    // And the native write echoes back without another analyze.
    let analyzes_before = coordinator
        .service()
        .ops()
        .iter()
        .filter(|op| **op == "analyze")
        .count();
    assert_eq!(
        coordinator.on_native_file_changed().await,
        SyncOutcome::Skipped(SkipReason::Echo)
    );
    let analyzes_after = coordinator
        .service()
        .ops()
        .iter()
        .filter(|op| **op == "analyze")
        .count();
    assert_eq!(analyzes_before, analyzes_after);
}

#[tokio::test]
async fn whitespace_only_edit_is_a_structural_noop() {
    let root = TempDir::new().expect("root");
    let coordinator = setup(&root);
    let native = coordinator.paths().native.clone();
    fs::create_dir_all(native.parent().unwrap()).unwrap();
    fs::write(&native, "ctrl+s save\n").unwrap();
    coordinator.on_native_file_changed().await;
    let shared_before = fs::read_to_string(&coordinator.paths().shared).unwrap();

    fs::write(&native, "ctrl+s save\n\n\n").unwrap();
    let outcome = coordinator.on_native_file_changed().await;

    assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::NoChanges));
    assert_eq!(
        fs::read_to_string(&coordinator.paths().shared).unwrap(),
        shared_before
    );
}
