//! In-memory collaborators for coordinator tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use keysync_core::{
    AnalyzeResponse, GenerateResponse, Keymap, KeymapChanges, KeymapEntry, ParseResponse,
};

use crate::collab::{FileAccess, StatusReporter, TranslationService};
use crate::error::{FileAccessError, ServiceError};

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryFiles {
    files: Mutex<HashMap<PathBuf, String>>,
    unreadable: Mutex<HashSet<PathBuf>>,
    ops: Mutex<Vec<String>>,
    reads: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryFiles {
    pub fn with(self, path: &str, content: &str) -> Self {
        self.set(path, content);
        self
    }

    pub fn set(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), content.to_string());
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(Path::new(path)).cloned()
    }

    /// Present but unreadable, like a file with no read permission.
    pub fn make_unreadable(&self, path: &str) {
        self.unreadable.lock().unwrap().insert(PathBuf::from(path));
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.ops().iter().filter(|op| op.starts_with("write:")).count()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl FileAccess for MemoryFiles {
    fn read(&self, path: &Path) -> Result<String, FileAccessError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unreadable.lock().unwrap().contains(path) {
            return Err(FileAccessError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| FileAccessError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), FileAccessError> {
        self.ops
            .lock()
            .unwrap()
            .push(format!("write:{}", path.display()));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FileAccessError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path) || self.unreadable.lock().unwrap().contains(path)
    }

    fn ensure_parent_dir(&self, path: &Path) -> Result<(), FileAccessError> {
        self.ops
            .lock()
            .unwrap()
            .push(format!("ensure:{}", path.display()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Analyze {
        content: String,
        baseline: Option<Keymap>,
    },
    GenerateKeymap(Keymap),
    Parse(String),
    GenerateEditorConfig {
        keymap: Keymap,
        current: String,
    },
}

/// Scripted service: each operation returns its configured response, or a
/// transport error when configured with `Err(message)`.
pub struct ScriptedService {
    calls: Mutex<Vec<Call>>,
    pub analyze: Mutex<Result<AnalyzeResponse, String>>,
    pub keymap_content: Mutex<Result<String, String>>,
    pub parse: Mutex<Result<ParseResponse, String>>,
    pub editor_content: Mutex<Result<String, String>>,
}

pub fn unified_keymap() -> Keymap {
    Keymap(json!({ "bindings": [{ "key": "ctrl+s", "command": "save" }] }))
}

pub fn one_added() -> KeymapChanges {
    KeymapChanges {
        add: vec![KeymapEntry(json!({ "key": "ctrl+s", "command": "save" }))],
        ..Default::default()
    }
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            analyze: Mutex::new(Ok(AnalyzeResponse {
                keymap: Some(unified_keymap()),
                changes: Some(one_added()),
            })),
            keymap_content: Mutex::new(Ok("bindings:\n  - ctrl+s: save\n".to_string())),
            parse: Mutex::new(Ok(ParseResponse {
                keymap: Some(unified_keymap()),
            })),
            editor_content: Mutex::new(Ok(
                r#"[{"key":"ctrl+s","command":"workbench.action.files.save"}]"#.to_string(),
            )),
        }
    }
}

impl ScriptedService {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn analyze_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Analyze { .. }))
    }

    pub fn parse_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Parse(_)))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn scripted<V: Clone>(slot: &Mutex<Result<V, String>>) -> Result<V, ServiceError> {
    slot.lock()
        .unwrap()
        .clone()
        .map_err(ServiceError::Transport)
}

#[async_trait]
impl TranslationService for ScriptedService {
    async fn analyze_editor_config(
        &self,
        native_content: &str,
        baseline: Option<&Keymap>,
    ) -> Result<AnalyzeResponse, ServiceError> {
        self.record(Call::Analyze {
            content: native_content.to_string(),
            baseline: baseline.cloned(),
        });
        scripted(&self.analyze)
    }

    async fn generate_keymap(&self, keymap: &Keymap) -> Result<GenerateResponse, ServiceError> {
        self.record(Call::GenerateKeymap(keymap.clone()));
        scripted(&self.keymap_content).map(|content| GenerateResponse { content })
    }

    async fn parse_keymap(&self, content: &str) -> Result<ParseResponse, ServiceError> {
        self.record(Call::Parse(content.to_string()));
        scripted(&self.parse)
    }

    async fn generate_editor_config(
        &self,
        keymap: &Keymap,
        current_native_content: &str,
    ) -> Result<GenerateResponse, ServiceError> {
        self.record(Call::GenerateEditorConfig {
            keymap: keymap.clone(),
            current: current_native_content.to_string(),
        });
        scripted(&self.editor_content).map(|content| GenerateResponse { content })
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl StatusReporter for RecordingReporter {
    fn report(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
