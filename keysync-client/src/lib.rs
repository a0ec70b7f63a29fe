//! # keysync-client
//!
//! HTTP/JSON transport for the translation service.
//!
//! Every operation is a `POST` with a JSON body that carries the configured
//! editor id:
//!
//! | operation                | path               | body                            |
//! |--------------------------|--------------------|---------------------------------|
//! | `analyze_editor_config`  | `/analyze`         | `{editor, content, baseline?}`  |
//! | `generate_keymap`        | `/keymap/generate` | `{editor, keymap}`              |
//! | `parse_keymap`           | `/keymap/parse`    | `{editor, content}`             |
//! | `generate_editor_config` | `/editor/generate` | `{editor, keymap, content}`     |
//!
//! Requests run on tokio's blocking pool via `ureq`; the agent's timeout is
//! the only deadline, and it surfaces as [`ServiceError::Transport`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use keysync_core::{
    AnalyzeResponse, GenerateResponse, Keymap, ParseResponse, ServiceConfig, SyncConfig,
};
use keysync_sync::{ServiceError, TranslationService};

pub const ANALYZE_PATH: &str = "analyze";
pub const GENERATE_KEYMAP_PATH: &str = "keymap/generate";
pub const PARSE_KEYMAP_PATH: &str = "keymap/parse";
pub const GENERATE_EDITOR_CONFIG_PATH: &str = "editor/generate";

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    editor: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    baseline: Option<&'a Keymap>,
}

#[derive(Debug, Serialize)]
struct GenerateKeymapRequest<'a> {
    editor: &'a str,
    keymap: &'a Keymap,
}

#[derive(Debug, Serialize)]
struct ParseKeymapRequest<'a> {
    editor: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateEditorConfigRequest<'a> {
    editor: &'a str,
    keymap: &'a Keymap,
    content: &'a str,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`TranslationService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTranslationClient {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
    editor: String,
}

impl HttpTranslationClient {
    pub fn new(service: &ServiceConfig, editor: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(service.timeout_secs))
            .build();
        Self {
            agent,
            base_url: service.url.trim_end_matches('/').to_string(),
            token: service.token.clone(),
            editor: editor.into(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(&config.service, config.editor.clone())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned + Send + 'static,
    {
        let body = serde_json::to_value(body).map_err(|e| ServiceError::Encode(e.to_string()))?;
        let agent = self.agent.clone();
        let url = self.endpoint(path);
        let token = self.token.clone();
        tracing::debug!(url = %url, "translation request");
        tokio::task::spawn_blocking(move || post_blocking(&agent, &url, token.as_deref(), &body))
            .await
            .map_err(|err| ServiceError::Join(err.to_string()))?
    }
}

fn post_blocking<R: DeserializeOwned>(
    agent: &ureq::Agent,
    url: &str,
    token: Option<&str>,
    body: &Value,
) -> Result<R, ServiceError> {
    let mut request = agent.post(url).set("Accept", "application/json");
    if let Some(token) = token {
        request = request.set("Authorization", &format!("Bearer {token}"));
    }
    match request.send_json(body) {
        Ok(response) => response
            .into_json::<R>()
            .map_err(|e| ServiceError::Decode(e.to_string())),
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            tracing::warn!(url = %url, code, "translation service error status");
            Err(ServiceError::Status { code, body })
        }
        Err(ureq::Error::Transport(transport)) => {
            Err(ServiceError::Transport(transport.to_string()))
        }
    }
}

#[async_trait]
impl TranslationService for HttpTranslationClient {
    async fn analyze_editor_config(
        &self,
        native_content: &str,
        baseline: Option<&Keymap>,
    ) -> Result<AnalyzeResponse, ServiceError> {
        let body = AnalyzeRequest {
            editor: &self.editor,
            content: native_content,
            baseline,
        };
        self.post(ANALYZE_PATH, &body).await
    }

    async fn generate_keymap(&self, keymap: &Keymap) -> Result<GenerateResponse, ServiceError> {
        let body = GenerateKeymapRequest {
            editor: &self.editor,
            keymap,
        };
        self.post(GENERATE_KEYMAP_PATH, &body).await
    }

    async fn parse_keymap(&self, content: &str) -> Result<ParseResponse, ServiceError> {
        let body = ParseKeymapRequest {
            editor: &self.editor,
            content,
        };
        self.post(PARSE_KEYMAP_PATH, &body).await
    }

    async fn generate_editor_config(
        &self,
        keymap: &Keymap,
        current_native_content: &str,
    ) -> Result<GenerateResponse, ServiceError> {
        let body = GenerateEditorConfigRequest {
            editor: &self.editor,
            keymap,
            content: current_native_content,
        };
        self.post(GENERATE_EDITOR_CONFIG_PATH, &body).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
