//! Outbound boundary to the AI provider: text (plus an optional image) in,
//! text or a classified-ready error out.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::llm_client::pool::Credential;

/// Failure of a single outbound call. Carries only the signals the
/// classifier needs: a status code and/or a message.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("malformed response envelope: {0}")]
    Envelope(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Upstream-supplied text, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ProviderError::Status { message, .. }
            | ProviderError::Network(message)
            | ProviderError::Envelope(message)
            | ProviderError::InvalidRequest(message) => Some(message),
            ProviderError::Timeout(_) => None,
        }
    }
}

/// Per-feature sampling knobs forwarded to the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 2000,
        }
    }
}

/// An image sent inline with the prompt (vision features).
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Bytes,
}

/// Opaque prompt payload. The gateway never inspects its contents.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub text: String,
    pub image: Option<InlineImage>,
    pub settings: GenerationSettings,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// The abstract upstream capability. Implementations must tolerate
/// concurrent use of the same credential.
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn call(&self, credential: &Credential, prompt: &Prompt) -> Result<String, ProviderError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted provider used by executor and adapter tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    pub type Script = Box<dyn Fn(&str, u32) -> Result<String, ProviderError> + Send + Sync>;

    /// Replies according to a closure over (credential value, per-credential call number).
    /// Every call is recorded in order.
    pub struct ScriptedProvider {
        script: Script,
        calls: Mutex<Vec<String>>,
        call_times: Mutex<Vec<tokio::time::Instant>>,
        per_key: Mutex<HashMap<String, u32>>,
    }

    impl ScriptedProvider {
        pub fn new(
            script: impl Fn(&str, u32) -> Result<String, ProviderError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                script: Box::new(script),
                calls: Mutex::new(Vec::new()),
                call_times: Mutex::new(Vec::new()),
                per_key: Mutex::new(HashMap::new()),
            }
        }

        /// Always answers with the same text.
        pub fn always(text: &'static str) -> Self {
            Self::new(move |_, _| Ok(text.to_string()))
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_times(&self) -> Vec<tokio::time::Instant> {
            self.call_times.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AiProvider for ScriptedProvider {
        async fn call(
            &self,
            credential: &Credential,
            _prompt: &Prompt,
        ) -> Result<String, ProviderError> {
            let key = credential.expose().to_string();
            self.calls.lock().unwrap().push(key.clone());
            self.call_times
                .lock()
                .unwrap()
                .push(tokio::time::Instant::now());
            let n = {
                let mut per_key = self.per_key.lock().unwrap();
                let count = per_key.entry(key.clone()).or_insert(0);
                *count += 1;
                *count
            };
            (self.script)(&key, n)
        }
    }

    pub fn rate_limited() -> ProviderError {
        ProviderError::Status {
            status: 429,
            message: "Resource has been exhausted (e.g. check quota).".to_string(),
        }
    }

    pub fn server_error() -> ProviderError {
        ProviderError::Status {
            status: 503,
            message: "The model is overloaded. Please try again later.".to_string(),
        }
    }
}
