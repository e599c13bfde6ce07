use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One unit of work for the executor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub stdin: Option<String>,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Short content hash identifying the submitted source in logs.
    ///
    /// Source text itself is never logged.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.code)
    }
}

pub(crate) fn fingerprint(code: &str) -> String {
    let digest = Sha256::digest(code.as_bytes());
    digest[..6].iter().map(|b| format!("{:02x}", b)).collect()
}
