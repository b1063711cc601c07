//! Error types for autopr-forge.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    /// The API answered with a non-success status.
    #[error("{method} {url} failed with status {status}: {message}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connection).
    #[error("{method} {url} failed: {message}")]
    Transport {
        method: &'static str,
        url: String,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The account does not expose a name or email; the token likely lacks
    /// the `user` / `user:email` scopes.
    #[error("could not resolve account {field}; check the API key scopes")]
    MissingIdentity { field: &'static str },
}

impl ForgeError {
    pub(crate) fn from_ureq(method: &'static str, url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let message = response
                    .into_string()
                    .ok()
                    .and_then(|body| api_message(&body))
                    .unwrap_or_else(|| "no message".to_string());
                ForgeError::Status {
                    method,
                    url: url.to_string(),
                    status,
                    message,
                }
            }
            ureq::Error::Transport(transport) => ForgeError::Transport {
                method,
                url: url.to_string(),
                message: transport.to_string(),
            },
        }
    }
}

/// GitHub error bodies look like `{"message": "...", ...}`.
fn api_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}
