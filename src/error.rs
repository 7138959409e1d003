use reqwest::StatusCode;
use thiserror::Error;

/// Fatal problems detected before the chat loop starts.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{var} not found in environment variables. Please check your .env file.")]
    MissingCredential { var: &'static str },

    #[error("invalid model identifier '{model}': expected a non-empty name without whitespace")]
    InvalidModel { model: String },

    #[error("invalid MODEL_BASE_URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid prompt template: {reason}")]
    InvalidTemplate { reason: String },

    #[error("failed to initialize HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// Failures of a single model call. The session reports these and keeps going.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error(
        "model request timed out after {timeout_secs}s while calling '{api_url}'. \
         Increase MODEL_TIMEOUT_SECS or check model responsiveness."
    )]
    Timeout { api_url: String, timeout_secs: u64 },

    #[error(
        "connection refused by model API at '{api_url}'. \
         Check MODEL_BASE_URL and that the endpoint is reachable."
    )]
    ConnectionRefused { api_url: String },

    #[error(
        "failed to connect to model API at '{api_url}'. \
         Check MODEL_BASE_URL and network connectivity."
    )]
    Connect { api_url: String },

    #[error("failed to call model API at '{api_url}': {source}")]
    Request {
        api_url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("model API rejected the credential with status {status}. Check HF_TOKEN: {body}")]
    Unauthorized { status: StatusCode, body: String },

    #[error("model API rate limit reached (status {status}): {body}")]
    RateLimited { status: StatusCode, body: String },

    #[error("model request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("model response stream failed: {reason}")]
    Stream { reason: String },

    #[error("failed to parse model response: {reason}")]
    MalformedChunk { reason: String },

    #[error("model API returned an error: {message}")]
    Remote { message: String },
}

/// Outcome of a failed turn: either the model call broke or we could not write output.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error("failed to write model output")]
    Output(#[from] std::io::Error),
}
