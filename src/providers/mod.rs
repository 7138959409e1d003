mod http_errors;
pub mod huggingface;
mod sse;
