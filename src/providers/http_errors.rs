use reqwest::StatusCode;
use std::error::Error as StdError;
use std::io::ErrorKind;

use crate::error::InvocationError;

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == ErrorKind::ConnectionRefused
        {
            return true;
        }

        if source
            .to_string()
            .to_ascii_lowercase()
            .contains("connection refused")
        {
            return true;
        }

        current = source.source();
    }

    false
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == ErrorKind::TimedOut
        {
            return true;
        }

        if source
            .to_string()
            .to_ascii_lowercase()
            .contains("timed out")
        {
            return true;
        }

        current = source.source();
    }

    false
}

pub(crate) fn model_api_request_error(
    err: reqwest::Error,
    api_url: &str,
    timeout_secs: Option<u64>,
) -> InvocationError {
    if let Some(timeout_secs) = timeout_secs
        && (err.is_timeout() || error_chain_has_timeout(&err))
    {
        return InvocationError::Timeout {
            api_url: api_url.to_string(),
            timeout_secs,
        };
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(&err) {
            return InvocationError::ConnectionRefused {
                api_url: api_url.to_string(),
            };
        }

        return InvocationError::Connect {
            api_url: api_url.to_string(),
        };
    }

    InvocationError::Request {
        api_url: api_url.to_string(),
        source: err,
    }
}

pub(crate) fn model_api_stream_error(err: reqwest::Error) -> InvocationError {
    InvocationError::Stream {
        reason: err.to_string(),
    }
}

pub(crate) fn model_api_status_error(status: StatusCode, body: String) -> InvocationError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            InvocationError::Unauthorized { status, body }
        }
        StatusCode::TOO_MANY_REQUESTS => InvocationError::RateLimited { status, body },
        _ => InvocationError::Status { status, body },
    }
}
