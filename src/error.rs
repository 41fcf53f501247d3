// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error and result types.

use std::error;
use std::fmt;

use reqwest::StatusCode;

/// Kind of an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Access denied by the server (HTTP 401 or 403).
    AccessDenied,
    /// Requested resource was not found (HTTP 404).
    ResourceNotFound,
    /// Request rejected by the server (HTTP 400 or another 4xx code).
    BadRequest,
    /// Request timed out, either in the transport or on the server (HTTP 408).
    RequestTimeout,
    /// Conflict in the request (HTTP 409).
    Conflict,
    /// The server limited the rate of requests (HTTP 413 or 429).
    OverLimit,
    /// Internal server error (HTTP 5xx).
    InternalServerError,
    /// The requested functionality is not implemented (HTTP 501).
    NotImplemented,
    /// The service is not available (HTTP 502, 503 or 504).
    ServiceUnavailable,
    /// Invalid value provided by the caller.
    InvalidInput,
    /// The server response was malformed or violated the expected shape.
    InvalidResponse,
    /// Failure at the transport level (connection, TLS, etc).
    ProtocolError,
}

impl ErrorKind {
    /// Short human-readable description of the kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::AccessDenied => "Access to the resource is denied",
            ErrorKind::ResourceNotFound => "Requested resource was not found",
            ErrorKind::BadRequest => "Request was rejected by the server",
            ErrorKind::RequestTimeout => "Request timed out",
            ErrorKind::Conflict => "Requested cannot be fulfilled due to a conflict",
            ErrorKind::OverLimit => "Request was rejected due to a rate limit",
            ErrorKind::InternalServerError => "Internal server error or no response",
            ErrorKind::NotImplemented => "Requested functionality is not implemented",
            ErrorKind::ServiceUnavailable => "The service is not available",
            ErrorKind::InvalidInput => "Invalid value provided",
            ErrorKind::InvalidResponse => "Received invalid response",
            ErrorKind::ProtocolError => "Error sending the request",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<StatusCode> for ErrorKind {
    fn from(value: StatusCode) -> ErrorKind {
        match value {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::AccessDenied,
            StatusCode::NOT_FOUND => ErrorKind::ResourceNotFound,
            StatusCode::REQUEST_TIMEOUT => ErrorKind::RequestTimeout,
            StatusCode::CONFLICT => ErrorKind::Conflict,
            StatusCode::PAYLOAD_TOO_LARGE | StatusCode::TOO_MANY_REQUESTS => ErrorKind::OverLimit,
            StatusCode::NOT_IMPLEMENTED => ErrorKind::NotImplemented,
            StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => ErrorKind::ServiceUnavailable,
            c if c.is_client_error() => ErrorKind::BadRequest,
            _ => ErrorKind::InternalServerError,
        }
    }
}

/// Error from an OpenStack call.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: Option<StatusCode>,
}

impl Error {
    /// Create a new error of the provided kind.
    #[inline]
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Error {
        Error {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status code, if the error was caused by an unsuccessful response.
    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    #[inline]
    pub(crate) fn with_status(mut self, status: StatusCode) -> Error {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Error {
        let kind = if value.is_timeout() {
            ErrorKind::RequestTimeout
        } else if value.is_decode() {
            ErrorKind::InvalidResponse
        } else if let Some(status) = value.status() {
            status.into()
        } else {
            ErrorKind::ProtocolError
        };
        let status = value.status();
        let mut result = Error::new(kind, value.to_string());
        if let Some(status) = status {
            result = result.with_status(status);
        }
        result
    }
}

impl From<http::Error> for Error {
    fn from(value: http::Error) -> Error {
        Error::new(ErrorKind::InvalidInput, value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Error {
        Error::new(ErrorKind::InvalidResponse, value.to_string())
    }
}
