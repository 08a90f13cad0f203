use thiserror::Error;

/// Broad classification of a [`NetError`], as seen by callers.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorKind {
    /// A required argument was missing, empty or malformed.
    InvalidArgument,
    /// Connection, DNS, TLS, timeout or non-success status.
    TransportFailure,
    /// The response bytes could not be decoded with the requested charset.
    ResponseDecodeFailure,
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // Argument Errors
    #[error("File part has no byte source")]
    MissingBodySource,
    #[error("File part file name is empty")]
    EmptyFileName,
    #[error("File part mime type is empty")]
    EmptyMimeType,
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("Unknown character encoding label")]
    UnknownEncoding,
    #[error("Invalid header value")]
    InvalidHeaderValue,
    #[error("Bad SSL client auth cert")]
    BadClientCertificate,
    #[error("Value cannot be represented as a form field")]
    UnsupportedFormValue,

    // Connection Errors
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("SSL protocol error")]
    SslProtocolError,

    // HTTP Errors
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("Redirect requires resending a streamed body")]
    RedirectBodyNotReplayable,
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("Error reading HTTP body")]
    HttpBodyError,
    #[error("Error reading upload source")]
    BodySourceFailed,
    #[error("Request body sink closed")]
    BodySinkClosed,

    // Decode Errors
    #[error("Response is not valid in the requested encoding")]
    ResponseDecodeFailed,
}

impl NetError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NetError::MissingBodySource
            | NetError::EmptyFileName
            | NetError::EmptyMimeType
            | NetError::InvalidUrl
            | NetError::UnknownUrlScheme
            | NetError::UnknownEncoding
            | NetError::InvalidHeaderValue
            | NetError::BadClientCertificate
            | NetError::UnsupportedFormValue => ErrorKind::InvalidArgument,

            NetError::ResponseDecodeFailed => ErrorKind::ResponseDecodeFailure,

            NetError::NameNotResolved
            | NetError::ConnectionRefused
            | NetError::ConnectionFailed
            | NetError::ConnectionClosed
            | NetError::ConnectionTimedOut
            | NetError::SslProtocolError
            | NetError::TooManyRedirects
            | NetError::RedirectBodyNotReplayable
            | NetError::HttpStatus(_)
            | NetError::HttpBodyError
            | NetError::BodySourceFailed
            | NetError::BodySinkClosed => ErrorKind::TransportFailure,
        }
    }

    /// Returns true if the request never produced a usable response.
    pub fn is_transport_failure(&self) -> bool {
        self.kind() == ErrorKind::TransportFailure
    }

    /// Chromium-style numeric code. Crate-specific errors start at -900.
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionFailed => -104,
            NetError::NameNotResolved => -105,
            NetError::SslProtocolError => -107,
            NetError::BadClientCertificate => -117,
            NetError::ConnectionTimedOut => -118,

            NetError::InvalidUrl => -300,
            NetError::UnknownUrlScheme => -302,
            NetError::TooManyRedirects => -310,
            NetError::HttpBodyError => -320,

            NetError::MissingBodySource => -900,
            NetError::EmptyFileName => -901,
            NetError::EmptyMimeType => -902,
            NetError::UnknownEncoding => -903,
            NetError::InvalidHeaderValue => -904,
            NetError::UnsupportedFormValue => -905,
            NetError::RedirectBodyNotReplayable => -906,
            NetError::BodySourceFailed => -907,
            NetError::BodySinkClosed => -908,
            NetError::ResponseDecodeFailed => -909,
            NetError::HttpStatus(_) => -910,
        }
    }
}

/// Request assembly only fails on the URI or a header, since methods and
/// header names are typed before they reach the builder.
impl From<http::Error> for NetError {
    fn from(err: http::Error) -> Self {
        if err.is::<http::uri::InvalidUri>() || err.is::<http::uri::InvalidUriParts>() {
            NetError::InvalidUrl
        } else {
            NetError::InvalidHeaderValue
        }
    }
}
