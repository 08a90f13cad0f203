//! Multipart form data support.
//!
//! Provides streamed multipart/form-data encoding for file uploads. Parts are
//! written straight into an [`AsyncWrite`] sink; a file part copies its
//! source in fixed-size chunks, so at most one chunk is held in memory.
//!
//! # Example
//! ```ignore
//! use formpost::http::multipart::{FilePart, MultipartWriter, Part};
//!
//! let mut file = tokio::fs::File::open("photo.jpg").await?;
//! let parts = vec![
//!     Part::text("media_type", "image"),
//!     FilePart::builder("media")
//!         .source(&mut file)
//!         .file_name("photo.jpg")
//!         .mime_type("image/jpeg")
//!         .build()?
//!         .into(),
//! ];
//!
//! let writer = MultipartWriter::new();
//! writer.write_body(parts, &mut sink).await?;
//! ```

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use bytes::Bytes;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// File name used when a file part does not name one.
pub const DEFAULT_FILE_NAME: &str = "UploadFile";
/// Mime type used when a file part does not name one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const CRLF: &[u8] = b"\r\n";
const COPY_CHUNK_SIZE: usize = 8 * 1024;

/// A readable upload source borrowed from the caller.
pub type BodySource<'a> = &'a mut (dyn AsyncRead + Unpin + Send);

/// One named field of a multipart body.
#[derive(Debug)]
pub enum Part<'a> {
    /// A plain text field.
    Form(FormPart),
    /// A file attachment read from a caller-owned source.
    File(FilePart<'a>),
}

impl<'a> Part<'a> {
    /// Create a text field.
    pub fn text<N, V>(name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Part::Form(FormPart::new(name, value))
    }

    /// The form field name.
    pub fn name(&self) -> &str {
        match self {
            Part::Form(p) => &p.name,
            Part::File(p) => &p.name,
        }
    }

    /// Write this part's headers and body, without the leading delimiter
    /// and without a trailing line break.
    pub async fn write_to<W>(self, out: &mut W) -> Result<(), NetError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        match self {
            Part::Form(p) => p.write_to(out).await,
            Part::File(p) => p.write_to(out).await,
        }
    }
}

impl From<FormPart> for Part<'_> {
    fn from(part: FormPart) -> Self {
        Part::Form(part)
    }
}

impl<'a> From<FilePart<'a>> for Part<'a> {
    fn from(part: FilePart<'a>) -> Self {
        Part::File(part)
    }
}

/// A text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    name: String,
    value: String,
}

impl FormPart {
    pub fn new<N, V>(name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    fn headers(&self) -> String {
        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", self.name)
    }

    async fn write_to<W>(self, out: &mut W) -> Result<(), NetError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        out.write_all(self.headers().as_bytes())
            .await
            .body_sink_context()?;
        out.write_all(self.value.as_bytes())
            .await
            .body_sink_context()
    }
}

/// A file attachment.
///
/// The source is only read, never closed or rewound. It is drained to EOF
/// when the part is written.
pub struct FilePart<'a> {
    name: String,
    file_name: String,
    mime_type: String,
    source: BodySource<'a>,
}

impl fmt::Debug for FilePart<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("name", &self.name)
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

impl<'a> FilePart<'a> {
    /// Start building a file part for the field `name`.
    pub fn builder<N: Into<String>>(name: N) -> FilePartBuilder<'a> {
        FilePartBuilder {
            name: name.into(),
            file_name: None,
            mime_type: None,
            source: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn headers(&self) -> String {
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            self.name, self.file_name, self.mime_type
        )
    }

    async fn write_to<W>(self, out: &mut W) -> Result<(), NetError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        out.write_all(self.headers().as_bytes())
            .await
            .body_sink_context()?;

        let FilePart {
            name,
            file_name,
            source,
            ..
        } = self;

        let mut buf = vec![0u8; COPY_CHUNK_SIZE];
        let mut copied = 0u64;
        loop {
            let n = source.read(&mut buf).await.body_source_context(&name)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n]).await.body_sink_context()?;
            copied += n as u64;
        }

        tracing::debug!(part = %name, file_name = %file_name, bytes = copied, "file part copied");
        Ok(())
    }
}

/// Builder for [`FilePart`].
#[must_use]
pub struct FilePartBuilder<'a> {
    name: String,
    file_name: Option<String>,
    mime_type: Option<String>,
    source: Option<BodySource<'a>>,
}

impl<'a> FilePartBuilder<'a> {
    /// Set the byte source. Required.
    pub fn source<R>(mut self, source: &'a mut R) -> Self
    where
        R: AsyncRead + Unpin + Send,
    {
        self.source = Some(source);
        self
    }

    /// Set an already type-erased byte source, or clear it with `None`.
    pub fn source_opt(mut self, source: Option<BodySource<'a>>) -> Self {
        self.source = source;
        self
    }

    /// Set the file name. Defaults to `UploadFile`.
    pub fn file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Set the mime type. Defaults to `application/octet-stream`.
    pub fn mime_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Validate and build the part.
    pub fn build(self) -> Result<FilePart<'a>, NetError> {
        let source = self.source.ok_or(NetError::MissingBodySource)?;

        let file_name = self.file_name.unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        if file_name.is_empty() {
            return Err(NetError::EmptyFileName);
        }

        let mime_type = self.mime_type.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
        if mime_type.is_empty() {
            return Err(NetError::EmptyMimeType);
        }

        Ok(FilePart {
            name: self.name,
            file_name,
            mime_type,
            source,
        })
    }
}

/// Writer states, in body order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    WriteBoundary,
    WritePart,
    WriteClosingBoundary,
    End,
}

/// Frames a sequence of parts into a multipart/form-data body.
///
/// Each instance owns one boundary; create a new writer per request.
#[derive(Debug, Clone)]
pub struct MultipartWriter {
    boundary: String,
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartWriter {
    /// Create a writer with a fresh random boundary.
    pub fn new() -> Self {
        Self {
            boundary: generate_boundary(),
        }
    }

    /// Create a writer with a fixed boundary.
    pub fn with_boundary<S: Into<String>>(boundary: S) -> Self {
        Self {
            boundary: boundary.into(),
        }
    }

    /// Get the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Write the whole body for `parts`, in order, into `out`.
    ///
    /// ```text
    /// --B\r\n<part 1>\r\n--B\r\n<part 2>\r\n--B--\r\n
    /// ```
    pub async fn write_body<'a, I, W>(&self, parts: I, out: &mut W) -> Result<(), NetError>
    where
        I: IntoIterator<Item = Part<'a>>,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut parts = parts.into_iter();
        let mut current = parts.next();
        let mut written = 0usize;
        let mut state = State::Start;

        loop {
            match state {
                State::Start => {
                    state = if current.is_some() {
                        State::WriteBoundary
                    } else {
                        State::WriteClosingBoundary
                    };
                }
                State::WriteBoundary => {
                    if written > 0 {
                        out.write_all(CRLF).await.body_sink_context()?;
                    }
                    let delimiter = format!("--{}\r\n", self.boundary);
                    out.write_all(delimiter.as_bytes())
                        .await
                        .body_sink_context()?;
                    state = State::WritePart;
                }
                State::WritePart => {
                    if let Some(part) = current.take() {
                        tracing::trace!(part = %part.name(), "writing multipart part");
                        part.write_to(out).await?;
                        written += 1;
                    }
                    current = parts.next();
                    state = if current.is_some() {
                        State::WriteBoundary
                    } else {
                        State::WriteClosingBoundary
                    };
                }
                State::WriteClosingBoundary => {
                    if written > 0 {
                        out.write_all(CRLF).await.body_sink_context()?;
                    }
                    let closing = format!("--{}--\r\n", self.boundary);
                    out.write_all(closing.as_bytes())
                        .await
                        .body_sink_context()?;
                    out.flush().await.body_sink_context()?;
                    state = State::End;
                }
                State::End => {
                    tracing::debug!(parts = written, boundary = %self.boundary, "multipart body written");
                    return Ok(());
                }
            }
        }
    }

    /// Encode the whole body into memory.
    pub async fn encode<'a, I>(&self, parts: I) -> Result<Bytes, NetError>
    where
        I: IntoIterator<Item = Part<'a>>,
    {
        let mut out = Vec::new();
        self.write_body(parts, &mut out).await?;
        Ok(Bytes::from(out))
    }
}

/// Generate a random boundary string.
fn generate_boundary() -> String {
    format!("----formpost-boundary-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_body() {
        let writer = MultipartWriter::with_boundary("B");
        let body = writer.encode(Vec::new()).await.unwrap();
        assert_eq!(&body[..], b"--B--\r\n");
    }

    #[tokio::test]
    async fn test_text_field() {
        let writer = MultipartWriter::with_boundary("B");
        let body = writer.encode(vec![Part::text("a", "1")]).await.unwrap();
        assert_eq!(
            &body[..],
            b"--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--B--\r\n"
        );
    }

    #[tokio::test]
    async fn test_form_and_file() {
        let mut src: &[u8] = b"\x00\x01binary\xff";
        let file = FilePart::builder("f")
            .source(&mut src)
            .file_name("file.txt")
            .mime_type("text/plain")
            .build()
            .unwrap();

        let writer = MultipartWriter::with_boundary("B");
        let body = writer
            .encode(vec![Part::text("a", "1"), file.into()])
            .await
            .unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(b"--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n");
        expected.extend_from_slice(
            b"--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"file.txt\"\r\nContent-Type: text/plain\r\n\r\n",
        );
        expected.extend_from_slice(b"\x00\x01binary\xff");
        expected.extend_from_slice(b"\r\n--B--\r\n");
        assert_eq!(&body[..], &expected[..]);

        // Drained, but still usable by the caller.
        assert!(src.is_empty());
    }

    #[test]
    fn test_file_part_requires_source() {
        let err = FilePart::builder("f").file_name("a.bin").build().unwrap_err();
        assert_eq!(err, NetError::MissingBodySource);

        let err = FilePart::builder("f").source_opt(None).build().unwrap_err();
        assert_eq!(err, NetError::MissingBodySource);
    }

    #[test]
    fn test_file_part_defaults() {
        let mut src: &[u8] = b"x";
        let part = FilePart::builder("media").source(&mut src).build().unwrap();
        assert_eq!(part.file_name(), DEFAULT_FILE_NAME);
        assert_eq!(part.mime_type(), DEFAULT_MIME_TYPE);
        assert_eq!(part.name(), "media");
    }

    #[test]
    fn test_file_part_rejects_empty_fields() {
        let mut src: &[u8] = b"x";
        let err = FilePart::builder("f")
            .source(&mut src)
            .file_name("")
            .build()
            .unwrap_err();
        assert_eq!(err, NetError::EmptyFileName);

        let mut src: &[u8] = b"x";
        let err = FilePart::builder("f")
            .source(&mut src)
            .mime_type("")
            .build()
            .unwrap_err();
        assert_eq!(err, NetError::EmptyMimeType);
    }

    #[test]
    fn test_boundary_is_fresh() {
        let a = MultipartWriter::new();
        let b = MultipartWriter::new();
        assert!(a.boundary().starts_with("----formpost-boundary-"));
        assert_ne!(a.boundary(), b.boundary());
    }

    #[test]
    fn test_content_type() {
        let writer = MultipartWriter::with_boundary("xyz");
        assert_eq!(writer.content_type(), "multipart/form-data; boundary=xyz");
    }

    #[tokio::test]
    async fn test_names_are_not_escaped() {
        let writer = MultipartWriter::with_boundary("B");
        let body = writer
            .encode(vec![Part::text("user[name]", "a\"b")])
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("name=\"user[name]\""));
        assert!(text.contains("\r\n\r\na\"b\r\n"));
    }

    #[tokio::test]
    async fn test_large_file_is_copied_in_full() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let mut src: &[u8] = &data;
        let part = FilePart::builder("big").source(&mut src).build().unwrap();

        let writer = MultipartWriter::with_boundary("B");
        let body = writer.encode(vec![Part::from(part)]).await.unwrap();

        let header_end = body.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let tail = b"\r\n--B--\r\n";
        assert_eq!(&body[header_end..body.len() - tail.len()], &data[..]);
    }
}
