//! Multipart body framing, checked against a reference header parser.

use formpost::{FilePart, MultipartWriter, NetError, Part};
use std::io::Cursor;
use tokio::io::AsyncReadExt;

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Split a body into (headers, content) pairs.
fn split_parts(body: &[u8], boundary: &str) -> Vec<(Vec<(String, String)>, Vec<u8>)> {
    let closing = format!("\r\n--{boundary}--\r\n");
    let body = body
        .strip_suffix(closing.as_bytes())
        .expect("closing boundary");
    let first = format!("--{boundary}\r\n");
    let body = body.strip_prefix(first.as_bytes()).expect("first delimiter");
    let delimiter = format!("\r\n--{boundary}\r\n");

    let mut parts = Vec::new();
    let mut rest = body;
    loop {
        let (segment, next) = match rest
            .windows(delimiter.len())
            .position(|w| w == delimiter.as_bytes())
        {
            Some(pos) => (&rest[..pos], Some(&rest[pos + delimiter.len()..])),
            None => (rest, None),
        };

        let mut headers = [httparse::EMPTY_HEADER; 8];
        let (offset, parsed) = match httparse::parse_headers(segment, &mut headers).unwrap() {
            httparse::Status::Complete(done) => done,
            httparse::Status::Partial => panic!("incomplete part headers"),
        };
        let headers = parsed
            .iter()
            .map(|h| {
                (
                    h.name.to_string(),
                    String::from_utf8(h.value.to_vec()).unwrap(),
                )
            })
            .collect();
        parts.push((headers, segment[offset..].to_vec()));

        match next {
            Some(next) => rest = next,
            None => return parts,
        }
    }
}

#[tokio::test]
async fn test_exact_bytes() {
    let mut src: &[u8] = b"hello\r\nworld";
    let parts = vec![
        Part::text("a", "1"),
        FilePart::builder("f")
            .source(&mut src)
            .file_name("file.txt")
            .mime_type("text/plain")
            .build()
            .unwrap()
            .into(),
    ];

    let body = MultipartWriter::with_boundary("B")
        .encode(parts)
        .await
        .unwrap();

    let expected: &[u8] = b"--B\r\n\
Content-Disposition: form-data; name=\"a\"\r\n\
\r\n\
1\r\n\
--B\r\n\
Content-Disposition: form-data; name=\"f\"; filename=\"file.txt\"\r\n\
Content-Type: text/plain\r\n\
\r\n\
hello\r\nworld\r\n\
--B--\r\n";
    assert_eq!(&body[..], expected);
}

#[tokio::test]
async fn test_reference_parser_round_trip() {
    let image: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let mut image_src = Cursor::new(image.clone());
    let mut notes_src: &[u8] = b"line one\nline two";

    let parts = vec![
        Part::text("title", "Holiday"),
        FilePart::builder("media")
            .source(&mut image_src)
            .file_name("beach.png")
            .mime_type("image/png")
            .build()
            .unwrap()
            .into(),
        Part::text("description", "sun & sea"),
        FilePart::builder("notes")
            .source(&mut notes_src)
            .build()
            .unwrap()
            .into(),
    ];

    let writer = MultipartWriter::new();
    let boundary = writer.boundary().to_string();
    let body = writer.encode(parts).await.unwrap();

    assert_eq!(count(&body, format!("--{boundary}\r\n").as_bytes()), 4);
    assert_eq!(count(&body, format!("--{boundary}--\r\n").as_bytes()), 1);

    let parsed = split_parts(&body, &boundary);
    assert_eq!(parsed.len(), 4);

    let (headers, content) = &parsed[0];
    assert_eq!(
        headers,
        &vec![(
            "Content-Disposition".to_string(),
            "form-data; name=\"title\"".to_string()
        )]
    );
    assert_eq!(content, b"Holiday");

    let (headers, content) = &parsed[1];
    assert_eq!(headers.len(), 2);
    assert_eq!(
        headers[0].1,
        "form-data; name=\"media\"; filename=\"beach.png\""
    );
    assert_eq!(headers[1], ("Content-Type".to_string(), "image/png".to_string()));
    assert!(*content == image);

    assert_eq!(parsed[2].1, b"sun & sea");

    let (headers, content) = &parsed[3];
    assert_eq!(
        headers[0].1,
        "form-data; name=\"notes\"; filename=\"UploadFile\""
    );
    assert_eq!(headers[1].1, "application/octet-stream");
    assert_eq!(content, b"line one\nline two");

    // The source is drained but still usable by its owner.
    assert_eq!(image_src.position(), 10_000);
}

#[tokio::test]
async fn test_streams_through_small_pipe() {
    let data = vec![b'x'; 100_000];
    let mut src: &[u8] = &data;
    let parts = vec![FilePart::builder("blob")
        .source(&mut src)
        .build()
        .unwrap()
        .into()];

    let writer = MultipartWriter::with_boundary("small");
    let (mut sink, mut reader) = tokio::io::duplex(64);

    let write = async move {
        let result = writer.write_body(parts, &mut sink).await;
        drop(sink);
        result
    };
    let read = async move {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.map(|_| out)
    };
    let (written, received) = tokio::join!(write, read);
    written.unwrap();
    let received = received.unwrap();

    assert!(received.starts_with(b"--small\r\n"));
    assert!(received.ends_with(b"\r\n--small--\r\n"));
    assert_eq!(count(&received, &data[..1000]), 99_001);
}

#[tokio::test]
async fn test_closed_sink() {
    let (mut sink, reader) = tokio::io::duplex(16);
    drop(reader);

    let err = MultipartWriter::with_boundary("B")
        .write_body(vec![Part::text("a", "1")], &mut sink)
        .await
        .unwrap_err();
    assert_eq!(err, NetError::BodySinkClosed);
}

#[test]
fn test_builder_validation() {
    assert_eq!(
        FilePart::builder("f").build().unwrap_err(),
        NetError::MissingBodySource
    );

    let mut src: &[u8] = b"";
    assert_eq!(
        FilePart::builder("f")
            .source(&mut src)
            .mime_type("")
            .build()
            .unwrap_err(),
        NetError::EmptyMimeType
    );
}
