use criterion::{black_box, criterion_group, criterion_main, Criterion};
use formpost::{build_form_string, build_query_string, FilePart, MultipartWriter, Part};

fn benchmark_form_string(c: &mut Criterion) {
    let pairs = [
        ("access_token", "ACCESS_TOKEN+/="),
        ("touser", "OPENID"),
        ("msgtype", "text"),
        ("content", "Hello world & welcome 你好"),
    ];

    c.bench_function("build_form_string", |b| {
        b.iter(|| build_form_string(black_box(pairs)))
    });
    c.bench_function("build_query_string", |b| {
        b.iter(|| build_query_string(black_box(pairs)))
    });
}

fn benchmark_multipart_encode(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let file = vec![0xA5u8; 256 * 1024];
    let file = &file;

    c.bench_function("multipart_encode_256k", |b| {
        b.to_async(&runtime).iter(|| async move {
            let mut src: &[u8] = file;
            let parts = vec![
                Part::text("type", "image"),
                FilePart::builder("media")
                    .source(&mut src)
                    .file_name("photo.jpg")
                    .mime_type("image/jpeg")
                    .build()
                    .unwrap()
                    .into(),
            ];
            black_box(MultipartWriter::new().encode(parts).await.unwrap())
        })
    });
}

criterion_group!(benches, benchmark_form_string, benchmark_multipart_encode);
criterion_main!(benches);
