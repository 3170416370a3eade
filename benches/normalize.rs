use std::hint::black_box;
use std::io::Cursor;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use image::{ImageFormat, Rgb, RgbImage};
use imcatalog::normalize::normalize_bytes;
use imcatalog::utils::object_id;

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn benchmark_normalize(c: &mut Criterion) {
    let jpg = encode(1080, 1440, ImageFormat::Jpeg);
    let png = encode(600, 800, ImageFormat::Png);

    let mut group = c.benchmark_group("图片标准化");
    group.throughput(Throughput::Elements(1));
    group.bench_function("JPEG 1080x1440", |b| {
        b.iter(|| normalize_bytes(black_box(&jpg)))
    });
    group.bench_function("PNG 600x800", |b| b.iter(|| normalize_bytes(black_box(&png))));
    group.finish();
}

fn benchmark_object_id(c: &mut Criterion) {
    let mut group = c.benchmark_group("对象 ID");
    group.throughput(Throughput::Elements(1));
    group.bench_function("BLAKE3", |b| {
        b.iter(|| object_id(black_box("images/1163.jpg")))
    });
    group.finish();
}

criterion_group!(benches, benchmark_normalize, benchmark_object_id);
criterion_main!(benches);
