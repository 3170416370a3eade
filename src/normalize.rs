//! 图片标准化：解码任意格式的图片，按 cover 方式缩放裁剪到 224x224，再编码为 JPEG

use std::io::ErrorKind;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};

/// 标准化后的图片，创建后不可修改
#[derive(Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pixels: Vec<u8>,
}

impl NormalizedImage {
    pub const WIDTH: u32 = 224;
    pub const HEIGHT: u32 = 224;
    pub const QUALITY: u8 = 90;
    pub const FORMAT: ImageFormat = ImageFormat::Jpeg;

    /// 编码后的 JPEG 数据
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.pixels)
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

impl std::fmt::Debug for NormalizedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedImage")
            .field("width", &Self::WIDTH)
            .field("height", &Self::HEIGHT)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// 标准化内存中的图片数据
pub fn normalize_bytes(data: &[u8]) -> Result<NormalizedImage> {
    let img = image::load_from_memory(data)?;
    encode(cover(&img))
}

/// 标准化磁盘上的图片文件
pub fn normalize_file(path: impl AsRef<Path>) -> Result<NormalizedImage> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::ImageIo(path.to_path_buf()),
        _ => Error::io(path, e),
    })?;
    normalize_bytes(&data)
}

/// 等比缩放直到完全覆盖目标尺寸，再居中裁掉多余部分
fn cover(img: &DynamicImage) -> DynamicImage {
    let resized = img.resize_to_fill(
        NormalizedImage::WIDTH,
        NormalizedImage::HEIGHT,
        FilterType::Lanczos3,
    );
    // JPEG 不支持透明通道
    DynamicImage::ImageRgb8(resized.to_rgb8())
}

fn encode(img: DynamicImage) -> Result<NormalizedImage> {
    let mut pixels = Vec::with_capacity(16 * 1024);
    let encoder = JpegEncoder::new_with_quality(&mut pixels, NormalizedImage::QUALITY);
    img.write_with_encoder(encoder)?;
    Ok(NormalizedImage { pixels })
}
