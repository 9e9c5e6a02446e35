//! Image header decoding.
//!
//! Only the header is needed: dimensions and the real format. Bytes are fed
//! to the decoder chunk by chunk until it answers or the stream ends.

use std::io;

use imagesize::{ImageError, ImageType};
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::package::PackageStream;

const CHUNK_SIZE: usize = 4096;

pub const SVG_MIME: &str = "image/svg+xml";

/// Geometry and real format of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub mime: String,
}

impl ImageInfo {
    pub fn new(width: u32, height: u32, mime: impl Into<String>) -> Self {
        Self {
            width,
            height,
            mime: mime.into(),
        }
    }

    pub fn is_svg(&self) -> bool {
        self.mime == SVG_MIME
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read image: {0}")]
    Io(#[from] io::Error),

    #[error("unsupported image format")]
    Unsupported,

    #[error("corrupt image: {0}")]
    Corrupt(String),
}

/// Byte stream to image geometry.
pub trait ImageDecoder: Send + Sync {
    /// Inspects the bytes read so far.
    ///
    /// Returns `Ok(None)` when more bytes are needed. When `complete` is set
    /// no more bytes will come and the decoder must decide.
    fn probe(&self, bytes: &[u8], complete: bool) -> Result<Option<ImageInfo>, DecodeError>;
}

/// Header sniffer for raster formats (`imagesize`) and SVG.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDecoder;

impl HeaderDecoder {
    fn probe_raster(bytes: &[u8], complete: bool) -> Result<Option<ImageInfo>, DecodeError> {
        let image_type = match imagesize::image_type(bytes) {
            Ok(image_type) => image_type,
            Err(ImageError::NotSupported) => return Err(DecodeError::Unsupported),
            Err(_) if !complete => return Ok(None),
            Err(e) => return Err(DecodeError::Corrupt(e.to_string())),
        };
        let mime = raster_mime(&image_type).ok_or(DecodeError::Unsupported)?;
        match imagesize::blob_size(bytes) {
            Ok(size) => {
                let width = u32::try_from(size.width)
                    .map_err(|_| DecodeError::Corrupt("width out of range".to_string()))?;
                let height = u32::try_from(size.height)
                    .map_err(|_| DecodeError::Corrupt("height out of range".to_string()))?;
                Ok(Some(ImageInfo::new(width, height, mime)))
            }
            Err(_) if !complete => Ok(None),
            Err(e) => Err(DecodeError::Corrupt(e.to_string())),
        }
    }
}

impl ImageDecoder for HeaderDecoder {
    fn probe(&self, bytes: &[u8], complete: bool) -> Result<Option<ImageInfo>, DecodeError> {
        if bytes.is_empty() {
            return if complete {
                Err(DecodeError::Corrupt("empty file".to_string()))
            } else {
                Ok(None)
            };
        }
        if looks_like_svg(bytes) {
            return probe_svg(bytes, complete);
        }
        Self::probe_raster(bytes, complete)
    }
}

fn raster_mime(image_type: &ImageType) -> Option<&'static str> {
    let mime = match image_type {
        ImageType::Png => "image/png",
        ImageType::Jpeg => "image/jpeg",
        ImageType::Gif => "image/gif",
        ImageType::Webp => "image/webp",
        ImageType::Bmp => "image/bmp",
        ImageType::Ico => "image/x-icon",
        ImageType::Tiff => "image/tiff",
        _ => return None,
    };
    Some(mime)
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<?xml") || text.starts_with("<svg") || text.starts_with("<!--") || text.starts_with("<!DOCTYPE svg")
}

fn probe_svg(bytes: &[u8], complete: bool) -> Result<Option<ImageInfo>, DecodeError> {
    let text = String::from_utf8_lossy(bytes);
    let Some(start) = text.find("<svg") else {
        return if complete {
            Err(DecodeError::Corrupt("no <svg> root element".to_string()))
        } else {
            Ok(None)
        };
    };
    let Some(end) = text[start..].find('>') else {
        return if complete {
            Err(DecodeError::Corrupt("unterminated <svg> element".to_string()))
        } else {
            Ok(None)
        };
    };
    let tag = &text[start..start + end];

    let width = attribute(tag, "width").and_then(parse_length);
    let height = attribute(tag, "height").and_then(parse_length);
    let (width, height) = match (width, height) {
        (Some(w), Some(h)) => (w, h),
        _ => view_box(tag).unwrap_or((0, 0)),
    };
    Ok(Some(ImageInfo::new(width, height, SVG_MIME)))
}

fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = tag;
    while let Some(pos) = rest.find(name) {
        let preceded_by_space = rest[..pos]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        let after = rest[pos + name.len()..].trim_start();
        if preceded_by_space && let Some(after) = after.strip_prefix('=') {
            let after = after.trim_start();
            let quote = after.chars().next()?;
            if quote == '"' || quote == '\'' {
                let value = &after[1..];
                return value.find(quote).map(|end| &value[..end]);
            }
        }
        rest = &rest[pos + name.len()..];
    }
    None
}

/// Parses `"48"`, `"48px"` or `"47.5"` into whole pixels.
fn parse_length(value: &str) -> Option<u32> {
    let value = value.trim();
    let value = value.strip_suffix("px").unwrap_or(value);
    let number: f64 = value.parse().ok()?;
    (number.is_finite() && number >= 0.0).then(|| number.round() as u32)
}

fn view_box(tag: &str) -> Option<(u32, u32)> {
    let parts: Vec<f64> = attribute(tag, "viewBox")?
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [_, _, w, h] if *w >= 0.0 && *h >= 0.0 => Some((w.round() as u32, h.round() as u32)),
        _ => None,
    }
}

/// Reads a stream until the decoder answers.
pub async fn read_image_info(
    mut stream: PackageStream,
    decoder: &dyn ImageDecoder,
) -> Result<ImageInfo, DecodeError> {
    let mut buffer = Vec::with_capacity(CHUNK_SIZE);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let read = stream.read(&mut chunk).await?;
        buffer.extend_from_slice(&chunk[..read]);
        let complete = read == 0;
        match decoder.probe(&buffer, complete)? {
            Some(info) => return Ok(info),
            None if complete => {
                return Err(DecodeError::Corrupt("could not read image header".to_string()));
            }
            None => {}
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Cursor;

    /// A minimal PNG: signature plus IHDR with the given dimensions.
    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes
    }

    /// A minimal GIF header with the given dimensions.
    pub(crate) fn gif(width: u16, height: u16) -> Vec<u8> {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0]);
        bytes
    }

    pub(crate) fn svg(attrs: &str) -> Vec<u8> {
        format!("<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" {}></svg>", attrs)
            .into_bytes()
    }

    /// A baseline JPEG whose SOF0 marker follows `app_segments` APP1
    /// segments of `segment_len` payload bytes each.
    pub(crate) fn jpeg_with_app_segments(
        width: u16,
        height: u16,
        app_segments: usize,
        segment_len: u16,
    ) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        for _ in 0..app_segments {
            bytes.extend_from_slice(&[0xFF, 0xE1]);
            bytes.extend_from_slice(&(segment_len + 2).to_be_bytes());
            bytes.extend(std::iter::repeat_n(0u8, usize::from(segment_len)));
        }
        bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    fn stream(bytes: Vec<u8>) -> PackageStream {
        Box::pin(Cursor::new(bytes))
    }

    #[tokio::test]
    async fn test_png_header() {
        let info = read_image_info(stream(png(48, 32)), &HeaderDecoder).await.unwrap();
        assert_eq!(info, ImageInfo::new(48, 32, "image/png"));
    }

    #[tokio::test]
    async fn test_jpeg_header_after_large_metadata() {
        let bytes = jpeg_with_app_segments(64, 64, 2, 40_000);
        assert!(bytes.len() > 64 * 1024);

        let info = read_image_info(stream(bytes), &HeaderDecoder).await.unwrap();
        assert_eq!(info, ImageInfo::new(64, 64, "image/jpeg"));
    }

    #[tokio::test]
    async fn test_gif_header() {
        let info = read_image_info(stream(gif(16, 16)), &HeaderDecoder).await.unwrap();
        assert_eq!(info, ImageInfo::new(16, 16, "image/gif"));
    }

    #[rstest]
    #[case("width=\"48\" height=\"48\"", 48, 48)]
    #[case("width=\"32px\" height='16px'", 32, 16)]
    #[case("viewBox=\"0 0 64 32\"", 64, 32)]
    #[case("", 0, 0)]
    #[tokio::test]
    async fn test_svg_header(#[case] attrs: &str, #[case] width: u32, #[case] height: u32) {
        let info = read_image_info(stream(svg(attrs)), &HeaderDecoder).await.unwrap();
        assert_eq!(info, ImageInfo::new(width, height, SVG_MIME));
        assert!(info.is_svg());
    }

    #[test]
    fn test_svg_stroke_width_is_not_width() {
        let bytes = svg("stroke-width=\"3\" viewBox=\"0 0 10 10\"");
        let info = HeaderDecoder.probe(&bytes, true).unwrap().unwrap();
        assert_eq!((info.width, info.height), (10, 10));
    }

    #[tokio::test]
    async fn test_garbage_is_rejected() {
        let result = read_image_info(stream(b"not an image at all".to_vec()), &HeaderDecoder).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_file_is_corrupt() {
        let result = read_image_info(stream(Vec::new()), &HeaderDecoder).await;
        assert!(matches!(result, Err(DecodeError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_truncated_png_is_corrupt() {
        let mut bytes = png(16, 16);
        bytes.truncate(12);
        let result = read_image_info(stream(bytes), &HeaderDecoder).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_input_asks_for_more() {
        let bytes = png(16, 16);
        assert_eq!(HeaderDecoder.probe(&bytes[..10], false).unwrap(), None);
    }
}
