//! Best-effort raster normalization.
//!
//! The pipeline is chosen once, when the normalizer is built. Without the
//! `resize` feature every image goes through [`PassthroughPipeline`].

use std::sync::Arc;

use bytes::Bytes;

use crate::sniff::{ImageKind, VerifiedType, GIF};

/// Bytes that will actually be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub bytes: Bytes,
    pub size: u64,
}

impl Normalized {
    fn from_bytes(bytes: Bytes) -> Self {
        let size = bytes.len() as u64;
        Self { bytes, size }
    }
}

/// A way of turning an uploaded raster into its stored form.
///
/// Implementations run on a blocking thread and must not panic on bad
/// input; return an error and the caller keeps the original.
pub trait ImagePipeline: Send + Sync {
    fn name(&self) -> &'static str;

    fn finalize_to_bytes(&self, input: &[u8], mime: &str) -> anyhow::Result<Vec<u8>>;
}

/// Returns its input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughPipeline;

impl ImagePipeline for PassthroughPipeline {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn finalize_to_bytes(&self, input: &[u8], _mime: &str) -> anyhow::Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}

#[cfg(feature = "resize")]
pub use resize::ResizePipeline;

#[cfg(feature = "resize")]
mod resize {
    use std::io::Cursor;

    use anyhow::{anyhow, Context};
    use image::{imageops::FilterType, DynamicImage, ImageFormat};

    use super::ImagePipeline;
    use crate::sniff::{JPEG, PNG, WEBP};

    /// Shrinks images whose longest side exceeds `max_dimension`,
    /// re-encoding in the source format.
    #[derive(Debug, Clone, Copy)]
    pub struct ResizePipeline {
        max_dimension: u32,
    }

    impl ResizePipeline {
        pub fn new(max_dimension: u32) -> anyhow::Result<Self> {
            if max_dimension == 0 {
                return Err(anyhow!("max dimension must be positive"));
            }
            Ok(Self { max_dimension })
        }

        pub fn max_dimension(&self) -> u32 {
            self.max_dimension
        }
    }

    fn format_for(mime: &str) -> Option<ImageFormat> {
        match mime {
            PNG => Some(ImageFormat::Png),
            JPEG => Some(ImageFormat::Jpeg),
            WEBP => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    impl ImagePipeline for ResizePipeline {
        fn name(&self) -> &'static str {
            "resize"
        }

        fn finalize_to_bytes(&self, input: &[u8], mime: &str) -> anyhow::Result<Vec<u8>> {
            let format = format_for(mime).ok_or_else(|| anyhow!("no encoder for {mime}"))?;
            let img = image::load_from_memory_with_format(input, format)
                .context("decode failed")?;

            if img.width() <= self.max_dimension && img.height() <= self.max_dimension {
                return Ok(input.to_vec());
            }

            let resized = img.resize(self.max_dimension, self.max_dimension, FilterType::Lanczos3);
            // the jpeg encoder rejects alpha channels
            let resized = match format {
                ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
                _ => resized,
            };

            let mut out = Cursor::new(Vec::with_capacity(input.len()));
            resized.write_to(&mut out, format).context("encode failed")?;
            Ok(out.into_inner())
        }
    }
}

/// Picks a pipeline at construction and applies it to verified rasters.
#[derive(Clone)]
pub struct ImageNormalizer {
    pipeline: Arc<dyn ImagePipeline>,
}

impl std::fmt::Debug for ImageNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageNormalizer")
            .field("pipeline", &self.pipeline.name())
            .finish()
    }
}

impl ImageNormalizer {
    /// Resize-capable when compiled with the `resize` feature and the bound
    /// is usable; passthrough otherwise.
    pub fn new(max_dimension: u32) -> Self {
        #[cfg(feature = "resize")]
        {
            match ResizePipeline::new(max_dimension) {
                Ok(pipeline) => return Self::with_pipeline(Arc::new(pipeline)),
                Err(e) => {
                    tracing::warn!(error = %e, "resize pipeline unavailable, images pass through");
                }
            }
        }
        #[cfg(not(feature = "resize"))]
        let _ = max_dimension;

        Self::passthrough()
    }

    pub fn passthrough() -> Self {
        Self::with_pipeline(Arc::new(PassthroughPipeline))
    }

    pub fn with_pipeline(pipeline: Arc<dyn ImagePipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline_name(&self) -> &'static str {
        self.pipeline.name()
    }

    /// Never fails: on any pipeline error the original bytes are kept.
    pub async fn normalize(&self, bytes: Bytes, verified: &VerifiedType) -> Normalized {
        if verified.kind == ImageKind::Vector || verified.mime == GIF {
            return Normalized::from_bytes(bytes);
        }

        let pipeline = Arc::clone(&self.pipeline);
        let input = bytes.clone();
        let mime = verified.mime;
        let result =
            tokio::task::spawn_blocking(move || pipeline.finalize_to_bytes(&input, mime)).await;

        match result {
            Ok(Ok(out)) => Normalized::from_bytes(Bytes::from(out)),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, mime, "image kept as uploaded");
                Normalized::from_bytes(bytes)
            }
            Err(e) => {
                tracing::warn!(error = %e, mime, "image pipeline task failed");
                Normalized::from_bytes(bytes)
            }
        }
    }
}
