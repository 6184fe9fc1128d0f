use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageError, ImageFormat, ImageReader};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::domain::order::FileReference;
use crate::domain::tool::{ResolutionReport, ToolError};

#[async_trait]
pub trait ResolutionTool: Send + Sync {
    /// Effective and required DPI of `file` printed at `width_inches` x `height_inches`.
    async fn check_resolution(
        &self,
        file: &FileReference,
        width_inches: Decimal,
        height_inches: Decimal,
    ) -> Result<ResolutionReport, ToolError>;
}

/// Source of raw artwork bytes.
#[async_trait]
pub trait ArtworkStore: Send + Sync {
    async fn load(&self, file: &FileReference) -> Result<Vec<u8>, ToolError>;
}

/// Reads artwork from the local filesystem. `file://` prefixes are accepted.
#[derive(Clone, Debug, Default)]
pub struct FsArtworkStore {
    root: Option<PathBuf>,
}

impl FsArtworkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    fn resolve(&self, uri: &str) -> PathBuf {
        let path = PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

#[async_trait]
impl ArtworkStore for FsArtworkStore {
    async fn load(&self, file: &FileReference) -> Result<Vec<u8>, ToolError> {
        let path = self.resolve(&file.uri);
        tokio::fs::read(&path).await.map_err(|error| ToolError::UnreadableArtwork {
            uri: file.uri.clone(),
            reason: error.to_string(),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryArtworkStore {
    files: HashMap<String, Vec<u8>>,
}

impl InMemoryArtworkStore {
    pub fn with_file(mut self, uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(uri.into(), bytes);
        self
    }
}

#[async_trait]
impl ArtworkStore for InMemoryArtworkStore {
    async fn load(&self, file: &FileReference) -> Result<Vec<u8>, ToolError> {
        self.files.get(&file.uri).cloned().ok_or_else(|| ToolError::UnreadableArtwork {
            uri: file.uri.clone(),
            reason: "no such file".to_string(),
        })
    }
}

/// Measures raster artwork against a configured minimum DPI.
pub struct ImageResolutionTool<S> {
    store: S,
    required_dpi: Decimal,
}

impl<S> ImageResolutionTool<S> {
    pub fn new(store: S, required_dpi: Decimal) -> Self {
        Self { store, required_dpi }
    }
}

#[async_trait]
impl<S> ResolutionTool for ImageResolutionTool<S>
where
    S: ArtworkStore,
{
    async fn check_resolution(
        &self,
        file: &FileReference,
        width_inches: Decimal,
        height_inches: Decimal,
    ) -> Result<ResolutionReport, ToolError> {
        if width_inches <= Decimal::ZERO || height_inches <= Decimal::ZERO {
            return Err(ToolError::InvalidInput {
                reason: "print dimensions must be positive".to_string(),
            });
        }

        let bytes = self.store.load(file).await?;
        let info = read_image_info(&bytes).map_err(|error| match error {
            ImageInfoError::Unsupported(detail) => {
                ToolError::UnsupportedFormat { uri: file.uri.clone(), detail }
            }
            ImageInfoError::Malformed(reason) => {
                ToolError::UnreadableArtwork { uri: file.uri.clone(), reason }
            }
        })?;
        debug!(
            event_name = "tool.resolution.measured",
            uri = %file.uri,
            format = %info.format,
            pixel_width = info.width,
            pixel_height = info.height,
            "artwork dimensions measured"
        );

        let actual_dpi = effective_dpi(info.width, info.height, width_inches, height_inches)
            .ok_or_else(|| ToolError::Arithmetic {
                detail: "computing effective dpi".to_string(),
            })?;

        Ok(ResolutionReport {
            format: info.format,
            pixel_width: info.width,
            pixel_height: info.height,
            actual_dpi,
            required_dpi: self.required_dpi,
        })
    }
}

/// The lower of the horizontal and vertical pixel densities, truncated to two
/// decimals so rounding can never lift a file over the threshold.
pub fn effective_dpi(
    pixel_width: u32,
    pixel_height: u32,
    width_inches: Decimal,
    height_inches: Decimal,
) -> Option<Decimal> {
    let horizontal = Decimal::from(pixel_width).checked_div(width_inches)?;
    let vertical = Decimal::from(pixel_height).checked_div(height_inches)?;
    Some(horizontal.min(vertical).round_dp_with_strategy(2, RoundingStrategy::ToZero))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageInfoError {
    Unsupported(String),
    Malformed(String),
}

/// Reads pixel dimensions from the image header without decoding pixel data.
pub fn read_image_info(bytes: &[u8]) -> Result<ImageInfo, ImageInfoError> {
    if bytes.is_empty() {
        return Err(ImageInfoError::Malformed("file is empty".to_string()));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|error| ImageInfoError::Malformed(error.to_string()))?;
    let Some(format) = reader.format() else {
        return Err(ImageInfoError::Unsupported(
            "expected png, jpeg or gif; pdf artwork must be rasterized first".to_string(),
        ));
    };

    let (width, height) = reader.into_dimensions().map_err(|error| match error {
        ImageError::Unsupported(detail) => ImageInfoError::Unsupported(detail.to_string()),
        other => ImageInfoError::Malformed(other.to_string()),
    })?;
    let format = format!("{format:?}").to_ascii_lowercase();
    if width == 0 || height == 0 {
        return Err(ImageInfoError::Malformed(format!("{format} reports zero pixel dimensions")));
    }

    Ok(ImageInfo { format, width, height })
}

/// Encodes a blank grayscale image of the given size. Used by tests and demo
/// fixtures where only the dimensions matter.
pub fn blank_image(width: u32, height: u32, format: ImageFormat) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(GrayImage::new(width, height)).write_to(&mut bytes, format)?;
    Ok(bytes.into_inner())
}

pub fn blank_png(width: u32, height: u32) -> Result<Vec<u8>, ImageError> {
    blank_image(width, height, ImageFormat::Png)
}
