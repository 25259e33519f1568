use std::path::Path;

use anyhow::{Context, Result, bail};
use image::ExtendedColorType;

/// CPU-side 8-bit image, rows top to bottom, channels interleaved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Vec<u8>,

    /// Set when the pixels came from a decoded file.
    pub from_file: bool,
}

impl Image {
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * channels as usize);
        Self {
            width,
            height,
            channels,
            data,
            from_file: false,
        }
    }

    /// Decodes `path`, converting to `channels` (1 to 4). A value of 0 keeps
    /// the file's own channel count.
    pub fn load(path: impl AsRef<Path>, channels: u32) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)
            .with_context(|| format!("failed to load image {}", path.display()))?;

        let channels = match channels {
            0 => u32::from(img.color().channel_count()).min(4),
            n => n,
        };
        let (width, height) = (img.width(), img.height());
        let data = match channels {
            1 => img.into_luma8().into_raw(),
            2 => img.into_luma_alpha8().into_raw(),
            3 => img.into_rgb8().into_raw(),
            4 => img.into_rgba8().into_raw(),
            n => bail!("unsupported channel count {n} for {}", path.display()),
        };

        log::debug!("loaded image {} ({width}x{height}, {channels} ch)", path.display());
        Ok(Self {
            width,
            height,
            channels,
            data,
            from_file: true,
        })
    }

    /// Encodes the image; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let color = match self.channels {
            1 => ExtendedColorType::L8,
            2 => ExtendedColorType::La8,
            3 => ExtendedColorType::Rgb8,
            4 => ExtendedColorType::Rgba8,
            n => bail!("unsupported channel count {n}"),
        };
        image::save_buffer(path, &self.data, self.width, self.height, color)
            .with_context(|| format!("failed to save image {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("unibox-{}-{name}", std::process::id()))
    }

    #[test]
    fn save_then_load_adds_alpha() {
        let path = temp_path("rgb.png");
        let img = Image::new(2, 1, 3, vec![10, 20, 30, 40, 50, 60]);
        img.save(&path).unwrap();

        let back = Image::load(&path, 4).unwrap();
        assert_eq!((back.width, back.height, back.channels), (2, 1, 4));
        assert_eq!(back.data, vec![10, 20, 30, 255, 40, 50, 60, 255]);
        assert!(back.from_file);

        let native = Image::load(&path, 0).unwrap();
        assert_eq!(native.channels, 3);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_error_names_path() {
        let err = Image::load("/definitely/not/here.png", 4).unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.png"));
    }

    #[test]
    fn new_checks_length_without_u32_overflow() {
        let img = Image::new(65536, 65536, 0, Vec::new());
        assert_eq!((img.width, img.height), (65536, 65536));
    }

    #[test]
    fn bad_channel_count_is_rejected_on_save() {
        let img = Image { width: 1, height: 1, channels: 5, data: vec![0; 5], from_file: false };
        assert!(img.save(temp_path("bad.png")).is_err());
    }
}
