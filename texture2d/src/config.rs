//! Settings that affect how new textures are created.
//!
//! The process-wide copy is read when a creation method without an explicit
//! [`TextureConfig`] argument is called. Changes only affect textures created afterwards.

use parking_lot::RwLock;

use crate::pixel_format::PixelFormat;

static GLOBAL_CONFIG: RwLock<TextureConfig> = RwLock::new(TextureConfig::new());

/// Texture creation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TextureConfig {
    /// Format used for images that contain an alpha channel.
    ///
    /// Possible choices are 32-bit ([`PixelFormat::Rgba8888`], the default), 24-bit
    /// ([`PixelFormat::Rgb888`]), 16-bit ([`PixelFormat::Rgba4444`], [`PixelFormat::Rgb5a1`],
    /// [`PixelFormat::Rgb565`]) and 8-bit ([`PixelFormat::A8`], only useful for single-color
    /// images). Images without alpha always use RGB888 or RGB565.
    pub default_alpha_pixel_format: PixelFormat,

    /// Treat PVR containers as if their alpha was premultiplied.
    ///
    /// There is no way to tell from the file itself, so this is a policy setting.
    pub pvr_images_have_premultiplied_alpha: bool,
}

impl TextureConfig {
    /// Default settings: RGBA8888 for alpha images, PVR alpha not premultiplied.
    pub const fn new() -> Self {
        Self {
            default_alpha_pixel_format: PixelFormat::Rgba8888,
            pvr_images_have_premultiplied_alpha: false,
        }
    }

    /// Sets the format used for images with alpha.
    pub fn with_default_alpha_pixel_format(mut self, format: PixelFormat) -> Self {
        self.default_alpha_pixel_format = format;
        self
    }

    /// Sets the PVR premultiplied-alpha policy.
    pub fn with_pvr_images_have_premultiplied_alpha(mut self, value: bool) -> Self {
        self.pvr_images_have_premultiplied_alpha = value;
        self
    }

    /// Snapshot of the process-wide settings.
    pub fn global() -> Self {
        *GLOBAL_CONFIG.read()
    }

    /// Replaces the process-wide settings.
    pub fn set_global(config: TextureConfig) {
        *GLOBAL_CONFIG.write() = config;
    }
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets the process-wide pixel format for images that contain alpha.
pub fn set_default_alpha_pixel_format(format: PixelFormat) {
    log::debug!("Default alpha pixel format set to {format:?}");
    GLOBAL_CONFIG.write().default_alpha_pixel_format = format;
}

/// Process-wide pixel format for images that contain alpha.
pub fn default_alpha_pixel_format() -> PixelFormat {
    GLOBAL_CONFIG.read().default_alpha_pixel_format
}

/// Sets whether PVR containers are treated as premultiplied.
pub fn set_pvr_images_have_premultiplied_alpha(value: bool) {
    GLOBAL_CONFIG.write().pvr_images_have_premultiplied_alpha = value;
}

/// Whether PVR containers are treated as premultiplied.
pub fn pvr_images_have_premultiplied_alpha() -> bool {
    GLOBAL_CONFIG.read().pvr_images_have_premultiplied_alpha
}

/// Restores the process-wide settings to their defaults.
pub fn reset_global_config() {
    TextureConfig::set_global(TextureConfig::new());
}


#[cfg(test)]
mod tests {
    use super::test_support::lock_global_config;
    use super::*;

    #[test]
    fn global_setters_round_trip_and_reset() {
        let _guard = lock_global_config();

        set_default_alpha_pixel_format(PixelFormat::Rgba4444);
        set_pvr_images_have_premultiplied_alpha(true);
        assert_eq!(default_alpha_pixel_format(), PixelFormat::Rgba4444);
        assert!(pvr_images_have_premultiplied_alpha());

        reset_global_config();
        assert_eq!(TextureConfig::global(), TextureConfig::default());
    }

    #[test]
    fn snapshot_is_not_affected_by_later_changes() {
        let _guard = lock_global_config();

        let snapshot = TextureConfig::global();
        set_default_alpha_pixel_format(PixelFormat::A8);
        assert_eq!(snapshot.default_alpha_pixel_format, PixelFormat::Rgba8888);
        reset_global_config();
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_partial_config() {
        let config: TextureConfig =
            serde_json::from_str(r#"{"default_alpha_pixel_format": "Rgb5a1"}"#)
                .expect("valid json");
        assert_eq!(config.default_alpha_pixel_format, PixelFormat::Rgb5a1);
        assert!(!config.pvr_images_have_premultiplied_alpha);
    }
}
