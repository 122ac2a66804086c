//! Renderer configuration
//!
//! Plain structs with `Default` values and `with_*` builder methods. A few
//! settings can be overridden from the environment through
//! [`RendererConfig::from_env`].

use log::warn;

/// Environment variable overriding [`RendererConfig::shadow_map_size`]
pub const SHADOW_MAP_SIZE_ENV: &str = "PENUMBRA_SHADOW_MAP_SIZE";
/// Environment variable overriding [`RendererConfig::vsync`] (`0`/`false` disables)
pub const VSYNC_ENV: &str = "PENUMBRA_VSYNC";

/// Top-level renderer settings
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Edge length of every spot light shadow map in texels
    pub shadow_map_size: u32,
    /// Present with `Fifo` when true, `Immediate` (or the closest supported mode) otherwise
    pub vsync: bool,
    /// Initial window width in pixels
    pub width: u32,
    /// Initial window height in pixels
    pub height: u32,
    /// Window title
    pub title: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shadow_map_size: 512,
            vsync: true,
            width: 1024,
            height: 768,
            title: "penumbra".to_string(),
        }
    }
}

impl RendererConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(SHADOW_MAP_SIZE_ENV) {
            match value.trim().parse::<u32>() {
                Ok(size) if size > 0 => self.shadow_map_size = size,
                _ => warn!("Ignoring invalid {}={:?}", SHADOW_MAP_SIZE_ENV, value),
            }
        }

        if let Some(value) = lookup(VSYNC_ENV) {
            match parse_flag(&value) {
                Some(vsync) => self.vsync = vsync,
                None => warn!("Ignoring invalid {}={:?}", VSYNC_ENV, value),
            }
        }

        self
    }

    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size.max(1);
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_owned();
        self
    }

    /// Present mode requested from the surface
    pub fn present_mode(&self) -> wgpu::PresentMode {
        if self.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Thin-lens parameters of the depth of field filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensConfig {
    /// Aperture diameter `D`
    pub aperture: f32,
    /// F-number `N`; focal length is `aperture * f_number`
    pub f_number: f32,
    /// Distance `F` of the focal plane from the eye
    pub focus_distance: f32,
    /// Upper clamp of the circle of confusion
    pub max_coc: f32,
    /// Below this circle of confusion the input is passed through unchanged
    pub sharp_coc: f32,
    /// At and above this circle of confusion only the blurred result is used
    pub full_coc: f32,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            aperture: 0.03,
            f_number: 40.0,
            focus_distance: 3.4,
            max_coc: 0.01,
            sharp_coc: 0.0002,
            full_coc: 0.002,
        }
    }
}

impl LensConfig {
    pub fn with_focus_distance(mut self, focus_distance: f32) -> Self {
        self.focus_distance = focus_distance;
        self
    }

    pub fn with_aperture(mut self, aperture: f32, f_number: f32) -> Self {
        self.aperture = aperture;
        self.f_number = f_number;
        self
    }

    pub fn with_max_coc(mut self, max_coc: f32) -> Self {
        self.max_coc = max_coc;
        self
    }

    pub fn with_blend_range(mut self, sharp_coc: f32, full_coc: f32) -> Self {
        self.sharp_coc = sharp_coc;
        self.full_coc = full_coc.max(sharp_coc);
        self
    }

    pub fn focal_length(&self) -> f32 {
        self.aperture * self.f_number
    }
}

/// Bloom filter settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomConfig {
    /// Number of horizontal+vertical blur rounds
    pub iterations: u32,
    /// Scale applied to the input before tone mapping
    pub exposure: f32,
    /// Show original, tone-mapped and blurred panes in the top-right corner
    pub debug_overlay: bool,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            iterations: 4,
            exposure: 0.5,
            debug_overlay: true,
        }
    }
}

impl BloomConfig {
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure;
        self
    }

    pub fn with_debug_overlay(mut self, enabled: bool) -> Self {
        self.debug_overlay = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.shadow_map_size, 512);
        assert!(config.vsync);

        let lens = LensConfig::default();
        assert!((lens.focal_length() - 1.2).abs() < 1e-6);
        assert!(lens.sharp_coc < lens.full_coc);

        let bloom = BloomConfig::default();
        assert_eq!(bloom.iterations, 4);
        assert_eq!(bloom.exposure, 0.5);
    }

    #[test]
    fn test_env_overrides() {
        let config = RendererConfig::default().with_env_overrides(lookup(&[
            (SHADOW_MAP_SIZE_ENV, "1024"),
            (VSYNC_ENV, "off"),
        ]));
        assert_eq!(config.shadow_map_size, 1024);
        assert!(!config.vsync);
        assert_eq!(config.present_mode(), wgpu::PresentMode::AutoNoVsync);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let config = RendererConfig::default().with_env_overrides(lookup(&[
            (SHADOW_MAP_SIZE_ENV, "huge"),
            (VSYNC_ENV, "maybe"),
        ]));
        assert_eq!(config, RendererConfig::default());

        let config =
            RendererConfig::default().with_env_overrides(lookup(&[(SHADOW_MAP_SIZE_ENV, "0")]));
        assert_eq!(config.shadow_map_size, 512);
    }

    #[test]
    fn test_blend_range_is_ordered() {
        let lens = LensConfig::default().with_blend_range(0.01, 0.001);
        assert_eq!(lens.full_coc, lens.sharp_coc);
    }
}
