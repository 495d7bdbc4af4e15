//! Named processing presets for common storefronts and social platforms.
//!
//! A preset is a sparse overlay: it only sets the keys it cares about and is
//! merged on top of the stock defaults (see [`crate::config::load_config`]).
//! Anything a preset leaves out keeps its default, and a config file or CLI
//! flag can still override what the preset sets.

use crate::config::ConfigError;

/// One entry in the preset table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub target_width: u32,
    pub target_height: u32,
    pub fill_ratio: f64,
    pub remove_background: bool,
    pub compress_level: Option<u8>,
    pub min_dimension: Option<u32>,
}

const fn preset(
    name: &'static str,
    description: &'static str,
    target_width: u32,
    target_height: u32,
    fill_ratio: f64,
) -> Preset {
    Preset {
        name,
        description,
        target_width,
        target_height,
        fill_ratio,
        remove_background: true,
        compress_level: None,
        min_dimension: None,
    }
}

pub const PRESETS: &[Preset] = &[
    preset(
        "ecommerce_square",
        "Square storefront listing",
        2000,
        2000,
        0.85,
    ),
    preset(
        "ecommerce_portrait",
        "Portrait storefront listing",
        1000,
        1500,
        0.80,
    ),
    preset("instagram_square", "Instagram square post", 1080, 1080, 0.90),
    preset(
        "instagram_portrait",
        "Instagram portrait post",
        1080,
        1350,
        0.85,
    ),
    preset("facebook_feed", "Facebook link/feed image", 1200, 630, 0.75),
    preset("pinterest", "Pinterest pin", 1000, 1500, 0.80),
    Preset {
        remove_background: false,
        ..preset(
            "amazon_main",
            "Amazon main image (keeps the white studio background)",
            2000,
            2000,
            0.85,
        )
    },
    preset("shopify_product", "Shopify product image", 2048, 2048, 0.80),
    preset("twitter_card", "Twitter/X summary card", 1200, 675, 0.70),
    Preset {
        compress_level: Some(8),
        min_dimension: Some(200),
        ..preset("thumbnail", "Small catalogue thumbnail", 400, 400, 0.90)
    },
];

impl Preset {
    /// The preset as a `[processing]` TOML overlay.
    pub fn overlay(&self) -> toml::Value {
        let mut processing = toml::Table::new();
        processing.insert(
            "target_width".into(),
            toml::Value::Integer(self.target_width.into()),
        );
        processing.insert(
            "target_height".into(),
            toml::Value::Integer(self.target_height.into()),
        );
        processing.insert("fill_ratio".into(), toml::Value::Float(self.fill_ratio));
        processing.insert(
            "remove_background".into(),
            toml::Value::Boolean(self.remove_background),
        );
        if let Some(level) = self.compress_level {
            processing.insert("compress_level".into(), toml::Value::Integer(level.into()));
        }
        if let Some(min) = self.min_dimension {
            processing.insert("min_dimension".into(), toml::Value::Integer(min.into()));
        }

        let mut root = toml::Table::new();
        root.insert("processing".into(), toml::Value::Table(processing));
        toml::Value::Table(root)
    }
}

/// Look up a preset by name.
pub fn get_preset(name: &str) -> Result<&'static Preset, ConfigError> {
    PRESETS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| ConfigError::UnknownPreset {
            name: name.to_string(),
            available: list_presets().join(", "),
        })
}

/// Preset names in table order.
pub fn list_presets() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProcessingConfig, resolve_config, stock_defaults_value};

    fn resolved(name: &str) -> ProcessingConfig {
        let overlay = get_preset(name).unwrap().overlay();
        resolve_config(stock_defaults_value().unwrap(), [overlay])
            .unwrap()
            .processing
    }

    #[test]
    fn list_contains_every_preset() {
        let names = list_presets();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "ecommerce_square");
        assert!(names.contains(&"thumbnail"));
    }

    #[test]
    fn names_are_unique() {
        let mut names = list_presets();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PRESETS.len());
    }

    #[test]
    fn ecommerce_square_values() {
        let config = resolved("ecommerce_square");
        assert_eq!(config.target_width(), 2000);
        assert_eq!(config.target_height(), 2000);
        assert_eq!(config.fill_ratio(), 0.85);
        assert!(config.remove_background());
        // Untouched keys keep their defaults.
        assert_eq!(config.crop_padding(), 20);
        assert_eq!(config.min_dimension(), 500);
    }

    #[test]
    fn amazon_keeps_background() {
        assert!(!resolved("amazon_main").remove_background());
    }

    #[test]
    fn thumbnail_compresses_harder_with_lower_floor() {
        let config = resolved("thumbnail");
        assert_eq!(config.compress_level().value(), 8);
        assert_eq!(config.min_dimension(), 200);
    }

    #[test]
    fn every_preset_validates() {
        for p in PRESETS {
            let config = resolved(p.name);
            assert_eq!(config.target_width(), p.target_width, "{}", p.name);
            assert_eq!(config.target_height(), p.target_height, "{}", p.name);
        }
    }

    #[test]
    fn unknown_preset_lists_available() {
        let err = get_preset("billboard").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("billboard"));
        assert!(msg.contains("twitter_card"));
    }
}
