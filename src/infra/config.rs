//! Configuration loading from TOML files
//!
//! Config file is selected via the --config command line argument;
//! a missing or unreadable file falls back to built-in defaults.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PositioningSection {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapSection {
    #[serde(default = "default_tile_url_template")]
    pub tile_url_template: String,
    /// Tile layer is only attached when a token is configured
    #[serde(default)]
    pub tile_access_token: Option<String>,
    #[serde(default = "default_tile_max_zoom")]
    pub tile_max_zoom: u8,
    #[serde(default = "default_first_fix_zoom")]
    pub first_fix_zoom: u8,
}

impl Default for MapSection {
    fn default() -> Self {
        Self {
            tile_url_template: default_tile_url_template(),
            tile_access_token: None,
            tile_max_zoom: default_tile_max_zoom(),
            first_fix_zoom: default_first_fix_zoom(),
        }
    }
}

fn default_tile_url_template() -> String {
    "https://api.tiles.mapbox.com/v4/mapbox.light/{z}/{x}/{y}{r}.png".to_string()
}

fn default_tile_max_zoom() -> u8 {
    23
}

fn default_first_fix_zoom() -> u8 {
    19
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSection {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    10
}

/// A monitored beacon and the notification it fires
#[derive(Debug, Clone, Deserialize)]
pub struct BeaconSpec {
    pub uuid: String,
    pub identifier: String,
    pub major: u16,
    pub minor: u16,
    pub notification_id: u32,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub attachment: Option<String>,
}

fn default_beacons() -> Vec<BeaconSpec> {
    let uuid = "B9407F30-F5F8-466E-AFF9-25556B57FE6D";
    let text = "Pinche aquí para escuchar la audio guía de este cuadro";
    vec![
        BeaconSpec {
            uuid: uuid.to_string(),
            identifier: "887c51c6c8f5c8a37bc234e6c30c1a04".to_string(),
            major: 39902,
            minor: 30708,
            notification_id: 1,
            title: "El jardín de las delicias - El Bosco".to_string(),
            text: text.to_string(),
            attachment: Some("https://content3.cdnprado.net/imagenes/Documentos/imgsem/02/0238/02388242-6d6a-4e9e-a992-e1311eab3609/272eeb2c-3074-48a2-9653-a3c9b67b3209_832.jpg".to_string()),
        },
        BeaconSpec {
            uuid: uuid.to_string(),
            identifier: "bd2cbdacd2b6199c945411a4887e0119".to_string(),
            major: 60952,
            minor: 20731,
            notification_id: 2,
            title: "Las Lanzas (La Rendición de Breda) - Diego Velázquez".to_string(),
            text: text.to_string(),
            attachment: Some("https://upload.wikimedia.org/wikipedia/commons/4/4e/Vel%C3%A1zquez_-_de_Breda_o_Las_Lanzas_%28Museo_del_Prado%2C_1634-35%29.jpg".to_string()),
        },
        BeaconSpec {
            uuid: uuid.to_string(),
            identifier: "d38fcae31a6148d7ba210f301ca1b22b".to_string(),
            major: 41230,
            minor: 64936,
            notification_id: 3,
            title: "Fusilamiento del 3 de mayo - Goya".to_string(),
            text: text.to_string(),
            attachment: Some("https://content3.cdnprado.net/imagenes/Documentos/imgsem/f0/f0f5/f0f52ca5-546a-44c4-8da0-f3c2603340b5/a88d41b7-8f41-459f-ab8f-7e9efcde99c7.jpg".to_string()),
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub positioning: PositioningSection,
    #[serde(default)]
    pub map: MapSection,
    #[serde(default)]
    pub metrics: MetricsSection,
    #[serde(default = "default_beacons")]
    pub beacons: Vec<BeaconSpec>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    api_key: String,
    api_secret: String,
    tile_url_template: String,
    tile_access_token: Option<String>,
    tile_max_zoom: u8,
    first_fix_zoom: u8,
    metrics_interval_secs: u64,
    beacons: Vec<BeaconSpec>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            tile_url_template: default_tile_url_template(),
            tile_access_token: None,
            tile_max_zoom: default_tile_max_zoom(),
            first_fix_zoom: default_first_fix_zoom(),
            metrics_interval_secs: default_metrics_interval(),
            beacons: default_beacons(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            api_key: toml_config.positioning.api_key,
            api_secret: toml_config.positioning.api_secret,
            tile_url_template: toml_config.map.tile_url_template,
            tile_access_token: toml_config.map.tile_access_token.filter(|t| !t.is_empty()),
            tile_max_zoom: toml_config.map.tile_max_zoom,
            first_fix_zoom: toml_config.map.first_fix_zoom,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            beacons: toml_config.beacons,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    pub fn tile_url_template(&self) -> &str {
        &self.tile_url_template
    }

    pub fn tile_access_token(&self) -> Option<&str> {
        self.tile_access_token.as_deref()
    }

    pub fn tile_max_zoom(&self) -> u8 {
        self.tile_max_zoom
    }

    pub fn first_fix_zoom(&self) -> u8 {
        self.first_fix_zoom
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn beacons(&self) -> &[BeaconSpec] {
        &self.beacons
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}
