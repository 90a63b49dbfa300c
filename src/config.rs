use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub analysis: AnalysisConfig,
}

/// Tunables for the coverage pipeline, loadable from `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Physical area of the sampling quadrat in square meters.
    pub quadrat_area_m2: f64,
    /// Carbon density assumed for full seagrass cover, grams per m².
    pub carbon_density_g_per_m2: f64,
    /// Longest image side after downscaling; larger inputs are resized.
    pub max_side: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            quadrat_area_m2: 0.25,
            carbon_density_g_per_m2: 100.0,
            max_side: 1280,
        }
    }
}

impl AnalysisConfig {
    /// Load tunables from a JSON file, falling back to defaults when the
    /// file is missing or unreadable. Keys present in the file override
    /// defaults individually.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let defaults = Self::default();
        let Ok(raw) = std::fs::read_to_string(path) else {
            return defaults;
        };
        let Ok(overrides) = serde_json::from_str::<serde_json::Value>(&raw) else {
            tracing::warn!("config.json is not valid JSON, using default analysis settings");
            return defaults;
        };
        Self {
            quadrat_area_m2: overrides
                .get("quadrat_area_m2")
                .and_then(|v| v.as_f64())
                .unwrap_or(defaults.quadrat_area_m2),
            carbon_density_g_per_m2: overrides
                .get("carbon_density_g_per_m2")
                .and_then(|v| v.as_f64())
                .unwrap_or(defaults.carbon_density_g_per_m2),
            max_side: overrides
                .get("max_side")
                .and_then(|v| v.as_u64())
                .map(|v| v as u32)
                .unwrap_or(defaults.max_side),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());

        // 20 MB covers any sensible quadrat photo
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "20971520".to_string())
            .parse()
            .unwrap_or(20 * 1024 * 1024);

        let config_path = env::var("ANALYSIS_CONFIG").unwrap_or_else(|_| "config.json".to_string());
        let analysis = AnalysisConfig::load_from(config_path);

        Ok(Self {
            api_host,
            api_port,
            upload_dir,
            max_upload_bytes,
            analysis,
        })
    }
}
