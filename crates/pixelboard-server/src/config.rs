use anyhow::{bail, Context};
use pixelboard_core::{BoardConfig, Color, Palette};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Canvas dimensions, cooldown and palette
    pub board: BoardConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = BoardConfig::default();

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 3000u16)?;

        let width = parse_or(&lookup, "CANVAS_WIDTH", defaults.width)?;
        let height = parse_or(&lookup, "CANVAS_HEIGHT", defaults.height)?;
        if width == 0 || height == 0 {
            bail!("CANVAS_WIDTH and CANVAS_HEIGHT must be at least 1");
        }

        let cooldown_seconds =
            parse_or(&lookup, "COOLDOWN_SECONDS", defaults.cooldown.num_seconds())?;
        if cooldown_seconds < 0 {
            bail!("COOLDOWN_SECONDS must not be negative");
        }
        let cooldown = chrono::Duration::try_seconds(cooldown_seconds)
            .context("COOLDOWN_SECONDS out of range")?;

        let palette = match lookup("PALETTE") {
            Some(raw) => Palette::parse(&raw).context("invalid PALETTE")?,
            None => defaults.palette,
        };

        let default_color = match lookup("DEFAULT_COLOR") {
            Some(raw) => Color::from_hex(&raw).context("invalid DEFAULT_COLOR")?,
            None => defaults.default_color,
        };
        if !palette.contains(default_color) {
            bail!("DEFAULT_COLOR {} is not in the palette", default_color);
        }

        let lock_timeout_ms = parse_or(
            &lookup,
            "LOCK_TIMEOUT_MS",
            defaults.lock_timeout.as_millis() as u64,
        )?;

        Ok(Self {
            host,
            port,
            board: BoardConfig {
                width,
                height,
                cooldown,
                palette,
                default_color,
                lock_timeout: Duration::from_millis(lock_timeout_ms),
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
