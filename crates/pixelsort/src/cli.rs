use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sortconfig::{AntialiasSetting, ColorSpaceSetting, PowerSetting};

#[derive(Parser, Debug)]
#[command(
    name = "pixelsort",
    author,
    version,
    about = "Blend an image with its brightness-sorted layout; the pointer drives the blend"
)]
pub struct Cli {
    /// Image to sort (PNG, JPEG, BMP or GIF).
    #[arg(value_name = "IMAGE")]
    pub image: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Settings that take precedence over the configuration file.
#[derive(Parser, Debug, Default, Clone)]
pub struct Overrides {
    /// Configuration file; defaults to `config.toml` in the config directory.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Window title.
    #[arg(long, value_name = "TITLE", global = true)]
    pub title: Option<String>,

    /// Window size (e.g. `1280x720`); defaults to the image size.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, global = true)]
    pub size: Option<(u32, u32)>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias, global = true)]
    pub antialias: Option<AntialiasSetting>,

    /// Output color space handling: `auto`, `gamma`, or `linear`.
    #[arg(long, value_name = "MODE", value_parser = parse_color_space, global = true)]
    pub color_space: Option<ColorSpaceSetting>,

    /// GPU adapter preference: `low` or `high`.
    #[arg(long, value_name = "POWER", value_parser = parse_power, global = true)]
    pub power: Option<PowerSetting>,

    /// Multiplier applied to the pointer's vertical position.
    #[arg(long, value_name = "GAIN", allow_negative_numbers = true, global = true)]
    pub phase_gain: Option<f32>,

    /// Offset added to the pointer's vertical position before scaling.
    #[arg(long, value_name = "OFFSET", allow_negative_numbers = true, global = true)]
    pub phase_offset: Option<f32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sort an image on the CPU and print a summary; no window or GPU needed.
    Inspect(InspectArgs),
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Number of sorted original indices to print.
    #[arg(long, value_name = "COUNT", default_value_t = 8)]
    pub top: usize,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    sortconfig::parse_size(value)
}

pub fn parse_antialias(value: &str) -> Result<AntialiasSetting, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    trimmed.parse::<AntialiasSetting>().map_err(|_| {
        format!("invalid anti-alias mode '{trimmed}'; use auto/off or 2/4/8/16")
    })
}

pub fn parse_color_space(value: &str) -> Result<ColorSpaceSetting, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color space must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" => Ok(ColorSpaceSetting::Auto),
        "gamma" | "srgb-off" => Ok(ColorSpaceSetting::Gamma),
        "linear" | "srgb" => Ok(ColorSpaceSetting::Linear),
        other => Err(format!(
            "unknown color space '{other}'; expected auto, gamma, or linear"
        )),
    }
}

pub fn parse_power(value: &str) -> Result<PowerSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" => Ok(PowerSetting::Low),
        "high" | "high-performance" => Ok(PowerSetting::High),
        other => Err(format!("unknown power preference '{other}'; expected low or high")),
    }
}
