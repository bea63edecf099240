use std::path::PathBuf;

use anyhow::{Context, Result};
use renderer::{
    Antialiasing, ColorSpaceMode, GpuPowerPreference, PhaseMapping, RendererConfig,
};
use sortconfig::{AntialiasSetting, ColorSpaceSetting, PowerSetting, ViewerConfig};

use crate::cli::Overrides;
use crate::paths::AppPaths;

/// Loads the configuration file and layers the CLI overrides on top.
///
/// An explicit `--config` must exist; the discovered default file is optional.
pub fn resolve(overrides: &Overrides) -> Result<ViewerConfig> {
    let (path, explicit) = match overrides.config.as_ref() {
        Some(path) => (path.clone(), true),
        None => (default_config_path()?, false),
    };

    let config = if explicit {
        ViewerConfig::load(&path)
    } else {
        ViewerConfig::load_or_default(&path)
    }
    .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::debug!(path = %path.display(), explicit, "resolved configuration file");

    apply_overrides(config, overrides)
}

fn default_config_path() -> Result<PathBuf> {
    let paths = AppPaths::discover()?;
    Ok(paths.config_file())
}

pub fn apply_overrides(mut config: ViewerConfig, overrides: &Overrides) -> Result<ViewerConfig> {
    if let Some(title) = overrides.title.as_ref() {
        config.window.title = title.clone();
    }
    if let Some((width, height)) = overrides.size {
        config.window.width = Some(width);
        config.window.height = Some(height);
    }
    if let Some(antialias) = overrides.antialias {
        config.render.antialias = antialias;
    }
    if let Some(color_space) = overrides.color_space {
        config.render.color_space = color_space;
    }
    if let Some(power) = overrides.power {
        config.render.power = power;
    }
    if let Some(gain) = overrides.phase_gain {
        config.phase.gain = gain;
    }
    if let Some(offset) = overrides.phase_offset {
        config.phase.offset = offset;
    }

    config
        .validate()
        .context("command-line overrides produced an invalid configuration")?;
    Ok(config)
}

pub fn renderer_config(config: &ViewerConfig) -> RendererConfig {
    RendererConfig {
        title: config.window.title.clone(),
        surface_size: config.window_size(),
        antialiasing: map_antialias(config.render.antialias),
        color_space: match config.render.color_space {
            ColorSpaceSetting::Auto => ColorSpaceMode::Auto,
            ColorSpaceSetting::Gamma => ColorSpaceMode::Gamma,
            ColorSpaceSetting::Linear => ColorSpaceMode::Linear,
        },
        gpu_power: match config.render.power {
            PowerSetting::Low => GpuPowerPreference::Low,
            PowerSetting::High => GpuPowerPreference::High,
        },
        background: config.render.background,
        phase: PhaseMapping {
            gain: config.phase.gain,
            offset: config.phase.offset,
        },
    }
}

fn map_antialias(setting: AntialiasSetting) -> Antialiasing {
    match setting.samples() {
        None => Antialiasing::Auto,
        Some(1) => Antialiasing::Off,
        Some(samples) => Antialiasing::Samples(samples),
    }
}
