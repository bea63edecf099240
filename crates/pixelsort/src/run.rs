use std::io;

use anyhow::{anyhow, Result};
use renderer::Renderer;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::inspect;
use crate::settings;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let Cli {
        image,
        overrides,
        command,
    } = cli;

    match command {
        Some(Command::Inspect(args)) => inspect::run_inspect(&args),
        Some(Command::Config) => {
            let config = settings::resolve(&overrides)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        None => {
            let image = image.ok_or_else(|| anyhow!("no IMAGE given; see `pixelsort --help`"))?;
            let config = settings::resolve(&overrides)?;
            let renderer_config = settings::renderer_config(&config);
            tracing::info!(
                image = %image.display(),
                title = %renderer_config.title,
                "starting pixel sort viewer"
            );
            Renderer::new(renderer_config).run(move || inspect::load_raw_image(&image))
        }
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
