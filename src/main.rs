mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use raster2svg::{tracer_status, ConversionOptions, Converter};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.check_tracer {
        let status = tracer_status(&cli.tracer);
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let base = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?
        }
        None => ConversionOptions::default(),
    };
    let options = cli.apply(base);

    let input = cli.input.clone().context("--input is required")?;
    let output_path = cli.output.clone().unwrap_or_else(|| input.with_extension("svg"));

    tracing::info!(input = %input.display(), output = %output_path.display(), "converting");
    let conversion = Converter::detect(options, &cli.tracer).convert_file(&input, &output_path)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&conversion)?);
    } else {
        println!("{}", conversion.message);
    }
    Ok(())
}
