pub mod audio;
pub mod cli;
pub mod commands;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod pipeline;
pub mod platform;
pub mod settings;

use std::process::ExitCode;
use clap::Parser;

use cli::Cli;

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_target(false)
        .init();

    tracing::info!("Starting AutoReader v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = persistence::load_settings(cli.config.as_deref());
    cli.apply(&mut settings);

    if let Err(e) = commands::convert::validate_settings(&mut settings) {
        tracing::error!("{:#}", e);
        return ExitCode::FAILURE;
    }

    if cli.write_config {
        if let Err(e) = persistence::save_settings(&settings, cli.config.as_deref()) {
            tracing::warn!("Failed to save settings: {:#}", e);
        }
    }

    match commands::convert::do_convert(&settings, &cli.input_file, &cli.output) {
        Ok(summary) => {
            match &summary.output {
                Some(path) => println!("\nSuccess! Audio saved to {}", path.display()),
                None => println!("\nSuccess! Audio played without saving to disk."),
            }
            if let Some(manifest) = &summary.manifest {
                println!("Segment files are listed in {}", manifest.display());
            }
            if summary.failed > 0 {
                println!("{} of {} segment(s) could not be processed.", summary.failed, summary.segments);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("An error occurred: {:#}", e);
            if let Some(hint) = error::voice_hint(&e, &settings.tts.voice) {
                eprintln!("\n{}", hint);
            }
            ExitCode::FAILURE
        }
    }
}
