mod app;
mod render;
mod results;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::results::CsvRecorder;

/// Adaptive tone-sequence memory task.
#[derive(Parser, Debug)]
#[command(name = "tonespan", version, about)]
struct Cli {
    /// Participant identifier; names the results file.
    #[arg(long)]
    participant: String,

    /// Playback volume, 0-100.
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(0..=100))]
    volume: u8,

    /// Play the reference tone and exit.
    #[arg(long)]
    test_sound: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    if cli.test_sound {
        return app::play_test_sound(cli.volume);
    }

    // Make sure we can save the data before anything is presented.
    let recorder = CsvRecorder::create(&cli.participant)?;
    App::new(&cli, recorder)?.run()
}
