use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use photobooth_core::{
    AppConfig, Booth, Camera, CollageSink, Compositor, DirectorySink, FileCamera, Frame,
    SyntheticCamera,
};
use tracing_subscriber::EnvFilter;

fn main() -> photobooth_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Run {
            output,
            frames,
            instant,
            mirrored,
        } => run_session(&config, &output, frames, instant, mirrored),
        Commands::Compose { inputs, output } => run_compose(&config, &inputs, &output),
        Commands::Config => {
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

fn run_session(
    config: &AppConfig,
    output: &Path,
    frames: Vec<String>,
    instant: bool,
    mirrored: bool,
) -> photobooth_core::Result<()> {
    let camera: Box<dyn Camera> = if frames.is_empty() {
        Box::new(SyntheticCamera::new(640, 480).mirrored(mirrored))
    } else {
        Box::new(FileCamera::new(frames.iter().map(|f| frame_path(f)).collect()))
    };

    let mut booth = Booth::new(config, camera)?;
    booth.start()?;
    tracing::info!(
        countdown = ?booth.state().countdown(),
        status = booth.state().status_label(),
        "capture sequence running"
    );

    if instant {
        booth.run_to_completion(booth.plan().ticks_to_complete())?;
    } else {
        let pause = config.pacing.tick_duration();
        let mut shown = booth.state().countdown();
        while booth.state().is_running() {
            std::thread::sleep(pause);
            if booth.tick().is_none() {
                break;
            }
            let countdown = booth.state().countdown();
            if countdown != shown {
                match countdown {
                    Some(0) => tracing::info!(shot = booth.state().current_shot(), "click"),
                    Some(n) => tracing::info!(shot = booth.state().current_shot(), "{n}"),
                    None => {}
                }
                shown = countdown;
            }
        }
    }

    let mut sink = DirectorySink::new(output);
    let collage = booth.download(&mut sink)?;
    tracing::info!(
        filename = %collage.filename,
        bytes = collage.bytes.len(),
        "session finished"
    );
    Ok(())
}

fn run_compose(
    config: &AppConfig,
    inputs: &[String],
    output: &Path,
) -> photobooth_core::Result<()> {
    tracing::info!(inputs = inputs.len(), ?output, "composing collage from files");

    let frames: Vec<Option<Frame>> = inputs.iter().map(|input| read_frame(input)).collect();
    let compositor = Compositor::new(config.collage.clone())?;
    let collage = compositor.compose(&frames)?;
    let mut sink = DirectorySink::new(output);
    sink.save(&collage.bytes, &collage.filename);
    Ok(())
}

/// Loads one collage input. Unreadable files become an empty slot, the same
/// way the file camera treats them.
fn read_frame(arg: &str) -> Option<Frame> {
    let path = frame_path(arg)?;
    match std::fs::read(&path) {
        Ok(bytes) => Some(Frame::from_bytes(bytes)),
        Err(err) => {
            tracing::warn!(?path, %err, "CaptureUnavailable: could not read frame");
            None
        }
    }
}

/// `-` stands for a shot without a frame.
fn frame_path(arg: &str) -> Option<PathBuf> {
    (arg != "-").then(|| PathBuf::from(arg))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "FrameIt photobooth", long_about = None)]
struct Cli {
    /// JSON config with the shot plan, collage layout and tick pacing.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one capture sequence and save the collage.
    Run {
        /// Directory the collage is written to.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// Image files to replay as camera snapshots, one per shot. `-` marks
        /// a shot where the camera had no feed. Uses a test pattern if empty.
        #[arg(long = "frame")]
        frames: Vec<String>,
        /// Skip the real-time countdown.
        #[arg(long)]
        instant: bool,
        /// Mirror the test pattern like a selfie preview.
        #[arg(long)]
        mirrored: bool,
    },
    /// Build a collage from existing image files.
    Compose {
        /// Frames in collage order; `-` leaves a placeholder slot.
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Directory the collage is written to.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Print the effective configuration as JSON.
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_and_unreadable_inputs_become_empty_slots() {
        assert!(read_frame("-").is_none());
        assert!(read_frame("/no/such/frameit-input.png").is_none());
    }

    #[test]
    fn readable_inputs_are_loaded() {
        let path = std::env::temp_dir().join(format!("frameit-input-{}.bin", std::process::id()));
        std::fs::write(&path, b"bytes").unwrap();

        let frame = read_frame(path.to_str().unwrap()).expect("file exists");
        assert_eq!(frame.bytes(), b"bytes");
        let _ = std::fs::remove_file(&path);
    }
}
