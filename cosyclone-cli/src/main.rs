use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cosyclone_core::voice::tts::AudioFormat;
use cosyclone_core::{DashScopeConfig, RunOutcome, Settings, VoiceCloner};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cosyclone")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clone a voice on DashScope CosyVoice and synthesize speech with it")]
struct Args {
    /// Settings file (defaults to ~/.cosyclone/settings.toml when present)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Target synthesis model for the cloned voice
    #[arg(long)]
    model: Option<String>,

    /// Voice name prefix (lowercase letters and digits, under ten characters)
    #[arg(long)]
    prefix: Option<String>,

    /// Publicly reachable URL of the reference recording
    #[arg(long, value_name = "URL")]
    audio_url: Option<String>,

    /// Text to speak with the cloned voice
    #[arg(long)]
    text: Option<String>,

    /// Where to write the synthesized audio
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Audio encoding (mp3, wav, pcm, opus)
    #[arg(long)]
    format: Option<AudioFormat>,

    /// Maximum number of status checks before giving up
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Seconds between status checks
    #[arg(long, value_name = "SECS")]
    poll_interval: Option<u64>,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(model) = self.model {
            settings.enrollment.target_model = model;
        }
        if let Some(prefix) = self.prefix {
            settings.enrollment.prefix = prefix;
        }
        if let Some(url) = self.audio_url {
            settings.enrollment.audio_url = url;
        }
        if let Some(text) = self.text {
            settings.synthesis.text = text;
        }
        if let Some(output) = self.output {
            settings.synthesis.output_path = output;
        }
        if let Some(format) = self.format {
            settings.synthesis.format = format;
        }
        if let Some(max_attempts) = self.max_attempts {
            settings.poll.max_attempts = max_attempts;
        }
        if let Some(interval) = self.poll_interval {
            settings.poll.interval_secs = interval;
        }
    }
}

fn main() -> Result<()> {
    setup_tracing();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.settings.as_deref())?;
    args.apply(&mut settings);

    let config = DashScopeConfig::from_env(&settings.endpoints)?;
    info!(
        model = %settings.enrollment.target_model,
        prefix = %settings.enrollment.prefix,
        output = ?settings.synthesis.output_path,
        "CLI startup"
    );

    let cloner = VoiceCloner::dashscope(config)?;
    let job = settings.to_job();

    match cloner.run(&job).await? {
        RunOutcome::Saved { voice, path, .. } => {
            println!("Voice ID: {voice}");
            println!("Audio saved to {}", path.display());
        }
        RunOutcome::SynthesisFailed { voice, error } => {
            warn!(voice_id = %voice, "Synthesis failed, no audio written");
            eprintln!("Error during speech synthesis: {error}");
        }
    }

    Ok(())
}

fn setup_tracing() {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let args = Args::parse_from([
            "cosyclone",
            "--prefix",
            "narrator",
            "--format",
            "WAV",
            "--max-attempts",
            "3",
            "--poll-interval",
            "1",
            "-o",
            "out.wav",
        ]);
        let mut settings = Settings::default();

        args.apply(&mut settings);

        assert_eq!(settings.enrollment.prefix, "narrator");
        assert_eq!(settings.enrollment.target_model, "cosyvoice-v3-plus");
        assert_eq!(settings.synthesis.format, AudioFormat::Wav);
        assert_eq!(settings.poll.max_attempts, 3);
        assert_eq!(settings.poll.interval_secs, 1);
        assert_eq!(settings.synthesis.output_path, PathBuf::from("out.wav"));
    }

    #[test]
    fn test_no_flags_keeps_settings() {
        let args = Args::parse_from(["cosyclone"]);
        let mut settings = Settings::default();

        args.apply(&mut settings);

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Args::try_parse_from(["cosyclone", "--format", "flac"]).is_err());
    }
}
