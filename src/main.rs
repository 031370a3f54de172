// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
mod audio;
mod config;
mod error;
mod mapping;
mod midi;
mod runtime;
mod samples;
mod scanner;
#[cfg(test)]
mod testutil;
mod util;

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{crate_version, CommandFactory, Parser};
use tracing::{info, span, Level};
use tracing_subscriber::EnvFilter;

use crate::error::SamplerError;
use crate::runtime::Runtime;

#[derive(Parser, Debug)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Plays a directory of audio files from MIDI note-on events."
)]
struct Cli {
    /// The directory holding the samples.
    directory: Option<PathBuf>,
    /// A YAML settings file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// The audio output device. Overrides the settings file.
    #[arg(short, long)]
    device: Option<String>,
    /// The MIDI input device. Overrides the settings file.
    #[arg(short, long)]
    midi_device: Option<String>,
    /// Lists the audio output and MIDI input devices and exits.
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli, runtime::ctrl_c()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.wants_usage() {
                eprintln!("{}", Cli::command().render_usage());
            }
            ExitCode::FAILURE
        }
    }
}

/// Runs the sampler until `shutdown` resolves.
async fn run<F>(cli: Cli, shutdown: F) -> Result<(), SamplerError>
where
    F: Future<Output = ()>,
{
    if cli.list_devices {
        return list_devices();
    }

    let directory = cli.directory.ok_or(SamplerError::MissingArgument)?;
    let mut settings = config::load(cli.config.as_deref())?;
    if let Some(device) = cli.device {
        settings.audio_mut().set_device(device);
    }
    if let Some(device) = cli.midi_device {
        settings.midi_mut().set_device(device);
    }

    play(&directory, &settings, audio::get_device, shutdown).await
}

/// Scans and maps the directory, and only then opens the audio output with
/// `open_audio`, so a bad directory never touches the audio backend.
async fn play<A, F>(
    directory: &Path,
    settings: &config::Sampler,
    open_audio: A,
    shutdown: F,
) -> Result<(), SamplerError>
where
    A: FnOnce(Option<&str>) -> Result<Arc<dyn audio::Device>, Box<dyn Error>>,
    F: Future<Output = ()>,
{
    let entries = {
        let span = span!(Level::INFO, "scan", directory = %directory.display());
        let _enter = span.enter();

        let files = scanner::scan(directory, settings.samples())?;
        mapping::resolve(&files).into_entries()
    };

    let audio = open_audio(settings.audio().device())
        .map_err(|e| SamplerError::AudioBackendInit(e.to_string()))?;
    let midi = midi::get_device(settings.midi().device())
        .map_err(|e| SamplerError::MidiBackendInit(e.to_string()))?;

    let runtime = Runtime::new(audio, midi)?;
    let bindings = samples::bind_all(
        &runtime,
        entries,
        settings.audio().ramp()?,
        settings.midi().channel()?,
    )?;

    runtime.run(bindings, shutdown).await?;
    info!("Sampler stopped");
    Ok(())
}

/// Prints the audio output and MIDI input devices.
fn list_devices() -> Result<(), SamplerError> {
    let audio_devices =
        audio::list_devices().map_err(|e| SamplerError::AudioBackendInit(e.to_string()))?;
    let midi_devices =
        midi::list_devices().map_err(|e| SamplerError::MidiBackendInit(e.to_string()))?;

    print_devices("Audio devices", &audio_devices);
    print_devices("MIDI devices", &midi_devices);
    Ok(())
}

fn print_devices<D: fmt::Display>(title: &str, devices: &[D]) {
    if devices.is_empty() {
        println!("{}: none found.", title);
        return;
    }

    println!("{}:", title);
    for device in devices {
        println!("- {}", device);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;

    use super::*;
    use crate::testutil::write_wav;

    fn cli(args: &[&str]) -> Cli {
        let args = std::iter::once("sampler").chain(args.iter().copied());
        Cli::try_parse_from(args).unwrap()
    }

    fn mock_settings() -> config::Sampler {
        let mut settings = config::Sampler::default();
        settings.audio_mut().set_device("mock-out".to_string());
        settings.midi_mut().set_device("mock-in".to_string());
        settings
    }

    #[test]
    fn test_parse_args() {
        let parsed = cli(&["samples", "-d", "mock-out", "--midi-device", "mock-in"]);
        assert_eq!(parsed.directory, Some(PathBuf::from("samples")));
        assert_eq!(parsed.device.as_deref(), Some("mock-out"));
        assert_eq!(parsed.midi_device.as_deref(), Some("mock-in"));
        assert!(!parsed.list_devices);

        assert!(Cli::try_parse_from(["sampler", "a", "b"]).is_err());
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let err = run(cli(&[]), async {}).await.unwrap_err();
        assert!(matches!(err, SamplerError::MissingArgument));
        assert!(err.wants_usage());
    }

    #[tokio::test]
    async fn test_invalid_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let missing_arg = missing.to_str().unwrap();

        let args = cli(&[missing_arg, "-d", "mock-out", "-m", "mock-in"]);
        let err = run(args, async {}).await.unwrap_err();
        match err {
            SamplerError::InvalidPath(path) => assert_eq!(path, missing),
            other => panic!("expected invalid path, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_directory_never_opens_audio() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let audio = Arc::new(audio::mock::Device::get("mock-out"));
        let shared: Arc<dyn audio::Device> = audio.clone();
        let opened = Cell::new(false);

        let err = play(
            &missing,
            &mock_settings(),
            |_| {
                opened.set(true);
                Ok(shared)
            },
            async {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SamplerError::InvalidPath(_)));
        assert!(!opened.get());
        assert!(!audio.is_running());
    }

    #[tokio::test]
    async fn test_play_opens_audio_after_scan_and_stops_it() {
        let dir = tempfile::tempdir().unwrap();
        let samples = vec![vec![0.5f32; 480]];
        write_wav(&dir.path().join("36.wav"), samples, 48000).unwrap();

        let audio = Arc::new(audio::mock::Device::get("mock-out"));
        let shared: Arc<dyn audio::Device> = audio.clone();
        let opened = Cell::new(false);

        play(
            dir.path(),
            &mock_settings(),
            |name| {
                assert_eq!(name, Some("mock-out"));
                opened.set(true);
                Ok(shared)
            },
            async {},
        )
        .await
        .unwrap();

        assert!(opened.get());
        assert!(!audio.is_running());
    }

    #[tokio::test]
    async fn test_run_with_mock_devices() {
        let dir = tempfile::tempdir().unwrap();
        let samples = vec![vec![0.5f32; 480]];
        write_wav(&dir.path().join("kick.wav"), samples.clone(), 48000).unwrap();
        write_wav(&dir.path().join("snare.wav"), samples, 44100).unwrap();
        fs::write(dir.path().join("notes.txt"), "not audio").unwrap();
        let dir_arg = dir.path().to_str().unwrap();

        let args = cli(&[dir_arg, "-d", "mock-out", "-m", "mock-in"]);
        run(args, async {}).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_with_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("sampler.yaml");
        fs::write(&config, "midi:\n  channel: 16\n").unwrap();
        let dir_arg = dir.path().to_str().unwrap();
        let config_arg = config.to_str().unwrap();

        let args = cli(&[dir_arg, "-c", config_arg]);
        let err = run(args, async {}).await.unwrap_err();
        assert!(matches!(err, SamplerError::Config(_)));
    }
}
