//! LayerLoop - headless mixdown renderer
//!
//! Usage: `layerloop <request.json> <output> [--config <config.json>]`

use anyhow::{bail, Context, Result};
use layerloop_core::{EngineConfig, MixFormat};
use layerloop_mixdown::{MixProgress, MixRequest, MixdownEngine, MixCancel};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

struct Args {
    request: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut positional = Vec::new();
    let mut config = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let [request, output]: [PathBuf; 2] = match positional.try_into() {
        Ok(paths) => paths,
        Err(_) => bail!("usage: layerloop <request.json> <output> [--config <config.json>]"),
    };
    Ok(Args {
        request,
        output,
        config,
    })
}

/// The format `path`'s extension names, when it differs from `actual`.
fn extension_mismatch(path: &Path, actual: MixFormat) -> Option<MixFormat> {
    let named = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(MixFormat::from_extension)?;
    (named != actual).then_some(named)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = parse_args(std::env::args().skip(1))?;

    let config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let bytes = std::fs::read(&args.request)
        .with_context(|| format!("reading request {}", args.request.display()))?;
    let request = MixRequest::from_json(&bytes)?;
    info!(
        tracks = request.tracks.len(),
        loops = request.loop_count,
        format = %request.format,
        "LayerLoop mixdown starting..."
    );

    let engine = MixdownEngine::standard(config.mixdown);
    info!(
        sample_rate = engine.config().sample_rate,
        channels = engine.config().channels,
        crossfade_ms = engine.config().crossfade_ms,
        "Mixdown engine ready"
    );
    let result = engine
        .mix_with(request.clone(), &MixProgress::new(), &MixCancel::new())
        .await?;

    if result.fell_back(&request) {
        warn!(
            requested = %request.format,
            actual = %result.actual_format,
            "Requested format unavailable"
        );
    }

    if let Some(named) = extension_mismatch(&args.output, result.actual_format) {
        warn!(
            path = %args.output.display(),
            extension = %named,
            actual = %result.actual_format,
            "Output extension does not match the encoded format"
        );
    }

    std::fs::write(&args.output, &result.data)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(
        path = %args.output.display(),
        format = %result.actual_format,
        duration_ms = result.duration_ms,
        bytes = result.data.len(),
        "Mix written"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_positional_args() {
        let parsed = args(&["mix.json", "out.wav"]).unwrap();
        assert_eq!(parsed.request, PathBuf::from("mix.json"));
        assert_eq!(parsed.output, PathBuf::from("out.wav"));
        assert!(parsed.config.is_none());
    }

    #[test]
    fn test_config_flag() {
        let parsed = args(&["--config", "engine.json", "mix.json", "out.mp3"]).unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("engine.json")));
        assert_eq!(parsed.output, PathBuf::from("out.mp3"));
    }

    #[test]
    fn test_extension_mismatch() {
        let out = Path::new("mix.mp3");
        assert_eq!(extension_mismatch(out, MixFormat::Wav), Some(MixFormat::Mp3));
        assert_eq!(extension_mismatch(out, MixFormat::Mp3), None);
        assert_eq!(extension_mismatch(Path::new("MIX.WAV"), MixFormat::Wav), None);
        assert_eq!(extension_mismatch(Path::new("mix"), MixFormat::Flac), None);
        assert_eq!(extension_mismatch(Path::new("mix.bin"), MixFormat::Flac), None);
    }

    #[test]
    fn test_missing_output_rejected() {
        assert!(args(&["mix.json"]).is_err());
        assert!(args(&["mix.json", "out.wav", "--config"]).is_err());
    }
}
