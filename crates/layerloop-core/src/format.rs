//! Output formats and the quality → bitrate table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Container/codec of a rendered mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixFormat {
    /// 16-bit PCM WAV. Always available.
    #[default]
    Wav,
    Flac,
    Aac,
    Mp3,
    Opus,
}

impl MixFormat {
    /// File extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
        }
    }

    /// Guess a format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            "m4a" | "aac" | "mp4" => Some(Self::Aac),
            "mp3" => Some(Self::Mp3),
            "opus" | "ogg" => Some(Self::Opus),
            _ => None,
        }
    }
}

impl fmt::Display for MixFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wav => "WAV",
            Self::Flac => "FLAC",
            Self::Aac => "AAC",
            Self::Mp3 => "MP3",
            Self::Opus => "Opus",
        };
        f.write_str(name)
    }
}

/// Export quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixQuality {
    Low,
    #[default]
    Medium,
    High,
}

/// Encoder bitrate in kbps for a lossy format, `None` for lossless ones.
pub fn bitrate_kbps(format: MixFormat, quality: MixQuality) -> Option<u32> {
    use MixQuality::*;
    let kbps = match (format, quality) {
        (MixFormat::Wav | MixFormat::Flac, _) => return None,
        (MixFormat::Aac, Low) => 96,
        (MixFormat::Aac, Medium) => 128,
        (MixFormat::Aac, High) => 256,
        (MixFormat::Mp3, Low) => 128,
        (MixFormat::Mp3, Medium) => 192,
        (MixFormat::Mp3, High) => 320,
        (MixFormat::Opus, Low) => 64,
        (MixFormat::Opus, Medium) => 96,
        (MixFormat::Opus, High) => 160,
    };
    Some(kbps)
}
