use crate::audio::buffer::StreamBuffer;
use crate::audio::pool::{FramePool, frame_size};
use crate::defaults;
use crate::error::VoxstreamError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub pool: PoolConfig,
    pub engine: EngineConfig,
}

/// Audio framing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub ptime_ms: u32,
    /// Stream buffer capacity, in frames.
    pub buffer_frames: usize,
}

/// Frame pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    /// Idle frames kept per size class; releases beyond this are dropped.
    pub max_idle_per_class: usize,
}

/// Recognition engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub model_path: PathBuf,
    pub scorer_path: Option<PathBuf>,
    pub beam_width: u32,
    pub lm_alpha: f32,
    pub lm_beta: f32,
    pub num_results: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            ptime_ms: defaults::PTIME_MS,
            buffer_frames: defaults::BUFFER_FRAMES,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_class: defaults::POOL_MAX_IDLE,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.pbmm"),
            scorer_path: None,
            beam_width: defaults::BEAM_WIDTH,
            lm_alpha: defaults::LM_ALPHA,
            lm_beta: defaults::LM_BETA,
            num_results: defaults::NUM_RESULTS,
        }
    }
}

impl PoolConfig {
    /// Builds a frame pool registry with this idle limit.
    pub fn build(&self) -> FramePool {
        FramePool::with_max_idle(self.max_idle_per_class)
    }
}

impl EngineConfig {
    /// Replaces non-positive decoder parameters with their defaults.
    pub fn normalized(mut self) -> Self {
        if self.beam_width == 0 {
            self.beam_width = defaults::BEAM_WIDTH;
        }
        if self.lm_alpha.is_nan() || self.lm_alpha <= 0.0 {
            self.lm_alpha = defaults::LM_ALPHA;
        }
        if self.lm_beta.is_nan() || self.lm_beta <= 0.0 {
            self.lm_beta = defaults::LM_BETA;
        }
        self
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; unreadable files and
    /// invalid TOML are returned as errors.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXSTREAM_MODEL → engine.model_path
    /// - VOXSTREAM_SCORER → engine.scorer_path
    /// - VOXSTREAM_SAMPLE_RATE → audio.sample_rate (ignored unless numeric)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("VOXSTREAM_MODEL")
            && !model.is_empty()
        {
            self.engine.model_path = PathBuf::from(model);
        }

        if let Ok(scorer) = std::env::var("VOXSTREAM_SCORER")
            && !scorer.is_empty()
        {
            self.engine.scorer_path = Some(PathBuf::from(scorer));
        }

        if let Ok(rate) = std::env::var("VOXSTREAM_SAMPLE_RATE")
            && let Ok(rate) = rate.trim().parse::<u32>()
        {
            self.audio.sample_rate = rate;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxstream/config.toml on Linux, or `None` when the
    /// platform has no config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("voxstream").join("config.toml"))
    }

    /// Checks the values a stream buffer and feeder will be built from.
    pub fn validate(&self) -> crate::error::Result<()> {
        if frame_size(self.audio.sample_rate, self.audio.ptime_ms).is_none() {
            return Err(VoxstreamError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: format!(
                    "no frame size for {}Hz at {}ms",
                    self.audio.sample_rate, self.audio.ptime_ms
                ),
            });
        }
        if self.audio.buffer_frames == 0 {
            return Err(VoxstreamError::ConfigInvalidValue {
                key: "audio.buffer_frames".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.engine.num_results == 0 {
            return Err(VoxstreamError::ConfigInvalidValue {
                key: "engine.num_results".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Creates a stream buffer with the configured format and capacity.
    pub fn stream_buffer(&self, pool: &FramePool) -> crate::error::Result<StreamBuffer> {
        StreamBuffer::new(
            pool,
            self.audio.sample_rate,
            self.audio.ptime_ms,
            self.audio.buffer_frames,
        )
    }
}
