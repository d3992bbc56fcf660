use crate::config::EngineConfig;
use crate::engine::error::EngineErrorCode;
use crate::error::{Result, VoxstreamError};
use crate::transcript::segmenter::segment;
use crate::transcript::types::{
    CandidateTranscript, Hypothesis, HypothesisCandidate, Metadata, Token,
};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Trait for streaming speech recognizers.
///
/// This trait allows swapping implementations (native engine vs mock).
pub trait Recognizer: Send + Sync {
    /// Sample rate the model expects, in Hz.
    fn sample_rate(&self) -> u32;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Opens a new recognition stream.
    fn create_stream(&self) -> Result<Box<dyn RecognizerStream>>;
}

/// Implement Recognizer for Arc<T> to allow sharing across sessions.
impl<T: Recognizer> Recognizer for Arc<T> {
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn create_stream(&self) -> Result<Box<dyn RecognizerStream>> {
        (**self).create_stream()
    }
}

/// One utterance being decoded.
pub trait RecognizerStream: Send {
    /// Feeds 16-bit PCM at the recognizer's sample rate. Empty input is ignored.
    fn feed_audio(&mut self, samples: &[i16]);

    /// Best transcript so far, without finishing the stream.
    fn intermediate_decode(&mut self) -> String;

    /// Ends the stream and returns up to `num_results` ranked transcripts.
    fn finish(self: Box<Self>, num_results: u32) -> Result<Metadata>;
}

/// Decoder parameters a loaded model accepts before streams are opened.
pub trait DecoderSettings {
    fn set_beam_width(&mut self, beam_width: u32) -> Result<()>;

    /// Enables language model rescoring with the scorer at `scorer_path`.
    fn enable_external_scorer(&mut self, scorer_path: &Path) -> Result<()>;

    /// Sets the language model weight and word insertion weight.
    ///
    /// Fails with `ScorerNotEnabled` when no scorer is loaded.
    fn set_scorer_alpha_beta(&mut self, alpha: f32, beta: f32) -> Result<()>;
}

/// Loads the model at `config.model_path` and applies the decoder settings.
///
/// Non-positive beam width and weights fall back to their defaults. The
/// scorer and its weights are only applied when a scorer path is set.
pub fn open_recognizer<R, F>(config: &EngineConfig, load: F) -> Result<R>
where
    R: Recognizer + DecoderSettings,
    F: FnOnce(&Path) -> Result<R>,
{
    let config = config.clone().normalized();
    let mut recognizer = load(&config.model_path)?;
    recognizer.set_beam_width(config.beam_width)?;

    if let Some(scorer_path) = &config.scorer_path {
        recognizer.enable_external_scorer(scorer_path)?;
        recognizer.set_scorer_alpha_beta(config.lm_alpha, config.lm_beta)?;
    }

    debug!(
        "opened recognizer {} ({}Hz, beam width {}, scorer {:?})",
        recognizer.model_name(),
        recognizer.sample_rate(),
        config.beam_width,
        config.scorer_path
    );
    Ok(recognizer)
}

/// Ends the stream and segments every transcript into words.
pub fn finish_with_hypothesis(
    stream: Box<dyn RecognizerStream>,
    num_results: u32,
) -> Result<Hypothesis> {
    let metadata = stream.finish(num_results)?;
    Ok(segment(&metadata))
}

/// Ends the stream and returns the top-ranked candidate, if any.
pub fn finish_with_best_hypothesis(
    stream: Box<dyn RecognizerStream>,
    num_results: u32,
) -> Result<Option<HypothesisCandidate>> {
    Ok(finish_with_hypothesis(stream, num_results)?.into_best())
}

/// Builds single-transcript metadata with one token per character, `step_ms`
/// apart, the way character-level engines report it.
pub fn metadata_from_text(text: &str, confidence: f64, step_ms: u32) -> Metadata {
    let tokens = text
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let step = i as u32;
            Token::new(c.to_string(), step, (step * step_ms) as f32 / 1000.0)
        })
        .collect();
    Metadata {
        transcripts: vec![CandidateTranscript { tokens, confidence }],
    }
}

/// Mock recognizer for testing
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    model_name: String,
    sample_rate: u32,
    response: Metadata,
    create_failure: Option<EngineErrorCode>,
    finish_failure: Option<EngineErrorCode>,
    fed: Arc<Mutex<Vec<i16>>>,
    beam_width: u32,
    scorer_path: Option<PathBuf>,
    scorer_alpha_beta: Option<(f32, f32)>,
}

impl MockRecognizer {
    /// Create a new mock recognizer with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            sample_rate: crate::defaults::SAMPLE_RATE,
            response: metadata_from_text("mock transcription", 0.0, 20),
            create_failure: None,
            finish_failure: None,
            fed: Arc::new(Mutex::new(Vec::new())),
            beam_width: crate::defaults::BEAM_WIDTH,
            scorer_path: None,
            scorer_alpha_beta: None,
        }
    }

    /// Configure the mock to finish with a single transcript of `text`
    pub fn with_text(mut self, text: &str) -> Self {
        self.response = metadata_from_text(text, 0.0, 20);
        self
    }

    /// Configure the mock to finish with specific metadata
    pub fn with_response(mut self, response: Metadata) -> Self {
        self.response = response;
        self
    }

    /// Configure the sample rate reported by the mock
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Configure the mock to fail on create_stream
    pub fn with_create_failure(mut self, code: EngineErrorCode) -> Self {
        self.create_failure = Some(code);
        self
    }

    /// Configure the mock to fail on finish
    pub fn with_finish_failure(mut self, code: EngineErrorCode) -> Self {
        self.finish_failure = Some(code);
        self
    }

    /// Every sample fed to any stream of this recognizer, in order
    pub fn fed_samples(&self) -> Vec<i16> {
        self.fed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MockRecognizer {
    /// Beam width last set through [`DecoderSettings`]
    pub fn beam_width(&self) -> u32 {
        self.beam_width
    }

    /// Scorer enabled through [`DecoderSettings`], if any
    pub fn scorer_path(&self) -> Option<&Path> {
        self.scorer_path.as_deref()
    }

    /// Scorer weights set through [`DecoderSettings`], if any
    pub fn scorer_alpha_beta(&self) -> Option<(f32, f32)> {
        self.scorer_alpha_beta
    }
}

impl DecoderSettings for MockRecognizer {
    fn set_beam_width(&mut self, beam_width: u32) -> Result<()> {
        self.beam_width = beam_width;
        Ok(())
    }

    fn enable_external_scorer(&mut self, scorer_path: &Path) -> Result<()> {
        self.scorer_path = Some(scorer_path.to_path_buf());
        Ok(())
    }

    fn set_scorer_alpha_beta(&mut self, alpha: f32, beta: f32) -> Result<()> {
        if self.scorer_path.is_none() {
            return Err(VoxstreamError::Engine(EngineErrorCode::ScorerNotEnabled));
        }
        self.scorer_alpha_beta = Some((alpha, beta));
        Ok(())
    }
}

impl Recognizer for MockRecognizer {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn create_stream(&self) -> Result<Box<dyn RecognizerStream>> {
        if let Some(code) = self.create_failure {
            return Err(VoxstreamError::Engine(code));
        }
        Ok(Box::new(MockStream {
            response: self.response.clone(),
            finish_failure: self.finish_failure,
            fed: self.fed.clone(),
            frames: 0,
        }))
    }
}

struct MockStream {
    response: Metadata,
    finish_failure: Option<EngineErrorCode>,
    fed: Arc<Mutex<Vec<i16>>>,
    frames: usize,
}

impl RecognizerStream for MockStream {
    fn feed_audio(&mut self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }
        self.frames += 1;
        self.fed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(samples);
    }

    fn intermediate_decode(&mut self) -> String {
        if self.frames == 0 {
            return String::new();
        }
        self.response
            .transcripts
            .first()
            .map(|t| t.tokens.iter().map(|tok| tok.text.as_str()).collect())
            .unwrap_or_default()
    }

    fn finish(self: Box<Self>, num_results: u32) -> Result<Metadata> {
        if let Some(code) = self.finish_failure {
            return Err(VoxstreamError::Engine(code));
        }
        let mut metadata = self.response;
        metadata.transcripts.truncate(num_results as usize);
        Ok(metadata)
    }
}
