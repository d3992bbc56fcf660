//! Status codes reported by the native recognition engine.

use thiserror::Error;

/// Non-zero status code returned by an engine call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorCode {
    // Missing model
    #[error("Missing model information.")]
    NoModel,

    // Invalid parameters
    #[error("Invalid alphabet embedded in model. (Data corruption?)")]
    InvalidAlphabet,
    #[error("Invalid model shape.")]
    InvalidShape,
    #[error("Invalid scorer file.")]
    InvalidScorer,
    #[error("Incompatible model.")]
    ModelIncompatible,
    #[error("External scorer is not enabled.")]
    ScorerNotEnabled,
    #[error("Could not read scorer file.")]
    ScorerUnreadable,
    #[error("Could not recognize language model header in scorer.")]
    ScorerInvalidLm,
    #[error("Reached end of scorer file before loading vocabulary trie.")]
    ScorerNoTrie,
    #[error("Invalid magic in trie header.")]
    ScorerInvalidTrie,
    #[error("Scorer file version does not match expected version.")]
    ScorerVersionMismatch,

    // Runtime failures
    #[error("Failed to initialize memory mapped model.")]
    FailInitMmap,
    #[error("Failed to initialize the session.")]
    FailInitSess,
    #[error("Interpreter failed.")]
    FailInterpreter,
    #[error("Failed to run the session.")]
    FailRunSess,
    #[error("Error creating the stream.")]
    FailCreateStream,
    #[error("Error reading the proto buffer model file.")]
    FailReadProtobuf,
    #[error("Failed to create session.")]
    FailCreateSess,
    #[error("Could not allocate model state.")]
    FailCreateModel,

    #[error("Unknown engine error code {0:#06x}")]
    Unknown(i32),
}

impl EngineErrorCode {
    /// Maps an engine status to a result; `0` is success.
    pub fn check(code: i32) -> Result<(), EngineErrorCode> {
        match code {
            0 => Ok(()),
            code => Err(Self::from_code(code)),
        }
    }

    /// Maps a non-zero engine status to its error.
    pub fn from_code(code: i32) -> Self {
        match code {
            0x1000 => Self::NoModel,
            0x2000 => Self::InvalidAlphabet,
            0x2001 => Self::InvalidShape,
            0x2002 => Self::InvalidScorer,
            0x2003 => Self::ModelIncompatible,
            0x2004 => Self::ScorerNotEnabled,
            0x2005 => Self::ScorerUnreadable,
            0x2006 => Self::ScorerInvalidLm,
            0x2007 => Self::ScorerNoTrie,
            0x2008 => Self::ScorerInvalidTrie,
            0x2009 => Self::ScorerVersionMismatch,
            0x3000 => Self::FailInitMmap,
            0x3001 => Self::FailInitSess,
            0x3002 => Self::FailInterpreter,
            0x3003 => Self::FailRunSess,
            0x3004 => Self::FailCreateStream,
            0x3005 => Self::FailReadProtobuf,
            0x3006 => Self::FailCreateSess,
            0x3007 => Self::FailCreateModel,
            other => Self::Unknown(other),
        }
    }

    /// The engine's numeric code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::NoModel => 0x1000,
            Self::InvalidAlphabet => 0x2000,
            Self::InvalidShape => 0x2001,
            Self::InvalidScorer => 0x2002,
            Self::ModelIncompatible => 0x2003,
            Self::ScorerNotEnabled => 0x2004,
            Self::ScorerUnreadable => 0x2005,
            Self::ScorerInvalidLm => 0x2006,
            Self::ScorerNoTrie => 0x2007,
            Self::ScorerInvalidTrie => 0x2008,
            Self::ScorerVersionMismatch => 0x2009,
            Self::FailInitMmap => 0x3000,
            Self::FailInitSess => 0x3001,
            Self::FailInterpreter => 0x3002,
            Self::FailRunSess => 0x3003,
            Self::FailCreateStream => 0x3004,
            Self::FailReadProtobuf => 0x3005,
            Self::FailCreateSess => 0x3006,
            Self::FailCreateModel => 0x3007,
            Self::Unknown(code) => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_success() {
        assert_eq!(EngineErrorCode::check(0), Ok(()));
    }

    #[test]
    fn test_known_codes_map_both_ways() {
        for code in [0x1000, 0x2000, 0x2005, 0x2009, 0x3000, 0x3004, 0x3007] {
            let error = EngineErrorCode::from_code(code);
            assert!(!matches!(error, EngineErrorCode::Unknown(_)), "{code:#x}");
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn test_unknown_code_is_preserved() {
        let error = EngineErrorCode::check(0x4242).unwrap_err();
        assert_eq!(error, EngineErrorCode::Unknown(0x4242));
        assert_eq!(error.code(), 0x4242);
        assert_eq!(error.to_string(), "Unknown engine error code 0x4242");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            EngineErrorCode::from_code(0x3004).to_string(),
            "Error creating the stream."
        );
        assert_eq!(
            EngineErrorCode::ScorerVersionMismatch.to_string(),
            "Scorer file version does not match expected version."
        );
    }
}
