use thiserror::Error;

/// Errors surfaced to the host. The audio path itself never fails; these
/// only arise while constructing an engine, decoding host input, or
/// queueing a command.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("sample rate {0} Hz is outside 8000..=384000")]
    InvalidSampleRate(f64),
    #[error("block size {0} is outside 1..=8192")]
    InvalidBlockSize(usize),
    #[error("command queue capacity must be non-zero")]
    InvalidCommandCapacity,
    #[error("refresh interval {0} is outside 1..=64")]
    InvalidRefreshInterval(usize),
    #[error("command queue is full, command dropped")]
    QueueFull,
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_bad_value() {
        assert_eq!(
            EngineError::InvalidSampleRate(100.0).to_string(),
            "sample rate 100 Hz is outside 8000..=384000"
        );
        assert_eq!(
            EngineError::InvalidBlockSize(0).to_string(),
            "block size 0 is outside 1..=8192"
        );
    }

    #[test]
    fn json_errors_convert() {
        let err: EngineError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, EngineError::Config(_)));
        assert!(err.to_string().starts_with("config error:"));
    }
}
