mod buffer;
mod decode;
mod mp3;

pub use buffer::{AudioBuffer, CHANNELS, SAMPLE_RATE};
pub use decode::{can_decode, decode_file};
pub use mp3::{encode_mp3, Mp3Encoder};

#[derive(Debug)]
pub enum CodecError {
    Io(std::io::Error),
    Unsupported(String),
    Decode(String),
    Encode(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Io(err) => write!(f, "io error: {}", err),
            CodecError::Unsupported(message) => write!(f, "unsupported audio: {}", message),
            CodecError::Decode(message) => write!(f, "decode failed: {}", message),
            CodecError::Encode(message) => write!(f, "encode failed: {}", message),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io(err)
    }
}
