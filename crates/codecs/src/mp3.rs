use mp3lame_encoder::{
    max_required_buffer_size, Bitrate as LameBitrate, Builder, Encoder, FlushNoGap,
    InterleavedPcm, Quality,
};

use crate::buffer::{AudioBuffer, CHANNELS, SAMPLE_RATE};
use crate::CodecError;

/// Frames handed to LAME per call; keeps the scratch output bounded.
const CHUNK_FRAMES: usize = 1152 * 32;
const FLUSH_RESERVE: usize = 7200;

pub struct Mp3Encoder {
    inner: Encoder,
    out: Vec<u8>,
}

impl Mp3Encoder {
    pub fn new(bitrate_kbps: u32) -> Result<Self, CodecError> {
        let mut builder = Builder::new()
            .ok_or_else(|| CodecError::Encode("mp3 encoder unavailable".to_string()))?;
        builder
            .set_num_channels(CHANNELS)
            .map_err(|err| CodecError::Encode(format!("channels: {:?}", err)))?;
        builder
            .set_sample_rate(SAMPLE_RATE)
            .map_err(|err| CodecError::Encode(format!("sample rate: {:?}", err)))?;
        builder
            .set_brate(lame_bitrate(bitrate_kbps)?)
            .map_err(|err| CodecError::Encode(format!("bitrate: {:?}", err)))?;
        builder
            .set_quality(Quality::Good)
            .map_err(|err| CodecError::Encode(format!("quality: {:?}", err)))?;
        let inner = builder
            .build()
            .map_err(|err| CodecError::Encode(format!("init: {:?}", err)))?;
        Ok(Self {
            inner,
            out: Vec::new(),
        })
    }

    /// Encodes interleaved stereo samples, appending to the internal output.
    pub fn encode(&mut self, samples: &[i16]) -> Result<(), CodecError> {
        let chunk_len = CHUNK_FRAMES * CHANNELS as usize;
        for chunk in samples.chunks(chunk_len) {
            let frames = chunk.len() / CHANNELS as usize;
            self.out.reserve(max_required_buffer_size(frames));
            self.inner
                .encode_to_vec(InterleavedPcm(chunk), &mut self.out)
                .map_err(|err| CodecError::Encode(format!("{:?}", err)))?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<Vec<u8>, CodecError> {
        self.out.reserve(FLUSH_RESERVE);
        self.inner
            .flush_to_vec::<FlushNoGap>(&mut self.out)
            .map_err(|err| CodecError::Encode(format!("flush: {:?}", err)))?;
        Ok(self.out)
    }
}

pub fn encode_mp3(buffer: &AudioBuffer, bitrate_kbps: u32) -> Result<Vec<u8>, CodecError> {
    let mut encoder = Mp3Encoder::new(bitrate_kbps)?;
    encoder.encode(buffer.samples())?;
    encoder.finish()
}

fn lame_bitrate(kbps: u32) -> Result<LameBitrate, CodecError> {
    match kbps {
        128 => Ok(LameBitrate::Kbps128),
        192 => Ok(LameBitrate::Kbps192),
        256 => Ok(LameBitrate::Kbps256),
        320 => Ok(LameBitrate::Kbps320),
        _ => Err(CodecError::Encode(format!("unsupported bitrate {}k", kbps))),
    }
}
