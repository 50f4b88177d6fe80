/// Every buffer is interleaved 16-bit stereo at this rate, so tracks from
/// different sources can be appended without conversion.
pub const SAMPLE_RATE: u32 = 44_100;
pub const CHANNELS: u8 = 2;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<i16>,
}

impl AudioBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes interleaved stereo samples; a dangling half frame is dropped.
    pub fn from_interleaved(mut samples: Vec<i16>) -> Self {
        let channels = CHANNELS as usize;
        let whole = samples.len() - samples.len() % channels;
        samples.truncate(whole);
        Self { samples }
    }

    pub fn silent(duration_ms: u32) -> Self {
        let mut buffer = Self::new();
        buffer.append_silence(duration_ms);
        buffer
    }

    pub fn append(&mut self, other: &AudioBuffer) {
        self.samples.extend_from_slice(&other.samples);
    }

    pub fn append_silence(&mut self, duration_ms: u32) {
        let frames = u64::from(SAMPLE_RATE) * u64::from(duration_ms) / 1000;
        let len = self.samples.len() + frames as usize * CHANNELS as usize;
        self.samples.resize(len, 0);
    }

    pub fn frames(&self) -> u64 {
        (self.samples.len() / CHANNELS as usize) as u64
    }

    pub fn duration_ms(&self) -> u64 {
        self.frames() * 1000 / u64::from(SAMPLE_RATE)
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
