use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::buffer::{AudioBuffer, SAMPLE_RATE};
use crate::CodecError;

struct OpenTrack {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
}

/// Opens the container and builds a decoder for its default track.
fn open_track(path: &Path) -> Result<OpenTrack, CodecError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        hint.with_extension(ext);
    }
    let opened = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|err| CodecError::Unsupported(err.to_string()))?;
    let format = opened.format;
    let track = format
        .default_track()
        .ok_or_else(|| CodecError::Unsupported("no default audio track".to_string()))?;
    let track_id = track.id;
    let decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| CodecError::Unsupported(err.to_string()))?;
    Ok(OpenTrack {
        format,
        decoder,
        track_id,
    })
}

/// True when `decode_file` has a demuxer and codec for `path`. Reads only
/// the container headers.
pub fn can_decode(path: &Path) -> bool {
    open_track(path).is_ok()
}

/// Decodes the default track of `path` into a canonical stereo buffer.
/// Corrupt packets are skipped; a file that yields no audio at all is an error.
pub fn decode_file(path: &Path) -> Result<AudioBuffer, CodecError> {
    let OpenTrack {
        mut format,
        mut decoder,
        track_id,
    } = open_track(path)?;

    let mut resampler: Option<StereoResampler> = None;
    let mut samples: Vec<i16> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => {
                return Err(CodecError::Decode("decoder reset required".to_string()));
            }
            Err(err) => return Err(CodecError::Decode(err.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(err) => return Err(CodecError::Decode(err.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        if channels == 0 {
            return Err(CodecError::Unsupported("no audio channels".to_string()));
        }
        let mut sample_buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let stereo = to_stereo(sample_buf.samples(), channels);

        if spec.rate == SAMPLE_RATE {
            samples.extend_from_slice(&stereo);
        } else {
            let resampler =
                resampler.get_or_insert_with(|| StereoResampler::new(spec.rate, SAMPLE_RATE));
            samples.extend(resampler.process(&stereo));
        }
    }

    if samples.is_empty() {
        return Err(CodecError::Decode("no audio decoded".to_string()));
    }
    Ok(AudioBuffer::from_interleaved(samples))
}

/// Mono is duplicated to both sides; anything wider keeps its front pair.
fn to_stereo(samples: &[i16], channels: usize) -> Vec<i16> {
    match channels {
        2 => samples.to_vec(),
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        _ => samples
            .chunks_exact(channels)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

/// Linear interpolation between neighbouring stereo frames. The last frame
/// of each chunk is carried into the next so chunk edges interpolate too.
struct StereoResampler {
    step: f64,
    /// Position of the next output frame, relative to `last`.
    phase: f64,
    last: Option<[i16; 2]>,
}

impl StereoResampler {
    fn new(input_rate: u32, output_rate: u32) -> Self {
        Self {
            step: f64::from(input_rate) / f64::from(output_rate),
            phase: 0.0,
            last: None,
        }
    }

    fn process(&mut self, input: &[i16]) -> Vec<i16> {
        let mut frames: Vec<[i16; 2]> = Vec::with_capacity(input.len() / 2 + 1);
        frames.extend(self.last);
        frames.extend(input.chunks_exact(2).map(|pair| [pair[0], pair[1]]));
        if frames.len() < 2 {
            self.last = frames.last().copied();
            return Vec::new();
        }

        let span = (frames.len() - 1) as f64;
        let mut out = Vec::with_capacity((span / self.step) as usize * 2 + 2);
        while self.phase < span {
            let index = self.phase as usize;
            let frac = self.phase - index as f64;
            let (a, b) = (frames[index], frames[index + 1]);
            for side in 0..2 {
                let value = f64::from(a[side]) + (f64::from(b[side]) - f64::from(a[side])) * frac;
                out.push(value.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16);
            }
            self.phase += self.step;
        }
        self.phase -= span;
        self.last = frames.last().copied();
        out
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{can_decode, decode_file, to_stereo, StereoResampler};
    use crate::CodecError;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: u32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for _ in 0..channels {
                writer.write_sample((i % 64) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_native_rate_wav_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("01.wav");
        write_wav(&path, 2, 44_100, 44_100);
        let buffer = decode_file(&path).unwrap();
        assert_eq!(buffer.frames(), 44_100);
        assert_eq!(buffer.duration_ms(), 1000);
        assert_eq!(&buffer.samples()[..6], &[0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn mono_low_rate_is_converted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 1, 22_050, 22_050);
        let buffer = decode_file(&path).unwrap();
        let frames = buffer.frames() as i64;
        assert!((frames - 44_100).abs() < 16, "frames = {}", frames);
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"RIFF but not really").unwrap();
        assert!(decode_file(&path).is_err());
        assert!(matches!(
            decode_file(&dir.path().join("missing.wav")),
            Err(CodecError::Io(_))
        ));
    }

    #[test]
    fn stereo_mapping() {
        assert_eq!(to_stereo(&[1, 2], 1), vec![1, 1, 2, 2]);
        assert_eq!(to_stereo(&[1, 2, 3, 4, 5, 6], 3), vec![1, 2, 4, 5]);
    }

    #[test]
    fn resampler_doubles_frame_count() {
        let mut resampler = StereoResampler::new(22_050, 44_100);
        let input: Vec<i16> = (0..200).map(|v| v as i16).collect();
        let out = resampler.process(&input);
        assert!(out.len() >= 2 * input.len() - 8);
    }

    #[test]
    fn resampler_interpolates_across_chunks() {
        let mut resampler = StereoResampler::new(22_050, 44_100);
        let mut out = resampler.process(&[0, 0]);
        assert!(out.is_empty());
        out.extend(resampler.process(&[100, -100]));
        out.extend(resampler.process(&[200, -200]));
        assert_eq!(out, vec![0, 0, 50, -50, 100, -100, 150, -150]);
    }

    #[test]
    fn can_decode_matches_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("01.wav");
        write_wav(&good, 2, 44_100, 1000);
        assert!(can_decode(&good));

        let bad = dir.path().join("02.wav");
        std::fs::write(&bad, b"RIFF but not really").unwrap();
        assert!(!can_decode(&bad));
        assert!(!can_decode(&dir.path().join("missing.flac")));
    }
}
