// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::warn;

use super::{DecodedSample, SampleError};

/// Turns an encoded audio payload into interleaved f32 frames. Runs on a blocking thread.
pub trait SampleDecoder: Send + Sync {
    fn decode(&self, bytes: Vec<u8>) -> Result<DecodedSample, SampleError>;
}

/// Decodes anything symphonia can probe.
#[derive(Clone, Debug, Default)]
pub struct SymphoniaDecoder {
    /// Extension hint for the format probe.
    extension: Option<String>,
}

impl SymphoniaDecoder {
    pub fn new() -> SymphoniaDecoder {
        SymphoniaDecoder::default()
    }

    /// Hints the probe with the asset extension.
    pub fn with_extension(mut self, extension: &str) -> SymphoniaDecoder {
        self.extension = Some(extension.trim_start_matches('.').to_string());
        self
    }
}

impl SampleDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: Vec<u8>) -> Result<DecodedSample, SampleError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = &self.extension {
            hint.with_extension(extension);
        }

        let probed = get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SampleError::Decode("no audio track found".to_string()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let mut decoder = get_codecs().make(&params, &DecoderOptions::default())?;
        let mut sample_rate = params.sample_rate;
        let mut channel_count = params.channels.map(|c| c.count() as u16);
        let mut data: Vec<f32> = Vec::new();

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!(error = e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);
            channel_count.get_or_insert(spec.channels.count() as u16);

            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            data.extend_from_slice(buffer.samples());
        }

        let sample_rate =
            sample_rate.ok_or_else(|| SampleError::Decode("sample rate not specified".to_string()))?;
        let channel_count = channel_count
            .filter(|count| *count > 0)
            .ok_or_else(|| SampleError::Decode("channel count not specified".to_string()))?;
        if data.is_empty() {
            return Err(SampleError::Empty);
        }

        Ok(DecodedSample::new(data, channel_count, sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::wav_bytes;

    #[test]
    fn test_decode_mono_wav() {
        let bytes = wav_bytes(vec![vec![16384i16; 800]], 8000);

        let sample = SymphoniaDecoder::new()
            .with_extension("wav")
            .decode(bytes)
            .expect("wav should decode");

        assert_eq!(sample.channel_count(), 1);
        assert_eq!(sample.sample_rate(), 8000);
        assert_eq!(sample.frame_count(), 800);
        assert!(sample.data().iter().all(|s| *s == 0.5));
    }

    #[test]
    fn test_decode_stereo_wav_is_interleaved() {
        let bytes = wav_bytes(vec![vec![16384i16; 100], vec![-16384i16; 100]], 22050);

        let sample = SymphoniaDecoder::new().decode(bytes).expect("wav should decode");

        assert_eq!(sample.channel_count(), 2);
        assert_eq!(sample.frame_count(), 100);
        assert_eq!(&sample.data()[..4], &[0.5, -0.5, 0.5, -0.5]);
    }

    #[test]
    fn test_decode_garbage() {
        let result = SymphoniaDecoder::new().decode(b"definitely not audio".to_vec());
        assert!(result.is_err());
    }
}
