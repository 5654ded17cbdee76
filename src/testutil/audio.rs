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

use hound::{SampleFormat, WavSpec, WavWriter};

/// Encodes 16 bit PCM channels into an in-memory WAV file. Channels are interleaved frame by
/// frame and must all have the same length.
pub fn wav_bytes(channels: Vec<Vec<i16>>, sample_rate: u32) -> Vec<u8> {
    let num_channels = channels.len();
    assert!(num_channels > 0, "At least one channel is required");
    let frames = channels[0].len();
    assert!(
        channels.iter().all(|channel| channel.len() == frames),
        "Channels must be the same length"
    );

    let mut bytes = Vec::new();
    {
        let mut writer = WavWriter::new(
            Cursor::new(&mut bytes),
            WavSpec {
                channels: num_channels as u16,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            },
        )
        .expect("wav writer");

        for frame in 0..frames {
            for channel in &channels {
                writer.write_sample(channel[frame]).expect("write sample");
            }
        }
        writer.finalize().expect("finalize wav");
    }
    bytes
}
