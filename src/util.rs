// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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

/// Outputs a length in seconds in a minutes:seconds.tenths format.
pub fn seconds_display(seconds: f64) -> String {
    let tenths = (seconds.max(0.0) * 10.0).round() as u64;
    let minutes = tenths / 600;
    let remainder = tenths % 600;
    format!("{}:{:02}.{}", minutes, remainder / 10, remainder % 10)
}

/// Outputs a beat position with at most two decimals and no trailing zeros.
pub fn beats_display(beats: f64) -> String {
    let formatted = format!("{:.2}", beats);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
