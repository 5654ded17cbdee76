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
use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Priority for the render thread when COMPOSER_THREAD_PRIORITY is unset.
const DEFAULT_RENDER_THREAD_PRIORITY: u8 = 70;

/// Reads COMPOSER_THREAD_PRIORITY (0-99). Called once per device, never from the render loop.
pub fn render_thread_priority() -> ThreadPriority {
    let value = std::env::var("COMPOSER_THREAD_PRIORITY")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .filter(|n| *n < 100)
        .unwrap_or(DEFAULT_RENDER_THREAD_PRIORITY);
    match ThreadPriorityValue::try_from(value) {
        Ok(value) => ThreadPriority::Crossplatform(value),
        Err(_) => ThreadPriority::Max,
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Whether to try SCHED_FIFO for the render thread. Opt out with COMPOSER_DISABLE_RT_AUDIO=1.
pub fn rt_audio_enabled() -> bool {
    !env_flag("COMPOSER_DISABLE_RT_AUDIO")
}

/// Raises the priority of the calling thread. Failures are logged and otherwise ignored.
pub fn configure_render_thread(tp: ThreadPriority, rt_audio: bool) {
    if let Err(e) = set_current_thread_priority(tp) {
        warn!(error = ?e, "Unable to raise render thread priority");
    }

    #[cfg(unix)]
    if rt_audio {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        match set_thread_priority_and_policy(
            thread_native_id(),
            tp,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => info!("Enabled RT SCHED_FIFO for render thread"),
            Err(e) => warn!(error = %e, "Failed to set RT SCHED_FIFO for render thread"),
        }
    }

    #[cfg(not(unix))]
    let _ = rt_audio;
}
