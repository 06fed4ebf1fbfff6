//! Presentation helpers shared by the TUI and text modes.
//!
//! Everything here is a pure function of the published state.

use crate::model::{Phase, RunState, TestResult};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Upper end of the gauge scale.
pub const GAUGE_MAX_MBPS: f64 = 100.0;
/// Sweep of the gauge arc.
pub const GAUGE_SWEEP_DEG: f64 = 180.0;

pub fn phase_text(run: &RunState) -> String {
    let text = match run.phase {
        Phase::Idle => "Ready to test",
        Phase::Ping => "Testing ping...",
        Phase::Download => "Testing download speed...",
        Phase::Upload => "Testing upload speed...",
        Phase::Complete => "Test complete!",
    };
    if run.paused {
        format!("{text} (paused)")
    } else {
        text.to_string()
    }
}

/// Needle angle in degrees, 0 at the left end of the arc and 180 at the right.
pub fn gauge_angle(speed_mbps: f64) -> f64 {
    if !speed_mbps.is_finite() || speed_mbps <= 0.0 {
        return 0.0;
    }
    (speed_mbps / GAUGE_MAX_MBPS * GAUGE_SWEEP_DEG).min(GAUGE_SWEEP_DEG)
}

/// Point on an upper half circle of `radius` centred on the origin, for a
/// gauge angle as returned by [`gauge_angle`].
pub fn arc_point(angle_deg: f64, radius: f64) -> (f64, f64) {
    let theta = (GAUGE_SWEEP_DEG - angle_deg).to_radians();
    (radius * theta.cos(), radius * theta.sin())
}

pub fn share_text(r: &TestResult) -> String {
    format!(
        "My internet speed: {} Mbps down, {} Mbps up, {}ms ping",
        r.download, r.upload, r.ping
    )
}

/// Render an RFC 3339 timestamp in local time. Unparseable input is shown as is.
pub fn format_timestamp(ts: &str) -> String {
    let Ok(t) = OffsetDateTime::parse(ts, &Rfc3339) else {
        return ts.to_string();
    };
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    format_in(t, offset).unwrap_or_else(|| ts.to_string())
}

fn format_in(t: OffsetDateTime, offset: UtcOffset) -> Option<String> {
    t.to_offset(offset)
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .ok()
}
