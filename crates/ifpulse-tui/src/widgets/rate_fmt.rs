//! Human-readable rate and utilization formatting helpers.

/// Format a bits/sec rate as "1.2 Gbps" / "845.0 Kbps" / "120 bps".
pub fn fmt_bps(bps: f64) -> String {
    if bps >= 1e9 {
        format!("{:.1} Gbps", bps / 1e9)
    } else if bps >= 1e6 {
        format!("{:.1} Mbps", bps / 1e6)
    } else if bps >= 1e3 {
        format!("{:.1} Kbps", bps / 1e3)
    } else {
        format!("{bps:.0} bps")
    }
}

/// Compact rate for sparkline panel titles: "1.2G", "50M", "500K".
pub fn fmt_bps_short(bps: f64) -> String {
    if bps >= 1e9 {
        format!("{:.1}G", bps / 1e9)
    } else if bps >= 1e6 {
        format!("{:.0}M", bps / 1e6)
    } else if bps >= 1e3 {
        format!("{:.0}K", bps / 1e3)
    } else {
        format!("{bps:.0}")
    }
}

/// Render a utilization percentage bar of `width` character cells.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn fmt_util_bar(pct: f64, width: u16) -> String {
    let clamped = pct.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * f64::from(width)).round() as u16;
    let empty = width.saturating_sub(filled);
    format!(
        "{}{}",
        "█".repeat(usize::from(filled)),
        "░".repeat(usize::from(empty))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_scales_through_units() {
        assert_eq!(fmt_bps(120.0), "120 bps");
        assert_eq!(fmt_bps(845_000.0), "845.0 Kbps");
        assert_eq!(fmt_bps(2_400_000.0), "2.4 Mbps");
        assert_eq!(fmt_bps(1_200_000_000.0), "1.2 Gbps");
    }

    #[test]
    fn short_rate_is_compact() {
        assert_eq!(fmt_bps_short(0.0), "0");
        assert_eq!(fmt_bps_short(50_000_000.0), "50M");
        assert_eq!(fmt_bps_short(1_200_000_000.0), "1.2G");
    }

    #[test]
    fn util_bar_spans_width() {
        let bar = fmt_util_bar(50.0, 10);
        assert_eq!(bar.chars().count(), 10);
        assert_eq!(bar.chars().filter(|c| *c == '█').count(), 5);

        // Out-of-range input clamps instead of overflowing the cell.
        assert_eq!(fmt_util_bar(250.0, 4).chars().filter(|c| *c == '█').count(), 4);
        assert_eq!(fmt_util_bar(-5.0, 4), "░░░░");
    }
}
