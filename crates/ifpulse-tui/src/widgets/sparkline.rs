//! Unicode sparkline strings for table cells.
//!
//! The ratatui `Sparkline` widget draws whole panels; table rows need a
//! plain string. Invalid samples render as blanks so wraps, resets,
//! and failed cycles show up as gaps rather than fake zero traffic.

const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render the last `width` values as a sparkline string.
///
/// `None` entries (invalid samples) become spaces. Values scale
/// against the window's peak; an all-zero window renders at minimum
/// height.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::as_conversions
)]
pub fn spark_string(values: &[Option<f64>], width: usize) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }

    let window = &values[values.len().saturating_sub(width)..];
    let peak = window
        .iter()
        .flatten()
        .fold(0.0f64, |acc, v| acc.max(*v));

    window
        .iter()
        .map(|value| match value {
            None => ' ',
            Some(v) => {
                let idx = if peak > 0.0 {
                    (((v / peak) * (SPARK_CHARS.len() - 1) as f64).round() as usize)
                        .min(SPARK_CHARS.len() - 1)
                } else {
                    0
                };
                SPARK_CHARS[idx]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_against_window_peak() {
        let values: Vec<Option<f64>> = vec![Some(0.0), Some(50.0), Some(100.0)];
        let spark = spark_string(&values, 8);
        assert_eq!(spark.chars().count(), 3);
        assert_eq!(spark.chars().last(), Some('█'));
        assert_eq!(spark.chars().next(), Some('▁'));
    }

    #[test]
    fn invalid_samples_render_as_gaps() {
        let values = vec![Some(10.0), None, Some(10.0)];
        let spark = spark_string(&values, 8);
        assert_eq!(spark.chars().nth(1), Some(' '));
    }

    #[test]
    fn window_keeps_only_the_newest_values() {
        let values: Vec<Option<f64>> = (0..20).map(|i| Some(f64::from(i))).collect();
        assert_eq!(spark_string(&values, 8).chars().count(), 8);
    }

    #[test]
    fn empty_history_is_empty() {
        assert_eq!(spark_string(&[], 8), "");
    }
}
