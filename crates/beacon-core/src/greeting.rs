//! The greeting every connection starts with.
//!
//! A freshly accepted connection has no message of its own yet, so the
//! server seeds its registry entry with a templated line telling the
//! client how often to expect pushes and how to replace them.

use std::time::Duration;

/// Build the initial outbound message for a connection.
#[must_use]
pub fn for_interval(interval: Duration) -> String {
    format!(
        "hello! i'll keep sending a message once every {} seconds. \
         update it by sending a new message to the server",
        format_seconds(interval)
    )
}

/// Render an interval as seconds with at most two decimal places.
///
/// Trailing zeros and a bare trailing dot are trimmed, so 1000ms renders
/// as "1", 1500ms as "1.5", and 1250ms as "1.25".
#[must_use]
pub fn format_seconds(interval: Duration) -> String {
    let rendered = format!("{:.2}", interval.as_secs_f64());
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_whole_seconds_drop_decimals() {
        assert_eq!(format_seconds(Duration::from_millis(1000)), "1");
        assert_eq!(format_seconds(Duration::from_millis(30_000)), "30");
        assert_eq!(format_seconds(Duration::from_millis(120_000)), "120");
    }

    #[test]
    fn test_greeting_fractional_seconds_keep_digits() {
        assert_eq!(format_seconds(Duration::from_millis(1500)), "1.5");
        assert_eq!(format_seconds(Duration::from_millis(1250)), "1.25");
        assert_eq!(format_seconds(Duration::from_millis(100)), "0.1");
        assert_eq!(format_seconds(Duration::from_millis(50)), "0.05");
    }

    #[test]
    fn test_greeting_sub_centisecond_rounds_to_zero() {
        assert_eq!(format_seconds(Duration::from_millis(1)), "0");
    }

    #[test]
    fn test_greeting_template() {
        assert_eq!(
            for_interval(Duration::from_millis(1000)),
            "hello! i'll keep sending a message once every 1 seconds. \
             update it by sending a new message to the server"
        );
    }

    #[test]
    fn test_greeting_embeds_fractional_interval() {
        assert!(for_interval(Duration::from_millis(250)).contains("once every 0.25 seconds"));
    }
}
