//! Human-readable elapsed time formatting
//!
//! Used for the "finished" message every import publishes on completion.

use std::time::Duration;

/// Format selection thresholds (seconds)
const SHORT_FORMAT_MAX: u64 = 100; // < 100s → X.XXs
const MEDIUM_FORMAT_MAX: u64 = 6000; // < 100m → M:SS.Xs
                                     // >= 100m → H:MM:SS

/// Format an elapsed wall-clock duration.
///
/// Format is picked from the magnitude of the duration itself:
/// - Short (`X.XXs`): under 100 seconds
/// - Medium (`M:SS.Xs`): 100 seconds to 100 minutes
/// - Long (`H:MM:SS`): 100 minutes and up
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use medley_common::human_time::format_elapsed;
///
/// assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_elapsed(Duration::from_secs(330)), "5:30.0s");
/// assert_eq!(format_elapsed(Duration::from_secs(7200)), "2:00:00");
/// ```
pub fn format_elapsed(elapsed: Duration) -> String {
    let whole_seconds = elapsed.as_secs();

    if whole_seconds < SHORT_FORMAT_MAX {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else if whole_seconds < MEDIUM_FORMAT_MAX {
        // Round once to tenths so a carry reaches the minutes
        let tenths = (elapsed.as_millis() + 50) / 100;
        let minutes = tenths / 600;
        let rest = tenths % 600;
        format!("{}:{:02}.{}s", minutes, rest / 10, rest % 10)
    } else {
        let hours = whole_seconds / 3600;
        let mins = (whole_seconds % 3600) / 60;
        let secs = whole_seconds % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}

/// Format elapsed time as the message text of a finished import.
pub fn finished_message(elapsed: Duration, cancelled: bool) -> String {
    if cancelled {
        format!("Import cancelled after {}", format_elapsed(elapsed))
    } else {
        format!("Import finished in {}", format_elapsed(elapsed))
    }
}
