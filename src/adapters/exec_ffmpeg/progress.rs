//! Parsing of ffmpeg's `-progress` and log output

use std::sync::LazyLock;

use regex::Regex;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Duration: (\d+):(\d+):([\d.]+)").expect("invalid duration regex"));
static OUT_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^out_time_(?:ms|us)=(\d+)").expect("invalid out_time regex"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressLine {
    /// Input duration announced in the log, seconds
    Duration(f64),
    /// Output position reached, seconds
    OutTime(f64),
    /// `progress=end`
    End,
    Other,
}

pub fn parse_line(line: &str) -> ProgressLine {
    let line = line.trim();
    if line == "progress=end" {
        return ProgressLine::End;
    }
    // Both keys carry microseconds
    if let Some(caps) = OUT_TIME_RE.captures(line) {
        let micros: u64 = caps[1].parse().unwrap_or(0);
        return ProgressLine::OutTime(micros as f64 / 1_000_000.0);
    }
    if let Some(caps) = DURATION_RE.captures(line) {
        let hours: f64 = caps[1].parse().unwrap_or(0.0);
        let minutes: f64 = caps[2].parse().unwrap_or(0.0);
        let seconds: f64 = caps[3].parse().unwrap_or(0.0);
        return ProgressLine::Duration(hours * 3600.0 + minutes * 60.0 + seconds);
    }
    ProgressLine::Other
}

/// Position as a percentage of `total`, held at 99 until the run ends.
pub fn percent(position: f64, total: f64) -> Option<u8> {
    if total <= 0.0 || !position.is_finite() {
        return None;
    }
    Some(((position / total) * 100.0).clamp(0.0, 99.0) as u8)
}

/// Last meaningful stderr lines, used as the failure text.
pub fn error_summary(stderr_tail: &[String], exit_code: Option<i32>) -> String {
    let lines: Vec<&str> = stderr_tail
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with("Duration:") && !l.starts_with("Stream #"))
        .collect();
    let start = lines.len().saturating_sub(3);
    match (lines[start..].join(" | "), exit_code) {
        (text, _) if !text.is_empty() => text,
        (_, Some(code)) => format!("ffmpeg exited with code {}", code),
        (_, None) => "ffmpeg was stopped by a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_parsed() {
        assert_eq!(parse_line("  Duration: 00:01:30.50, start: 0.000000"), ProgressLine::Duration(90.5));
    }

    #[test]
    fn out_time_in_microseconds() {
        assert_eq!(parse_line("out_time_ms=5000000"), ProgressLine::OutTime(5.0));
        assert_eq!(parse_line("out_time_us=2500000"), ProgressLine::OutTime(2.5));
    }

    #[test]
    fn end_marker_and_noise() {
        assert_eq!(parse_line("progress=end"), ProgressLine::End);
        assert_eq!(parse_line("bitrate=128.0kbits/s"), ProgressLine::Other);
    }

    #[test]
    fn percent_held_below_hundred() {
        assert_eq!(percent(5.0, 10.0), Some(50));
        assert_eq!(percent(12.0, 10.0), Some(99));
        assert_eq!(percent(1.0, 0.0), None);
    }

    #[test]
    fn summary_prefers_stderr_text() {
        let tail = vec![
            "Stream #0:0: Video: h264".to_string(),
            "Unknown encoder 'libfoo'".to_string(),
        ];
        assert_eq!(error_summary(&tail, Some(1)), "Unknown encoder 'libfoo'");
        assert_eq!(error_summary(&[], Some(1)), "ffmpeg exited with code 1");
        assert_eq!(error_summary(&[], None), "ffmpeg was stopped by a signal");
    }
}
