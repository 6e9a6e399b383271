//! Incremental parser for the encoder's `key=value` progress stream.
//!
//! Output arrives in arbitrary chunks. A trailing partial line is kept in a
//! carry buffer and completed by the next chunk.

use super::errors::ProgressParseError;

/// One interpreted progress line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressLine {
    /// Elapsed decoded time in seconds.
    Elapsed(f64),
    /// `progress=end`: the encoder has written its last block.
    End,
    /// Any other key.
    Other,
}

/// Interpret a single progress line (without its newline).
///
/// `out_time_us` and `out_time_ms` both carry microseconds; `out_time` is
/// `HH:MM:SS.ffffff`.
pub fn parse_progress_line(line: &str) -> Result<ProgressLine, ProgressParseError> {
    let line = line.trim();
    let (key, value) = line
        .split_once('=')
        .ok_or_else(|| ProgressParseError::MissingSeparator(line.to_string()))?;
    let (key, value) = (key.trim(), value.trim());

    let invalid = || ProgressParseError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };

    match key {
        "out_time_us" | "out_time_ms" => {
            let micros: i64 = value.parse().map_err(|_| invalid())?;
            if micros < 0 {
                return Err(invalid());
            }
            Ok(ProgressLine::Elapsed(micros as f64 / 1_000_000.0))
        }
        "out_time" => parse_timestamp(value)
            .map(ProgressLine::Elapsed)
            .ok_or_else(invalid),
        "progress" if value == "end" => Ok(ProgressLine::End),
        _ => Ok(ProgressLine::Other),
    }
}

/// Parse `HH:MM:SS(.fraction)` into seconds.
fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let whole = hours.checked_mul(3600)?.checked_add(minutes.checked_mul(60)?)?;
    Some(whole as f64 + seconds)
}

/// Turns raw encoder stdout into a bounded, non-decreasing fraction stream.
#[derive(Debug)]
pub struct ProgressParser {
    carry: Vec<u8>,
    total_duration: Option<f64>,
    last: f64,
    saw_end: bool,
    skipped: usize,
}

impl ProgressParser {
    /// Create a parser. Without a usable total duration no fractions are emitted.
    pub fn new(total_duration: Option<f64>) -> Self {
        Self {
            carry: Vec::new(),
            total_duration: total_duration.filter(|d| d.is_finite() && *d > 0.0),
            last: 0.0,
            saw_end: false,
            skipped: 0,
        }
    }

    /// Feed a chunk of output. Returns newly reached fractions, strictly increasing.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<f64> {
        self.carry.extend_from_slice(chunk);

        let mut emitted = Vec::new();
        while let Some(pos) = self.carry.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.carry.drain(..=pos).collect();
            self.handle_line(&line[..pos], &mut emitted);
        }
        emitted
    }

    /// Flush a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Vec<f64> {
        let mut emitted = Vec::new();
        if !self.carry.is_empty() {
            let line = std::mem::take(&mut self.carry);
            self.handle_line(&line, &mut emitted);
        }
        emitted
    }

    /// Highest fraction emitted so far.
    pub fn last(&self) -> f64 {
        self.last
    }

    /// Whether `progress=end` was seen.
    pub fn saw_end(&self) -> bool {
        self.saw_end
    }

    /// Number of lines skipped as malformed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> &[u8] {
        &self.carry
    }

    fn handle_line(&mut self, raw: &[u8], emitted: &mut Vec<f64>) {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        match parse_progress_line(text) {
            Ok(ProgressLine::Elapsed(secs)) => {
                let Some(total) = self.total_duration else {
                    return;
                };
                let fraction = (secs / total).clamp(0.0, 1.0);
                if fraction > self.last {
                    self.last = fraction;
                    emitted.push(fraction);
                }
            }
            Ok(ProgressLine::End) => self.saw_end = true,
            Ok(ProgressLine::Other) => {}
            Err(e) => {
                self.skipped += 1;
                tracing::trace!("Skipping progress line: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_elapsed_keys() {
        assert_eq!(
            parse_progress_line("out_time_ms=1500000").unwrap(),
            ProgressLine::Elapsed(1.5)
        );
        assert_eq!(
            parse_progress_line("out_time_us=250000").unwrap(),
            ProgressLine::Elapsed(0.25)
        );
        assert_eq!(
            parse_progress_line("out_time=00:01:02.500000").unwrap(),
            ProgressLine::Elapsed(62.5)
        );
        assert_eq!(parse_progress_line("progress=end").unwrap(), ProgressLine::End);
        assert_eq!(
            parse_progress_line("progress=continue").unwrap(),
            ProgressLine::Other
        );
        assert_eq!(parse_progress_line("speed=41.3x").unwrap(), ProgressLine::Other);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(
            parse_progress_line("garbage"),
            Err(ProgressParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            parse_progress_line("out_time_ms=N/A"),
            Err(ProgressParseError::InvalidValue { .. })
        ));
        assert!(parse_progress_line("out_time_us=-23220").is_err());
        assert!(parse_progress_line("out_time=-00:00:00.023220").is_err());
    }

    #[test]
    fn oversized_timestamp_is_skipped() {
        assert!(matches!(
            parse_progress_line("out_time=9999999999999999999:00:00.0"),
            Err(ProgressParseError::InvalidValue { .. })
        ));
        assert!(parse_progress_line("out_time=0:9999999999999999999:00").is_err());

        let mut parser = ProgressParser::new(Some(10.0));
        let fractions = parser.feed(b"out_time=9999999999999999999:00:00.0\nout_time_ms=5000000\n");
        assert_eq!(fractions, vec![0.5]);
        assert_eq!(parser.skipped(), 1);
    }

    #[test]
    fn partial_line_is_carried_to_next_chunk() {
        let mut parser = ProgressParser::new(Some(10.0));

        assert!(parser.feed(b"frame=1\nout_time_ms=25").is_empty());
        assert_eq!(parser.pending(), b"out_time_ms=25");

        let emitted = parser.feed(b"00000\nprogress=continue\n");
        assert_eq!(emitted, vec![0.25]);
        assert!(parser.pending().is_empty());
    }

    #[test]
    fn fractions_never_decrease_and_stay_bounded() {
        let mut parser = ProgressParser::new(Some(4.0));
        let stream = b"out_time_ms=1000000\n\
            out_time_ms=3000000\n\
            out_time_ms=2000000\n\
            out_time_ms=3000000\n\
            out_time_ms=9000000\n\
            out_time_ms=12000000\n";

        let emitted = parser.feed(stream);
        assert_eq!(emitted, vec![0.25, 0.75, 1.0]);
        assert!(emitted.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(parser.last(), 1.0);
    }

    #[test]
    fn byte_at_a_time_matches_whole_chunk() {
        let stream = b"out_time_us=500000\nbitrate=N/A\nout_time_us=1000000\nprogress=end\n";

        let mut whole = ProgressParser::new(Some(2.0));
        let expected = whole.feed(stream);

        let mut split = ProgressParser::new(Some(2.0));
        let mut got = Vec::new();
        for byte in stream.iter() {
            got.extend(split.feed(std::slice::from_ref(byte)));
        }

        assert_eq!(got, expected);
        assert_eq!(got, vec![0.25, 0.5]);
        assert!(split.saw_end());
    }

    #[test]
    fn unknown_duration_emits_nothing() {
        let mut parser = ProgressParser::new(None);
        assert!(parser.feed(b"out_time_ms=5000000\n").is_empty());

        let mut zero = ProgressParser::new(Some(0.0));
        assert!(zero.feed(b"out_time_ms=5000000\n").is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let mut parser = ProgressParser::new(Some(1.0));
        let emitted = parser.feed(b"???\nout_time_ms=N/A\nout_time_ms=500000\n");
        assert_eq!(emitted, vec![0.5]);
        assert_eq!(parser.skipped(), 2);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut parser = ProgressParser::new(Some(1.0));
        assert!(parser.feed(b"out_time_ms=800000").is_empty());
        assert_eq!(parser.finish(), vec![0.8]);
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut parser = ProgressParser::new(Some(2.0));
        assert_eq!(parser.feed(b"out_time_ms=1000000\r\n"), vec![0.5]);
    }
}
