//! Progress tracking for byte streams and encoder runs

/// Ceiling reported while a stream is still being written
pub const IN_FLIGHT_CEILING: u8 = 99;

/// Percentage of `done` out of `total`, held below 100 while in flight.
///
/// Returns `None` when the total is unknown or zero, in which case progress
/// stays unreported.
pub fn in_flight_percent(done: u64, total: Option<u64>) -> Option<u8> {
    let total = total.filter(|t| *t > 0)?;
    let percent = (u128::from(done) * 100 / u128::from(total)).min(u128::from(IN_FLIGHT_CEILING));
    Some(percent as u8)
}

/// Monotonic filter over one stream's progress values.
///
/// Only strictly increasing values pass, so observers never see a
/// percentage go backwards or repeat within a stream.
#[derive(Debug, Default, Clone)]
pub struct ProgressGate {
    last: Option<u8>,
}

impl ProgressGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new stream; the next value passes regardless of the last one.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn advance(&mut self, percent: u8) -> Option<u8> {
        let percent = percent.min(100);
        match self.last {
            Some(last) if percent <= last => None,
            _ => {
                self.last = Some(percent);
                Some(percent)
            }
        }
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }
}
