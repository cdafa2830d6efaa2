//! Time parsing utilities

use crate::domain::errors::*;

/// Parser for whole-second positions
pub struct TimeParser;

impl TimeParser {
    /// Parse `SS`, `MM:SS` or `HH:MM:SS` into seconds.
    ///
    /// Minutes and seconds after the first field must be below 60.
    pub fn parse_seconds(time_str: &str) -> DomainResult<u32> {
        let time_str = time_str.trim();
        let invalid = || {
            DomainError::InvalidTimeRange(format!(
                "'{}' is not a time; use SS, MM:SS or HH:MM:SS",
                time_str
            ))
        };

        let parts: Vec<&str> = time_str.split(':').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid());
        }

        let mut fields = Vec::with_capacity(parts.len());
        for part in &parts {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            let value: u32 = part.parse().map_err(|_| invalid())?;
            fields.push(value);
        }

        if fields.iter().skip(1).any(|&v| v >= 60) {
            return Err(invalid());
        }

        fields
            .iter()
            .try_fold(0u32, |acc, &v| acc.checked_mul(60)?.checked_add(v))
            .ok_or_else(invalid)
    }
}
