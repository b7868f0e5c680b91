//! Opening-hours validation
//!
//! A shop may open several times a day, but two intervals of the same day
//! must not overlap, and every interval must close after it opens.

use crate::core::error::ValidationError;
use crate::core::model::OpeningHoursShop;
use std::collections::BTreeMap;

/// Validate the opening hours of one shop
///
/// Intervals are grouped by day and sorted by opening time; the first
/// adjacent pair where the next interval opens before the current one closes
/// is reported. Days are checked in ascending order so the reported conflict
/// is deterministic. Touching intervals (12:00-14:00 then 14:00-18:00) pass.
pub fn validate_opening_hours(hours: &[OpeningHoursShop]) -> Result<(), ValidationError> {
    for h in hours {
        if h.open_at >= h.close_at {
            return Err(ValidationError::InvalidInterval {
                day: h.day,
                open_at: h.open_at,
                close_at: h.close_at,
            });
        }
    }

    let mut by_day: BTreeMap<i64, Vec<&OpeningHoursShop>> = BTreeMap::new();
    for h in hours {
        by_day.entry(h.day).or_default().push(h);
    }

    for (day, mut day_hours) in by_day {
        day_hours.sort_by_key(|h| h.open_at);

        for pair in day_hours.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            if next.open_at < current.close_at {
                return Err(ValidationError::OverlappingHours {
                    day,
                    first: (current.open_at, current.close_at),
                    second: (next.open_at, next.close_at),
                });
            }
        }
    }

    Ok(())
}
