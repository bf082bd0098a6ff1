use chrono::{Duration, NaiveTime};

use crate::models::ScheduleError;

/// Upper bound on slots a single day's rule may imply. A rule that exceeds
/// it is a misconfiguration and is rejected when the schedule is saved,
/// rather than being silently truncated here.
pub const MAX_SLOTS_PER_DAY: usize = 100;

/// Generate the ordered slot start times for one day's rule: `start`,
/// `start + interval`, ... strictly less than `end`. An inverted or empty
/// range yields no slots; a zero interval or a rule implying more than
/// [`MAX_SLOTS_PER_DAY`] slots is an error.
pub fn generate_slots(
    start: NaiveTime,
    end: NaiveTime,
    interval_minutes: u32,
) -> Result<Vec<NaiveTime>, ScheduleError> {
    if interval_minutes == 0 {
        return Err(ScheduleError::Validation(
            "slot interval must be greater than zero".to_string(),
        ));
    }
    if start >= end {
        return Ok(vec![]);
    }

    let span_minutes = (end - start).num_minutes() as u64;
    let interval = interval_minutes as u64;
    let count = (span_minutes + interval - 1) / interval;

    if count as usize > MAX_SLOTS_PER_DAY {
        return Err(ScheduleError::Validation(format!(
            "rule implies {} slots, maximum is {}",
            count, MAX_SLOTS_PER_DAY
        )));
    }

    Ok((0..count)
        .map(|i| start + Duration::minutes((i * interval) as i64))
        .collect())
}

/// Slot rendering used everywhere a time leaves the engine: zero-padded
/// 24-hour `HH:MM`, matching the stored `time` field exactly.
pub fn format_slot(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn generates_strictly_increasing_slots_below_end() {
        let slots = generate_slots(t(8, 0), t(8, 50), 20).unwrap();
        let rendered: Vec<String> = slots.into_iter().map(format_slot).collect();
        assert_eq!(rendered, vec!["08:00", "08:20", "08:40"]);
    }

    #[test]
    fn excludes_slot_landing_exactly_on_end() {
        let slots = generate_slots(t(8, 0), t(9, 0), 20).unwrap();
        let rendered: Vec<String> = slots.into_iter().map(format_slot).collect();
        assert_eq!(rendered, vec!["08:00", "08:20", "08:40"]);
    }

    #[test]
    fn full_office_day_shape() {
        let slots = generate_slots(t(14, 0), t(18, 0), 20).unwrap();
        assert_eq!(slots.len(), 12);
        assert_eq!(format_slot(slots[0]), "14:00");
        assert_eq!(format_slot(*slots.last().unwrap()), "17:40");
        assert!(slots.windows(2).all(|w| (w[1] - w[0]).num_minutes() == 20));
    }

    #[test]
    fn inverted_or_empty_range_yields_no_slots() {
        assert!(generate_slots(t(17, 0), t(8, 0), 20).unwrap().is_empty());
        assert!(generate_slots(t(8, 0), t(8, 0), 20).unwrap().is_empty());
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert_matches!(
            generate_slots(t(8, 0), t(17, 0), 0),
            Err(ScheduleError::Validation(_))
        );
    }

    #[test]
    fn rule_beyond_slot_cap_is_rejected() {
        // 08:00 to 17:00 at one-minute granularity implies 540 slots.
        assert_matches!(
            generate_slots(t(8, 0), t(17, 0), 1),
            Err(ScheduleError::Validation(_))
        );
    }
}
