// libs/appointment-cell/src/services/slots.rs
use chrono::{NaiveTime, Timelike};

/// Enumerate candidate start times across `[open, close)` at `step_minutes`
/// increments, discarding any whose `[start, start + block_minutes)` would
/// extend past `close`. Pure function of its inputs; empty when the block is
/// longer than the window.
pub fn generate_slots(
    open: NaiveTime,
    close: NaiveTime,
    step_minutes: i64,
    block_minutes: i64,
) -> Vec<NaiveTime> {
    let mut slots = Vec::new();

    if step_minutes <= 0 || block_minutes <= 0 {
        return slots;
    }

    let open_min = (open.num_seconds_from_midnight() / 60) as i64;
    let close_min = (close.num_seconds_from_midnight() / 60) as i64;

    let mut cursor = open_min;
    while cursor + block_minutes <= close_min {
        let start = NaiveTime::from_num_seconds_from_midnight_opt((cursor * 60) as u32, 0)
            .expect("cursor stays within the day");
        slots.push(start);
        cursor += step_minutes;
    }

    slots
}

/// Add whole minutes to a wall-clock time without wrapping midnight.
/// Returns None when the result would leave the day.
pub fn add_minutes(time: NaiveTime, minutes: i64) -> Option<NaiveTime> {
    let total = (time.num_seconds_from_midnight() / 60) as i64 + minutes;
    if !(0..MINUTES_PER_DAY).contains(&total) {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt((total * 60) as u32, 0)
}

/// Round a wall-clock time to the nearest multiple of `step_minutes`,
/// clamped to the same day. Used to quantize pointer-derived times.
pub fn snap_to_step(time: NaiveTime, step_minutes: i64) -> NaiveTime {
    if step_minutes <= 0 {
        return time;
    }
    let minutes = (time.num_seconds_from_midnight() / 60) as i64;
    let mut snapped = (minutes + step_minutes / 2) / step_minutes * step_minutes;
    if snapped >= MINUTES_PER_DAY {
        snapped = MINUTES_PER_DAY - step_minutes;
    }
    NaiveTime::from_num_seconds_from_midnight_opt((snapped * 60) as u32, 0)
        .expect("snapped time stays within the day")
}

const MINUTES_PER_DAY: i64 = 24 * 60;
