use std::collections::HashMap;

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::{AppError, ScheduleError};
use crate::models::{AvailabilitySlot, NormalizedSlot, SlotBatch, SlotPatch, TimeOfDay, WeekDay};

/// Validates a batch payload: day and time normalization, strict
/// `start < end` per slot, then a per-day overlap pre-check within the batch
/// itself. Exact duplicates inside the batch are tolerated (they collapse at
/// reconcile time); any partial overlap fails before storage is touched.
pub fn normalize_slot_batch(batch: SlotBatch) -> Result<Vec<NormalizedSlot>, ScheduleError> {
    let inputs = batch.into_vec();

    let mut normalized = Vec::with_capacity(inputs.len());
    for input in inputs {
        let day = WeekDay::parse(&input.day)?;
        let start = TimeOfDay::parse(&input.start_time)?;
        let end = TimeOfDay::parse(&input.end_time)?;

        let slot = NormalizedSlot {
            day,
            start_minute: start.minutes(),
            end_minute: end.minutes(),
        };
        let (range_start, range_end) = slot.range();
        if range_start >= range_end {
            return Err(ScheduleError::InvalidTimeRange(day.as_str().to_string()));
        }
        normalized.push(slot);
    }

    let mut by_day: HashMap<WeekDay, Vec<(u32, u32)>> = HashMap::new();
    for slot in &normalized {
        by_day.entry(slot.day).or_default().push(slot.range());
    }

    for (day, mut ranges) in by_day {
        ranges.sort();
        ranges.dedup();
        for pair in ranges.windows(2) {
            if pair[1].0 < pair[0].1 {
                return Err(ScheduleError::OverlappingSlots(day.as_str().to_string()));
            }
        }
    }

    Ok(normalized)
}

/// Merges a normalized batch into the tutor's stored slots. A slot identical
/// to a stored one is skipped; a slot overlapping a stored (or
/// earlier-staged) one on the same day fails the whole batch. Returns how
/// many slots were actually inserted.
pub fn reconcile(
    conn: &Connection,
    tutor_id: &str,
    batch: &[NormalizedSlot],
) -> Result<usize, AppError> {
    let tx = conn.unchecked_transaction()?;

    let existing = queries::slots_for_tutor(&tx, tutor_id)?;
    let mut by_day: HashMap<String, Vec<(u32, u32)>> = HashMap::new();
    for slot in &existing {
        by_day
            .entry(slot.day_key())
            .or_default()
            .push(slot.effective_range());
    }

    let mut created = 0usize;
    for slot in batch {
        let key = slot.day.as_str().to_lowercase();
        let (start, end) = slot.range();
        let bucket = by_day.entry(key).or_default();

        if bucket.iter().any(|&(s, e)| s == start && e == end) {
            continue;
        }
        if bucket.iter().any(|&(s, e)| start < e && end > s) {
            return Err(ScheduleError::OverlappingSlots(slot.day.as_str().to_string()).into());
        }

        queries::create_slot(
            &tx,
            &AvailabilitySlot {
                id: Uuid::new_v4().to_string(),
                tutor_id: tutor_id.to_string(),
                day: slot.day.as_str().to_string(),
                start_minute: slot.start_minute,
                end_minute: slot.end_minute,
            },
        )?;
        bucket.push((start, end));
        created += 1;
    }

    tx.commit()?;
    Ok(created)
}

/// Full-rewrite semantics: drops every stored slot for the tutor and
/// recreates from the batch. The batch has already passed the overlap
/// pre-check; duplicates within it collapse to a single row.
pub fn replace_all(
    conn: &Connection,
    tutor_id: &str,
    batch: &[NormalizedSlot],
) -> Result<usize, AppError> {
    let tx = conn.unchecked_transaction()?;

    queries::delete_slots_for_tutor(&tx, tutor_id)?;

    let mut seen: Vec<(WeekDay, u32, u32)> = vec![];
    let mut created = 0usize;
    for slot in batch {
        let (start, end) = slot.range();
        if seen.contains(&(slot.day, start, end)) {
            continue;
        }
        queries::create_slot(
            &tx,
            &AvailabilitySlot {
                id: Uuid::new_v4().to_string(),
                tutor_id: tutor_id.to_string(),
                day: slot.day.as_str().to_string(),
                start_minute: slot.start_minute,
                end_minute: slot.end_minute,
            },
        )?;
        seen.push((slot.day, start, end));
        created += 1;
    }

    tx.commit()?;
    Ok(created)
}

/// Applies a partial update to one slot, re-validating the time range and
/// checking overlap against the tutor's other slots on the resulting day.
pub fn update_one(
    conn: &Connection,
    tutor_id: &str,
    slot_id: &str,
    patch: SlotPatch,
) -> Result<AvailabilitySlot, AppError> {
    let tx = conn.unchecked_transaction()?;

    let mut slot = queries::slot_by_id(&tx, tutor_id, slot_id)?
        .ok_or_else(|| AppError::NotFound(format!("availability slot {slot_id}")))?;

    if let Some(day) = &patch.day {
        slot.day = WeekDay::parse(day)?.as_str().to_string();
    }
    if let Some(start) = &patch.start_time {
        slot.start_minute = TimeOfDay::parse(start)?.minutes();
    }
    if let Some(end) = &patch.end_time {
        slot.end_minute = TimeOfDay::parse(end)?.minutes();
    }

    let (start, end) = slot.effective_range();
    if start >= end {
        return Err(ScheduleError::InvalidTimeRange(display_day(&slot)).into());
    }

    let siblings = queries::slots_for_tutor(&tx, tutor_id)?;
    let day_key = slot.day_key();
    let clash = siblings.iter().any(|other| {
        if other.id == slot.id || other.day_key() != day_key {
            return false;
        }
        let (s, e) = other.effective_range();
        start < e && end > s
    });
    if clash {
        return Err(ScheduleError::OverlappingSlots(display_day(&slot)).into());
    }

    queries::update_slot(&tx, &slot)?;
    tx.commit()?;
    Ok(slot)
}

pub fn remove_one(
    conn: &Connection,
    tutor_id: &str,
    slot_id: &str,
) -> Result<AvailabilitySlot, AppError> {
    let slot = queries::slot_by_id(conn, tutor_id, slot_id)?
        .ok_or_else(|| AppError::NotFound(format!("availability slot {slot_id}")))?;

    queries::delete_slot(conn, tutor_id, slot_id)?;
    Ok(slot)
}

/// All of a tutor's slots ordered by day-of-week index (Sunday first,
/// unrecognizable day text last) then start minute.
pub fn list_for_tutor(
    conn: &Connection,
    tutor_id: &str,
) -> Result<Vec<AvailabilitySlot>, AppError> {
    let mut slots = queries::slots_for_tutor(conn, tutor_id)?;
    slots.sort_by_key(|slot| (slot.day_index(), slot.start_minute));
    Ok(slots)
}

fn display_day(slot: &AvailabilitySlot) -> String {
    match WeekDay::parse(&slot.day) {
        Ok(day) => day.as_str().to_string(),
        Err(_) => slot.day.clone(),
    }
}
