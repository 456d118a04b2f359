//! Pin list algorithms shared by every note edit.
//!
//! All functions take and return pins with times relative to the note start
//! unless stated otherwise. [`finish_setup`] is the single normalisation step
//! that every edit goes through.

use crate::structure::{Note, NotePin};

/// Rounds halves toward positive infinity.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Linearly interpolated `(interval, size)` at relative time `time`.
pub fn interpolate(pins: &[NotePin], time: f64) -> (f64, f64) {
    let Some(first) = pins.first() else {
        return (0.0, 0.0);
    };
    if time <= first.time as f64 {
        return (first.interval as f64, first.size as f64);
    }
    for pair in pins.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if time <= next.time as f64 {
            let span = (next.time - prev.time) as f64;
            let ratio = if span > 0.0 {
                (time - prev.time as f64) / span
            } else {
                1.0
            };
            return (
                prev.interval as f64 * (1.0 - ratio) + next.interval as f64 * ratio,
                prev.size as f64 * (1.0 - ratio) + next.size as f64 * ratio,
            );
        }
    }
    let last = pins[pins.len() - 1];
    (last.interval as f64, last.size as f64)
}

/// Pin at integer time `time`, reusing an existing pin when one sits there.
pub fn pin_at(pins: &[NotePin], time: i32) -> NotePin {
    if let Some(pin) = pins.iter().find(|p| p.time == time) {
        return *pin;
    }
    let (interval, size) = interpolate(pins, time as f64);
    NotePin::new(round_half_up(interval), time, round_half_up(size))
}

/// Replaces the note's pins with `new_pins` and re-bases it.
///
/// Pins not strictly earlier than their successor are dropped, interior pins
/// flat with both neighbours are merged away, and the first pin is moved to
/// time 0 and interval 0 by shifting the note's start and pitches.
pub fn finish_setup(note: &mut Note, mut new_pins: Vec<NotePin>) {
    let mut i = 0;
    while i + 1 < new_pins.len() {
        if new_pins[i].time >= new_pins[i + 1].time {
            new_pins.remove(i);
        } else {
            i += 1;
        }
    }
    let mut i = 1;
    while i + 1 < new_pins.len() {
        let (prev, pin, next) = (new_pins[i - 1], new_pins[i], new_pins[i + 1]);
        if prev.interval == pin.interval
            && pin.interval == next.interval
            && prev.size == pin.size
            && pin.size == next.size
        {
            new_pins.remove(i);
        } else {
            i += 1;
        }
    }
    let Some(first) = new_pins.first().copied() else {
        note.pins.clear();
        return;
    };
    for pitch in note.pitches.iter_mut() {
        *pitch += first.interval;
    }
    for pin in new_pins.iter_mut() {
        pin.interval -= first.interval;
        pin.time -= first.time;
    }
    note.start += first.time;
    note.end = note.start + new_pins[new_pins.len() - 1].time;
    note.pins = new_pins;
}

/// Pins of the note restricted to absolute parts `[trunc_start, trunc_end]`.
pub fn truncated_pins(note: &Note, trunc_start: i32, trunc_end: i32) -> Vec<NotePin> {
    let from = trunc_start - note.start;
    let to = trunc_end - note.start;
    let mut pins = vec![pin_at(&note.pins, from)];
    pins.extend(
        note.pins
            .iter()
            .filter(|p| p.time > from && p.time < to)
            .copied(),
    );
    pins.push(pin_at(&note.pins, to));
    pins
}

/// Pins after moving pin `pin_index` to absolute part `shifted_time`.
///
/// Pins passed over on the way are dropped.
pub fn pin_time_pins(note: &Note, pin_index: usize, shifted_time: i32) -> Vec<NotePin> {
    let shifted = shifted_time - note.start;
    let moved = note.pins[pin_index];
    let original = moved.time;
    let skip_start = original.min(shifted);
    let skip_end = original.max(shifted);
    let mut pins = Vec::with_capacity(note.pins.len() + 1);
    let mut placed = false;
    for pin in &note.pins {
        if pin.time < skip_start {
            pins.push(*pin);
        } else if pin.time > skip_end {
            if !placed {
                pins.push(NotePin::new(moved.interval, shifted, moved.size));
                placed = true;
            }
            pins.push(*pin);
        }
    }
    if !placed {
        pins.push(NotePin::new(moved.interval, shifted, moved.size));
    }
    pins
}

/// Pins after bending the size (and interval) at relative time `bend_part`.
pub fn size_bend_pins(
    note: &Note,
    bend_part: i32,
    size: i32,
    interval: i32,
    uniform: bool,
) -> Vec<NotePin> {
    if uniform {
        return note
            .pins
            .iter()
            .map(|p| NotePin::new(p.interval, p.time, size))
            .collect();
    }
    let bent = NotePin::new(interval, bend_part, size);
    let mut pins = Vec::with_capacity(note.pins.len() + 1);
    let mut inserted = false;
    for pin in &note.pins {
        if pin.time < bend_part {
            pins.push(*pin);
        } else if pin.time == bend_part {
            pins.push(bent);
            inserted = true;
        } else {
            if !inserted {
                pins.push(bent);
                inserted = true;
            }
            pins.push(*pin);
        }
    }
    pins
}

/// Pins after bending chord member `pitch_index` toward absolute pitch `bend_to`
/// between absolute parts `bend_start` and `bend_end`.
///
/// Walks forward when `bend_end > bend_start`, backward otherwise. Pins past the
/// bend end keep the bent interval until a pin that was already bent differently.
pub fn pitch_bend_pins(
    note: &Note,
    bend_start: i32,
    bend_end: i32,
    bend_to: i32,
    pitch_index: usize,
) -> Vec<NotePin> {
    let bend_start = bend_start - note.start;
    let bend_end = bend_end - note.start;
    let bend_to = bend_to - note.pitches.get(pitch_index).copied().unwrap_or(0);
    let forward = bend_end > bend_start;
    let direction = if forward { 1 } else { -1 };

    let mut out: Vec<NotePin> = Vec::with_capacity(note.pins.len() + 2);
    let push = |out: &mut Vec<NotePin>, pin: NotePin| {
        if forward {
            out.push(pin);
        } else {
            out.insert(0, pin);
        }
    };

    let mut set_start = false;
    let mut set_end = false;
    let mut prev_interval = 0;
    let mut prev_size = 3;
    let mut persist = true;

    let order: Vec<NotePin> = if forward {
        note.pins.clone()
    } else {
        note.pins.iter().rev().copied().collect()
    };
    for pin in order {
        let time = pin.time;
        loop {
            if !set_start {
                if time * direction <= bend_start * direction {
                    prev_interval = pin.interval;
                    prev_size = pin.size;
                }
                if time * direction < bend_start * direction {
                    push(&mut out, pin);
                    break;
                }
                push(&mut out, NotePin::new(prev_interval, bend_start, prev_size));
                set_start = true;
            } else if !set_end {
                if time * direction <= bend_end * direction {
                    prev_interval = pin.interval;
                    prev_size = pin.size;
                }
                if time * direction < bend_end * direction {
                    break;
                }
                push(&mut out, NotePin::new(bend_to, bend_end, prev_size));
                set_end = true;
            } else {
                if time * direction != bend_end * direction {
                    if pin.interval != prev_interval {
                        persist = false;
                    }
                    let interval = if persist { bend_to } else { pin.interval };
                    push(&mut out, NotePin::new(interval, time, pin.size));
                }
                break;
            }
        }
    }
    if !set_end {
        push(&mut out, NotePin::new(bend_to, bend_end, prev_size));
    }
    out
}

/// Copy of the note restricted to absolute parts `[from, to]`, or `None` if nothing remains.
pub fn slice_note(note: &Note, from: i32, to: i32) -> Option<Note> {
    let from = from.max(note.start);
    let to = to.min(note.end);
    if from >= to {
        return None;
    }
    if from == note.start && to == note.end {
        return Some(note.clone());
    }
    let mut sliced = note.clone();
    let pins = truncated_pins(note, from, to);
    finish_setup(&mut sliced, pins);
    Some(sliced)
}

/// Pin template derived from an edited note: intervals zeroed, flat runs merged.
pub fn template_from(note: &Note) -> Vec<NotePin> {
    let mut pins: Vec<NotePin> = note
        .pins
        .iter()
        .map(|p| NotePin::new(0, p.time, p.size))
        .collect();
    let mut i = 1;
    while i + 1 < pins.len() {
        if pins[i - 1].size == pins[i].size && pins[i].size == pins[i + 1].size {
            pins.remove(i);
        } else {
            i += 1;
        }
    }
    pins
}

/// Scales sizes down proportionally so the loudest pin sits at `cap`.
pub fn fit_to_cap(pins: &mut [NotePin], cap: i32) {
    let highest = pins.iter().map(|p| p.size).max().unwrap_or(0);
    if highest <= cap {
        return;
    }
    let ratio = cap.max(0) as f64 / highest as f64;
    for pin in pins.iter_mut() {
        pin.size = round_half_up(pin.size as f64 * ratio).min(cap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::NoteId;

    fn note(start: i32, pitch: i32, pins: &[(i32, i32, i32)]) -> Note {
        let pins: Vec<NotePin> = pins
            .iter()
            .map(|&(interval, time, size)| NotePin::new(interval, time, size))
            .collect();
        Note {
            id: NoteId::next(),
            pitches: vec![pitch],
            start,
            end: start + pins.last().map(|p| p.time).unwrap_or(0),
            pins,
            continues_last_pattern: false,
        }
    }

    #[test]
    fn round_half_up_matches_positive_and_negative_halves() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-0.4), 0);
    }

    #[test]
    fn finish_setup_rebases_and_shifts_pitch() {
        let mut n = note(4, 60, &[(0, 0, 6), (0, 8, 6)]);
        finish_setup(
            &mut n,
            vec![NotePin::new(2, 2, 3), NotePin::new(2, 6, 3), NotePin::new(3, 8, 3)],
        );
        assert_eq!(n.start, 6);
        assert_eq!(n.end, 12);
        assert_eq!(n.pitches, vec![62]);
        assert_eq!(n.pins[0], NotePin::new(0, 0, 3));
        assert_eq!(n.pins[2], NotePin::new(1, 6, 3));
    }

    #[test]
    fn finish_setup_drops_colliding_and_flat_pins() {
        let mut n = note(0, 60, &[(0, 0, 6), (0, 8, 6)]);
        finish_setup(
            &mut n,
            vec![
                NotePin::new(0, 0, 6),
                NotePin::new(0, 4, 6),
                NotePin::new(0, 4, 2),
                NotePin::new(0, 6, 2),
                NotePin::new(0, 8, 2),
            ],
        );
        assert_eq!(
            n.pins,
            vec![NotePin::new(0, 0, 6), NotePin::new(0, 4, 2), NotePin::new(0, 8, 2)]
        );
    }

    #[test]
    fn truncation_interpolates_boundaries() {
        let n = note(0, 60, &[(0, 0, 0), (4, 8, 4)]);
        let pins = truncated_pins(&n, 2, 6);
        assert_eq!(
            pins,
            vec![NotePin::new(1, 2, 1), NotePin::new(3, 6, 3)]
        );
        let sliced = slice_note(&n, 2, 6).expect("overlap");
        assert_eq!((sliced.start, sliced.end), (2, 6));
        assert_eq!(sliced.pitches, vec![61]);
    }

    #[test]
    fn pin_time_skips_passed_pins() {
        let n = note(0, 60, &[(0, 0, 6), (0, 4, 3), (0, 8, 6), (0, 12, 6)]);
        let pins = pin_time_pins(&n, 3, 6);
        assert_eq!(
            pins,
            vec![NotePin::new(0, 0, 6), NotePin::new(0, 4, 3), NotePin::new(0, 6, 6)]
        );
    }

    #[test]
    fn size_bend_inserts_between_pins() {
        let n = note(0, 60, &[(0, 0, 6), (0, 12, 6)]);
        let pins = size_bend_pins(&n, 6, 2, 0, false);
        assert_eq!(pins[1], NotePin::new(0, 6, 2));
        let uniform = size_bend_pins(&n, 6, 2, 0, true);
        assert!(uniform.iter().all(|p| p.size == 2));
    }

    #[test]
    fn forward_pitch_bend_extends_past_end() {
        let n = note(0, 60, &[(0, 0, 6), (0, 12, 6)]);
        let mut bent = n.clone();
        let pins = pitch_bend_pins(&n, 6, 18, 64, 0);
        finish_setup(&mut bent, pins);
        assert_eq!(bent.end, 18);
        assert_eq!(bent.last_pin().interval, 4);
        assert_eq!(bent.pins[0].time, 0);
    }

    #[test]
    fn backward_pitch_bend_moves_start() {
        let n = note(12, 60, &[(0, 0, 6), (0, 12, 6)]);
        let mut bent = n.clone();
        let pins = pitch_bend_pins(&n, 18, 6, 58, 0);
        finish_setup(&mut bent, pins);
        assert_eq!(bent.start, 6);
        assert_eq!(bent.end, 24);
        assert_eq!(bent.pitches, vec![58]);
        assert_eq!(bent.last_pin().interval, 2);
    }

    #[test]
    fn template_merges_flat_sizes() {
        let n = note(0, 60, &[(0, 0, 6), (1, 4, 6), (2, 8, 6), (0, 12, 2)]);
        let template = template_from(&n);
        assert_eq!(
            template,
            vec![NotePin::new(0, 0, 6), NotePin::new(0, 8, 6), NotePin::new(0, 12, 2)]
        );
    }

    #[test]
    fn fit_to_cap_keeps_the_shape() {
        let mut pins = vec![NotePin::new(0, 0, 200), NotePin::new(0, 6, 100), NotePin::new(0, 12, 0)];
        fit_to_cap(&mut pins, 7);
        let sizes: Vec<i32> = pins.iter().map(|p| p.size).collect();
        assert_eq!(sizes, vec![7, 4, 0]);

        let mut quiet = vec![NotePin::new(0, 0, 3), NotePin::new(0, 6, 5)];
        fit_to_cap(&mut quiet, 7);
        assert_eq!(quiet[1].size, 5);
    }
}
