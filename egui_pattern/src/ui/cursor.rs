//! Resolves what the pointer targets inside a pattern.

use super::geometry::{snap_to_pitch, PatternGeometry};
use crate::config::{ARC_TOLERANCE, MOD_COUNT, NOTE_SIZE_MAX, PARTS_PER_BEAT};
use crate::pins;
use crate::structure::{ChannelKind, Note, NotePin, Pattern, Scale, Song};
use egui::Pos2;

/// Snapshot of the pointer target. Rebuilt on every move; never mutated afterward.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cursor {
    pub valid: bool,
    pub exact_part: f64,
    pub part: i32,
    /// Span of the note under the pointer, or of the note that a click would create.
    pub start: i32,
    pub end: i32,
    pub pitch: i32,
    /// Chord member equal to `pitch`.
    pub pitch_index: Option<usize>,
    /// Notes sorted before the pointer; insertion index for a new note.
    pub cur_index: usize,
    pub prev_note: Option<Note>,
    pub cur_note: Option<Note>,
    pub next_note: Option<Note>,
    pub near_pin_index: usize,
    pub pins: Vec<NotePin>,
}

impl Cursor {
    pub fn invalid() -> Self {
        Self::default()
    }
}

pub struct CursorInput<'a> {
    pub song: &'a Song,
    pub channel: usize,
    pub instrument: usize,
    pub pattern: Option<&'a Pattern>,
    pub geometry: PatternGeometry,
    pub pointer: Pos2,
    pub fine: bool,
    pub horizontal: bool,
    /// Pins copied from the last edited note of this channel.
    pub template: Option<&'a [NotePin]>,
    pub scale: Scale,
}

/// Pin template used before any note of the channel was edited.
pub fn default_template(geometry: &PatternGeometry) -> Vec<NotePin> {
    vec![
        NotePin::new(0, 0, NOTE_SIZE_MAX),
        NotePin::new(0, geometry.max_division(false, false), NOTE_SIZE_MAX),
    ]
}

/// Index of the pin closest to `exact_part`. Ties go to the earlier pin.
pub fn nearest_pin(note: &Note, exact_part: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::MAX;
    for (index, pin) in note.pins.iter().enumerate() {
        let distance = ((note.start + pin.time) as f64 - exact_part).abs();
        if distance < best_distance {
            best_distance = distance;
            best = index;
        }
    }
    best
}

pub fn resolve_cursor(input: &CursorInput) -> Cursor {
    let g = &input.geometry;
    let pointer = input.pointer;
    if !g.contains(pointer) || g.pitch_height() <= 0.0 || g.part_width() <= 0.0 {
        return Cursor::invalid();
    }
    let is_mod = g.kind == ChannelKind::Mod;
    let min_division = g.min_division(input.fine, input.horizontal);
    let max_pitch = input.song.max_pitch(input.channel);

    let mut cursor = Cursor {
        exact_part: g.pixel_to_part(pointer.x),
        ..Cursor::default()
    };
    let clamped = cursor
        .exact_part
        .min((g.bar_parts - min_division) as f64)
        .max(0.0);
    cursor.part = (clamped / min_division as f64).floor() as i32 * min_division;

    let mut mouse_pitch = g.find_mouse_pitch(pointer.y);
    let row = mouse_pitch.floor() as i32;
    let exact = cursor.exact_part;
    let on_row = |n: &Note| !is_mod || n.pitches.first() == Some(&row);

    if let Some(pattern) = input.pattern {
        let mut found = false;
        for note in &pattern.notes {
            if note.end as f64 <= exact {
                if on_row(note) {
                    cursor.prev_note = Some(note.clone());
                }
                if !is_mod || !found {
                    cursor.cur_index += 1;
                }
            } else if note.start as f64 <= exact {
                if on_row(note) {
                    cursor.cur_note = Some(note.clone());
                    found = true;
                } else if !found {
                    cursor.cur_index += 1;
                }
            } else if on_row(note) {
                cursor.next_note = Some(note.clone());
                break;
            }
        }
    }

    if let Some(note) = cursor.cur_note.clone() {
        cursor.start = note.start;
        cursor.end = note.end;
        cursor.pins = note.pins.clone();

        let part_width = g.part_width();
        let x = pointer.x as f64;
        let mut interval = 0.0;
        let mut error = 0.0;
        for pair in note.pins.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            let left = part_width * (note.start + prev.time) as f64;
            let right = part_width * (note.start + next.time) as f64;
            if x > right {
                continue;
            }
            let ratio = ((x - left) / (right - left)).clamp(0.0, 1.0);
            let arc = (0.5 - (ratio - 0.5).powi(2)).sqrt() - 0.5;
            let bend_height = (next.interval - prev.interval).abs() as f64;
            interval = prev.interval as f64 * (1.0 - ratio) + next.interval as f64 * ratio;
            error = arc * bend_height + ARC_TOLERANCE;
            break;
        }

        let min_interval = note.pins.iter().map(|p| p.interval).min().unwrap_or(0);
        let max_interval = note.pins.iter().map(|p| p.interval).max().unwrap_or(0);
        cursor.near_pin_index = nearest_pin(&note, exact);

        mouse_pitch -= interval;
        cursor.pitch = snap_to_pitch(
            mouse_pitch,
            -min_interval,
            max_pitch - max_interval,
            input.scale,
            g.ignores_scale(),
        );

        if g.kind == ChannelKind::Pitch {
            let mut nearest = error;
            for &pitch in &note.pitches {
                let distance = (pitch as f64 - mouse_pitch + 0.5).abs();
                if distance > nearest {
                    continue;
                }
                nearest = distance;
                cursor.pitch = pitch;
            }
        }
        cursor.pitch_index = note.pitches.iter().position(|&p| p == cursor.pitch);
    } else {
        cursor.pitch = snap_to_pitch(mouse_pitch, 0, max_pitch, input.scale, g.ignores_scale());
        let fallback;
        let template = match input.template {
            Some(t) if t.len() >= 2 => t,
            _ => {
                fallback = default_template(g);
                fallback.as_slice()
            }
        };
        let default_length = template[template.len() - 1].time;
        new_note_span(&mut cursor, g, default_length, input);
        if cursor.end <= cursor.start {
            return Cursor::invalid();
        }
        let length = cursor.end - cursor.start;
        if length == default_length {
            cursor.pins = template.iter().map(|p| NotePin::new(0, p.time, p.size)).collect();
        } else {
            for pin in template {
                if pin.time <= length {
                    cursor.pins.push(NotePin::new(0, pin.time, pin.size));
                    if pin.time == length {
                        break;
                    }
                } else {
                    cursor.pins.push(NotePin::new(0, length, pin.size));
                    break;
                }
            }
        }

        if is_mod {
            cursor.pitch = cursor.pitch.clamp(0, MOD_COUNT as i32 - 1);
            let bound = input.pattern.map_or(&[][..], |p| p.instruments.as_slice());
            let cap = input
                .song
                .bound_volume_cap(input.channel, bound, input.instrument, cursor.pitch);
            pins::fit_to_cap(&mut cursor.pins, cap);
        }
    }

    cursor.valid = true;
    cursor
}

/// Places a prospective note of `default_length` around the cursor part,
/// aligned to the beat grid and kept clear of neighbouring notes.
fn new_note_span(cursor: &mut Cursor, g: &PatternGeometry, default_length: i32, input: &CursorInput) {
    let full_beats = cursor.part / PARTS_PER_BEAT;
    let max_division = g.max_division(input.fine, input.horizontal);
    let mod_mouse = cursor.part % PARTS_PER_BEAT;

    cursor.start = if default_length == 1 {
        cursor.part
    } else if default_length >= PARTS_PER_BEAT {
        let mut start = full_beats * PARTS_PER_BEAT;
        if default_length == PARTS_PER_BEAT && max_division < PARTS_PER_BEAT && mod_mouse > max_division {
            start += (mod_mouse / max_division) * max_division;
        }
        start
    } else {
        let mut division = if PARTS_PER_BEAT % default_length == 0 {
            default_length
        } else {
            default_length.min(max_division)
        };
        while division < max_division && PARTS_PER_BEAT % division != 0 {
            division += 1;
        }
        full_beats * PARTS_PER_BEAT + (mod_mouse / division) * division
    };
    cursor.end = cursor.start + default_length;

    let force_start = cursor.prev_note.as_ref().map(|n| n.end).unwrap_or(0);
    let force_end = cursor
        .next_note
        .as_ref()
        .map(|n| n.start)
        .unwrap_or(g.bar_parts);
    if cursor.start < force_start {
        cursor.start = force_start;
        cursor.end = (cursor.start + default_length).min(force_end);
    } else if cursor.end > force_end {
        cursor.end = force_end;
        cursor.start = (cursor.end - default_length).max(force_start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulator::ModSetting;
    use crate::structure::{ChannelKind, Pattern, Song};
    use egui::Vec2;

    const SIZE: Vec2 = Vec2::new(768.0, 370.0);

    fn input<'a>(
        song: &'a Song,
        channel: usize,
        pattern: Option<&'a Pattern>,
        pointer: Pos2,
        template: Option<&'a [NotePin]>,
    ) -> CursorInput<'a> {
        let size = if song.is_mod_channel(channel) {
            Vec2::new(768.0, 60.0)
        } else {
            SIZE
        };
        CursorInput {
            song,
            channel,
            instrument: 0,
            pattern,
            geometry: PatternGeometry::for_channel(song, channel, size),
            pointer,
            fine: false,
            horizontal: false,
            template,
            scale: song.scale,
        }
    }

    fn at(song: &Song, channel: usize, part: f64, pitch: i32) -> Pos2 {
        let g = PatternGeometry::for_channel(song, channel, SIZE);
        Pos2::new(g.part_to_pixel(part), g.pitch_to_pixel(pitch))
    }

    fn pattern(notes: Vec<Note>) -> Pattern {
        Pattern {
            notes,
            instruments: vec![0],
        }
    }

    #[test]
    fn outside_editor_is_invalid() {
        let song = Song::default();
        let c = resolve_cursor(&input(&song, 0, None, Pos2::new(-1.0, 10.0), None));
        assert!(!c.valid);
        let c = resolve_cursor(&input(&song, 0, None, Pos2::new(10.0, 371.0), None));
        assert!(!c.valid);
    }

    #[test]
    fn empty_space_proposes_template_note() {
        let song = Song::default();
        let template = [NotePin::new(0, 0, 6), NotePin::new(0, 1, 6)];
        let c = resolve_cursor(&input(&song, 0, None, at(&song, 0, 0.5, 60), Some(&template)));
        assert!(c.valid);
        assert!(c.cur_note.is_none());
        assert_eq!((c.start, c.end, c.pitch), (0, 1, 60));
        assert_eq!(c.pins, template.to_vec());
    }

    #[test]
    fn new_note_is_kept_clear_of_neighbours() {
        let song = Song::default();
        let p = pattern(vec![
            Note::new(60, 0, 10, 6, false),
            Note::new(60, 14, 20, 6, false),
        ]);
        let template = [NotePin::new(0, 0, 6), NotePin::new(0, 3, 2), NotePin::new(0, 12, 6)];
        let c = resolve_cursor(&input(&song, 0, Some(&p), at(&song, 0, 11.0, 60), Some(&template)));
        assert!(c.valid);
        assert_eq!(c.prev_note.as_ref().map(|n| n.start), Some(0));
        assert_eq!(c.next_note.as_ref().map(|n| n.start), Some(14));
        assert_eq!(c.cur_index, 1);
        assert_eq!((c.start, c.end), (10, 14));
        assert_eq!(
            c.pins,
            vec![NotePin::new(0, 0, 6), NotePin::new(0, 3, 2), NotePin::new(0, 4, 6)]
        );
    }

    #[test]
    fn existing_note_snaps_to_chord_pitch() {
        let song = Song::default();
        let mut chord = Note::new(60, 0, 24, 6, false);
        chord.pitches.push(64);
        let p = pattern(vec![chord]);
        let c = resolve_cursor(&input(&song, 0, Some(&p), at(&song, 0, 6.0, 64), None));
        assert_eq!(c.cur_note.as_ref().map(|n| n.start), Some(0));
        assert_eq!(c.pitch, 64);
        assert_eq!(c.pitch_index, Some(1));
        let c = resolve_cursor(&input(&song, 0, Some(&p), at(&song, 0, 6.0, 67), None));
        assert_eq!(c.pitch, 67);
        assert_eq!(c.pitch_index, None);
    }

    #[test]
    fn nearest_pin_prefers_earlier_on_tie() {
        let note = Note::new(60, 0, 12, 6, false);
        assert_eq!(nearest_pin(&note, 6.0), 0);
        assert_eq!(nearest_pin(&note, 6.1), 1);
    }

    #[test]
    fn modulator_rows_filter_notes_and_scale_template() {
        let mut song = Song::new(&[ChannelKind::Pitch, ChannelKind::Mod], 4);
        song.channels[1].instruments[0].modulators[5].setting = ModSetting::Distortion;
        song.channels[1].instruments[0].modulators[4].setting = ModSetting::Echo;
        // Slot 4 -> row 1, slot 5 -> row 0.
        let p = pattern(vec![Note::new(1, 0, 24, 3, false)]);
        let g = PatternGeometry::for_channel(&song, 1, Vec2::new(768.0, 60.0));
        let row0 = Pos2::new(g.part_to_pixel(6.0), g.pitch_to_pixel(0));
        let c = resolve_cursor(&input(&song, 1, Some(&p), row0, None));
        assert!(c.cur_note.is_none());
        assert_eq!(c.pitch, 0);
        let row1 = Pos2::new(g.part_to_pixel(6.0), g.pitch_to_pixel(1));
        let c = resolve_cursor(&input(&song, 1, Some(&p), row1, None));
        assert!(c.cur_note.is_some());

        let template = [NotePin::new(0, 0, 14), NotePin::new(0, 12, 7)];
        let c = resolve_cursor(&input(&song, 1, None, row0, Some(&template)));
        // Distortion caps at 7: sizes halve.
        assert_eq!(c.pins.iter().map(|p| p.size).collect::<Vec<_>>(), vec![7, 4]);
    }
}
