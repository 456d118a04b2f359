//! Change sequences rebuilt from the press state on every pointer move.

use super::{DragPreview, Gesture, PatternEditor, PressState};
use crate::change::{Change, ChangeSequence, Lane, PatternRef};
use crate::config::{
    FAST_DRAG_COEFFICIENT, FAST_DRAG_EXPONENT, PARTS_PER_BEAT, PITCHES_PER_OCTAVE,
    SLOW_DRAG_COEFFICIENT, SLOW_DRAG_EXPONENT, SLOW_DRAG_COUNT_LIMIT,
};
use crate::document::SongDocument;
use crate::pins::{self, round_half_up};
use crate::structure::{ChannelKind, Note, NoteId};
use super::geometry::{snap_to_pitch, PatternGeometry};

#[derive(Debug, Default)]
pub(super) struct DragStep {
    pub change: ChangeSequence,
    /// Note whose pins become the channel's template once the change is applied.
    pub copy_from: Option<NoteId>,
    pub preview: Option<DragPreview>,
}

/// Shared per-move values.
struct DragFrame<'a> {
    doc: &'a SongDocument,
    g: PatternGeometry,
    at: PatternRef,
    min_division: i32,
    current_part: i32,
    bar_parts: i32,
}

impl PatternEditor {
    pub(super) fn build_drag_change(&self, doc: &SongDocument, press: &PressState) -> DragStep {
        let g = self.geometry(doc);
        let min_division = g.min_division(self.fine(), press.horizontal);
        let frame = DragFrame {
            doc,
            g,
            at: Self::pattern_ref(doc),
            min_division,
            current_part: g.snap_to_min_division(g.pixel_to_part(self.pointer.x), min_division),
            bar_parts: g.bar_parts,
        };
        match press.gesture {
            Gesture::ResizingSelectionStart => {
                let end = doc.base_selection().end;
                let start = frame.current_part.clamp(0, frame.bar_parts);
                DragStep::selection(start, end)
            }
            Gesture::ResizingSelectionEnd => {
                let start = doc.base_selection().start;
                let end = frame.current_part.clamp(0, frame.bar_parts);
                DragStep::selection(start, end)
            }
            Gesture::MovingSelectionContents => self.drag_selection_contents(&frame, press),
            Gesture::ShiftSelecting => self.extend_shift_selection(&frame),
            Gesture::CreatingNote | Gesture::ShapingNote => match self.cursor.cur_note.clone() {
                None => self.stretch_new_note(&frame),
                Some(note) if press.horizontal => self.shift_pin(&frame, press, &note),
                Some(note)
                    if self.cursor.pitch_index.is_none() || frame.g.kind == ChannelKind::Mod =>
                {
                    self.bend_size(&frame, press, &note)
                }
                Some(note) => self.bend_pitch(&frame, press, &note),
            },
        }
    }

    fn drag_selection_contents(&self, frame: &DragFrame, press: &PressState) -> DragStep {
        let mut step = DragStep::default();
        if frame.doc.base_pattern(0).is_none() {
            return step;
        }
        let pitch_ratio = if frame.g.ignores_scale() {
            1.0
        } else {
            PITCHES_PER_OCTAVE as f64 / self.scale(frame.doc).notes_in_scale().max(1) as f64
        };
        let dx = (self.pointer.x - press.origin.x) as f64;
        let dy = (press.origin.y - self.pointer.y) as f64;
        let parts = round_half_up(dx / (frame.g.part_width() * frame.min_division as f64)) * frame.min_division;
        let transpose = round_half_up(dy / (frame.g.pitch_height() * pitch_ratio));
        step.change.push(Change::DragSelectedNotes {
            at: frame.at,
            parts,
            transpose,
            chromatic: self.options.notes_outside_scale,
        });
        step
    }

    fn extend_shift_selection(&self, frame: &DragFrame) -> DragStep {
        let beats = frame.doc.song.beats_per_bar;
        let current = frame.current_part;
        let mut start = ((self.cursor.exact_part / PARTS_PER_BEAT as f64).floor() as i32 * PARTS_PER_BEAT)
            .clamp(0, (beats - 1).max(0) * PARTS_PER_BEAT);
        let mut end = start + PARTS_PER_BEAT;
        if let Some(note) = &self.cursor.cur_note {
            start = start.max(note.start);
            end = end.min(note.end);
        }
        let notes: &[Note] = frame
            .doc
            .base_pattern(0)
            .map(|p| p.notes.as_slice())
            .unwrap_or(&[]);

        if current < start {
            start = 0;
            for note in notes {
                if note.start <= current {
                    start = note.start;
                }
                if note.end <= current {
                    start = note.end;
                }
            }
            for beat in 0..=beats {
                let part = beat * PARTS_PER_BEAT;
                if start <= part && part <= current {
                    start = part;
                }
            }
        }
        if current > end {
            end = frame.bar_parts;
            for note in notes {
                if note.start >= current {
                    end = note.start;
                    break;
                }
                if note.end >= current {
                    end = note.end;
                    break;
                }
            }
            for beat in 0..=beats {
                let part = beat * PARTS_PER_BEAT;
                if current < part && part < end {
                    end = part;
                }
            }
        }
        DragStep::selection(start, end)
    }

    /// Drag from empty space: the new note grows toward the pointer in blessed lengths.
    fn stretch_new_note(&self, frame: &DragFrame) -> DragStep {
        let mut step = DragStep::default();
        step.change.push(Change::PatternSelection { start: 0, end: 0 });
        let doc = frame.doc;
        let cursor = &self.cursor;

        let (backwards, direct_length) = if frame.current_part < cursor.start {
            (true, cursor.start - frame.current_part)
        } else {
            (false, frame.current_part - cursor.start + frame.min_division)
        };
        let length = blessed_length(direct_length, frame.min_division, frame.bar_parts);
        let (mut start, mut end) = if backwards {
            (cursor.start - length, cursor.start)
        } else {
            (cursor.start, cursor.start + length)
        };
        let continues_last_pattern = start < 0 && frame.g.kind != ChannelKind::Noise;
        start = start.max(0);
        end = end.min(frame.bar_parts);
        if start >= end {
            return step;
        }

        let instrument = doc.base_pattern(0)
            .and_then(|p| p.instruments.first().copied())
            .unwrap_or(doc.instrument);
        let size = doc.song.new_note_volume(doc.channel, instrument, cursor.pitch);
        let mut note = Note::new(
            cursor.pitch,
            start,
            end,
            size,
            frame.g.kind == ChannelKind::Noise,
        );
        note.continues_last_pattern = continues_last_pattern;
        let lane = if frame.g.kind == ChannelKind::Mod {
            Lane::Pitch(cursor.pitch)
        } else {
            Lane::All
        };
        let index = doc
            .base_pattern(0)
            .map(|p| p.notes.iter().take_while(|n| n.start < end).count())
            .unwrap_or(0);
        let edge = note.pins[if backwards { 0 } else { note.pins.len() - 1 }];

        step.change.push(Change::EnsurePatternExists { at: frame.at, instrument });
        step.change.push(Change::NoteTruncate {
            at: frame.at,
            start,
            end,
            skip: None,
            lane,
        });
        step.copy_from = Some(note.id);
        step.preview = Some(DragPreview {
            time: if backwards { start } else { end },
            pitch: cursor.pitch,
            size: edge.size,
            visible: true,
        });
        step.change.push(Change::NoteAdded { at: frame.at, note, index });
        step
    }

    /// Horizontal drag on a note moves its nearest pin.
    fn shift_pin(&self, frame: &DragFrame, press: &PressState, note: &Note) -> DragStep {
        let mut step = DragStep::default();
        let pin_index = self.cursor.near_pin_index;
        let Some(pin) = note.pins.get(pin_index).copied() else {
            return step;
        };
        let shift = (self.pointer.x - press.origin.x) as f64 / frame.g.part_width();
        let division = frame.min_division as f64;
        let mut shifted = round_half_up(((note.start + pin.time) as f64 + shift) / division) * frame.min_division;
        let continues_last_pattern = shifted < 0 && frame.g.kind != ChannelKind::Noise;
        shifted = shifted.clamp(0, frame.bar_parts);

        let last = note.pins.len() - 1;
        if (shifted <= note.start && pin_index == last) || (shifted >= note.end && pin_index == 0) {
            step.change.push(Change::NoteRemoved { at: frame.at, note: note.id });
            return step;
        }
        step.change.push(Change::NoteTruncate {
            at: frame.at,
            start: note.start.min(shifted),
            end: note.end.max(shifted),
            skip: Some(note.id),
            lane: lane_for(frame.g.kind, note),
        });
        step.change.push(Change::PinTime {
            at: frame.at,
            note: note.id,
            pin_index,
            shifted_time: shifted,
            continues_last_pattern,
        });
        step.copy_from = Some(note.id);
        step.preview = Some(DragPreview {
            time: shifted,
            pitch: note.pitches[self.cursor.pitch_index.unwrap_or(0)] + pin.interval,
            size: pin.size,
            visible: true,
        });
        step
    }

    /// Vertical drag off the chord pitches (or any vertical drag on a modulator row) bends the size.
    fn bend_size(&self, frame: &DragFrame, press: &PressState, note: &Note) -> DragStep {
        let mut step = DragStep::default();
        let doc = frame.doc;
        let is_mod = frame.g.kind == ChannelKind::Mod;
        let base_pitch = note.pitches[0];
        let division = frame.min_division as f64;
        let bend_part = (round_half_up(self.pointer.x as f64 / (frame.g.part_width() * division))
            * frame.min_division)
            .clamp(note.start, note.end)
            - note.start;

        let cap = doc.current_volume_cap(self.cursor.pitch).max(1);
        let slow = SLOW_DRAG_COEFFICIENT / (cap as f64).powf(SLOW_DRAG_EXPONENT);
        let fast = FAST_DRAG_COEFFICIENT / (cap as f64).powf(FAST_DRAG_EXPONENT);
        let distance = (press.origin.y - self.pointer.y).abs() as f64;
        let sign = if press.origin.y > self.pointer.y { 1.0 } else { -1.0 };
        let counts = (distance / slow).min(SLOW_DRAG_COUNT_LIMIT)
            + (distance / fast - SLOW_DRAG_COUNT_LIMIT).max(0.0);

        let mut size = 0;
        let mut interval = 0;
        for pair in note.pins.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if bend_part > next.time {
                continue;
            }
            let ratio = (bend_part - prev.time) as f64 / (next.time - prev.time) as f64;
            size = round_half_up(
                prev.size as f64 * (1.0 - ratio) + next.size as f64 * ratio + sign * counts,
            );
            if !self.fine() && !self.options.fine_note_volume && !is_mod {
                size = size.div_euclid(2) * 2;
            }
            size = size.clamp(0, cap);
            let bent = prev.interval as f64 * (1.0 - ratio) + next.interval as f64 * ratio;
            interval = snap_to_pitch(
                bent + base_pitch as f64,
                0,
                doc.song.max_pitch(doc.channel),
                self.scale(doc),
                frame.g.ignores_scale(),
            ) - base_pitch;
            break;
        }
        let uniform = self.modifiers.shift;

        step.change.push(Change::SizeBend {
            at: frame.at,
            note: note.id,
            bend_part,
            size,
            interval,
            uniform,
        });
        if is_mod && self.fine() {
            for (at, neighbour, part) in linked_neighbours(frame, note, bend_part) {
                let base = doc.base_song();
                let neighbour_cap = base.pattern(at.channel, at.bar).map_or(cap, |p| {
                    base.bound_volume_cap(at.channel, &p.instruments, doc.instrument, base_pitch)
                });
                step.change.push(Change::SizeBend {
                    at,
                    note: neighbour,
                    bend_part: part,
                    size: size.min(neighbour_cap),
                    interval,
                    uniform,
                });
            }
        }
        step.copy_from = Some(note.id);
        step.preview = Some(DragPreview {
            time: note.start + bend_part,
            pitch: note.pitches[self.cursor.pitch_index.unwrap_or(0)] + interval,
            size,
            visible: true,
        });
        step
    }

    /// Vertical drag on a chord pitch bends that pitch toward the pointer.
    fn bend_pitch(&self, frame: &DragFrame, press: &PressState, note: &Note) -> DragStep {
        let mut step = DragStep::default();
        let Some(pitch_index) = self.cursor.pitch_index else {
            return step;
        };
        let (bend_start, bend_end) = if self.pointer.x >= press.origin.x {
            (
                note.start.max(self.cursor.part),
                frame.current_part + frame.min_division,
            )
        } else {
            (
                note.end.min(self.cursor.part + frame.min_division),
                frame.current_part,
            )
        };
        let bend_end = bend_end.clamp(0, frame.bar_parts);
        if bend_end > note.end {
            step.change.push(Change::NoteTruncate {
                at: frame.at,
                start: note.start,
                end: bend_end,
                skip: Some(note.id),
                lane: Lane::All,
            });
        }
        if bend_end < note.start {
            step.change.push(Change::NoteTruncate {
                at: frame.at,
                start: bend_end,
                end: note.end,
                skip: Some(note.id),
                lane: Lane::All,
            });
        }

        let bent = note.pitches[pitch_index];
        let below = note.lowest_pitch() - bent;
        let above = note.highest_pitch() - bent;
        let max_pitch = frame.doc.song.max_pitch(frame.doc.channel);
        let bend_to = snap_to_pitch(
            frame.g.find_mouse_pitch(self.pointer.y),
            -below,
            max_pitch - above,
            self.scale(frame.doc),
            frame.g.ignores_scale(),
        );
        step.change.push(Change::PitchBend {
            at: frame.at,
            note: note.id,
            bend_start,
            bend_end,
            bend_to,
            pitch_index,
        });
        let (_, size) = pins::interpolate(&note.pins, (bend_end - note.start) as f64);
        step.copy_from = Some(note.id);
        step.preview = Some(DragPreview {
            time: bend_end,
            pitch: bend_to,
            size: round_half_up(size),
            visible: true,
        });
        step
    }
}

impl DragStep {
    fn selection(start: i32, end: i32) -> Self {
        Self {
            change: ChangeSequence::single(Change::PatternSelection { start, end }),
            ..Self::default()
        }
    }
}

fn lane_for(kind: ChannelKind, note: &Note) -> Lane {
    match (kind, note.pitches.first()) {
        (ChannelKind::Mod, Some(&pitch)) => Lane::Pitch(pitch),
        _ => Lane::All,
    }
}

/// Longest musically sensible length not far below `direct_length`.
///
/// Small multiples of the division are always allowed; beyond that only beat
/// multiples and 3/4, 4/3 and 3/2 of a beat. With a single-part division the
/// sub-beat lengths must be divisible by 3 or 4 (up to half a beat) or by 6 or 8
/// (up to a beat and a half).
pub fn blessed_length(direct_length: i32, min_division: i32, bar_parts: i32) -> i32 {
    let min_division = min_division.max(1);
    let mut length = min_division;
    let mut candidate = min_division;
    while candidate <= bar_parts {
        let i = candidate;
        candidate += min_division;
        let blessed = if min_division == 1 {
            if i < 5 {
                true
            } else if i <= PARTS_PER_BEAT / 2 {
                i % 3 == 0 || i % 4 == 0
            } else if i * 2 <= PARTS_PER_BEAT * 3 {
                i % 6 == 0 || i % 8 == 0
            } else {
                i % PARTS_PER_BEAT == 0
            }
        } else {
            i < 5 * min_division
                || i % PARTS_PER_BEAT == 0
                || i * 4 == PARTS_PER_BEAT * 3
                || i * 2 == PARTS_PER_BEAT * 3
                || i * 3 == PARTS_PER_BEAT * 4
        };
        if !blessed {
            continue;
        }
        if i == direct_length {
            return i;
        }
        if i < direct_length {
            length = i;
        } else {
            if length < direct_length - min_division {
                length = i;
            }
            break;
        }
    }
    length
}

/// Modulator notes touching `note` at the bent edge, in this bar or across the bar line.
fn linked_neighbours(frame: &DragFrame, note: &Note, bend_part: i32) -> Vec<(PatternRef, NoteId, i32)> {
    let doc = frame.doc;
    let mut linked = Vec::new();
    let Some(pattern) = doc.base_pattern(0) else {
        return linked;
    };
    let pitch = note.pitches[0];
    let same_row = |n: &Note| n.pitches.first() == Some(&pitch);
    let instrument = pattern.instruments.first().copied();
    let neighbour_bar = |offset: isize| {
        let bar = doc.bar.checked_add_signed(offset)?;
        let pattern = doc.base_pattern(offset)?;
        (pattern.instruments.first().copied() == instrument)
            .then_some((PatternRef::new(doc.channel, bar), pattern))
    };
    let last_time = note.last_pin().time;

    if bend_part >= last_time {
        let edge = note.start + last_time;
        if edge < frame.bar_parts {
            for n in pattern.notes.iter().filter(|n| n.start == edge && same_row(n)) {
                linked.push((frame.at, n.id, n.pins[0].time));
            }
        } else if let Some((at, next)) = neighbour_bar(1) {
            for n in next.notes.iter().filter(|n| n.start == 0 && same_row(n)) {
                linked.push((at, n.id, n.pins[0].time));
            }
        }
    } else if bend_part <= note.pins[0].time {
        if note.start > 0 {
            for n in pattern.notes.iter().filter(|n| n.end == note.start && same_row(n)) {
                linked.push((frame.at, n.id, n.last_pin().time));
            }
        } else if let Some((at, prev)) = neighbour_bar(-1) {
            for n in prev.notes.iter().filter(|n| n.end == frame.bar_parts && same_row(n)) {
                linked.push((at, n.id, n.last_pin().time));
            }
        }
    }
    if !linked.is_empty() {
        log::trace!("linking size bend to {} neighbouring notes", linked.len());
    }
    linked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::PatternEditorOptions;
    use crate::modulator::ModSetting;
    use crate::structure::{NotePin, Song};
    use egui::{Modifiers, Pos2, Vec2};

    #[test]
    fn blessed_lengths_snap_to_musical_values() {
        // Division 6 with a 192-part bar.
        assert_eq!(blessed_length(6, 6, 192), 6);
        assert_eq!(blessed_length(24, 6, 192), 24);
        // 30 is not blessed: falls back to 24 since it is within one division.
        assert_eq!(blessed_length(30, 6, 192), 24);
        // 36 is a beat and a half.
        assert_eq!(blessed_length(36, 6, 192), 36);
        assert_eq!(blessed_length(42, 6, 192), 36);
        // 60 rounds up to 72 since 48 is more than one division short.
        assert_eq!(blessed_length(60, 6, 192), 72);
        // Freehand allows 3 and 4 multiples only below half a beat.
        assert_eq!(blessed_length(7, 1, 192), 6);
        assert_eq!(blessed_length(9, 1, 192), 9);
    }

    fn setup(template_end: i32) -> (SongDocument, PatternEditor) {
        let doc = SongDocument::default();
        let mut editor = PatternEditor::new(PatternEditorOptions::default());
        editor.set_copied_pins(0, vec![NotePin::new(0, 0, 6), NotePin::new(0, template_end, 6)]);
        (doc, editor)
    }

    fn at(doc: &SongDocument, editor: &PatternEditor, part: f64, pitch: i32) -> Pos2 {
        let g = PatternGeometry::for_channel(&doc.song, doc.channel, editor.size());
        Pos2::new(g.part_to_pixel(part), g.pitch_to_pixel(pitch))
    }

    fn drag(editor: &mut PatternEditor, doc: &mut SongDocument, from: Pos2, to: Pos2, mods: Modifiers) {
        editor.pointer_moved(doc, from, mods).expect("hover");
        editor.pointer_pressed(doc, from, mods).expect("press");
        let mid = from + (to - from) * 0.5;
        editor.pointer_moved(doc, mid, mods).expect("mid");
        editor.pointer_moved(doc, to, mods).expect("move");
        editor.pointer_released(doc, to).expect("release");
    }

    fn only_note(doc: &SongDocument) -> Note {
        let notes = &doc.current_pattern(0).expect("pattern").notes;
        assert_eq!(notes.len(), 1);
        notes[0].clone()
    }

    #[test]
    fn dragging_from_empty_space_stretches_the_new_note() {
        let (mut doc, mut editor) = setup(6);
        let from = at(&doc, &editor, 1.0, 60);
        let to = at(&doc, &editor, 47.0, 60);
        drag(&mut editor, &mut doc, from, to, Modifiers::NONE);
        let note = only_note(&doc);
        assert_eq!((note.start, note.end), (0, 48));
        assert_eq!(editor.copied_pins(0).map(|p| p.last().map(|p| p.time)), Some(Some(48)));
        assert!(!editor.drag_preview().visible);
    }

    #[test]
    fn dragging_left_creates_the_note_backwards() {
        let (mut doc, mut editor) = setup(6);
        let from = at(&doc, &editor, 49.0, 60);
        let to = at(&doc, &editor, 25.0, 60);
        drag(&mut editor, &mut doc, from, to, Modifiers::NONE);
        let note = only_note(&doc);
        assert_eq!((note.start, note.end), (24, 48));
    }

    #[test]
    fn dragging_the_end_pin_resizes() {
        let (mut doc, mut editor) = setup(12);
        let p = at(&doc, &editor, 1.0, 60);
        editor.pointer_pressed(&mut doc, p, Modifiers::NONE).expect("press");
        editor.pointer_released(&mut doc, p).expect("release");
        let end_pin = at(&doc, &editor, 11.0, 60);
        let to = at(&doc, &editor, 35.0, 60);
        drag(&mut editor, &mut doc, end_pin, to, Modifiers::NONE);
        let note = only_note(&doc);
        assert_eq!((note.start, note.end), (0, 36));
    }

    #[test]
    fn vertical_drag_on_note_body_bends_size_in_even_steps() {
        let (mut doc, mut editor) = setup(24);
        let p = at(&doc, &editor, 1.0, 60);
        editor.pointer_pressed(&mut doc, p, Modifiers::NONE).expect("press");
        editor.pointer_released(&mut doc, p).expect("release");
        // Off-pitch row above the note's lane keeps pitch_index empty.
        let from = at(&doc, &editor, 23.0, 62);
        drag(&mut editor, &mut doc, from, from + Vec2::new(0.0, 40.0), Modifiers::NONE);
        let note = only_note(&doc);
        let last = note.last_pin();
        assert_eq!(last.time, 24);
        assert!(last.size < 6);
        assert_eq!(last.size % 2, 0);
    }

    #[test]
    fn vertical_drag_on_pitch_bends_it() {
        let (mut doc, mut editor) = setup(24);
        let p = at(&doc, &editor, 1.0, 60);
        editor.pointer_pressed(&mut doc, p, Modifiers::NONE).expect("press");
        editor.pointer_released(&mut doc, p).expect("release");
        let from = at(&doc, &editor, 13.0, 60);
        let to = at(&doc, &editor, 19.0, 64);
        // Mostly vertical so the drag is classified as a bend.
        let to = Pos2::new(from.x + 2.0, to.y);
        drag(&mut editor, &mut doc, from, to, Modifiers::NONE);
        let note = only_note(&doc);
        assert_eq!(note.pitches, vec![60]);
        assert!(note.pins.iter().any(|p| p.interval == 4));
    }

    #[test]
    fn ctrl_bend_on_modulator_links_adjacent_note() {
        let mut song = Song::new(&[ChannelKind::Pitch, ChannelKind::Mod], 4);
        song.channels[1].instruments[0].modulators[5].setting = ModSetting::SongVolume;
        let mut doc = SongDocument::new(song);
        doc.channel = 1;
        let at_ref = PatternRef::new(1, 0);
        let left = Note::new(0, 0, 24, 50, false);
        let right = Note::new(0, 24, 48, 50, false);
        let (left_id, right_id) = (left.id, right.id);
        doc.record(
            &ChangeSequence::new()
                .with(Change::EnsurePatternExists { at: at_ref, instrument: 0 })
                .with(Change::NoteAdded { at: at_ref, note: left, index: 0 })
                .with(Change::NoteAdded { at: at_ref, note: right, index: 1 }),
        )
        .expect("seed");

        let mut editor = PatternEditor::default();
        editor.set_size(Vec2::new(768.0, 120.0));
        let g = PatternGeometry::for_channel(&doc.song, 1, editor.size());
        let from = Pos2::new(g.part_to_pixel(23.0), g.pitch_to_pixel(0));
        drag(&mut editor, &mut doc, from, from + Vec2::new(0.0, -30.0), Modifiers::COMMAND);

        let pattern = doc.current_pattern(0).expect("pattern");
        let left = pattern.note(left_id).expect("left");
        let right = pattern.note(right_id).expect("right");
        assert!(left.last_pin().size > 50);
        assert_eq!(left.last_pin().size, right.pins[0].size);
    }

    #[test]
    fn moving_modulator_start_before_the_bar_marks_continuation() {
        let mut song = Song::new(&[ChannelKind::Pitch, ChannelKind::Mod], 4);
        song.channels[1].instruments[0].modulators[5].setting = ModSetting::SongVolume;
        let mut doc = SongDocument::new(song);
        doc.channel = 1;
        let at_ref = PatternRef::new(1, 0);
        let note = Note::new(0, 0, 24, 50, false);
        let id = note.id;
        doc.record(
            &ChangeSequence::new()
                .with(Change::EnsurePatternExists { at: at_ref, instrument: 0 })
                .with(Change::NoteAdded { at: at_ref, note, index: 0 }),
        )
        .expect("seed");

        let mut editor = PatternEditor::default();
        editor.set_size(Vec2::new(768.0, 120.0));
        let g = PatternGeometry::for_channel(&doc.song, 1, editor.size());
        // Below the row centre, clear of the value label.
        let from = Pos2::new(g.part_to_pixel(2.0), g.pitch_to_pixel(0) + 3.0);
        editor.pointer_moved(&mut doc, from, Modifiers::NONE).expect("hover");
        editor.pointer_pressed(&mut doc, from, Modifiers::NONE).expect("press");
        let before_bar = from - Vec2::new(g.part_width() as f32 * 24.0, 0.0);
        editor.pointer_moved(&mut doc, before_bar, Modifiers::NONE).expect("drag");

        let moved = doc.current_pattern(0).and_then(|p| p.note(id)).expect("note");
        assert_eq!(moved.start, 0);
        assert!(moved.continues_last_pattern);
    }
}
