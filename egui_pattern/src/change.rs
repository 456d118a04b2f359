//! Re-applicable edit descriptions.
//!
//! A [`ChangeSequence`] is built from scratch for every pointer move and applied
//! on top of a base snapshot, so every [`Change`] refers to notes by id and to
//! patterns by channel and bar rather than by reference.

use crate::error::{EditorError, Result};
use crate::modulator::{FilterParam, ModSetting, ModSlot, ModSource};
use crate::pins;
use crate::structure::{
    ChannelKind, Note, NoteId, NotePin, ParameterTarget, Pattern, PatternSelection, Song,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static CHANGE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeId(pub u64);

impl ChangeId {
    pub fn next() -> Self {
        ChangeId(CHANGE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRef {
    pub channel: usize,
    pub bar: usize,
}

impl PatternRef {
    pub fn new(channel: usize, bar: usize) -> Self {
        Self { channel, bar }
    }
}

/// Which notes a truncation may touch. Modulator rows never collide with each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lane {
    All,
    Pitch(i32),
}

impl Lane {
    pub fn includes(self, note: &Note) -> bool {
        match self {
            Lane::All => true,
            Lane::Pitch(pitch) => note.pitches.first() == Some(&pitch),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Change {
    PatternSelection {
        start: i32,
        end: i32,
    },
    /// Creates the pattern for the bar if missing and binds the instrument to it.
    EnsurePatternExists {
        at: PatternRef,
        instrument: usize,
    },
    NoteAdded {
        at: PatternRef,
        note: Note,
        index: usize,
    },
    NoteRemoved {
        at: PatternRef,
        note: NoteId,
    },
    /// Clears `[start, end)`: spanning notes are split, edge notes clipped, contained notes removed.
    NoteTruncate {
        at: PatternRef,
        start: i32,
        end: i32,
        skip: Option<NoteId>,
        lane: Lane,
    },
    NoteLength {
        at: PatternRef,
        note: NoteId,
        start: i32,
        end: i32,
    },
    PinTime {
        at: PatternRef,
        note: NoteId,
        pin_index: usize,
        shifted_time: i32,
        continues_last_pattern: bool,
    },
    SizeBend {
        at: PatternRef,
        note: NoteId,
        bend_part: i32,
        size: i32,
        interval: i32,
        uniform: bool,
    },
    PitchBend {
        at: PatternRef,
        note: NoteId,
        bend_start: i32,
        bend_end: i32,
        bend_to: i32,
        pitch_index: usize,
    },
    /// Appends absolute-time pins after the note's current end.
    PinsAppended {
        at: PatternRef,
        note: NoteId,
        pins: Vec<(i32, i32)>,
    },
    PitchAdded {
        at: PatternRef,
        note: NoteId,
        pitch: i32,
        index: usize,
    },
    PitchRemoved {
        at: PatternRef,
        note: NoteId,
        pitch: i32,
    },
    DragSelectedNotes {
        at: PatternRef,
        parts: i32,
        transpose: i32,
        chromatic: bool,
    },
    ModSlotAssigned {
        channel: usize,
        instrument: usize,
        slot: usize,
        setting: ModSetting,
        source: ModSource,
        filter: Option<FilterParam>,
    },
    BaseParameter {
        target: ParameterTarget,
        value: f64,
    },
}

fn pattern_mut(song: &mut Song, at: PatternRef) -> Result<&mut Pattern> {
    song.pattern_mut(at.channel, at.bar)
        .ok_or(EditorError::MissingPattern {
            channel: at.channel,
            bar: at.bar,
        })
}

fn note_mut(song: &mut Song, at: PatternRef, id: NoteId) -> Result<&mut Note> {
    pattern_mut(song, at)?
        .note_mut(id)
        .ok_or(EditorError::MissingNote(id))
}

impl Change {
    /// Pattern the edit writes to, if it targets one.
    pub fn pattern_ref(&self) -> Option<PatternRef> {
        match self {
            Change::EnsurePatternExists { at, .. }
            | Change::NoteAdded { at, .. }
            | Change::NoteRemoved { at, .. }
            | Change::NoteTruncate { at, .. }
            | Change::NoteLength { at, .. }
            | Change::PinTime { at, .. }
            | Change::SizeBend { at, .. }
            | Change::PitchBend { at, .. }
            | Change::PinsAppended { at, .. }
            | Change::PitchAdded { at, .. }
            | Change::PitchRemoved { at, .. }
            | Change::DragSelectedNotes { at, .. } => Some(*at),
            Change::PatternSelection { .. }
            | Change::ModSlotAssigned { .. }
            | Change::BaseParameter { .. } => None,
        }
    }

    pub fn apply(&self, song: &mut Song, selection: &mut PatternSelection) -> Result<()> {
        match self {
            Change::PatternSelection { start, end } => {
                *selection = if start < end {
                    PatternSelection::new(*start, *end)
                } else {
                    PatternSelection::default()
                };
            }
            Change::EnsurePatternExists { at, instrument } => {
                let bar_count = song.bar_count;
                let channel = song.channel_mut(at.channel)?;
                if channel.bars.len() < bar_count {
                    channel.bars.resize(bar_count, 0);
                }
                match channel.pattern_index(at.bar) {
                    Some(index) => {
                        let pattern = &mut channel.patterns[index];
                        if !pattern.instruments.contains(instrument) {
                            pattern.instruments.push(*instrument);
                        }
                    }
                    None => {
                        if at.bar >= channel.bars.len() {
                            return Err(EditorError::MissingPattern {
                                channel: at.channel,
                                bar: at.bar,
                            });
                        }
                        channel.patterns.push(Pattern::with_instrument(*instrument));
                        channel.bars[at.bar] = channel.patterns.len();
                    }
                }
            }
            Change::NoteAdded { at, note, index } => {
                let pattern = pattern_mut(song, *at)?;
                let index = (*index).min(pattern.notes.len());
                pattern.notes.insert(index, note.clone());
                pattern.sort_notes();
            }
            Change::NoteRemoved { at, note } => {
                let pattern = pattern_mut(song, *at)?;
                let index = pattern
                    .note_index(*note)
                    .ok_or(EditorError::MissingNote(*note))?;
                pattern.notes.remove(index);
            }
            Change::NoteTruncate {
                at,
                start,
                end,
                skip,
                lane,
            } => truncate(pattern_mut(song, *at)?, *start, *end, *skip, *lane),
            Change::NoteLength {
                at,
                note,
                start,
                end,
            } => {
                let note = note_mut(song, *at, *note)?;
                let new_pins = pins::truncated_pins(note, *start, *end);
                pins::finish_setup(note, new_pins);
            }
            Change::PinTime {
                at,
                note,
                pin_index,
                shifted_time,
                continues_last_pattern,
            } => {
                let note = note_mut(song, *at, *note)?;
                if *pin_index >= note.pins.len() {
                    return Err(EditorError::MissingNote(note.id));
                }
                let new_pins = pins::pin_time_pins(note, *pin_index, *shifted_time);
                pins::finish_setup(note, new_pins);
                if *pin_index == 0 {
                    note.continues_last_pattern = *continues_last_pattern;
                }
            }
            Change::SizeBend {
                at,
                note,
                bend_part,
                size,
                interval,
                uniform,
            } => {
                let note = note_mut(song, *at, *note)?;
                let new_pins = pins::size_bend_pins(note, *bend_part, *size, *interval, *uniform);
                pins::finish_setup(note, new_pins);
            }
            Change::PitchBend {
                at,
                note,
                bend_start,
                bend_end,
                bend_to,
                pitch_index,
            } => {
                let note = note_mut(song, *at, *note)?;
                let new_pins =
                    pins::pitch_bend_pins(note, *bend_start, *bend_end, *bend_to, *pitch_index);
                pins::finish_setup(note, new_pins);
                pattern_mut(song, *at)?.sort_notes();
            }
            Change::PinsAppended {
                at,
                note,
                pins: appended,
            } => {
                let note = note_mut(song, *at, *note)?;
                let interval = note.last_pin().interval;
                let mut new_pins = note.pins.clone();
                new_pins.extend(
                    appended
                        .iter()
                        .map(|&(time, size)| NotePin::new(interval, time - note.start, size)),
                );
                pins::finish_setup(note, new_pins);
            }
            Change::PitchAdded {
                at,
                note,
                pitch,
                index,
            } => {
                let note = note_mut(song, *at, *note)?;
                let index = (*index).min(note.pitches.len());
                note.pitches.insert(index, *pitch);
            }
            Change::PitchRemoved { at, note, pitch } => {
                let note = note_mut(song, *at, *note)?;
                note.pitches.retain(|p| p != pitch);
            }
            Change::DragSelectedNotes {
                at,
                parts,
                transpose,
                chromatic,
            } => drag_selected_notes(song, selection, *at, *parts, *transpose, *chromatic)?,
            Change::ModSlotAssigned {
                channel,
                instrument,
                slot,
                setting,
                source,
                filter,
            } => {
                let inst = song.instrument_mut(*channel, *instrument)?;
                if let Some(target) = inst.modulators.get_mut(*slot) {
                    *target = ModSlot {
                        setting: *setting,
                        source: *source,
                        filter: *filter,
                    };
                }
            }
            Change::BaseParameter { target, value } => song.set_parameter(*target, *value)?,
        }
        Ok(())
    }
}

/// Clears `[start, end)` in the lane, leaving `skip` untouched.
pub fn truncate(pattern: &mut Pattern, start: i32, end: i32, skip: Option<NoteId>, lane: Lane) {
    if start >= end {
        return;
    }
    let mut i = 0;
    while i < pattern.notes.len() {
        let note = &pattern.notes[i];
        if Some(note.id) == skip || !lane.includes(note) || note.end <= start || note.start >= end
        {
            i += 1;
        } else if note.start < start && note.end > end {
            let mut tail = pattern.notes[i].duplicate();
            let head = &mut pattern.notes[i];
            let head_pins = pins::truncated_pins(head, head.start, start);
            let tail_pins = pins::truncated_pins(&tail, end, tail.end);
            pins::finish_setup(head, head_pins);
            pins::finish_setup(&mut tail, tail_pins);
            pattern.notes.insert(i + 1, tail);
            i += 2;
        } else if note.start < start {
            let head = &mut pattern.notes[i];
            let new_pins = pins::truncated_pins(head, head.start, start);
            pins::finish_setup(head, new_pins);
            i += 1;
        } else if note.end > end {
            let tail = &mut pattern.notes[i];
            let new_pins = pins::truncated_pins(tail, end, tail.end);
            pins::finish_setup(tail, new_pins);
            i += 1;
        } else {
            pattern.notes.remove(i);
        }
    }
    pattern.sort_notes();
}

/// Moves `pitch` by `steps` scale degrees, stopping at the channel bounds.
pub fn transpose_pitch(song: &Song, channel: usize, pitch: i32, steps: i32, chromatic: bool) -> i32 {
    let max = song.max_pitch(channel);
    let scaled = song.channel_kind(channel) == ChannelKind::Pitch && !chromatic;
    let direction = steps.signum();
    let mut result = pitch;
    for _ in 0..steps.abs() {
        let mut candidate = result + direction;
        while scaled && candidate >= 0 && candidate <= max && !song.scale.contains(candidate) {
            candidate += direction;
        }
        if candidate < 0 || candidate > max {
            break;
        }
        result = candidate;
    }
    result
}

fn drag_selected_notes(
    song: &mut Song,
    selection: &mut PatternSelection,
    at: PatternRef,
    parts: i32,
    transpose: i32,
    chromatic: bool,
) -> Result<()> {
    if !selection.is_active() || (parts == 0 && transpose == 0) {
        return Ok(());
    }
    let bar_parts = song.parts_per_bar();
    let old = *selection;
    let new_start = (old.start + parts).clamp(0, bar_parts);
    let new_end = (old.end + parts).clamp(0, bar_parts);

    let (moved, bound): (Vec<Note>, Vec<usize>) = {
        let pattern = song.pattern(at.channel, at.bar).ok_or(EditorError::MissingPattern {
            channel: at.channel,
            bar: at.bar,
        })?;
        let moved = pattern
            .notes
            .iter()
            .filter_map(|n| pins::slice_note(n, old.start, old.end))
            .collect();
        (moved, pattern.instruments.clone())
    };
    let is_mod = song.channel_kind(at.channel) == ChannelKind::Mod;

    let mut shifted = Vec::with_capacity(moved.len());
    for mut note in moved {
        note.start += parts;
        note.end += parts;
        let Some(sliced) = pins::slice_note(&note, 0, bar_parts) else {
            continue;
        };
        // The part left behind keeps the original id.
        let mut note = sliced.duplicate();
        if transpose != 0 {
            let mut pitches: Vec<i32> = Vec::with_capacity(note.pitches.len());
            for &p in &note.pitches {
                let t = transpose_pitch(song, at.channel, p, transpose, chromatic);
                if !pitches.contains(&t) {
                    pitches.push(t);
                }
            }
            note.pitches = pitches;
            // A modulator row takes the value range of the slot it lands on.
            if is_mod {
                let cap = song.bound_volume_cap(at.channel, &bound, 0, note.pitches[0]);
                pins::fit_to_cap(&mut note.pins, cap);
            }
        }
        // Transposing against a bound can fold two modulator rows together.
        let collides = |other: &Note| {
            other.pitches.first() == note.pitches.first()
                && other.start < note.end
                && note.start < other.end
        };
        if shifted.iter().any(collides) {
            continue;
        }
        shifted.push(note);
    }

    let pattern = pattern_mut(song, at)?;
    truncate(pattern, old.start, old.end, None, Lane::All);
    truncate(pattern, new_start, new_end, None, Lane::All);
    pattern.notes.extend(shifted);
    pattern.sort_notes();
    *selection = if new_start < new_end {
        PatternSelection::new(new_start, new_end)
    } else {
        PatternSelection::default()
    };
    Ok(())
}

/// An immutable list of changes applied and recorded as one undo step.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeSequence {
    id: ChangeId,
    changes: Vec<Change>,
}

impl Default for ChangeSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSequence {
    pub fn new() -> Self {
        Self {
            id: ChangeId::next(),
            changes: Vec::new(),
        }
    }

    pub fn single(change: Change) -> Self {
        Self::new().with(change)
    }

    pub fn with(mut self, change: Change) -> Self {
        self.changes.push(change);
        self
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn id(&self) -> ChangeId {
        self.id
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn edits(&self) -> &[Change] {
        &self.changes
    }

    pub fn apply(&self, song: &mut Song, selection: &mut PatternSelection) -> Result<()> {
        for change in &self.changes {
            change.apply(song, selection)?;
        }
        Ok(())
    }
}
