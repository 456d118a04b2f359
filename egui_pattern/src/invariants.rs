//! Structural checks run after every applied change.

use crate::change::{Change, ChangeSequence};
use crate::error::{EditorError, Result};
use crate::structure::{ChannelKind, Note, Pattern, Song};

pub fn check_song(song: &Song) -> Result<()> {
    for channel in 0..song.channels.len() {
        check_channel(song, channel)?;
    }
    Ok(())
}

/// Checks only what `change` can have touched: its patterns, plus every pattern
/// of a channel whose modulator slots it reassigned.
pub fn check_change(song: &Song, change: &ChangeSequence) -> Result<()> {
    let mut channels: Vec<usize> = Vec::new();
    let mut patterns: Vec<(usize, usize)> = Vec::new();
    for edit in change.edits() {
        if let Change::ModSlotAssigned { channel, .. } = edit {
            if !channels.contains(channel) {
                channels.push(*channel);
            }
        } else if let Some(at) = edit.pattern_ref() {
            let Some(index) = song.channel(at.channel)?.pattern_index(at.bar) else {
                continue;
            };
            if !patterns.contains(&(at.channel, index)) {
                patterns.push((at.channel, index));
            }
        }
    }
    for &channel in &channels {
        check_channel(song, channel)?;
    }
    for (channel, index) in patterns {
        if channels.contains(&channel) {
            continue;
        }
        let pattern = &song.channel(channel)?.patterns[index];
        check_pattern(song, channel, index, pattern)?;
    }
    Ok(())
}

pub fn check_channel(song: &Song, channel: usize) -> Result<()> {
    let ch = song.channel(channel)?;
    for (index, pattern) in ch.patterns.iter().enumerate() {
        check_pattern(song, channel, index, pattern)?;
    }
    Ok(())
}

pub fn check_pattern(song: &Song, channel: usize, index: usize, pattern: &Pattern) -> Result<()> {
    let kind = song.channel_kind(channel);
    let max_pitch = song.max_pitch(channel);

    for note in &pattern.notes {
        check_note(note).map_err(|reason| EditorError::invariant(channel, index, reason))?;
        if note.pitches.iter().any(|&p| p < 0 || p > max_pitch) {
            return Err(EditorError::invariant(
                channel,
                index,
                format!("note {:?} has pitch outside 0..={max_pitch}", note.id),
            ));
        }
        if kind == ChannelKind::Mod && note.pitches.len() != 1 {
            return Err(EditorError::invariant(
                channel,
                index,
                format!("modulator note {:?} must target exactly one slot", note.id),
            ));
        }
        let cap = song.bound_volume_cap(channel, &pattern.instruments, 0, note.pitches[0]);
        if let Some(pin) = note.pins.iter().find(|p| p.size > cap) {
            return Err(EditorError::invariant(
                channel,
                index,
                format!("note {:?} size {} above cap {cap}", note.id, pin.size),
            ));
        }
    }

    for pair in pattern.notes.windows(2) {
        let key = |n: &Note| (n.start, n.pitches.first().copied());
        if key(&pair[0]) > key(&pair[1]) {
            return Err(EditorError::invariant(
                channel,
                index,
                format!("notes {:?} and {:?} out of order", pair[0].id, pair[1].id),
            ));
        }
    }

    // Pitched and drum patterns are monophonic in time; modulator rows are independent.
    for (i, a) in pattern.notes.iter().enumerate() {
        for b in &pattern.notes[i + 1..] {
            let same_lane = kind != ChannelKind::Mod || a.pitches.first() == b.pitches.first();
            if same_lane && a.start < b.end && b.start < a.end {
                return Err(EditorError::invariant(
                    channel,
                    index,
                    format!("notes {:?} and {:?} overlap", a.id, b.id),
                ));
            }
        }
    }
    Ok(())
}

/// Pin-list shape rules every note must satisfy.
pub fn check_note(note: &Note) -> std::result::Result<(), String> {
    if note.pitches.is_empty() {
        return Err(format!("note {:?} has no pitches", note.id));
    }
    if note.pins.len() < 2 {
        return Err(format!("note {:?} has {} pins", note.id, note.pins.len()));
    }
    if note.pins[0].time != 0 {
        return Err(format!("note {:?} first pin at {}", note.id, note.pins[0].time));
    }
    if note.last_pin().time != note.end - note.start {
        return Err(format!(
            "note {:?} last pin at {} but length is {}",
            note.id,
            note.last_pin().time,
            note.end - note.start
        ));
    }
    if note.pins.windows(2).any(|w| w[0].time >= w[1].time) {
        return Err(format!("note {:?} pin times not increasing", note.id));
    }
    if note.pins.iter().any(|p| p.size < 0) {
        return Err(format!("note {:?} has a negative size", note.id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NOTE_SIZE_MAX;
    use crate::structure::{NotePin, Pattern};

    fn song_with(kind: ChannelKind, notes: Vec<Note>) -> Song {
        let mut song = Song::new(&[kind], 1);
        song.channels[0].patterns.push(Pattern {
            notes,
            instruments: vec![0],
        });
        song.channels[0].bars[0] = 1;
        song
    }

    #[test]
    fn accepts_well_formed_pattern() {
        let song = song_with(
            ChannelKind::Pitch,
            vec![
                Note::new(60, 0, 6, NOTE_SIZE_MAX, false),
                Note::new(62, 6, 12, NOTE_SIZE_MAX, false),
            ],
        );
        assert!(check_song(&song).is_ok());
    }

    #[test]
    fn rejects_single_pin_note() {
        let mut note = Note::new(60, 0, 6, NOTE_SIZE_MAX, false);
        note.pins.truncate(1);
        assert!(check_note(&note).is_err());
    }

    #[test]
    fn rejects_misplaced_last_pin() {
        let mut note = Note::new(60, 0, 6, NOTE_SIZE_MAX, false);
        note.pins[1] = NotePin::new(0, 5, NOTE_SIZE_MAX);
        assert!(check_note(&note).is_err());
    }

    #[test]
    fn rejects_overlap_on_pitched_channel() {
        let song = song_with(
            ChannelKind::Pitch,
            vec![
                Note::new(60, 0, 8, NOTE_SIZE_MAX, false),
                Note::new(64, 4, 12, NOTE_SIZE_MAX, false),
            ],
        );
        assert!(matches!(
            check_song(&song),
            Err(EditorError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn modulator_rows_may_overlap_each_other() {
        let song = song_with(
            ChannelKind::Mod,
            vec![Note::new(4, 0, 8, 3, false), Note::new(5, 0, 8, 3, false)],
        );
        assert!(check_song(&song).is_ok());
    }

    #[test]
    fn modulator_size_above_cap_is_rejected() {
        let song = song_with(ChannelKind::Mod, vec![Note::new(5, 0, 8, NOTE_SIZE_MAX + 1, false)]);
        assert!(check_song(&song).is_err());
    }

    #[test]
    fn change_check_covers_only_touched_patterns() {
        use crate::change::PatternRef;
        let song = song_with(
            ChannelKind::Pitch,
            vec![
                Note::new(60, 0, 8, NOTE_SIZE_MAX, false),
                Note::new(64, 4, 12, NOTE_SIZE_MAX, false),
            ],
        );
        let elsewhere = ChangeSequence::single(Change::PatternSelection { start: 0, end: 8 });
        assert!(check_change(&song, &elsewhere).is_ok());
        let here = ChangeSequence::single(Change::NoteTruncate {
            at: PatternRef::new(0, 0),
            start: 20,
            end: 24,
            skip: None,
            lane: crate::change::Lane::All,
        });
        assert!(check_change(&song, &here).is_err());
    }

    #[test]
    fn modulator_cap_comes_from_any_bound_instrument() {
        use crate::modulator::{pitch_for_slot, ModSetting};
        let row = pitch_for_slot(0);
        let mut song = song_with(ChannelKind::Mod, vec![Note::new(row, 0, 8, 110, false)]);
        song.channels[0].instruments.push(Default::default());
        song.channels[0].instruments[1].modulators[0].setting = ModSetting::Tempo;
        assert!(check_song(&song).is_err());
        song.channels[0].patterns[0].instruments = vec![0, 1];
        assert!(check_song(&song).is_ok());
    }
}
