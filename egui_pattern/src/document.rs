//! Song document with snapshot undo history and one prospective change slot.

use crate::change::{ChangeId, ChangeSequence};
use crate::config::MAX_HISTORY;
use crate::error::Result;
use crate::invariants;
use crate::structure::{ParameterTarget, Pattern, PatternSelection, Song};

#[derive(Clone, Debug, PartialEq)]
struct Snapshot {
    song: Song,
    selection: PatternSelection,
}

#[derive(Clone, Debug)]
struct Prospective {
    base: Snapshot,
    id: ChangeId,
}

#[derive(Clone, Debug)]
pub struct SongDocument {
    pub song: Song,
    pub channel: usize,
    pub bar: usize,
    /// Instrument shown for bars that have no pattern yet.
    pub instrument: usize,
    pub selection: PatternSelection,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    prospective: Option<Prospective>,
    last_recorded: Option<ChangeId>,
}

impl Default for SongDocument {
    fn default() -> Self {
        Self::new(Song::default())
    }
}

impl SongDocument {
    pub fn new(song: Song) -> Self {
        Self {
            song,
            channel: 0,
            bar: 0,
            instrument: 0,
            selection: PatternSelection::default(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            prospective: None,
            last_recorded: None,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            song: self.song.clone(),
            selection: self.selection,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.song = snapshot.song;
        self.selection = snapshot.selection;
    }

    fn apply_checked(&mut self, change: &ChangeSequence) -> Result<()> {
        change.apply(&mut self.song, &mut self.selection)?;
        invariants::check_change(&self.song, change)
    }

    /// Applies `change` on top of the base state, replacing any earlier prospective change.
    pub fn set_prospective_change(&mut self, change: &ChangeSequence) -> Result<()> {
        let base = match self.prospective.take() {
            Some(previous) => {
                self.restore(previous.base.clone());
                previous.base
            }
            None => self.snapshot(),
        };
        if let Err(err) = self.apply_checked(change) {
            self.restore(base);
            return Err(err);
        }
        self.prospective = Some(Prospective {
            base,
            id: change.id(),
        });
        Ok(())
    }

    /// Commits `change` as one undo step.
    ///
    /// If it is the current prospective change it is already applied; otherwise
    /// any prospective change is rolled back first.
    pub fn record(&mut self, change: &ChangeSequence) -> Result<()> {
        let base = match self.prospective.take() {
            Some(p) if p.id == change.id() => p.base,
            Some(p) => {
                self.restore(p.base.clone());
                if let Err(err) = self.apply_checked(change) {
                    self.restore(p.base);
                    return Err(err);
                }
                p.base
            }
            None => {
                let base = self.snapshot();
                if let Err(err) = self.apply_checked(change) {
                    self.restore(base);
                    return Err(err);
                }
                base
            }
        };
        self.push_undo_snapshot(base);
        self.last_recorded = Some(change.id());
        Ok(())
    }

    pub fn discard_prospective_change(&mut self) {
        if let Some(p) = self.prospective.take() {
            self.restore(p.base);
        }
    }

    pub fn last_change_was(&self, id: ChangeId) -> bool {
        match &self.prospective {
            Some(p) => p.id == id,
            None => self.last_recorded == Some(id),
        }
    }

    /// True when the prospective change left the document unchanged.
    pub fn is_prospective_noop(&self) -> bool {
        match &self.prospective {
            Some(p) => p.base.song == self.song && p.base.selection == self.selection,
            None => true,
        }
    }

    /// Sets a live parameter without adding an undo step, the way a host slider does.
    pub fn set_parameter_untracked(&mut self, target: ParameterTarget, value: f64) -> Result<()> {
        if let Some(p) = self.prospective.as_mut() {
            p.base.song.set_parameter(target, value)?;
        }
        self.song.set_parameter(target, value)
    }

    fn push_undo_snapshot(&mut self, snapshot: Snapshot) {
        self.undo_stack.push(snapshot);
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    pub fn undo(&mut self) -> bool {
        self.discard_prospective_change();
        if let Some(previous) = self.undo_stack.pop() {
            self.redo_stack.push(self.snapshot());
            self.restore(previous);
            self.last_recorded = None;
            return true;
        }
        false
    }

    pub fn redo(&mut self) -> bool {
        self.discard_prospective_change();
        if let Some(next) = self.redo_stack.pop() {
            self.undo_stack.push(self.snapshot());
            self.restore(next);
            self.last_recorded = None;
            return true;
        }
        false
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Loads a different song. Any running gesture is left stale.
    pub fn replace_song(&mut self, song: Song) {
        self.song = song;
        self.selection = PatternSelection::default();
        self.prospective = None;
        self.last_recorded = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Song as it was before the running prospective change.
    pub fn base_song(&self) -> &Song {
        self.prospective
            .as_ref()
            .map(|p| &p.base.song)
            .unwrap_or(&self.song)
    }

    pub fn base_selection(&self) -> PatternSelection {
        self.prospective
            .as_ref()
            .map(|p| p.base.selection)
            .unwrap_or(self.selection)
    }

    pub fn base_pattern(&self, bar_offset: isize) -> Option<&Pattern> {
        let bar = self.bar.checked_add_signed(bar_offset)?;
        self.base_song().pattern(self.channel, bar)
    }

    pub fn current_pattern(&self, bar_offset: isize) -> Option<&Pattern> {
        let bar = self.bar.checked_add_signed(bar_offset)?;
        self.song.pattern(self.channel, bar)
    }

    pub fn current_instrument(&self, bar_offset: isize) -> usize {
        self.current_pattern(bar_offset)
            .and_then(|p| p.instruments.first().copied())
            .unwrap_or(self.instrument)
    }

    /// Size cap for a row of the current pattern, across every bound instrument.
    pub fn current_volume_cap(&self, pitch: i32) -> i32 {
        let bound = self
            .current_pattern(0)
            .map_or(&[][..], |p| p.instruments.as_slice());
        self.song
            .bound_volume_cap(self.channel, bound, self.instrument, pitch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{Change, PatternRef};
    use crate::config::NOTE_SIZE_MAX;
    use crate::structure::Note;

    fn add_note(start: i32) -> ChangeSequence {
        let at = PatternRef::new(0, 0);
        ChangeSequence::new()
            .with(Change::EnsurePatternExists { at, instrument: 0 })
            .with(Change::NoteAdded {
                at,
                note: Note::new(60, start, start + 6, NOTE_SIZE_MAX, false),
                index: 0,
            })
    }

    fn note_starts(doc: &SongDocument) -> Vec<i32> {
        doc.current_pattern(0)
            .map(|p| p.notes.iter().map(|n| n.start).collect())
            .unwrap_or_default()
    }

    #[test]
    fn prospective_changes_replace_each_other() {
        let mut doc = SongDocument::default();
        let first = add_note(0);
        doc.set_prospective_change(&first).expect("first");
        assert_eq!(note_starts(&doc), vec![0]);
        let second = add_note(12);
        doc.set_prospective_change(&second).expect("second");
        assert_eq!(note_starts(&doc), vec![12]);
        assert!(!doc.last_change_was(first.id()));
        assert!(doc.last_change_was(second.id()));
    }

    #[test]
    fn record_commits_prospective_and_undo_restores() {
        let mut doc = SongDocument::default();
        let change = add_note(6);
        doc.set_prospective_change(&change).expect("apply");
        doc.record(&change).expect("record");
        assert_eq!(note_starts(&doc), vec![6]);
        assert!(doc.undo());
        assert!(doc.current_pattern(0).is_none());
        assert!(doc.redo());
        assert_eq!(note_starts(&doc), vec![6]);
    }

    #[test]
    fn failed_change_leaves_document_untouched() {
        let mut doc = SongDocument::default();
        let bad = ChangeSequence::single(Change::NoteRemoved {
            at: PatternRef::new(0, 0),
            note: crate::structure::NoteId::next(),
        });
        assert!(doc.set_prospective_change(&bad).is_err());
        assert!(doc.current_pattern(0).is_none());
        assert!(!doc.last_change_was(bad.id()));
    }

    #[test]
    fn replacing_song_makes_running_change_stale() {
        let mut doc = SongDocument::default();
        let change = add_note(0);
        doc.set_prospective_change(&change).expect("apply");
        doc.replace_song(Song::default());
        assert!(!doc.last_change_was(change.id()));
        assert!(!doc.can_undo());
    }

    #[test]
    fn empty_prospective_change_is_noop() {
        let mut doc = SongDocument::default();
        doc.set_prospective_change(&ChangeSequence::new())
            .expect("empty");
        assert!(doc.is_prospective_noop());
        doc.set_prospective_change(&add_note(0)).expect("note");
        assert!(!doc.is_prospective_noop());
    }
}
