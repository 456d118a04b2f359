//! 调制自动录制
//!
//! While a parameter control is dragged, [`ModRecorder`] writes the live value
//! into every modulator slot listening to that parameter, allocating a free
//! slot when none listens yet. Each call is one undo step.

use crate::change::{Change, ChangeSequence, Lane, PatternRef};
use crate::config::{MOD_COUNT, PARTS_PER_BEAT};
use crate::document::SongDocument;
use crate::editor::{EditorEvent, PatternEditorOptions};
use crate::error::Result;
use crate::modulator::{
    pitch_for_slot, FilterParam, FilterTarget, InstrumentSelector, ModSetting, ModSlot, ModSource,
    OPERATOR_COUNT,
};
use crate::pins::{self, round_half_up};
use crate::structure::{ChannelKind, Note, ParameterTarget, Song};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    pub old: f64,
    pub new: f64,
}

impl ValueChange {
    pub fn new(old: f64, new: f64) -> Self {
        Self { old, new }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Eq,
    Note,
}

/// A base parameter edit the recorder can mirror into modulator notes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParameterChange {
    Tempo(ValueChange),
    SongVolume(ValueChange),
    SongReverb(ValueChange),
    MixVolume(ValueChange),
    Pan(ValueChange),
    Reverb(ValueChange),
    Distortion(ValueChange),
    OperatorAmplitude { operator: u8, value: ValueChange },
    Detune(ValueChange),
    VibratoDepth(ValueChange),
    VibratoSpeed(ValueChange),
    VibratoDelay(ValueChange),
    ArpeggioSpeed(ValueChange),
    PanDelay(ValueChange),
    BitCrush(ValueChange),
    FreqCrush(ValueChange),
    Echo(ValueChange),
    Chorus(ValueChange),
    EqFilterCut(ValueChange),
    EqFilterPeak(ValueChange),
    NoteFilterCut(ValueChange),
    NoteFilterPeak(ValueChange),
    PitchShift(ValueChange),
    Sustain(ValueChange),
    EnvelopeSpeed(ValueChange),
    SupersawDynamism(ValueChange),
    SupersawSpread(ValueChange),
    SupersawShape(ValueChange),
    /// A dragged filter control point moves frequency and gain together.
    FilterMovePoint {
        target: FilterKind,
        point: usize,
        freq: f64,
        gain: f64,
    },
}

/// One modulator value to write.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Apply {
    setting: ModSetting,
    filter: Option<FilterParam>,
    value: f64,
}

impl ParameterChange {
    /// Slider value pair, if the edit came from a single slider.
    pub fn slider(&self) -> Option<(ModSetting, ValueChange)> {
        use ParameterChange as P;
        let pair = match *self {
            P::Tempo(v) => (ModSetting::Tempo, v),
            P::SongVolume(v) => (ModSetting::SongVolume, v),
            P::SongReverb(v) => (ModSetting::SongReverb, v),
            P::MixVolume(v) => (ModSetting::MixVolume, v),
            P::Pan(v) => (ModSetting::Pan, v),
            P::Reverb(v) => (ModSetting::Reverb, v),
            P::Distortion(v) => (ModSetting::Distortion, v),
            P::OperatorAmplitude { operator, value } => (ModSetting::OperatorAmplitude(operator), value),
            P::Detune(v) => (ModSetting::Detune, v),
            P::VibratoDepth(v) => (ModSetting::VibratoDepth, v),
            P::VibratoSpeed(v) => (ModSetting::VibratoSpeed, v),
            P::VibratoDelay(v) => (ModSetting::VibratoDelay, v),
            P::ArpeggioSpeed(v) => (ModSetting::ArpeggioSpeed, v),
            P::PanDelay(v) => (ModSetting::PanDelay, v),
            P::BitCrush(v) => (ModSetting::BitCrush, v),
            P::FreqCrush(v) => (ModSetting::FreqCrush, v),
            P::Echo(v) => (ModSetting::Echo, v),
            P::Chorus(v) => (ModSetting::Chorus, v),
            P::EqFilterCut(v) => (ModSetting::EqFilterCut, v),
            P::EqFilterPeak(v) => (ModSetting::EqFilterPeak, v),
            P::NoteFilterCut(v) => (ModSetting::NoteFilterCut, v),
            P::NoteFilterPeak(v) => (ModSetting::NoteFilterPeak, v),
            P::PitchShift(v) => (ModSetting::PitchShift, v),
            P::Sustain(v) => (ModSetting::Sustain, v),
            P::EnvelopeSpeed(v) => (ModSetting::EnvelopeSpeed, v),
            P::SupersawDynamism(v) => (ModSetting::SupersawDynamism, v),
            P::SupersawSpread(v) => (ModSetting::SupersawSpread, v),
            P::SupersawShape(v) => (ModSetting::SupersawShape, v),
            P::FilterMovePoint { .. } => return None,
        };
        Some(pair)
    }

    fn applies(&self) -> Vec<Apply> {
        match *self {
            ParameterChange::FilterMovePoint {
                target,
                point,
                freq,
                gain,
            } => {
                let setting = match target {
                    FilterKind::Eq => ModSetting::EqFilter,
                    FilterKind::Note => ModSetting::NoteFilter,
                };
                [(FilterTarget::Freq, freq), (FilterTarget::Gain, gain)]
                    .into_iter()
                    .map(|(target, value)| Apply {
                        setting,
                        filter: Some(FilterParam { point, target }),
                        value,
                    })
                    .collect()
            }
            _ => self
                .slider()
                .map(|(setting, value)| Apply {
                    setting,
                    filter: None,
                    value: value.new,
                })
                .into_iter()
                .collect(),
        }
    }
}

/// Where the edit happened and when.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordContext {
    /// Channel and instrument whose parameter was edited.
    pub channel: usize,
    pub instrument: usize,
    pub bar: usize,
    /// Playhead position within the bar.
    pub part: i32,
    pub from_slider: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedPoint {
    pub channel: usize,
    pub instrument: usize,
    pub slot: usize,
    pub part: i32,
    pub value: i32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordOutcome {
    pub recorded: Vec<RecordedPoint>,
    pub restored_base: bool,
}

/// Modulator slot chosen for one apply value.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SlotWrite {
    channel: usize,
    instrument: usize,
    slot: usize,
    slot_config: ModSlot,
    value: f64,
}

#[derive(Clone, Debug)]
struct Held {
    change: ParameterChange,
    writes: Vec<SlotWrite>,
}

pub struct ModRecorder {
    options: PatternEditorOptions,
    held: Option<Held>,
    pending_events: Vec<EditorEvent>,
}

impl ModRecorder {
    pub fn new(options: PatternEditorOptions) -> Self {
        Self {
            options: options.sanitized(),
            held: None,
            pending_events: Vec::new(),
        }
    }

    pub fn apply_options(&mut self, options: &PatternEditorOptions) {
        self.options = options.clone().sanitized();
    }

    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    /// Recording grid in parts for the song's rhythm.
    pub fn time_quantum(&self, song: &Song) -> i32 {
        self.options
            .mod_min_time_quantum
            .max(PARTS_PER_BEAT / song.rhythm.steps_per_beat().max(1))
    }

    /// Mirrors `change` into modulator notes at `ctx.part` and records the result.
    pub fn record(
        &mut self,
        doc: &mut SongDocument,
        change: ParameterChange,
        ctx: RecordContext,
    ) -> Result<RecordOutcome> {
        if let ParameterChange::OperatorAmplitude { operator, .. } = change {
            if operator >= OPERATOR_COUNT {
                log::debug!("operator {operator} has no amplitude modulator");
                return Ok(RecordOutcome::default());
            }
        }
        let mut seq = ChangeSequence::new();
        let writes = match &self.held {
            Some(held) if held.change == change => held.writes.clone(),
            _ => self.plan_writes(doc, change, ctx, &mut seq),
        };
        if writes.is_empty() {
            log::debug!("no modulator slot available for {:?}", change);
            self.held = None;
            return Ok(RecordOutcome::default());
        }
        let outcome = self.write(doc, &writes, change, ctx, seq)?;
        self.held = Some(Held { change, writes });
        Ok(outcome)
    }

    /// Re-records the held values at a new playhead position.
    pub fn continue_held(&mut self, doc: &mut SongDocument, ctx: RecordContext) -> Result<RecordOutcome> {
        let Some(held) = self.held.clone() else {
            return Ok(RecordOutcome::default());
        };
        self.write(doc, &held.writes, held.change, ctx, ChangeSequence::new())
    }

    /// Ends the held recording.
    pub fn release(&mut self) {
        self.held = None;
    }

    /// Finds listening slots for each apply value, allocating a free slot when none listens.
    fn plan_writes(
        &mut self,
        doc: &SongDocument,
        change: ParameterChange,
        ctx: RecordContext,
        seq: &mut ChangeSequence,
    ) -> Vec<SlotWrite> {
        let mut writes = Vec::new();
        for apply in change.applies() {
            let matched = matching_slots(&doc.song, apply, ctx);
            if !matched.is_empty() {
                writes.extend(matched);
                continue;
            }
            let taken: Vec<(usize, usize, usize)> = writes
                .iter()
                .map(|w: &SlotWrite| (w.channel, w.instrument, w.slot))
                .collect();
            match free_slot(&doc.song, apply, ctx, &taken) {
                Some(write) => {
                    log::debug!(
                        "allocating modulator slot {} of channel {} instrument {} to {:?}",
                        write.slot,
                        write.channel,
                        write.instrument,
                        apply.setting
                    );
                    seq.push(Change::ModSlotAssigned {
                        channel: write.channel,
                        instrument: write.instrument,
                        slot: write.slot,
                        setting: write.slot_config.setting,
                        source: write.slot_config.source,
                        filter: write.slot_config.filter,
                    });
                    self.pending_events.push(EditorEvent::ModSlotAllocated {
                        channel: write.channel,
                        instrument: write.instrument,
                        slot: write.slot,
                        setting: apply.setting,
                    });
                    writes.push(write);
                }
                None => log::debug!("every modulator slot is taken, skipping {:?}", apply.setting),
            }
        }
        writes
    }

    fn write(
        &mut self,
        doc: &mut SongDocument,
        writes: &[SlotWrite],
        change: ParameterChange,
        ctx: RecordContext,
        mut seq: ChangeSequence,
    ) -> Result<RecordOutcome> {
        let bar_parts = doc.song.parts_per_bar();
        let quantum = self.time_quantum(&doc.song);
        let part = ctx.part.clamp(0, (bar_parts - 1).max(0));
        let current = part.div_euclid(quantum) * quantum;
        let end = (current + quantum + self.options.mod_lookahead).min(bar_parts);
        if current >= end {
            return Ok(RecordOutcome::default());
        }

        let mut outcome = RecordOutcome::default();
        for write in writes {
            let at = PatternRef::new(write.channel, ctx.bar);
            let pitch = pitch_for_slot(write.slot);
            let cap = write.slot_config.cap();
            let offset = write.slot_config.setting.info().convert_real_factor as f64;
            let value = round_half_up(write.value - offset).clamp(0, cap);
            seq.push(Change::EnsurePatternExists {
                at,
                instrument: write.instrument,
            });
            let notes: &[Note] = doc
                .song
                .pattern(write.channel, ctx.bar)
                .map(|p| p.notes.as_slice())
                .unwrap_or(&[]);
            if !self.write_point(&mut seq, at, notes, pitch, current, end, value) {
                continue;
            }
            outcome.recorded.push(RecordedPoint {
                channel: write.channel,
                instrument: write.instrument,
                slot: write.slot,
                part: current,
                value,
            });
        }

        let restore = change
            .slider()
            .filter(|_| ctx.from_slider)
            .map(|(setting, value)| {
                let target = if setting.info().song_scoped {
                    ParameterTarget::Song(setting)
                } else {
                    ParameterTarget::Instrument {
                        channel: ctx.channel,
                        instrument: ctx.instrument,
                        setting,
                    }
                };
                (target, value.old)
            });
        outcome.restored_base = restore.is_some();

        let allocates = seq
            .edits()
            .iter()
            .any(|c| matches!(c, Change::ModSlotAssigned { .. }));
        if outcome.recorded.is_empty() && !allocates {
            // Nothing new on any row: no undo step, only the live value goes back.
            if let Some((target, value)) = restore {
                doc.set_parameter_untracked(target, value)?;
            }
            return Ok(outcome);
        }
        if let Some((target, value)) = restore {
            seq.push(Change::BaseParameter { target, value });
        }

        doc.record(&seq)?;
        for point in &outcome.recorded {
            log::trace!("recorded {:?}", point);
            self.pending_events.push(EditorEvent::ModValueRecorded {
                channel: point.channel,
                instrument: point.instrument,
                slot: point.slot,
                part: point.part,
                value: point.value,
            });
        }
        Ok(outcome)
    }

    /// Appends the edits writing `value` over `[current, end)` on the row `pitch`.
    /// Returns false when the row already holds that value there.
    #[allow(clippy::too_many_arguments)]
    fn write_point(
        &self,
        seq: &mut ChangeSequence,
        at: PatternRef,
        notes: &[Note],
        pitch: i32,
        current: i32,
        end: i32,
        value: i32,
    ) -> bool {
        let latest = notes
            .iter()
            .filter(|n| n.pitches.first() == Some(&pitch) && n.start <= current)
            .last();
        let Some(note) = latest else {
            seq.push(sanitize_interval(at, pitch, current, end));
            seq.push(Change::NoteAdded {
                at,
                note: Note::new(pitch, current, end, value, false),
                index: 0,
            });
            return true;
        };

        if note.end >= end {
            let size_at = |abs: i32| round_half_up(pins::interpolate(&note.pins, (abs - note.start) as f64).1);
            if size_at(current) == value && size_at(end) == value {
                log::trace!("modulator row {pitch} already holds {value}");
                return false;
            }
        }

        let rel_current = current - note.start;
        if note.end == end && note.pins.iter().any(|p| p.time == rel_current) {
            for bend_part in [rel_current, note.end - note.start] {
                seq.push(Change::SizeBend {
                    at,
                    note: note.id,
                    bend_part,
                    size: value,
                    interval: 0,
                    uniform: false,
                });
            }
            return true;
        }

        seq.push(sanitize_interval(at, pitch, current, end));
        if note.start < current && current - note.end < self.options.mod_new_note_distance {
            seq.push(Change::PinsAppended {
                at,
                note: note.id,
                pins: vec![(current, value), (end, value)],
            });
        } else {
            seq.push(Change::NoteAdded {
                at,
                note: Note::new(pitch, current, end, value, false),
                index: 0,
            });
        }
        true
    }
}

/// Clears `[start, end)` on one modulator row, splitting or clipping the notes it touches.
pub fn sanitize_interval(at: PatternRef, pitch: i32, start: i32, end: i32) -> Change {
    Change::NoteTruncate {
        at,
        start,
        end,
        skip: None,
        lane: Lane::Pitch(pitch),
    }
}

fn mod_channels(song: &Song) -> impl Iterator<Item = usize> + '_ {
    song.channels
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind == ChannelKind::Mod)
        .map(|(i, _)| i)
}

fn matching_slots(song: &Song, apply: Apply, ctx: RecordContext) -> Vec<SlotWrite> {
    let mut found = Vec::new();
    for channel in mod_channels(song) {
        let pattern = song.pattern(channel, ctx.bar);
        let instruments: Vec<usize> = match pattern {
            Some(p) => p.instruments.clone(),
            None => song
                .channels
                .get(channel)
                .map(|c| (0..c.instruments.len()).collect())
                .unwrap_or_default(),
        };
        'instruments: for instrument in instruments {
            let Some(inst) = song.instrument(channel, instrument) else {
                continue;
            };
            for (slot, config) in inst.modulators.iter().enumerate() {
                if !config.listens_to(apply.setting, apply.filter, ctx.channel, ctx.instrument) {
                    continue;
                }
                found.push(SlotWrite {
                    channel,
                    instrument,
                    slot,
                    slot_config: *config,
                    value: apply.value,
                });
                // Without a pattern the first listener gets one created.
                if pattern.is_none() {
                    break 'instruments;
                }
            }
        }
    }
    found
}

/// First unassigned slot, preferring instruments bound to the current pattern.
/// `taken` holds slots already allocated by the same edit.
fn free_slot(
    song: &Song,
    apply: Apply,
    ctx: RecordContext,
    taken: &[(usize, usize, usize)],
) -> Option<SlotWrite> {
    let source = if apply.setting.info().song_scoped {
        ModSource::Song
    } else {
        ModSource::Channel {
            channel: ctx.channel,
            instrument: InstrumentSelector::Active,
        }
    };
    for channel in mod_channels(song) {
        let count = song.channels.get(channel).map_or(0, |c| c.instruments.len());
        let mut order: Vec<usize> = song
            .pattern(channel, ctx.bar)
            .map(|p| p.instruments.clone())
            .unwrap_or_default();
        let unbound: Vec<usize> = (0..count).filter(|i| !order.contains(i)).collect();
        order.extend(unbound);
        for instrument in order {
            let Some(inst) = song.instrument(channel, instrument) else {
                continue;
            };
            let free = |s: &usize| {
                inst.modulators[*s].is_free() && !taken.contains(&(channel, instrument, *s))
            };
            if let Some(slot) = (0..MOD_COUNT).find(free) {
                return Some(SlotWrite {
                    channel,
                    instrument,
                    slot,
                    slot_config: ModSlot {
                        setting: apply.setting,
                        source,
                        filter: apply.filter,
                    },
                    value: apply.value,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulator::slot_for_pitch;

    fn doc() -> SongDocument {
        let mut doc = SongDocument::new(Song::new(&[ChannelKind::Pitch, ChannelKind::Mod], 4));
        doc.song.channels[1].instruments[0].modulators[0] = ModSlot {
            setting: ModSetting::Tempo,
            source: ModSource::Song,
            filter: None,
        };
        doc
    }

    fn ctx(part: i32) -> RecordContext {
        RecordContext {
            channel: 0,
            instrument: 0,
            bar: 0,
            part,
            from_slider: true,
        }
    }

    fn row(doc: &SongDocument, slot: usize) -> Vec<Note> {
        let pitch = pitch_for_slot(slot);
        doc.song
            .pattern(1, 0)
            .map(|p| {
                p.notes
                    .iter()
                    .filter(|n| n.pitches[0] == pitch)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn tempo_slider_writes_offset_value_and_restores_base() {
        let mut doc = doc();
        let mut recorder = ModRecorder::new(PatternEditorOptions::default());
        doc.song.tempo = 140.0;
        let outcome = recorder
            .record(&mut doc, ParameterChange::Tempo(ValueChange::new(120.0, 140.0)), ctx(13))
            .expect("record");
        assert!(outcome.restored_base);
        assert_eq!(doc.song.tempo, 120.0);
        let notes = row(&doc, 0);
        assert_eq!(notes.len(), 1);
        assert_eq!((notes[0].start, notes[0].end), (12, 18));
        assert!(notes[0].pins.iter().all(|p| p.size == 110));
        assert_eq!(slot_for_pitch(notes[0].pitches[0]), Some(0));
    }

    #[test]
    fn same_quantum_rewrites_the_value() {
        let mut doc = doc();
        let mut recorder = ModRecorder::new(PatternEditorOptions::default());
        recorder
            .record(&mut doc, ParameterChange::Tempo(ValueChange::new(120.0, 140.0)), ctx(12))
            .expect("first");
        recorder
            .record(&mut doc, ParameterChange::Tempo(ValueChange::new(120.0, 150.0)), ctx(14))
            .expect("second");
        let notes = row(&doc, 0);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].pins.iter().all(|p| p.size == 120));
    }

    #[test]
    fn nearby_points_extend_the_note() {
        let mut doc = doc();
        let mut recorder = ModRecorder::new(PatternEditorOptions::default());
        let change = ParameterChange::Tempo(ValueChange::new(120.0, 140.0));
        recorder.record(&mut doc, change, ctx(0)).expect("first");
        recorder.continue_held(&mut doc, ctx(12)).expect("held");
        let notes = row(&doc, 0);
        assert_eq!(notes.len(), 1);
        assert_eq!((notes[0].start, notes[0].end), (0, 18));
    }

    #[test]
    fn distant_points_start_a_new_note() {
        let mut doc = doc();
        let mut recorder = ModRecorder::new(PatternEditorOptions::default());
        let change = ParameterChange::Tempo(ValueChange::new(120.0, 140.0));
        recorder.record(&mut doc, change, ctx(0)).expect("first");
        recorder.continue_held(&mut doc, ctx(96)).expect("held");
        let spans: Vec<(i32, i32)> = row(&doc, 0).iter().map(|n| (n.start, n.end)).collect();
        assert_eq!(spans, vec![(0, 6), (96, 102)]);
    }

    #[test]
    fn unchanged_value_inside_a_note_is_skipped() {
        let mut doc = doc();
        let at = PatternRef::new(1, 0);
        doc.record(
            &ChangeSequence::new()
                .with(Change::EnsurePatternExists { at, instrument: 0 })
                .with(Change::NoteAdded {
                    at,
                    note: Note::new(pitch_for_slot(0), 0, 48, 110, false),
                    index: 0,
                }),
        )
        .expect("seed");
        let mut recorder = ModRecorder::new(PatternEditorOptions::default());
        let outcome = recorder
            .record(&mut doc, ParameterChange::Tempo(ValueChange::new(140.0, 140.0)), ctx(20))
            .expect("record");
        assert!(outcome.recorded.is_empty());
        assert_eq!(row(&doc, 0).len(), 1);
    }

    #[test]
    fn steady_slider_adds_no_undo_steps() {
        let mut doc = doc();
        let mut recorder = ModRecorder::new(PatternEditorOptions::default());
        doc.song.tempo = 140.0;
        recorder
            .record(&mut doc, ParameterChange::Tempo(ValueChange::new(120.0, 140.0)), ctx(0))
            .expect("first");
        for part in [1, 2, 3, 4] {
            doc.song.tempo = 140.0;
            let outcome = recorder.continue_held(&mut doc, ctx(part)).expect("held");
            assert!(outcome.recorded.is_empty());
            assert!(outcome.restored_base);
            assert_eq!(doc.song.tempo, 120.0);
        }
        assert!(doc.undo());
        assert!(row(&doc, 0).is_empty());
        assert!(!doc.can_undo());
    }

    #[test]
    fn missing_listener_allocates_first_free_slot() {
        let mut doc = doc();
        let mut recorder = ModRecorder::new(PatternEditorOptions::default());
        let outcome = recorder
            .record(&mut doc, ParameterChange::Pan(ValueChange::new(0.0, 20.0)), ctx(0))
            .expect("record");
        assert_eq!(outcome.recorded.len(), 1);
        let slot = doc.song.channels[1].instruments[0].modulators[1];
        assert_eq!(slot.setting, ModSetting::Pan);
        assert_eq!(
            slot.source,
            ModSource::Channel {
                channel: 0,
                instrument: InstrumentSelector::Active
            }
        );
        assert_eq!(row(&doc, 1)[0].pins[0].size, 70);
        assert!(recorder
            .take_events()
            .iter()
            .any(|e| matches!(e, EditorEvent::ModSlotAllocated { slot: 1, .. })));
    }

    #[test]
    fn full_modulator_instrument_skips_recording() {
        let mut doc = doc();
        for slot in doc.song.channels[1].instruments[0].modulators.iter_mut() {
            slot.setting = ModSetting::Echo;
        }
        let mut recorder = ModRecorder::new(PatternEditorOptions::default());
        let outcome = recorder
            .record(&mut doc, ParameterChange::Pan(ValueChange::new(0.0, 20.0)), ctx(0))
            .expect("record");
        assert!(outcome.recorded.is_empty());
        assert!(!doc.can_undo());
    }

    #[test]
    fn filter_point_move_records_frequency_and_gain() {
        let mut doc = SongDocument::new(Song::new(&[ChannelKind::Pitch, ChannelKind::Mod], 4));
        let mut recorder = ModRecorder::new(PatternEditorOptions::default());
        let change = ParameterChange::FilterMovePoint {
            target: FilterKind::Note,
            point: 0,
            freq: 20.0,
            gain: 9.0,
        };
        let mut context = ctx(0);
        context.from_slider = false;
        let outcome = recorder.record(&mut doc, change, context).expect("record");
        assert_eq!(outcome.recorded.len(), 2);
        assert!(!outcome.restored_base);
        assert_eq!(row(&doc, 0)[0].pins[0].size, 20);
        assert_eq!(row(&doc, 1)[0].pins[0].size, 9);
    }
}
