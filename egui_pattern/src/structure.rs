//! 数据结构模块
//!
//! Song, channel, pattern and note types edited by the pattern editor.

use crate::config::{
    BEATS_PER_BAR, DRUM_COUNT, MAX_PITCH, MOD_COUNT, NOTE_SIZE_MAX, PARTS_PER_BEAT,
    PITCHES_PER_OCTAVE,
};
use crate::error::{EditorError, Result};
use crate::modulator::{slot_for_pitch, ModSetting, ModSlot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NOTE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteId(pub u64);

impl NoteId {
    pub fn next() -> Self {
        NoteId(NOTE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A control point inside a note. `time` is relative to the note start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePin {
    pub interval: i32,
    pub time: i32,
    pub size: i32,
}

impl NotePin {
    pub fn new(interval: i32, time: i32, size: i32) -> Self {
        Self {
            interval,
            time,
            size,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub pitches: Vec<i32>,
    pub start: i32, // parts from the start of the bar
    pub end: i32,
    pub pins: Vec<NotePin>,
    pub continues_last_pattern: bool,
}

impl Note {
    /// Two-pin note. Noise notes fade out to silence.
    pub fn new(pitch: i32, start: i32, end: i32, size: i32, fade_out: bool) -> Self {
        Self::with_id(NoteId::next(), pitch, start, end, size, fade_out)
    }

    pub fn with_id(id: NoteId, pitch: i32, start: i32, end: i32, size: i32, fade_out: bool) -> Self {
        let length = end - start;
        Self {
            id,
            pitches: vec![pitch],
            start,
            end,
            pins: vec![
                NotePin::new(0, 0, size),
                NotePin::new(0, length, if fade_out { 0 } else { size }),
            ],
            continues_last_pattern: false,
        }
    }

    pub fn length(&self) -> i32 {
        self.end - self.start
    }

    pub fn last_pin(&self) -> NotePin {
        self.pins.last().copied().unwrap_or(NotePin::new(0, 0, 0))
    }

    pub fn contains_part(&self, part: f64) -> bool {
        (self.start as f64) <= part && part < self.end as f64
    }

    pub fn lowest_pitch(&self) -> i32 {
        self.pitches.iter().copied().min().unwrap_or(0)
    }

    pub fn highest_pitch(&self) -> i32 {
        self.pitches.iter().copied().max().unwrap_or(0)
    }

    /// Same note with a fresh identity.
    pub fn duplicate(&self) -> Self {
        Self {
            id: NoteId::next(),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub notes: Vec<Note>,
    /// Instruments bound to this pattern. The first one is the current instrument.
    pub instruments: Vec<usize>,
}

impl Pattern {
    pub fn with_instrument(instrument: usize) -> Self {
        Self {
            notes: Vec::new(),
            instruments: vec![instrument],
        }
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn note_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|n| n.id == id)
    }

    pub fn note_index(&self, id: NoteId) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }

    pub fn sort_notes(&mut self) {
        self.notes.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.pitches.first().cmp(&b.pitches.first()))
        });
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Pitch,
    Noise,
    Mod,
}

/// Inclusive pitch window an instrument plays in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRange {
    pub lower: i32,
    pub upper: i32,
}

impl Default for NoteRange {
    fn default() -> Self {
        Self {
            lower: 0,
            upper: MAX_PITCH,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub modulators: [ModSlot; MOD_COUNT],
    pub parameters: BTreeMap<ModSetting, f64>,
    pub note_range: NoteRange,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub kind: ChannelKind,
    pub instruments: Vec<Instrument>,
    pub patterns: Vec<Pattern>,
    /// Pattern per bar, 1-based. 0 leaves the bar empty.
    pub bars: Vec<usize>,
    pub octave: i32,
}

impl Channel {
    pub fn new(kind: ChannelKind, bar_count: usize) -> Self {
        Self {
            kind,
            instruments: vec![Instrument::default()],
            patterns: Vec::new(),
            bars: vec![0; bar_count],
            octave: if kind == ChannelKind::Pitch { 3 } else { 0 },
        }
    }

    pub fn pattern_index(&self, bar: usize) -> Option<usize> {
        match self.bars.get(bar) {
            Some(&index) if index > 0 && index <= self.patterns.len() => Some(index - 1),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rhythm {
    Triplets,
    #[default]
    Standard,
    Sextuplets,
    ThirtySecondNotes,
    Freehand,
}

impl Rhythm {
    pub fn steps_per_beat(self) -> i32 {
        match self {
            Rhythm::Triplets => 3,
            Rhythm::Standard => 4,
            Rhythm::Sextuplets => 6,
            Rhythm::ThirtySecondNotes => 8,
            Rhythm::Freehand => 24,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    MajorPentatonic,
    MinorPentatonic,
    IslandMajor,
    IslandMinor,
    MajorBlues,
    MinorBlues,
    #[default]
    Major,
    Minor,
    DoubleHarmonicMajor,
    DoubleHarmonicMinor,
    WholeTone,
    Chromatic,
    Custom([bool; 12]),
}

impl Scale {
    pub fn flags(self) -> [bool; 12] {
        const T: bool = true;
        const F: bool = false;
        match self {
            Scale::MajorPentatonic => [T, F, T, F, T, F, F, T, F, T, F, F],
            Scale::MinorPentatonic => [T, F, F, T, F, T, F, T, F, F, T, F],
            Scale::IslandMajor => [T, F, F, F, T, T, F, T, F, F, F, T],
            Scale::IslandMinor => [T, T, F, T, F, F, F, T, T, F, F, F],
            Scale::MajorBlues => [T, F, T, T, T, F, F, T, F, T, F, F],
            Scale::MinorBlues => [T, F, F, T, F, T, T, T, F, F, T, F],
            Scale::Major => [T, F, T, F, T, T, F, T, F, T, F, T],
            Scale::Minor => [T, F, T, T, F, T, F, T, T, F, T, F],
            Scale::DoubleHarmonicMajor => [T, T, F, F, T, T, F, T, T, F, F, T],
            Scale::DoubleHarmonicMinor => [T, F, T, T, F, F, T, T, T, F, F, T],
            Scale::WholeTone => [T, F, T, F, T, F, T, F, T, F, T, F],
            Scale::Chromatic => [T; 12],
            Scale::Custom(flags) => flags,
        }
    }

    pub fn contains(self, pitch: i32) -> bool {
        self.flags()[pitch.rem_euclid(PITCHES_PER_OCTAVE) as usize]
    }

    pub fn notes_in_scale(self) -> i32 {
        self.flags().iter().filter(|&&f| f).count().max(1) as i32
    }
}

/// Pattern-local selection range in parts. Active iff `start < end`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSelection {
    pub start: i32,
    pub end: i32,
}

impl PatternSelection {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn is_active(&self) -> bool {
        self.start < self.end
    }

    pub fn contains(&self, part: f64) -> bool {
        self.is_active() && self.start as f64 <= part && part < self.end as f64
    }
}

/// Where a base parameter lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterTarget {
    Song(ModSetting),
    Instrument {
        channel: usize,
        instrument: usize,
        setting: ModSetting,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub channels: Vec<Channel>,
    pub beats_per_bar: i32,
    pub bar_count: usize,
    pub rhythm: Rhythm,
    pub scale: Scale,
    pub tempo: f64,
    pub parameters: BTreeMap<ModSetting, f64>,
}

impl Default for Song {
    fn default() -> Self {
        Self::new(&[ChannelKind::Pitch, ChannelKind::Noise, ChannelKind::Mod], 16)
    }
}

impl Song {
    pub fn new(kinds: &[ChannelKind], bar_count: usize) -> Self {
        Self {
            channels: kinds.iter().map(|&k| Channel::new(k, bar_count)).collect(),
            beats_per_bar: BEATS_PER_BAR,
            bar_count,
            rhythm: Rhythm::default(),
            scale: Scale::default(),
            tempo: 120.0,
            parameters: BTreeMap::new(),
        }
    }

    pub fn parts_per_bar(&self) -> i32 {
        self.beats_per_bar * PARTS_PER_BEAT
    }

    pub fn channel(&self, channel: usize) -> Result<&Channel> {
        self.channels
            .get(channel)
            .ok_or(EditorError::MissingChannel(channel))
    }

    pub fn channel_mut(&mut self, channel: usize) -> Result<&mut Channel> {
        self.channels
            .get_mut(channel)
            .ok_or(EditorError::MissingChannel(channel))
    }

    pub fn channel_kind(&self, channel: usize) -> ChannelKind {
        self.channels
            .get(channel)
            .map(|c| c.kind)
            .unwrap_or(ChannelKind::Pitch)
    }

    pub fn is_mod_channel(&self, channel: usize) -> bool {
        self.channel_kind(channel) == ChannelKind::Mod
    }

    pub fn is_noise_channel(&self, channel: usize) -> bool {
        self.channel_kind(channel) == ChannelKind::Noise
    }

    pub fn max_pitch(&self, channel: usize) -> i32 {
        match self.channel_kind(channel) {
            ChannelKind::Pitch => MAX_PITCH,
            ChannelKind::Noise => DRUM_COUNT - 1,
            ChannelKind::Mod => MOD_COUNT as i32 - 1,
        }
    }

    pub fn pattern(&self, channel: usize, bar: usize) -> Option<&Pattern> {
        let ch = self.channels.get(channel)?;
        ch.pattern_index(bar).map(|i| &ch.patterns[i])
    }

    pub fn pattern_mut(&mut self, channel: usize, bar: usize) -> Option<&mut Pattern> {
        let ch = self.channels.get_mut(channel)?;
        let index = ch.pattern_index(bar)?;
        ch.patterns.get_mut(index)
    }

    pub fn instrument(&self, channel: usize, instrument: usize) -> Option<&Instrument> {
        self.channels.get(channel)?.instruments.get(instrument)
    }

    pub fn instrument_mut(&mut self, channel: usize, instrument: usize) -> Result<&mut Instrument> {
        self.channels
            .get_mut(channel)
            .ok_or(EditorError::MissingChannel(channel))?
            .instruments
            .get_mut(instrument)
            .ok_or(EditorError::MissingInstrument {
                channel,
                instrument,
            })
    }

    /// Modulator slot driven by a note at `pitch` on a modulator channel.
    pub fn mod_slot(&self, channel: usize, instrument: usize, pitch: i32) -> Option<&ModSlot> {
        let slot = slot_for_pitch(pitch)?;
        self.instrument(channel, instrument)
            .map(|inst| &inst.modulators[slot])
    }

    /// Largest pin size allowed for a note at `pitch`.
    pub fn volume_cap(&self, channel: usize, instrument: usize, pitch: i32) -> i32 {
        if !self.is_mod_channel(channel) {
            return NOTE_SIZE_MAX;
        }
        self.mod_slot(channel, instrument, pitch)
            .map(|slot| slot.cap())
            .unwrap_or(NOTE_SIZE_MAX)
    }

    /// Cap for a row shared by every instrument bound to a pattern: the loosest of
    /// their slot caps. `fallback` is used when nothing is bound yet.
    pub fn bound_volume_cap(
        &self,
        channel: usize,
        instruments: &[usize],
        fallback: usize,
        pitch: i32,
    ) -> i32 {
        instruments
            .iter()
            .map(|&instrument| self.volume_cap(channel, instrument, pitch))
            .max()
            .unwrap_or_else(|| self.volume_cap(channel, fallback, pitch))
    }

    pub fn new_note_volume(&self, channel: usize, instrument: usize, pitch: i32) -> i32 {
        if !self.is_mod_channel(channel) {
            return NOTE_SIZE_MAX;
        }
        self.mod_slot(channel, instrument, pitch)
            .map(|slot| slot.new_note_vol())
            .unwrap_or(NOTE_SIZE_MAX)
    }

    /// One `[lower, upper]` entry per instrument bound to the pattern; `-1` marks a missing instrument.
    pub fn note_range_entries(&self, channel: usize, bar: usize) -> Vec<[i32; 2]> {
        let Some(pattern) = self.pattern(channel, bar) else {
            return Vec::new();
        };
        pattern
            .instruments
            .iter()
            .map(|&i| match self.instrument(channel, i) {
                Some(inst) => [inst.note_range.lower, inst.note_range.upper],
                None => [-1, -1],
            })
            .collect()
    }

    pub fn parameter(&self, target: ParameterTarget) -> Option<f64> {
        match target {
            ParameterTarget::Song(ModSetting::Tempo) => Some(self.tempo),
            ParameterTarget::Song(setting) => self.parameters.get(&setting).copied(),
            ParameterTarget::Instrument {
                channel,
                instrument,
                setting,
            } => self
                .instrument(channel, instrument)?
                .parameters
                .get(&setting)
                .copied(),
        }
    }

    pub fn set_parameter(&mut self, target: ParameterTarget, value: f64) -> Result<()> {
        match target {
            ParameterTarget::Song(ModSetting::Tempo) => self.tempo = value,
            ParameterTarget::Song(setting) => {
                self.parameters.insert(setting, value);
            }
            ParameterTarget::Instrument {
                channel,
                instrument,
                setting,
            } => {
                self.instrument_mut(channel, instrument)?
                    .parameters
                    .insert(setting, value);
            }
        }
        Ok(())
    }
}
