//! 调制器设置表
//!
//! Every modulatable parameter declares the offset between its real value and
//! the raw size stored in modulator pins, the largest raw size, the size given
//! to freshly drawn modulator notes, and whether it is a song-wide setting.

use crate::config::{MOD_COUNT, NOTE_SIZE_MAX, TEMPO_MAX, TEMPO_MIN};
use serde::{Deserialize, Serialize};

pub const FILTER_FREQ_CAP: i32 = 33;
pub const FILTER_GAIN_CAP: i32 = 14;
pub const OPERATOR_COUNT: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModSetting {
    None,
    Tempo,
    SongVolume,
    SongReverb,
    MixVolume,
    Pan,
    Reverb,
    Distortion,
    OperatorAmplitude(u8),
    Detune,
    VibratoDepth,
    VibratoSpeed,
    VibratoDelay,
    ArpeggioSpeed,
    PanDelay,
    BitCrush,
    FreqCrush,
    Echo,
    Chorus,
    EqFilterCut,
    EqFilterPeak,
    NoteFilterCut,
    NoteFilterPeak,
    PitchShift,
    Sustain,
    EnvelopeSpeed,
    SupersawDynamism,
    SupersawSpread,
    SupersawShape,
    EqFilter,
    NoteFilter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModSettingInfo {
    pub name: &'static str,
    pub convert_real_factor: i32,
    pub max_raw_vol: i32,
    pub new_note_vol: i32,
    pub song_scoped: bool,
}

const fn info(
    name: &'static str,
    convert_real_factor: i32,
    max_raw_vol: i32,
    new_note_vol: i32,
    song_scoped: bool,
) -> ModSettingInfo {
    ModSettingInfo {
        name,
        convert_real_factor,
        max_raw_vol,
        new_note_vol,
        song_scoped,
    }
}

impl ModSetting {
    pub fn info(self) -> ModSettingInfo {
        match self {
            ModSetting::None => info("none", 0, NOTE_SIZE_MAX, NOTE_SIZE_MAX, false),
            ModSetting::Tempo => info("tempo", TEMPO_MIN, TEMPO_MAX - TEMPO_MIN, 120 - TEMPO_MIN, true),
            ModSetting::SongVolume => info("song volume", 0, 100, 100, true),
            ModSetting::SongReverb => info("song reverb", 0, 31, 0, true),
            ModSetting::MixVolume => info("mix volume", -25, 50, 25, false),
            ModSetting::Pan => info("pan", -50, 100, 50, false),
            ModSetting::Reverb => info("reverb", 0, 31, 0, false),
            ModSetting::Distortion => info("distortion", 0, 7, 0, false),
            ModSetting::OperatorAmplitude(_) => info("operator amplitude", 0, 15, 15, false),
            ModSetting::Detune => info("detune", -200, 400, 200, false),
            ModSetting::VibratoDepth => info("vibrato depth", 0, 50, 0, false),
            ModSetting::VibratoSpeed => info("vibrato speed", 0, 30, 10, false),
            ModSetting::VibratoDelay => info("vibrato delay", 0, 50, 0, false),
            ModSetting::ArpeggioSpeed => info("arpeggio speed", 0, 50, 10, false),
            ModSetting::PanDelay => info("pan delay", 0, 20, 10, false),
            ModSetting::BitCrush => info("bit crush", 0, 14, 0, false),
            ModSetting::FreqCrush => info("freq crush", 0, 14, 0, false),
            ModSetting::Echo => info("echo", 0, 7, 0, false),
            ModSetting::Chorus => info("chorus", 0, 7, 0, false),
            ModSetting::EqFilterCut => info("eq filt cut", 0, 10, 10, false),
            ModSetting::EqFilterPeak => info("eq filt peak", 0, 7, 0, false),
            ModSetting::NoteFilterCut => info("note filt cut", 0, 10, 10, false),
            ModSetting::NoteFilterPeak => info("note filt peak", 0, 7, 0, false),
            ModSetting::PitchShift => info("pitch shift", -12, 24, 12, false),
            ModSetting::Sustain => info("sustain", 0, 15, 0, false),
            ModSetting::EnvelopeSpeed => info("envelope speed", 0, 50, 12, false),
            ModSetting::SupersawDynamism => info("dynamism", 0, 6, 6, false),
            ModSetting::SupersawSpread => info("spread", 0, 12, 6, false),
            ModSetting::SupersawShape => info("saw shape", 0, 6, 0, false),
            ModSetting::EqFilter => info("eq filter", 0, FILTER_FREQ_CAP, 0, false),
            ModSetting::NoteFilter => info("note filter", 0, FILTER_FREQ_CAP, 0, false),
        }
    }

    pub fn is_filter(self) -> bool {
        matches!(self, ModSetting::EqFilter | ModSetting::NoteFilter)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterTarget {
    Freq,
    Gain,
}

/// One control point coordinate of an EQ or note filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParam {
    pub point: usize,
    pub target: FilterTarget,
}

impl FilterParam {
    pub fn cap(self) -> i32 {
        match self.target {
            FilterTarget::Freq => FILTER_FREQ_CAP,
            FilterTarget::Gain => FILTER_GAIN_CAP,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentSelector {
    Index(usize),
    All,
    Active,
}

impl InstrumentSelector {
    pub fn targets(self, instrument: usize) -> bool {
        match self {
            InstrumentSelector::Index(index) => index == instrument,
            InstrumentSelector::All | InstrumentSelector::Active => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModSource {
    Song,
    Channel {
        channel: usize,
        instrument: InstrumentSelector,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModSlot {
    pub setting: ModSetting,
    pub source: ModSource,
    pub filter: Option<FilterParam>,
}

impl Default for ModSlot {
    fn default() -> Self {
        Self {
            setting: ModSetting::None,
            source: ModSource::Song,
            filter: None,
        }
    }
}

impl ModSlot {
    pub fn is_free(&self) -> bool {
        self.setting == ModSetting::None
    }

    pub fn cap(&self) -> i32 {
        match self.filter {
            Some(param) if self.setting.is_filter() => param.cap(),
            _ => self.setting.info().max_raw_vol,
        }
    }

    pub fn new_note_vol(&self) -> i32 {
        self.setting.info().new_note_vol.clamp(0, self.cap())
    }

    /// Whether this slot listens to `setting` edited on `channel`/`instrument`.
    pub fn listens_to(
        &self,
        setting: ModSetting,
        filter: Option<FilterParam>,
        channel: usize,
        instrument: usize,
    ) -> bool {
        if self.setting != setting || self.filter != filter {
            return false;
        }
        match self.source {
            ModSource::Song => setting.info().song_scoped,
            ModSource::Channel {
                channel: source_channel,
                instrument: selector,
            } => {
                !setting.info().song_scoped
                    && source_channel == channel
                    && selector.targets(instrument)
            }
        }
    }
}

/// Maps a modulator note pitch (row) to its slot index and back.
pub fn slot_for_pitch(pitch: i32) -> Option<usize> {
    let slot = MOD_COUNT as i32 - 1 - pitch;
    (0..MOD_COUNT as i32).contains(&slot).then_some(slot as usize)
}

pub fn pitch_for_slot(slot: usize) -> i32 {
    MOD_COUNT as i32 - 1 - slot as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_offsets_by_minimum() {
        let tempo = ModSetting::Tempo.info();
        assert_eq!(tempo.convert_real_factor, 30);
        assert_eq!(tempo.max_raw_vol, 470);
        assert!(tempo.song_scoped);
    }

    #[test]
    fn slot_rows_are_reversed() {
        assert_eq!(pitch_for_slot(0), 5);
        assert_eq!(slot_for_pitch(5), Some(0));
        assert_eq!(slot_for_pitch(0), Some(5));
        assert_eq!(slot_for_pitch(6), None);
    }

    #[test]
    fn channel_source_respects_selector() {
        let slot = ModSlot {
            setting: ModSetting::Pan,
            source: ModSource::Channel {
                channel: 1,
                instrument: InstrumentSelector::Index(2),
            },
            filter: None,
        };
        assert!(slot.listens_to(ModSetting::Pan, None, 1, 2));
        assert!(!slot.listens_to(ModSetting::Pan, None, 1, 0));
        assert!(!slot.listens_to(ModSetting::Pan, None, 0, 2));
        assert!(!slot.listens_to(ModSetting::Reverb, None, 1, 2));
    }

    #[test]
    fn filter_slots_cap_per_coordinate() {
        let mut slot = ModSlot {
            setting: ModSetting::EqFilter,
            source: ModSource::Channel {
                channel: 0,
                instrument: InstrumentSelector::Active,
            },
            filter: Some(FilterParam {
                point: 0,
                target: FilterTarget::Gain,
            }),
        };
        assert_eq!(slot.cap(), FILTER_GAIN_CAP);
        slot.filter = Some(FilterParam {
            point: 0,
            target: FilterTarget::Freq,
        });
        assert_eq!(slot.cap(), FILTER_FREQ_CAP);
    }
}
