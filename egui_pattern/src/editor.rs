use crate::config::{
    DRAG_THRESHOLD_PX, MOD_MIN_TIME_QUANTUM, MOD_NEW_NOTE_DISTANCE, SELECTION_HANDLE_INSIDE,
    SELECTION_HANDLE_OUTSIDE,
};
use crate::error::Result;
use crate::modulator::ModSetting;
use crate::structure::{NoteId, PatternSelection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 外部宿主可监听的编辑事件
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    ChangeCommitted {
        channel: usize,
        bar: usize,
    },
    SelectionChanged(PatternSelection),
    /// Pitches a host may play briefly while a note is drawn.
    NotePreview {
        pitches: Vec<i32>,
        duration: i32,
    },
    ModLabelEditStarted {
        note: NoteId,
        pin_index: usize,
    },
    ModValueRecorded {
        channel: usize,
        instrument: usize,
        slot: usize,
        part: i32,
        value: i32,
    },
    ModSlotAllocated {
        channel: usize,
        instrument: usize,
        slot: usize,
        setting: ModSetting,
    },
    DragAborted,
}

/// 初始化与运行时的编辑配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternEditorOptions {
    pub drag_threshold_px: f32,
    /// Keep odd note sizes when bending instead of rounding to even steps.
    pub fine_note_volume: bool,
    /// Snap against every semitone instead of the song scale.
    pub notes_outside_scale: bool,
    pub enable_note_preview: bool,
    pub selection_handle_outside: f64,
    pub selection_handle_inside: f64,
    pub mod_min_time_quantum: i32,
    pub mod_new_note_distance: i32,
    /// Extra parts cleared ahead of each recorded modulator point.
    pub mod_lookahead: i32,
}

impl Default for PatternEditorOptions {
    fn default() -> Self {
        Self {
            drag_threshold_px: DRAG_THRESHOLD_PX,
            fine_note_volume: false,
            notes_outside_scale: false,
            enable_note_preview: true,
            selection_handle_outside: SELECTION_HANDLE_OUTSIDE,
            selection_handle_inside: SELECTION_HANDLE_INSIDE,
            mod_min_time_quantum: MOD_MIN_TIME_QUANTUM,
            mod_new_note_distance: MOD_NEW_NOTE_DISTANCE,
            mod_lookahead: 0,
        }
    }
}

impl PatternEditorOptions {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let options: Self = serde_json::from_str(&json)?;
        Ok(options.sanitized())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Clamps values a hand-edited file could break.
    pub fn sanitized(mut self) -> Self {
        self.drag_threshold_px = self.drag_threshold_px.max(0.0);
        self.selection_handle_outside = self.selection_handle_outside.max(0.0);
        self.selection_handle_inside = self.selection_handle_inside.max(0.0);
        self.mod_min_time_quantum = self.mod_min_time_quantum.max(1);
        self.mod_new_note_distance = self.mod_new_note_distance.max(0);
        self.mod_lookahead = self.mod_lookahead.max(0);
        self
    }
}
