//! 模式编辑器：指针手势分类、拖拽预览与调制值标签
//!
//! `PatternEditor` holds no song data. Every call takes the [`SongDocument`]
//! it edits, so a host can keep one document and several editors.

pub mod cursor;
mod drag;
pub mod geometry;

use crate::change::{Change, ChangeSequence, PatternRef};
use crate::config::{
    MAX_CHORD_SIZE, MOD_LABEL_CHAR_WIDTH, MOD_LABEL_HEIGHT, MOD_LABEL_PAD_BOTTOM, MOD_LABEL_PAD_TOP,
    MOD_LABEL_PAD_X, NOTE_SIZE_MAX, PARTS_PER_BEAT,
};
use crate::document::SongDocument;
use crate::editor::{EditorEvent, PatternEditorOptions};
use crate::error::Result;
use crate::pins::{self, round_half_up};
use crate::structure::{Note, NoteId, NotePin, Scale};
use cursor::{resolve_cursor, Cursor, CursorInput};
use egui::{Modifiers, Pos2, Rect, Sense, Vec2};
use geometry::{sanitize, PatternGeometry};
use std::collections::BTreeMap;

pub use cursor::{default_template, nearest_pin};

/// What a press turned into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    ResizingSelectionStart,
    ResizingSelectionEnd,
    MovingSelectionContents,
    ShiftSelecting,
    CreatingNote,
    ShapingNote,
}

/// Ghost shown next to the pointer while a note is being shaped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DragPreview {
    pub time: i32,
    pub pitch: i32,
    pub size: i32,
    pub visible: bool,
}

/// Editable value shown above the modulator pin nearest the pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct ModValueLabel {
    pub note: NoteId,
    pub pin_index: usize,
    /// Value in display units (raw size plus the setting's offset).
    pub value: i32,
    pub rect: Rect,
}

impl ModValueLabel {
    pub fn hit_box(&self) -> Rect {
        Rect::from_min_max(
            Pos2::new(self.rect.left() - MOD_LABEL_PAD_X, self.rect.top() - MOD_LABEL_PAD_TOP),
            Pos2::new(self.rect.right() + MOD_LABEL_PAD_X, self.rect.top() + MOD_LABEL_PAD_BOTTOM),
        )
    }
}

#[derive(Clone, Debug)]
struct PressState {
    origin: Pos2,
    gesture: Gesture,
    dragging: bool,
    horizontal: bool,
    change: ChangeSequence,
    aborted: bool,
}

pub struct PatternEditor {
    options: PatternEditorOptions,
    size: Vec2,
    cursor: Cursor,
    pointer: Pos2,
    modifiers: Modifiers,
    press: Option<PressState>,
    copied_pins: BTreeMap<usize, Vec<NotePin>>,
    drag_preview: DragPreview,
    mod_label: Option<ModValueLabel>,
    label_editing: bool,
    pending_events: Vec<EditorEvent>,
    event_listener: Option<Box<dyn FnMut(&EditorEvent)>>,
}

impl Default for PatternEditor {
    fn default() -> Self {
        Self::new(PatternEditorOptions::default())
    }
}

impl PatternEditor {
    pub fn new(options: PatternEditorOptions) -> Self {
        Self {
            options: options.sanitized(),
            size: Vec2::new(768.0, 370.0),
            cursor: Cursor::invalid(),
            pointer: Pos2::ZERO,
            modifiers: Modifiers::NONE,
            press: None,
            copied_pins: BTreeMap::new(),
            drag_preview: DragPreview::default(),
            mod_label: None,
            label_editing: false,
            pending_events: Vec::new(),
            event_listener: None,
        }
    }

    pub fn apply_options(&mut self, options: &PatternEditorOptions) {
        self.options = options.clone().sanitized();
    }

    pub fn options(&self) -> &PatternEditorOptions {
        &self.options
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = Vec2::new(size.x.max(0.0), size.y.max(0.0));
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn set_event_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&EditorEvent) + 'static,
    {
        self.event_listener = Some(Box::new(listener));
    }

    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn emit_event(&mut self, event: EditorEvent) {
        if let Some(listener) = &mut self.event_listener {
            listener(&event);
        }
        self.pending_events.push(event);
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn drag_preview(&self) -> DragPreview {
        self.drag_preview
    }

    pub fn mod_value_label(&self) -> Option<&ModValueLabel> {
        self.mod_label.as_ref()
    }

    pub fn is_editing_mod_label(&self) -> bool {
        self.label_editing
    }

    /// Gesture of the press in progress, if any.
    pub fn gesture(&self) -> Option<Gesture> {
        self.press.as_ref().map(|p| p.gesture)
    }

    pub fn is_dragging(&self) -> bool {
        self.press.as_ref().is_some_and(|p| p.dragging && !p.aborted)
    }

    pub fn copied_pins(&self, channel: usize) -> Option<&[NotePin]> {
        self.copied_pins.get(&channel).map(Vec::as_slice)
    }

    /// Overrides the shape new notes on `channel` start from. Intervals are ignored.
    pub fn set_copied_pins(&mut self, channel: usize, pins: Vec<NotePin>) {
        let pins: Vec<NotePin> = pins
            .into_iter()
            .map(|p| NotePin::new(0, p.time, p.size))
            .collect();
        if pins.len() >= 2 {
            self.copied_pins.insert(channel, pins);
        } else {
            log::warn!("ignoring pin template with fewer than two pins");
        }
    }

    fn copy_pins(&mut self, channel: usize, note: &Note) {
        self.copied_pins.insert(channel, pins::template_from(note));
    }

    fn geometry(&self, doc: &SongDocument) -> PatternGeometry {
        PatternGeometry::for_channel(&doc.song, doc.channel, self.size)
    }

    fn fine(&self) -> bool {
        self.modifiers.command
    }

    fn scale(&self, doc: &SongDocument) -> Scale {
        if self.options.notes_outside_scale {
            Scale::Chromatic
        } else {
            doc.song.scale
        }
    }

    fn pattern_ref(doc: &SongDocument) -> PatternRef {
        PatternRef::new(doc.channel, doc.bar)
    }

    fn update_cursor(&mut self, doc: &SongDocument) {
        let geometry = self.geometry(doc);
        let horizontal = self.press.as_ref().is_some_and(|p| p.horizontal);
        self.cursor = resolve_cursor(&CursorInput {
            song: &doc.song,
            channel: doc.channel,
            instrument: doc.current_instrument(0),
            pattern: doc.current_pattern(0),
            geometry,
            pointer: self.pointer,
            fine: self.fine(),
            horizontal,
            template: self.copied_pins(doc.channel),
            scale: self.scale(doc),
        });
        if !self.cursor.valid {
            log::trace!("pointer at {:?} targets nothing", self.pointer);
        }
        self.update_mod_label(doc, &geometry);
    }

    fn update_mod_label(&mut self, doc: &SongDocument, geometry: &PatternGeometry) {
        if self.label_editing {
            return;
        }
        self.mod_label = None;
        if !doc.song.is_mod_channel(doc.channel) || !self.cursor.valid {
            return;
        }
        let Some(note) = &self.cursor.cur_note else {
            return;
        };
        let pin_index = self.cursor.near_pin_index;
        let Some(pin) = note.pins.get(pin_index) else {
            return;
        };
        let pitch = note.pitches.first().copied().unwrap_or(0);
        let offset = doc
            .song
            .mod_slot(doc.channel, doc.current_instrument(0), pitch)
            .map(|slot| slot.setting.info().convert_real_factor)
            .unwrap_or(0);
        let value = pin.size + offset;
        let width = value.to_string().len() as f32 * MOD_LABEL_CHAR_WIDTH;
        let x = geometry.part_to_pixel((note.start + pin.time) as f64);
        let y = geometry.pitch_to_pixel(pitch + pin.interval);
        let rect = Rect::from_min_size(
            Pos2::new(x + 2.0, y - MOD_LABEL_HEIGHT),
            Vec2::new(width, MOD_LABEL_HEIGHT),
        );
        self.mod_label = Some(ModValueLabel {
            note: note.id,
            pin_index,
            value,
            rect,
        });
    }

    fn at_selection_start(&self, doc: &SongDocument) -> bool {
        let selection = doc.selection;
        selection.is_active()
            && self.cursor.pitch_index.is_none()
            && (selection.start as f64 - self.options.selection_handle_outside) <= self.cursor.exact_part
            && self.cursor.exact_part <= selection.start as f64 + self.options.selection_handle_inside
    }

    fn at_selection_end(&self, doc: &SongDocument) -> bool {
        let selection = doc.selection;
        selection.is_active()
            && self.cursor.pitch_index.is_none()
            && (selection.end as f64 - self.options.selection_handle_inside) <= self.cursor.exact_part
            && self.cursor.exact_part <= selection.end as f64 + self.options.selection_handle_outside
    }

    pub fn pointer_moved(&mut self, doc: &mut SongDocument, pos: Pos2, modifiers: Modifiers) -> Result<()> {
        self.pointer = sanitize(pos);
        self.modifiers = modifiers;
        if self.label_editing {
            return Ok(());
        }
        let Some(mut press) = self.press.take() else {
            self.update_cursor(doc);
            return Ok(());
        };
        let result = self.drag_moved(doc, &mut press);
        self.press = Some(press);
        result
    }

    fn drag_moved(&mut self, doc: &mut SongDocument, press: &mut PressState) -> Result<()> {
        if press.aborted {
            self.update_cursor(doc);
            return Ok(());
        }
        if !doc.last_change_was(press.change.id()) {
            log::warn!("pattern changed during drag, ignoring the rest of the gesture");
            press.aborted = true;
            self.drag_preview.visible = false;
            self.emit_event(EditorEvent::DragAborted);
            self.update_cursor(doc);
            return Ok(());
        }
        if !press.dragging {
            let delta = self.pointer - press.origin;
            if delta.length() > self.options.drag_threshold_px {
                press.dragging = true;
                press.horizontal = delta.x.abs() >= delta.y.abs();
                log::trace!(
                    "{:?} became a {} drag",
                    press.gesture,
                    if press.horizontal { "horizontal" } else { "vertical" }
                );
            } else {
                return Ok(());
            }
        }

        let step = self.build_drag_change(doc, press);
        doc.set_prospective_change(&step.change)?;
        press.change = step.change;
        if let Some(id) = step.copy_from {
            if let Some(note) = doc.current_pattern(0).and_then(|p| p.note(id)).cloned() {
                self.copy_pins(doc.channel, &note);
            }
        }
        self.drag_preview = step.preview.unwrap_or_default();
        Ok(())
    }

    pub fn pointer_pressed(&mut self, doc: &mut SongDocument, pos: Pos2, modifiers: Modifiers) -> Result<()> {
        self.pointer = sanitize(pos);
        self.modifiers = modifiers;
        if self.label_editing {
            return Ok(());
        }
        if let Some(label) = &self.mod_label {
            if label.hit_box().contains(self.pointer) {
                let event = EditorEvent::ModLabelEditStarted {
                    note: label.note,
                    pin_index: label.pin_index,
                };
                self.label_editing = true;
                self.emit_event(event);
                return Ok(());
            }
        }
        if self.press.is_some() {
            self.cancel_drag(doc);
        }
        self.update_cursor(doc);
        if !self.cursor.valid {
            return Ok(());
        }

        let at = Self::pattern_ref(doc);
        let selection = doc.selection;
        let exact = self.cursor.exact_part;
        let mut change = ChangeSequence::new();
        let gesture = if self.at_selection_start(doc) {
            Gesture::ResizingSelectionStart
        } else if self.at_selection_end(doc) {
            Gesture::ResizingSelectionEnd
        } else if modifiers.shift {
            let bar_parts = doc.song.parts_per_bar();
            let (start, end) = if selection.contains(exact) {
                (0, 0)
            } else if let Some(note) = &self.cursor.cur_note {
                (note.start.max(0), note.end.min(bar_parts))
            } else {
                let last_beat = (doc.song.beats_per_bar - 1).max(0) * PARTS_PER_BEAT;
                let start = ((exact / PARTS_PER_BEAT as f64).floor() as i32 * PARTS_PER_BEAT).clamp(0, last_beat);
                (start, start + PARTS_PER_BEAT)
            };
            change.push(Change::PatternSelection { start, end });
            Gesture::ShiftSelecting
        } else if selection.contains(exact) {
            Gesture::MovingSelectionContents
        } else if self.cursor.cur_note.is_none() {
            let is_noise = doc.song.is_noise_channel(doc.channel);
            let mut note = Note::new(
                self.cursor.pitch,
                self.cursor.start,
                self.cursor.end,
                NOTE_SIZE_MAX,
                is_noise,
            );
            note.pins = self.cursor.pins.clone();
            change.push(Change::PatternSelection { start: 0, end: 0 });
            change.push(Change::EnsurePatternExists {
                at,
                instrument: doc.current_instrument(0),
            });
            change.push(Change::NoteAdded {
                at,
                note,
                index: self.cursor.cur_index,
            });
            if self.options.enable_note_preview {
                self.emit_event(EditorEvent::NotePreview {
                    pitches: vec![self.cursor.pitch],
                    duration: (self.cursor.end - self.cursor.start).min(PARTS_PER_BEAT),
                });
            }
            Gesture::CreatingNote
        } else {
            Gesture::ShapingNote
        };
        log::debug!("press at part {:.2} classified as {:?}", exact, gesture);

        doc.set_prospective_change(&change)?;
        self.press = Some(PressState {
            origin: self.pointer,
            gesture,
            dragging: false,
            horizontal: false,
            change,
            aborted: false,
        });
        Ok(())
    }

    pub fn pointer_released(&mut self, doc: &mut SongDocument, pos: Pos2) -> Result<()> {
        self.pointer = sanitize(pos);
        if self.label_editing {
            return Ok(());
        }
        let Some(press) = self.press.take() else {
            return Ok(());
        };
        self.drag_preview.visible = false;
        if press.aborted || !doc.last_change_was(press.change.id()) {
            self.update_cursor(doc);
            return Ok(());
        }
        if !self.geometry(doc).contains(self.pointer) {
            log::debug!("released outside the pattern, discarding {:?}", press.gesture);
            doc.discard_prospective_change();
            self.update_cursor(doc);
            return Ok(());
        }
        let result = self.finish_gesture(doc, press);
        self.update_cursor(doc);
        result
    }

    fn finish_gesture(&mut self, doc: &mut SongDocument, press: PressState) -> Result<()> {
        match press.gesture {
            Gesture::ResizingSelectionStart | Gesture::ResizingSelectionEnd | Gesture::ShiftSelecting => {
                if doc.is_prospective_noop() {
                    doc.discard_prospective_change();
                    return Ok(());
                }
                doc.record(&press.change)?;
                self.emit_event(EditorEvent::SelectionChanged(doc.selection));
            }
            Gesture::MovingSelectionContents => {
                if press.dragging {
                    doc.record(&press.change)?;
                    self.emit_committed(doc);
                } else {
                    doc.record(&ChangeSequence::single(Change::PatternSelection { start: 0, end: 0 }))?;
                }
                self.emit_event(EditorEvent::SelectionChanged(doc.selection));
            }
            Gesture::CreatingNote | Gesture::ShapingNote => {
                if press.dragging || self.cursor.cur_note.is_none() || !doc.is_prospective_noop() {
                    doc.record(&press.change)?;
                } else {
                    let (toggle, kept) = self.toggle_pitch(doc);
                    doc.record(&toggle)?;
                    if let Some(id) = kept {
                        if let Some(note) = doc.current_pattern(0).and_then(|p| p.note(id)).cloned() {
                            self.copy_pins(doc.channel, &note);
                        }
                    }
                }
                self.emit_committed(doc);
            }
        }
        Ok(())
    }

    /// Click on an existing note without dragging: flips membership of the pointed pitch.
    fn toggle_pitch(&self, doc: &SongDocument) -> (ChangeSequence, Option<NoteId>) {
        let at = Self::pattern_ref(doc);
        let mut change = ChangeSequence::new();
        let Some(note) = &self.cursor.cur_note else {
            return (change, None);
        };
        match self.cursor.pitch_index {
            None => {
                let mut count = note.pitches.len();
                if count >= MAX_CHORD_SIZE {
                    change.push(Change::PitchRemoved {
                        at,
                        note: note.id,
                        pitch: note.pitches[0],
                    });
                    count -= 1;
                }
                change.push(Change::PitchAdded {
                    at,
                    note: note.id,
                    pitch: self.cursor.pitch,
                    index: count,
                });
                (change, Some(note.id))
            }
            Some(_) if note.pitches.len() == 1 => {
                change.push(Change::NoteRemoved { at, note: note.id });
                (change, None)
            }
            Some(_) => {
                change.push(Change::PitchRemoved {
                    at,
                    note: note.id,
                    pitch: self.cursor.pitch,
                });
                (change, Some(note.id))
            }
        }
    }

    fn emit_committed(&mut self, doc: &SongDocument) {
        self.emit_event(EditorEvent::ChangeCommitted {
            channel: doc.channel,
            bar: doc.bar,
        });
    }

    pub fn pointer_left(&mut self, _doc: &SongDocument) {
        if self.press.is_some() || self.label_editing {
            return;
        }
        self.cursor = Cursor::invalid();
        self.mod_label = None;
        self.drag_preview.visible = false;
    }

    /// Drops the running gesture and restores the pattern as it was at the press.
    pub fn cancel_drag(&mut self, doc: &mut SongDocument) {
        if let Some(press) = self.press.take() {
            if doc.last_change_was(press.change.id()) {
                doc.discard_prospective_change();
            }
            log::debug!("cancelled {:?}", press.gesture);
        }
        self.drag_preview.visible = false;
        self.update_cursor(doc);
    }

    /// Applies a typed value to the labelled modulator pin. Returns whether anything was recorded.
    pub fn commit_mod_label(&mut self, doc: &mut SongDocument, text: &str) -> Result<bool> {
        if !self.label_editing {
            return Ok(false);
        }
        self.label_editing = false;
        let Some(label) = self.mod_label.take() else {
            return Ok(false);
        };
        let value: f64 = match text.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("ignoring non-numeric modulator value {:?}", text);
                self.update_cursor(doc);
                return Ok(false);
            }
        };
        let Some(note) = doc.current_pattern(0).and_then(|p| p.note(label.note)).cloned() else {
            log::warn!("labelled note {:?} no longer exists", label.note);
            self.update_cursor(doc);
            return Ok(false);
        };
        let Some(pin) = note.pins.get(label.pin_index).copied() else {
            self.update_cursor(doc);
            return Ok(false);
        };
        let instrument = doc.current_instrument(0);
        let pitch = note.pitches.first().copied().unwrap_or(0);
        let offset = doc
            .song
            .mod_slot(doc.channel, instrument, pitch)
            .map(|slot| slot.setting.info().convert_real_factor)
            .unwrap_or(0);
        let cap = doc.current_volume_cap(pitch);
        let size = round_half_up(value - offset as f64).clamp(0, cap);
        let change = ChangeSequence::single(Change::SizeBend {
            at: Self::pattern_ref(doc),
            note: note.id,
            bend_part: pin.time,
            size,
            interval: pin.interval,
            uniform: false,
        });
        doc.record(&change)?;
        self.emit_committed(doc);
        self.update_cursor(doc);
        Ok(true)
    }

    pub fn discard_mod_label(&mut self, doc: &SongDocument) {
        self.label_editing = false;
        self.update_cursor(doc);
    }

    /// Forwards an egui widget's pointer state. The widget must span `self.size()`.
    pub fn handle_input(&mut self, ui: &mut egui::Ui, doc: &mut SongDocument) -> Result<egui::Response> {
        let (rect, response) = ui.allocate_exact_size(self.size, Sense::click_and_drag());
        let (modifiers, pressed, released, pointer) = ui.input(|i| {
            (
                i.modifiers,
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
            )
        });
        let Some(pointer) = pointer else {
            self.pointer_left(doc);
            return Ok(response);
        };
        let local = (pointer - rect.min).to_pos2();
        if pressed && response.hovered() {
            self.pointer_pressed(doc, local, modifiers)?;
        } else if response.hovered() || self.press.is_some() {
            self.pointer_moved(doc, local, modifiers)?;
        } else {
            self.pointer_left(doc);
        }
        if released && self.press.is_some() {
            self.pointer_released(doc, local)?;
        }
        Ok(response)
    }
}
