//! # egui_pattern
//!
//! 一个 BeepBox 风格的模式编辑器核心：把指针手势解析为可撤销的音符编辑。
//!
//! ## 功能特性
//!
//! - **光标解析**：指针位置映射到音符、和弦音高与最近的控制点
//! - **手势拖拽**：创建音符、移动控制点、音量/音高弯曲、选区调整与移动
//! - **撤销历史**：每次拖动都在基准快照上重新应用，松开时提交为一步
//! - **调制录制**：拖动参数控件时自动写入调制通道
//! - **音域遮罩**：合并乐器音域，得到需要变暗的音高区间
//!
//! ## 基本使用
//!
//! ```rust
//! use egui::{Modifiers, Pos2};
//! use egui_pattern::{PatternEditor, PatternEditorOptions, SongDocument};
//!
//! let mut doc = SongDocument::default();
//! let mut editor = PatternEditor::new(PatternEditorOptions::default());
//!
//! let pos = Pos2::new(10.0, 100.0);
//! editor.pointer_pressed(&mut doc, pos, Modifiers::NONE)?;
//! editor.pointer_released(&mut doc, pos)?;
//! assert!(doc.can_undo());
//! # Ok::<(), egui_pattern::EditorError>(())
//! ```
//!
//! Inside an egui frame, [`PatternEditor::handle_input`] allocates the widget
//! and forwards its pointer state.

pub mod change;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod invariants;
pub mod modulator;
pub mod note_range;
pub mod pins;
pub mod recorder;
pub mod structure;
pub mod ui;

pub use change::{Change, ChangeId, ChangeSequence, Lane, PatternRef};
pub use document::SongDocument;
pub use editor::{EditorEvent, PatternEditorOptions};
pub use error::{EditorError, Result};
pub use modulator::{InstrumentSelector, ModSetting, ModSlot, ModSource};
pub use note_range::NoteRangeOverlay;
pub use recorder::{ModRecorder, ParameterChange, RecordContext, RecordOutcome, ValueChange};
pub use structure::{
    Channel, ChannelKind, Note, NoteId, NotePin, Pattern, PatternSelection, Rhythm, Scale, Song,
};
pub use ui::cursor::Cursor;
pub use ui::geometry::PatternGeometry;
pub use ui::{DragPreview, Gesture, ModValueLabel, PatternEditor};
