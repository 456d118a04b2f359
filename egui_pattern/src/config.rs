//! 音乐常量与手势调校参数

/// Ticks ("parts") per beat. Every rhythm divides this evenly.
pub const PARTS_PER_BEAT: i32 = 24;
pub const BEATS_PER_BAR: i32 = 8;

pub const NOTE_SIZE_MAX: i32 = 6;
pub const MOD_COUNT: usize = 6;
pub const MAX_CHORD_SIZE: usize = 9;

pub const PITCHES_PER_OCTAVE: i32 = 12;
pub const PITCH_OCTAVES: i32 = 8;
pub const MAX_PITCH: i32 = PITCH_OCTAVES * PITCHES_PER_OCTAVE;
pub const WINDOW_OCTAVES: i32 = 3;
/// Rows visible in the pattern editor for a pitched channel.
pub const WINDOW_PITCH_COUNT: i32 = WINDOW_OCTAVES * PITCHES_PER_OCTAVE + 1;
pub const DRUM_COUNT: i32 = 12;

pub const TEMPO_MIN: i32 = 30;
pub const TEMPO_MAX: i32 = 500;

// Pointer gesture tuning. Values are empirical and must not drift.
pub const DRAG_THRESHOLD_PX: f32 = 5.0;
pub const ARC_TOLERANCE: f64 = 0.95;
pub const SLOW_DRAG_COEFFICIENT: f64 = 25.0;
pub const SLOW_DRAG_EXPONENT: f64 = 0.4;
pub const FAST_DRAG_COEFFICIENT: f64 = 22.0;
pub const FAST_DRAG_EXPONENT: f64 = 0.5;
pub const SLOW_DRAG_COUNT_LIMIT: f64 = 8.0;

// Selection handle reach, in parts, measured from the boundary.
pub const SELECTION_HANDLE_OUTSIDE: f64 = 3.0;
pub const SELECTION_HANDLE_INSIDE: f64 = 1.25;

// Modulator value label hit box padding, in pixels.
pub const MOD_LABEL_PAD_X: f32 = 6.0;
pub const MOD_LABEL_PAD_TOP: f32 = 8.0;
pub const MOD_LABEL_PAD_BOTTOM: f32 = 11.0;
pub const MOD_LABEL_CHAR_WIDTH: f32 = 7.0;
pub const MOD_LABEL_HEIGHT: f32 = 12.0;

pub const MOD_MIN_TIME_QUANTUM: i32 = 4;
/// Parts after the last recorded point beyond which the recorder starts a fresh note.
pub const MOD_NEW_NOTE_DISTANCE: i32 = 24;

pub const MAX_HISTORY: usize = 64;
