use crate::config::{DRUM_COUNT, MOD_COUNT, PARTS_PER_BEAT, PITCHES_PER_OCTAVE, WINDOW_PITCH_COUNT};
use crate::structure::{ChannelKind, Scale, Song};
use egui::{Pos2, Vec2};

/// Pixel layout of one bar of one channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatternGeometry {
    pub size: Vec2,
    pub bar_parts: i32,
    pub pitch_count: i32,
    pub octave_offset: i32,
    pub steps_per_beat: i32,
    pub kind: ChannelKind,
}

impl PatternGeometry {
    pub fn for_channel(song: &Song, channel: usize, size: Vec2) -> Self {
        let kind = song.channel_kind(channel);
        let (pitch_count, octave_offset) = match kind {
            ChannelKind::Pitch => (
                WINDOW_PITCH_COUNT,
                song.channels
                    .get(channel)
                    .map(|c| c.octave * PITCHES_PER_OCTAVE)
                    .unwrap_or(0),
            ),
            ChannelKind::Noise => (DRUM_COUNT, 0),
            ChannelKind::Mod => (MOD_COUNT as i32, 0),
        };
        Self {
            size,
            bar_parts: song.parts_per_bar(),
            pitch_count,
            octave_offset,
            steps_per_beat: song.rhythm.steps_per_beat(),
            kind,
        }
    }

    pub fn part_width(&self) -> f64 {
        self.size.x as f64 / self.bar_parts.max(1) as f64
    }

    pub fn pitch_height(&self) -> f64 {
        self.size.y as f64 / self.pitch_count.max(1) as f64
    }

    pub fn contains(&self, pos: Pos2) -> bool {
        pos.x >= 0.0 && pos.x <= self.size.x && pos.y >= 0.0 && pos.y <= self.size.y
    }

    pub fn pixel_to_part(&self, x: f32) -> f64 {
        let width = self.part_width();
        if width > 0.0 {
            x as f64 / width
        } else {
            0.0
        }
    }

    pub fn part_to_pixel(&self, part: f64) -> f32 {
        (part * self.part_width()) as f32
    }

    /// Fine control while dragging sideways drops the division to a single part.
    pub fn min_division(&self, fine: bool, horizontal: bool) -> i32 {
        if fine && horizontal {
            return 1;
        }
        PARTS_PER_BEAT / self.steps_per_beat.max(1)
    }

    pub fn max_division(&self, fine: bool, horizontal: bool) -> i32 {
        if fine && horizontal {
            return PARTS_PER_BEAT;
        }
        let steps = self.steps_per_beat;
        if steps % 4 == 0 {
            PARTS_PER_BEAT / 2
        } else if steps % 3 == 0 {
            PARTS_PER_BEAT / 3
        } else if steps % 2 == 0 {
            PARTS_PER_BEAT / 2
        } else {
            PARTS_PER_BEAT
        }
    }

    pub fn snap_to_min_division(&self, part: f64, division: i32) -> i32 {
        let division = division.max(1);
        (part / division as f64).floor() as i32 * division
    }

    /// Continuous pitch under `y`, clamped to the visible rows.
    pub fn find_mouse_pitch(&self, y: f32) -> f64 {
        let height = self.pitch_height();
        let rows = self.pitch_count as f64;
        let raw = if height > 0.0 { rows - y as f64 / height } else { 0.0 };
        raw.clamp(0.0, rows - 1.0) + self.octave_offset as f64
    }

    /// Vertical centre of the row drawing `pitch`.
    pub fn pitch_to_pixel(&self, pitch: i32) -> f32 {
        (self.pitch_height() * (self.pitch_count as f64 - (pitch - self.octave_offset) as f64 - 0.5))
            as f32
    }

    pub fn ignores_scale(&self) -> bool {
        self.kind != ChannelKind::Pitch
    }
}

/// Replaces non-finite coordinates with 0.
pub fn sanitize(pos: Pos2) -> Pos2 {
    let fix = |v: f32| if v.is_finite() { v } else { 0.0 };
    Pos2::new(fix(pos.x), fix(pos.y))
}

/// Snaps a continuous pitch guess onto the scale within `[min, max]`.
///
/// Off-scale guesses go to the nearer scale member above or below; the
/// octave and fifth classes receive half a step of extra pull.
pub fn snap_to_pitch(guess: f64, min: i32, max: i32, scale: Scale, ignore_scale: bool) -> i32 {
    let guess = guess.clamp(min as f64, max as f64);
    let floored = guess.floor() as i32;
    if ignore_scale || scale.contains(floored) || !scale.flags().contains(&true) {
        return floored;
    }
    let mut top = floored + 1;
    let mut bottom = floored - 1;
    while !scale.contains(top) {
        top += 1;
    }
    while !scale.contains(bottom) {
        bottom -= 1;
    }
    if top > max {
        if bottom < min {
            min
        } else {
            bottom
        }
    } else if bottom < min {
        top
    } else {
        let is_anchor = |p: i32| matches!(p.rem_euclid(PITCHES_PER_OCTAVE), 0 | 7);
        let mut top_range = top as f64;
        let mut bottom_range = bottom as f64 + 1.0;
        if is_anchor(top) {
            top_range -= 0.5;
        }
        if is_anchor(bottom) {
            bottom_range += 0.5;
        }
        if guess - bottom_range > top_range - guess {
            top
        } else {
            bottom
        }
    }
}
