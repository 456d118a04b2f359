//! Merges per-instrument pitch windows into the ranges left undimmed.

/// Memoised union of `[lower, upper]` pitch entries. Entries with a negative
/// bound, or with `lower > upper`, are ignored.
#[derive(Clone, Debug, Default)]
pub struct NoteRangeOverlay {
    entries: Vec<[i32; 2]>,
    merged: Vec<[i32; 2]>,
    merges: usize,
}

impl NoteRangeOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the entries differed from the previous call and the union was rebuilt.
    pub fn update(&mut self, entries: &[[i32; 2]]) -> bool {
        if self.merges > 0 && self.entries == entries {
            return false;
        }
        self.entries = entries.to_vec();
        self.merged = merge_ranges(entries);
        self.merges += 1;
        true
    }

    pub fn merged(&self) -> &[[i32; 2]] {
        &self.merged
    }

    /// Number of times the union has been rebuilt.
    pub fn merge_count(&self) -> usize {
        self.merges
    }

    /// Complement of the merged ranges within `[min, max]`. Empty when no entry is valid.
    pub fn dimmed(&self, min: i32, max: i32) -> Vec<[i32; 2]> {
        if self.merged.is_empty() {
            return Vec::new();
        }
        let mut dimmed = Vec::new();
        let mut cursor = min;
        for &[lower, upper] in &self.merged {
            if lower > cursor {
                dimmed.push([cursor, (lower - 1).min(max)]);
            }
            cursor = cursor.max(upper + 1);
            if cursor > max {
                break;
            }
        }
        if cursor <= max {
            dimmed.push([cursor, max]);
        }
        dimmed.retain(|[lo, hi]| lo <= hi);
        dimmed
    }
}

pub fn merge_ranges(entries: &[[i32; 2]]) -> Vec<[i32; 2]> {
    let mut valid: Vec<[i32; 2]> = entries
        .iter()
        .copied()
        .filter(|&[lower, upper]| lower >= 0 && upper >= lower)
        .collect();
    valid.sort_unstable();
    let mut merged: Vec<[i32; 2]> = Vec::with_capacity(valid.len());
    for [lower, upper] in valid {
        match merged.last_mut() {
            Some(last) if lower <= last[1] + 1 => last[1] = last[1].max(upper),
            _ => merged.push([lower, upper]),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_and_adjacent_ranges_merge() {
        assert_eq!(
            merge_ranges(&[[40, 50], [10, 20], [21, 30], [45, 60]]),
            vec![[10, 30], [40, 60]]
        );
    }

    #[test]
    fn invalid_entries_are_skipped() {
        assert_eq!(merge_ranges(&[[-1, -1], [5, 3], [0, 12]]), vec![[0, 12]]);
        assert!(merge_ranges(&[[-1, -1]]).is_empty());
    }

    #[test]
    fn merge_only_runs_when_entries_change() {
        let mut overlay = NoteRangeOverlay::new();
        assert!(overlay.update(&[[0, 12]]));
        assert!(!overlay.update(&[[0, 12]]));
        assert_eq!(overlay.merge_count(), 1);
        assert!(overlay.update(&[[0, 24]]));
        assert_eq!(overlay.merge_count(), 2);
    }

    #[test]
    fn dimmed_is_the_complement() {
        let mut overlay = NoteRangeOverlay::new();
        overlay.update(&[[10, 20], [30, 40]]);
        assert_eq!(overlay.dimmed(0, 50), vec![[0, 9], [21, 29], [41, 50]]);
        overlay.update(&[[0, 50]]);
        assert!(overlay.dimmed(0, 50).is_empty());
        overlay.update(&[[-1, -1]]);
        assert!(overlay.dimmed(0, 50).is_empty());
    }
}
