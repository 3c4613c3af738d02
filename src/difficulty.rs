//! Effective difficulty from the requested level and the session history.

use crate::domain::{HistoryEntry, MAX_LEVEL, MIN_LEVEL};

/// Questions per automatic one-level step.
const PROGRESS_STEP: usize = 5;

/// Progressive step first (+1 per 5 prior questions), then the performance
/// delta from the last two answers: both right +1, both wrong −1, mixed 0.
/// Result is always within `MIN_LEVEL..=MAX_LEVEL`.
pub fn adjust(base_level: u8, history: &[HistoryEntry]) -> u8 {
  let base = base_level.clamp(MIN_LEVEL, MAX_LEVEL);

  let boost = (history.len() / PROGRESS_STEP).min(MAX_LEVEL as usize) as u8;
  let mut level = base.saturating_add(boost).min(MAX_LEVEL);

  if let [.., prev, last] = history {
    match (prev.is_correct(), last.is_correct()) {
      (true, true) => level = (level + 1).min(MAX_LEVEL),
      (false, false) => level = level.saturating_sub(1).max(MIN_LEVEL),
      _ => {}
    }
  }
  level
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entries(flags: &[bool]) -> Vec<HistoryEntry> {
    flags
      .iter()
      .enumerate()
      .map(|(i, ok)| HistoryEntry {
        question_text: format!("q{i}"),
        was_correct: Some(*ok),
        ..Default::default()
      })
      .collect()
  }

  #[test]
  fn no_history_keeps_level() {
    assert_eq!(adjust(3, &[]), 3);
    assert_eq!(adjust(1, &[]), 1);
  }

  #[test]
  fn ten_questions_with_two_correct_caps_at_five() {
    let mut flags = vec![false; 8];
    flags.extend([true, true]);
    assert_eq!(adjust(3, &entries(&flags)), 5);
    assert_eq!(adjust(1, &entries(&flags)), 4);
  }

  #[test]
  fn two_wrong_answers_step_down() {
    assert_eq!(adjust(3, &entries(&[false, false])), 2);
    assert_eq!(adjust(1, &entries(&[false, false])), 1);
  }

  #[test]
  fn mixed_answers_leave_level() {
    assert_eq!(adjust(3, &entries(&[true, false])), 3);
    assert_eq!(adjust(3, &entries(&[false, true])), 3);
  }

  #[test]
  fn single_entry_has_no_performance_effect() {
    assert_eq!(adjust(3, &entries(&[true])), 3);
    assert_eq!(adjust(3, &entries(&[false])), 3);
  }

  #[test]
  fn progression_applies_before_performance() {
    // 5 entries: +1 progress, last two wrong: −1
    assert_eq!(adjust(2, &entries(&[true, true, true, false, false])), 2);
    // at the cap, a wrong streak still pulls back down
    assert_eq!(adjust(5, &entries(&[false; 10])), 4);
  }

  #[test]
  fn persisted_entries_without_flags_count_as_wrong() {
    let history: Vec<HistoryEntry> = (0..2)
      .map(|i| HistoryEntry { question_text: format!("q{i}"), ..Default::default() })
      .collect();
    assert_eq!(adjust(3, &history), 2);
  }

  #[test]
  fn out_of_range_base_is_clamped() {
    assert_eq!(adjust(0, &[]), 1);
    assert_eq!(adjust(9, &[]), 5);
  }
}
