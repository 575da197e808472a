//! Score table
//!
//! The simulation submits the final score of every game to a [`ScoreSink`].
//! [`HighScores`] keeps the best ten in memory; saving the table is up to
//! the host (it round-trips through JSON).

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::settings::Difficulty;

/// Entries kept in the table
pub const MAX_HIGH_SCORES: usize = 10;

/// Receives the final score whenever a game ends
pub trait ScoreSink {
    fn submit(&mut self, score: u64, level: usize, difficulty: Difficulty);
}

/// Shared sinks let the host keep reading the table the session writes to
impl<S: ScoreSink> ScoreSink for Rc<RefCell<S>> {
    fn submit(&mut self, score: u64, level: usize, difficulty: Difficulty) {
        self.borrow_mut().submit(score, level, difficulty);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: u64,
    /// Level reached (0-based)
    pub level: usize,
    pub difficulty: Difficulty,
}

/// Best scores first. Among equal scores the older entry ranks higher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighScores {
    pub entries: Vec<ScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot a score would take, or None if it wouldn't make the table.
    /// Zero never counts.
    fn slot_for(&self, score: u64) -> Option<usize> {
        if score == 0 {
            return None;
        }
        let slot = self.entries.partition_point(|e| e.score >= score);
        (slot < MAX_HIGH_SCORES).then_some(slot)
    }

    pub fn qualifies(&self, score: u64) -> bool {
        self.slot_for(score).is_some()
    }

    /// 1-based rank a score would get
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        self.slot_for(score).map(|slot| slot + 1)
    }

    /// Record a score. Returns its 1-based rank if it made the table.
    pub fn add_score(&mut self, score: u64, level: usize, difficulty: Difficulty) -> Option<usize> {
        let slot = self.slot_for(score)?;
        self.entries.insert(
            slot,
            ScoreEntry {
                score,
                level,
                difficulty,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(slot + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load a saved table. Entries are re-sorted and capped.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut table: HighScores = serde_json::from_str(json)?;
        table.entries.retain(|e| e.score > 0);
        // Stable sort keeps the saved order among ties
        table.entries.sort_by(|a, b| b.score.cmp(&a.score));
        table.entries.truncate(MAX_HIGH_SCORES);
        Ok(table)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl ScoreSink for HighScores {
    fn submit(&mut self, score: u64, level: usize, difficulty: Difficulty) {
        match self.add_score(score, level, difficulty) {
            Some(rank) => log::info!("Score {} entered the high score table at #{}", score, rank),
            None => log::debug!("Score {} did not make the high score table", score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_never_qualifies() {
        let scores = HighScores::new();
        assert!(!scores.qualifies(0));
        assert_eq!(scores.potential_rank(0), None);
    }

    #[test]
    fn test_entries_stay_sorted_and_capped() {
        let mut scores = HighScores::new();
        for i in 1..=12u64 {
            scores.add_score(i * 100, 0, Difficulty::Medium);
        }
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.top_score(), Some(1200));
        assert_eq!(scores.entries.last().map(|e| e.score), Some(300));
        assert!(!scores.qualifies(250));
        assert_eq!(scores.potential_rank(650), Some(7));
    }

    #[test]
    fn test_ties_rank_below_older_entries() {
        let mut scores = HighScores::new();
        scores.add_score(500, 1, Difficulty::Easy);
        assert_eq!(scores.add_score(500, 2, Difficulty::Hard), Some(2));
        assert_eq!(scores.entries[0].level, 1);
    }

    #[test]
    fn test_json_load_sorts_and_drops_zeroes() {
        let json = r#"[
            {"score": 10, "level": 0, "difficulty": "Easy"},
            {"score": 0, "level": 0, "difficulty": "Easy"},
            {"score": 90, "level": 4, "difficulty": "Hard"}
        ]"#;
        let scores = HighScores::from_json(json).expect("valid table");
        assert_eq!(scores.entries.len(), 2);
        assert_eq!(scores.top_score(), Some(90));

        let json = scores.to_json().expect("serializes");
        let again = HighScores::from_json(&json).expect("round trip");
        assert_eq!(again.entries, scores.entries);
    }

    #[test]
    fn test_shared_sink_writes_through() {
        let shared = Rc::new(RefCell::new(HighScores::new()));
        let mut sink: Box<dyn ScoreSink> = Box::new(shared.clone());
        sink.submit(4200, 3, Difficulty::Hard);
        assert_eq!(shared.borrow().top_score(), Some(4200));
        assert_eq!(shared.borrow().entries[0].level, 3);
    }
}
