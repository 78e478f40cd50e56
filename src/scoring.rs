// src/scoring.rs

use std::collections::HashMap;

use crate::models::attempt::Answers;

/// Question id -> correct option label, covering the whole question bank.
pub type AnswerKey = HashMap<i64, String>;

/// Counts the questions in `key` whose submitted answer equals the correct label.
///
/// Every question in the key is visited once; questions missing from `answers`
/// and answers for unknown question ids contribute nothing.
/// The result is always within `0..=key.len()`.
pub fn score(key: &AnswerKey, answers: &Answers) -> i64 {
    key.iter()
        .filter(|(q_id, correct)| answers.get(q_id).is_some_and(|given| given == *correct))
        .count() as i64
}
