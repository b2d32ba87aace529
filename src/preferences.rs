//! Preference aggregation over a user's history
//!
//! Frequencies are counted across every record; ties keep the order in which
//! items were first seen. The average preparation time ignores zero entries
//! and is rounded to the nearest ten with ties going to the even multiple
//! (a mean of 25 becomes 20, 35 becomes 40).

use crate::types::HistoryRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of ingredients kept in [`Preferences::top_ingredients`]
pub const TOP_INGREDIENTS: usize = 5;
/// Number of cuisines kept in [`Preferences::top_cuisines`]
pub const TOP_CUISINES: usize = 2;

/// An item and how often it occurred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    pub name: String,
    pub count: usize,
}

/// Taste signals derived from history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub top_ingredients: Vec<RankedItem>,
    pub top_cuisines: Vec<RankedItem>,
    /// Mean non-zero preparation time, rounded to the nearest 10
    pub avg_time: Option<i64>,
}

impl Preferences {
    /// Aggregate a set of history records.
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        let mut ingredients = FrequencyCounter::default();
        let mut cuisines = FrequencyCounter::default();
        let mut times = Vec::new();

        for record in records {
            ingredients.extend(split_joined(&record.ingredients));
            cuisines.extend(split_joined(&record.cuisine));
            if record.ready_in_minutes != 0 {
                times.push(record.ready_in_minutes);
            }
        }

        Self {
            top_ingredients: ingredients.most_common(TOP_INGREDIENTS),
            top_cuisines: cuisines.most_common(TOP_CUISINES),
            avg_time: average_time(&times),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top_ingredients.is_empty() && self.top_cuisines.is_empty() && self.avg_time.is_none()
    }

    /// The single most frequent cuisine
    pub fn favorite_cuisine(&self) -> Option<&str> {
        self.top_cuisines.first().map(|c| c.name.as_str())
    }
}

/// One-line description of a user's taste, for explanation prompts.
pub fn preference_summary(prefs: &Preferences) -> String {
    let ingredients = if prefs.top_ingredients.is_empty() {
        "particular ingredients".to_string()
    } else {
        prefs
            .top_ingredients
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let cuisine = prefs.favorite_cuisine().unwrap_or("a particular style");

    let mut summary = format!(
        "You often chose '{ingredients}' and enjoy '{cuisine}' dishes."
    );
    if let Some(minutes) = prefs.avg_time {
        summary.push_str(&format!(
            " You seem to prefer meals ready in about {minutes} minutes."
        ));
    }
    summary
}

/// Split a comma-joined column back into trimmed, non-empty tokens.
pub fn split_joined(joined: &str) -> impl Iterator<Item = &str> {
    joined.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// Mean of `times` rounded to the nearest 10, ties to even.
fn average_time(times: &[i64]) -> Option<i64> {
    if times.is_empty() {
        return None;
    }
    let mean = times.iter().sum::<i64>() as f64 / times.len() as f64;
    Some(round_to_nearest_ten(mean))
}

fn round_to_nearest_ten(value: f64) -> i64 {
    ((value / 10.0).round_ties_even() * 10.0) as i64
}

/// Insertion-ordered occurrence counter
#[derive(Debug, Default)]
struct FrequencyCounter {
    order: Vec<(String, usize)>,
    positions: HashMap<String, usize>,
}

impl FrequencyCounter {
    fn add(&mut self, item: &str) {
        match self.positions.get(item) {
            Some(&pos) => self.order[pos].1 += 1,
            None => {
                self.positions.insert(item.to_string(), self.order.len());
                self.order.push((item.to_string(), 1));
            }
        }
    }

    fn extend<'a>(&mut self, items: impl Iterator<Item = &'a str>) {
        for item in items {
            self.add(item);
        }
    }

    fn most_common(mut self, n: usize) -> Vec<RankedItem> {
        // sort_by is stable, so equal counts stay in first-seen order.
        self.order.sort_by(|a, b| b.1.cmp(&a.1));
        self.order
            .into_iter()
            .take(n)
            .map(|(name, count)| RankedItem { name, count })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(ingredients: &str, cuisine: &str, minutes: i64) -> HistoryRecord {
        HistoryRecord {
            id: 0,
            user_id: "demo".into(),
            title: String::new(),
            summary: String::new(),
            created_at: Utc::now(),
            cuisine: cuisine.into(),
            ingredients: ingredients.into(),
            ready_in_minutes: minutes,
        }
    }

    #[test]
    fn egg_outranks_rice_and_tofu() {
        let mut records = vec![record("egg, rice", "", 0); 3];
        records.push(record("egg,tofu", "", 0));

        let prefs = Preferences::from_records(&records);
        assert_eq!(
            prefs.top_ingredients[0],
            RankedItem {
                name: "egg".into(),
                count: 4
            }
        );
        assert_eq!(prefs.top_ingredients[1].name, "rice");
        assert_eq!(prefs.top_ingredients[1].count, 3);
        assert_eq!(prefs.top_ingredients[2].name, "tofu");
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let records = vec![
            record("basil, garlic", "Italian, Thai", 0),
            record("garlic, basil", "Thai, Italian", 0),
        ];
        let prefs = Preferences::from_records(&records);
        let names: Vec<_> = prefs.top_ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["basil", "garlic"]);
        assert_eq!(prefs.favorite_cuisine(), Some("Italian"));
    }

    #[test]
    fn tops_are_capped() {
        let records = vec![record("a, b, c, d, e, f, g", "x, y, z", 0)];
        let prefs = Preferences::from_records(&records);
        assert_eq!(prefs.top_ingredients.len(), TOP_INGREDIENTS);
        assert_eq!(prefs.top_cuisines.len(), TOP_CUISINES);
    }

    #[test]
    fn blank_tokens_are_dropped() {
        let tokens: Vec<_> = split_joined(" egg , ,rice,,  ").collect();
        assert_eq!(tokens, vec!["egg", "rice"]);
    }

    #[test]
    fn mean_of_25_rounds_half_to_even() {
        let records = vec![record("", "", 20), record("", "", 30), record("", "", 25)];
        assert_eq!(Preferences::from_records(&records).avg_time, Some(20));
    }

    #[test]
    fn mean_of_35_rounds_half_to_even() {
        let records = vec![record("", "", 30), record("", "", 40)];
        assert_eq!(Preferences::from_records(&records).avg_time, Some(40));
    }

    #[test]
    fn zero_times_are_ignored() {
        let records = vec![record("", "", 0), record("", "", 44), record("", "", 0)];
        assert_eq!(Preferences::from_records(&records).avg_time, Some(40));

        let none = vec![record("egg", "", 0)];
        assert_eq!(Preferences::from_records(&none).avg_time, None);
    }

    #[test]
    fn empty_history_yields_empty_preferences() {
        let prefs = Preferences::from_records(&[]);
        assert!(prefs.is_empty());
        assert_eq!(prefs.favorite_cuisine(), None);
    }

    #[test]
    fn summary_mentions_tastes() {
        let prefs = Preferences::from_records(&[record("egg, rice", "Korean", 20)]);
        let text = preference_summary(&prefs);
        assert!(text.contains("'egg, rice'"));
        assert!(text.contains("'Korean'"));
        assert!(text.contains("about 20 minutes"));
    }

    #[test]
    fn summary_falls_back_without_history() {
        let text = preference_summary(&Preferences::default());
        assert!(text.contains("particular ingredients"));
        assert!(text.contains("a particular style"));
        assert!(!text.contains("minutes"));
    }
}
