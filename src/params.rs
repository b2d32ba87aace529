//! Search parameter builders for the recipe search API
//!
//! Keys follow the recipe API's query names (`includeIngredients`, `cuisine`,
//! `maxReadyTime`, ...). Credentials are added by the HTTP layer.

use crate::preferences::Preferences;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Personalized searches only cap time for users who cook fast.
pub const QUICK_COOK_THRESHOLD: i64 = 40;
/// Slack added to the average when capping preparation time.
pub const READY_TIME_SLACK: i64 = 5;

/// Query parameters for one recipe search call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, Value>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `number` results with full recipe information attached
    fn base(number: u32) -> Self {
        let mut params = Self::new();
        params.insert("number", number);
        params.insert("addRecipeInformation", true);
        params
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten to string pairs for a URL query
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect()
    }
}

/// What a user asked for explicitly
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchProfile {
    /// Comma-separated ingredient list
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub preferred_cuisine: Option<String>,
    #[serde(default)]
    pub avg_time: Option<i64>,
}

impl SearchProfile {
    fn ingredients(&self) -> Option<&str> {
        non_blank(self.ingredients.as_deref())
    }

    fn cuisine(&self) -> Option<&str> {
        non_blank(self.preferred_cuisine.as_deref())
    }

    fn max_time(&self) -> Option<i64> {
        self.avg_time.filter(|t| *t > 0)
    }
}

/// Bias a single-result search toward what the user has saved before.
///
/// With no history this is just the base parameter set.
pub fn build_personalized_params(prefs: &Preferences) -> ParamSet {
    let mut params = ParamSet::base(1);

    if !prefs.top_ingredients.is_empty() {
        let joined = prefs
            .top_ingredients
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(",");
        params.insert("includeIngredients", joined);
    }
    if let Some(cuisine) = prefs.favorite_cuisine() {
        params.insert("cuisine", cuisine);
    }
    // A zero average carries no signal.
    if let Some(avg) = prefs.avg_time.filter(|t| *t > 0 && *t < QUICK_COOK_THRESHOLD) {
        params.insert("maxReadyTime", avg + READY_TIME_SLACK);
    }

    params
}

/// Parameters for an explicit profile search
pub fn build_recipe_params(profile: &SearchProfile) -> ParamSet {
    let mut params = ParamSet::base(10);
    if let Some(ingredients) = profile.ingredients() {
        params.insert("includeIngredients", ingredients);
    }
    if let Some(cuisine) = profile.cuisine() {
        params.insert("cuisine", cuisine);
    }
    if let Some(time) = profile.avg_time {
        params.insert("maxReadyTime", time);
    }
    params
}

/// Parameter sets to try in order until one returns results, most specific first.
///
/// The final entry is always the unconstrained base set.
pub fn build_fallback_params(profile: &SearchProfile) -> Vec<ParamSet> {
    let base = ParamSet::base(5);
    let ingredients = profile.ingredients();
    let cuisine = profile.cuisine();
    let max_time = profile.max_time();

    let mut attempts = Vec::new();

    if let Some(ingredients) = ingredients.filter(|i| i.contains(',')) {
        attempts.push(base.clone().with("query", ingredients.replace(',', " ")));
    }
    if let (Some(ingredients), Some(cuisine), Some(max_time)) = (ingredients, cuisine, max_time) {
        attempts.push(
            base.clone()
                .with("includeIngredients", ingredients)
                .with("cuisine", cuisine)
                .with("maxReadyTime", max_time),
        );
    }
    if let (Some(ingredients), Some(cuisine)) = (ingredients, cuisine) {
        attempts.push(
            base.clone()
                .with("includeIngredients", ingredients)
                .with("cuisine", cuisine),
        );
    }
    if let Some(ingredients) = ingredients {
        attempts.push(base.clone().with("includeIngredients", ingredients));
    }
    if let Some(cuisine) = cuisine {
        attempts.push(base.clone().with("cuisine", cuisine));
    }
    attempts.push(base);

    attempts
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::RankedItem;

    fn prefs(ingredients: &[&str], cuisines: &[&str], avg_time: Option<i64>) -> Preferences {
        let ranked = |names: &[&str]| -> Vec<RankedItem> {
            names
                .iter()
                .map(|n| RankedItem {
                    name: n.to_string(),
                    count: 1,
                })
                .collect()
        };
        Preferences {
            top_ingredients: ranked(ingredients),
            top_cuisines: ranked(cuisines),
            avg_time,
        }
    }

    #[test]
    fn personalized_params_follow_preferences() {
        let quick = prefs(&["egg", "rice"], &["Korean", "Thai"], Some(20));
        let params = build_personalized_params(&quick);
        assert_eq!(params.get("includeIngredients"), Some(&Value::from("egg,rice")));
        assert_eq!(params.get("cuisine"), Some(&Value::from("Korean")));
        assert_eq!(params.get("maxReadyTime"), Some(&Value::from(25)));
        assert_eq!(params.get("number"), Some(&Value::from(1)));
    }

    #[test]
    fn no_time_cap_without_quick_average() {
        for avg in [None, Some(40), Some(60), Some(0)] {
            let params = build_personalized_params(&prefs(&["egg"], &[], avg));
            assert!(!params.contains_key("maxReadyTime"), "avg_time {avg:?}");
        }
    }

    #[test]
    fn empty_preferences_give_base_params() {
        let params = build_personalized_params(&Preferences::default());
        assert_eq!(params.len(), 2);
        assert!(params.contains_key("addRecipeInformation"));
    }

    #[test]
    fn query_pairs_unquote_strings() {
        let params = ParamSet::new().with("cuisine", "Korean").with("number", 3);
        assert_eq!(
            params.to_query_pairs(),
            vec![
                ("cuisine".to_string(), "Korean".to_string()),
                ("number".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn recipe_params_include_given_fields() {
        let profile = SearchProfile {
            ingredients: Some("egg,rice".into()),
            preferred_cuisine: Some(" ".into()),
            avg_time: Some(30),
        };
        let params = build_recipe_params(&profile);
        assert_eq!(params.get("number"), Some(&Value::from(10)));
        assert_eq!(params.get("includeIngredients"), Some(&Value::from("egg,rice")));
        assert!(!params.contains_key("cuisine"));
        assert_eq!(params.get("maxReadyTime"), Some(&Value::from(30)));
    }

    #[test]
    fn fallback_ladder_goes_from_specific_to_broad() {
        let profile = SearchProfile {
            ingredients: Some("egg,rice".into()),
            preferred_cuisine: Some("Korean".into()),
            avg_time: Some(30),
        };
        let ladder = build_fallback_params(&profile);
        assert_eq!(ladder.len(), 6);
        assert_eq!(ladder[0].get("query"), Some(&Value::from("egg rice")));
        assert_eq!(ladder[1].get("maxReadyTime"), Some(&Value::from(30)));
        assert!(!ladder[2].contains_key("maxReadyTime"));
        assert!(!ladder[3].contains_key("cuisine"));
        assert!(!ladder[4].contains_key("includeIngredients"));
        assert_eq!(ladder[5], ParamSet::base(5));
    }

    #[test]
    fn fallback_for_empty_profile_is_base_only() {
        let ladder = build_fallback_params(&SearchProfile::default());
        assert_eq!(ladder, vec![ParamSet::base(5)]);
    }
}
