//! Transforms a list of [`RankedItem`] into a diverse, context-aware,
//! deduplicated list of [`ReRankedItem`]. The Context Store is
//! best-effort: an absent or failed read yields an empty context and
//! the rules that depend on it become no-ops, never errors.

use reco_core::config::RankerTunables;
use reco_core::types::{RankedItem, ReRankedItem, ShortTermContext};
use std::collections::HashMap;

const MAX_DIVERSITY_PASSES: usize = 3;

/// Runs the full re-ranking state machine: per-item adjustments,
/// diversity pass, dedup, truncation to `target_n`.
pub fn rerank(
    ranked: &[RankedItem],
    context: &ShortTermContext,
    target_n: usize,
    tunables: &RankerTunables,
) -> Vec<ReRankedItem> {
    if ranked.is_empty() {
        return Vec::new();
    }

    let mut items: Vec<ReRankedItem> = ranked
        .iter()
        .map(|item| apply_per_item_rules(item, context, tunables))
        .collect();

    diversity_pass(&mut items, target_n, tunables);

    dedupe(&mut items);
    items.truncate(target_n);
    for (i, item) in items.iter_mut().enumerate() {
        item.rank_position = i + 1;
    }
    items
}

fn apply_per_item_rules(
    item: &RankedItem,
    context: &ShortTermContext,
    tunables: &RankerTunables,
) -> ReRankedItem {
    let mut score = item.score;
    let mut applied_rules = Vec::new();

    // Rule 1: intent boost.
    if let Some(category) = &item.category {
        if let Some(&count) = context.recent_categories.get(category) {
            let boost = (tunables.intent_boost_rate * count as f32).min(tunables.intent_boost_cap);
            score *= 1.0 + boost;
            let percent = (boost * 100.0).round() as i64;
            applied_rules.push(format!("intent_boost({category}:+{percent}%)"));
        }
    }

    // Rule 2: recency penalty.
    if let Some(position) = context.recent_items.iter().position(|id| id == &item.item_id) {
        let multiplier = if position < tunables.recency_threshold_top {
            tunables.recency_multiplier_top
        } else if position < tunables.recency_threshold_mid {
            tunables.recency_multiplier_mid
        } else {
            tunables.recency_multiplier_rest
        };
        score *= multiplier;
        applied_rules.push(format!("recency_penalty(position={position})"));
    }

    // Rule 3: low-review penalty.
    if let Some(rating_count) = item.rating_count {
        if rating_count < tunables.low_review_threshold {
            score *= tunables.low_review_penalty;
            applied_rules.push(format!("popularity_floor(rating={rating_count})"));
        }
    }

    ReRankedItem {
        item_id: item.item_id.clone(),
        raw_score: item.score,
        adjusted_score: score,
        rank_position: item.rank_position,
        applied_rules,
        category: item.category.clone(),
        family_id: item.family_id.clone(),
    }
}

/// Up to [`MAX_DIVERSITY_PASSES`] passes over the top `2 * target_n`
/// window, penalizing over-represented categories and re-sorting
/// between passes. Stops early once a pass applies no penalty. Counts,
/// shares, and penalties are all scoped to the window; items beyond it
/// are untouched by this pass.
fn diversity_pass(items: &mut Vec<ReRankedItem>, target_n: usize, tunables: &RankerTunables) {
    sort_desc(items);

    for _ in 0..MAX_DIVERSITY_PASSES {
        let window_len = (2 * target_n).min(items.len());
        let window = &items[..window_len];
        let mut counts: HashMap<String, usize> = HashMap::new();
        for item in window.iter() {
            if let Some(category) = &item.category {
                *counts.entry(category.clone()).or_insert(0) += 1;
            }
        }

        let mut penalized = false;
        for item in items[..window_len].iter_mut() {
            let Some(category) = &item.category else {
                continue;
            };
            let count = *counts.get(category).unwrap_or(&0);
            let share = count as f32 / window_len.max(1) as f32;

            if share > tunables.diversity_threshold {
                item.adjusted_score *= tunables.diversity_penalty;
                let percent = (share * 100.0).round() as i64;
                item.applied_rules
                    .push(format!("diversity_penalty({percent}%)"));
                penalized = true;
            }
            if count > tunables.max_same_category {
                item.adjusted_score *= tunables.category_limit_penalty;
                item.applied_rules
                    .push(format!("category_limit_exceeded({count})"));
                penalized = true;
            }
        }

        sort_desc(items);
        if !penalized {
            break;
        }
    }
}

fn sort_desc(items: &mut [ReRankedItem]) {
    items.sort_by(|a, b| {
        b.adjusted_score
            .partial_cmp(&a.adjusted_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Keeps an item only if both its ItemId and FamilyId have not been
/// seen yet, traversing once in the current (post-diversity) order.
fn dedupe(items: &mut Vec<ReRankedItem>) {
    let mut seen_items = std::collections::HashSet::new();
    let mut seen_families = std::collections::HashSet::new();
    items.retain(|item| {
        let family_id = item.family_id.clone().unwrap_or_else(|| item.item_id.clone());
        if seen_items.contains(&item.item_id) || seen_families.contains(&family_id) {
            return false;
        }
        seen_items.insert(item.item_id.clone());
        seen_families.insert(family_id);
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, score: f32, category: Option<&str>, rating_count: Option<u32>) -> RankedItem {
        RankedItem {
            item_id: id.to_string(),
            score,
            rank_position: 0,
            category: category.map(str::to_string),
            rating_count,
            family_id: None,
        }
    }

    #[test]
    fn empty_input_returns_empty_output() {
        let context = ShortTermContext::default();
        let result = rerank(&[], &context, 10, &RankerTunables::default());
        assert!(result.is_empty());
    }

    #[test]
    fn intent_boost_matches_scenario_s3() {
        let mut context = ShortTermContext::default();
        context.recent_categories.insert("Electronics".to_string(), 3);
        let ranked = vec![item("I9", 0.400, Some("Electronics"), None)];

        let result = rerank(&ranked, &context, 1, &RankerTunables::default());
        assert!((result[0].adjusted_score - 0.496).abs() < 1e-3);
        assert!(result[0]
            .applied_rules
            .contains(&"intent_boost(Electronics:+24%)".to_string()));
    }

    #[test]
    fn recency_penalty_matches_scenario_s4() {
        let mut context = ShortTermContext::default();
        context.recent_items = vec!["I3".to_string(), "I2".to_string(), "I1".to_string()];
        let ranked = vec![
            item("I1", 0.90, None, None),
            item("I2", 0.80, None, None),
            item("I3", 0.70, None, None),
        ];

        let result = rerank(&ranked, &context, 3, &RankerTunables::default());
        let by_id = |id: &str| result.iter().find(|i| i.item_id == id).unwrap();
        assert!((by_id("I1").adjusted_score - 0.18).abs() < 1e-3);
        assert!((by_id("I2").adjusted_score - 0.16).abs() < 1e-3);
        assert!((by_id("I3").adjusted_score - 0.14).abs() < 1e-3);
    }

    #[test]
    fn low_review_penalty_applies_below_threshold() {
        let context = ShortTermContext::default();
        let ranked = vec![item("I1", 1.0, None, Some(2))];
        let result = rerank(&ranked, &context, 1, &RankerTunables::default());
        assert!((result[0].adjusted_score - 0.9).abs() < 1e-6);
        assert!(result[0]
            .applied_rules
            .iter()
            .any(|r| r.starts_with("popularity_floor")));
    }

    #[test]
    fn diversity_cap_limits_category_share() {
        let context = ShortTermContext::default();
        let ranked: Vec<RankedItem> = (0..10)
            .map(|i| item(&format!("I{i}"), 1.0 - i as f32 * 0.01, Some("Books"), None))
            .collect();
        let result = rerank(&ranked, &context, 10, &RankerTunables::default());
        assert!(result
            .iter()
            .any(|i| i.applied_rules.iter().any(|r| r.starts_with("diversity_penalty"))));
    }

    fn reranked(id: &str, score: f32, category: Option<&str>) -> ReRankedItem {
        ReRankedItem {
            item_id: id.to_string(),
            raw_score: score,
            adjusted_score: score,
            rank_position: 0,
            applied_rules: Vec::new(),
            category: category.map(str::to_string),
            family_id: None,
        }
    }

    #[test]
    fn diversity_pass_only_scores_the_top_2n_window() {
        // target_n = 1, so the window is the top 2 items. "Tail" starts
        // (and, given its score, always stays) well outside that window
        // across all three passes, and must come out untouched.
        let tunables = RankerTunables::default();
        let mut items = vec![
            reranked("W0", 1.00, Some("Books")),
            reranked("W1", 0.99, Some("Books")),
            reranked("Tail", 0.01, Some("Books")),
        ];

        diversity_pass(&mut items, 1, &tunables);

        let tail = items.iter().find(|i| i.item_id == "Tail").unwrap();
        assert!(tail.applied_rules.is_empty());
        assert_eq!(tail.adjusted_score, 0.01);
        // The window pair, sharing a category 1:1, did get penalized.
        let w0 = items.iter().find(|i| i.item_id == "W0").unwrap();
        assert!(w0.applied_rules.iter().any(|r| r.starts_with("diversity_penalty")));
    }

    #[test]
    fn dedup_keeps_first_occurrence_of_item_and_family() {
        let context = ShortTermContext::default();
        let mut a = item("I1", 0.9, None, None);
        a.family_id = Some("F1".to_string());
        let mut b = item("I2", 0.8, None, None);
        b.family_id = Some("F1".to_string());
        let result = rerank(&[a, b], &context, 10, &RankerTunables::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].item_id, "I1");
    }
}
