//! Scenario overlay: base features with scenario edits applied by id.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::HeatmapResult;
use crate::feature::{Feature, ScenarioEdit};
use crate::ids::FeatureId;

/// Merge `base` with `edits`.
///
/// Any edit suppresses the base row sharing its feature id. Edits of type
/// new or modified then contribute their own row; deletions contribute
/// nothing. Base order is kept, followed by the surviving edits in edit
/// order. If a scenario carries several edits for one feature id the last
/// one is used.
pub fn resolve_overlay(base: Vec<Feature>, edits: Vec<ScenarioEdit>) -> HeatmapResult<Vec<Feature>> {
    let edits = dedup_edits(edits);
    let edited: HashSet<FeatureId> = edits.iter().map(|edit| edit.feature_id).collect();

    let mut merged = Vec::with_capacity(base.len() + edits.len());
    merged.extend(base.into_iter().filter(|feature| !edited.contains(&feature.id)));
    for edit in edits {
        if edit.edit_type.supplies_row() {
            merged.push(edit.into_feature()?);
        }
    }
    Ok(merged)
}

fn dedup_edits(edits: Vec<ScenarioEdit>) -> Vec<ScenarioEdit> {
    let mut last_index: HashMap<FeatureId, usize> = HashMap::with_capacity(edits.len());
    for (index, edit) in edits.iter().enumerate() {
        if last_index.insert(edit.feature_id, index).is_some() {
            warn!(
                "heatmap: scenario carries several edits for feature {}; using the last",
                edit.feature_id
            );
        }
    }
    edits
        .into_iter()
        .enumerate()
        .filter(|(index, edit)| last_index.get(&edit.feature_id) == Some(index))
        .map(|(_, edit)| edit)
        .collect()
}
