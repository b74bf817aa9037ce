//! Final aggregation: per-category winners from the layer 4 results.
//!
//! Ordering is total and deterministic: score descending, then earlier
//! submission (projects without a timestamp last), then project id
//! ascending. Categories without survivors do not appear. Results whose
//! project is no longer in the catalog are skipped.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use gauntlet_state::{FinalResults, LayerResultRecord, Project};
use tracing::debug;

/// Winners kept per category unless configured otherwise.
pub const DEFAULT_TOP_N: usize = 5;

struct Candidate<'a> {
    result: &'a LayerResultRecord,
    project: &'a Project,
}

fn rank(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.result
        .score
        .total_cmp(&a.result.score)
        .then_with(|| match (a.project.submitted_at, b.project.submitted_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.project.id.cmp(&b.project.id))
}

/// Rank surviving layer 4 results and keep the top `top_n` per category.
pub fn aggregate_final_results(
    results: &[LayerResultRecord],
    projects: &[Project],
    top_n: usize,
) -> FinalResults {
    let by_id: HashMap<&str, &Project> = projects.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut candidates: Vec<Candidate<'_>> = results
        .iter()
        .filter(|r| !r.eliminated)
        .filter_map(|result| match by_id.get(result.project_id.as_str()) {
            Some(project) => Some(Candidate {
                result,
                project: *project,
            }),
            None => {
                debug!(project_id = %result.project_id, "result for unknown project skipped");
                None
            }
        })
        .collect();
    let total_candidates = candidates.len() as u32;

    candidates.sort_by(rank);

    let mut winners: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for candidate in &candidates {
        let list = winners
            .entry(candidate.project.category_id.clone())
            .or_default();
        if list.len() < top_n {
            list.push(candidate.project.id.clone());
        }
    }
    winners.retain(|_, list| !list.is_empty());

    let total_winners = winners.values().map(|l| l.len() as u32).sum();
    let category_count = winners.len() as u32;

    FinalResults {
        winners,
        generated_at: Utc::now(),
        total_winners,
        total_candidates,
        category_count,
    }
}
