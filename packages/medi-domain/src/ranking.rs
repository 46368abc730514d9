use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Candidate {
	pub condition_id: i64,
	pub score: f32,
}

/// Applies the threshold, keeps the best score per id, and returns at most `top_k` candidates
/// ordered by score descending with ids ascending on ties.
pub fn rank_candidates<I>(raw: I, threshold: f32, top_k: usize) -> Vec<Candidate>
where
	I: IntoIterator<Item = Candidate>,
{
	let mut best: HashMap<i64, f32> = HashMap::new();

	for candidate in raw {
		if candidate.score.is_nan() || candidate.score < threshold {
			continue;
		}

		best.entry(candidate.condition_id)
			.and_modify(|score| {
				if candidate.score > *score {
					*score = candidate.score;
				}
			})
			.or_insert(candidate.score);
	}

	let mut ranked: Vec<Candidate> = best
		.into_iter()
		.map(|(condition_id, score)| Candidate { condition_id, score })
		.collect();

	ranked.sort_by(cmp_by_score);
	ranked.truncate(top_k);

	ranked
}

pub fn cmp_by_score(a: &Candidate, b: &Candidate) -> Ordering {
	b.score.total_cmp(&a.score).then_with(|| a.condition_id.cmp(&b.condition_id))
}
