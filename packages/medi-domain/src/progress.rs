use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ranking::{self, Candidate};

/// Versioned progress of one conversation. Every write bumps `version`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SessionProgress {
	pub condition_ids: Vec<i64>,
	pub version: i64,
}
impl SessionProgress {
	pub fn is_empty(&self) -> bool {
		self.condition_ids.is_empty()
	}

	pub fn contains(&self, condition_id: i64) -> bool {
		self.condition_ids.contains(&condition_id)
	}
}

/// Prior ids keep their order; surfaced ids not yet in `prior` follow by score descending.
pub fn merge_progress(prior: &[i64], surfaced: &[Candidate]) -> Vec<i64> {
	let mut seen: HashSet<i64> = HashSet::with_capacity(prior.len() + surfaced.len());
	let mut merged: Vec<i64> = Vec::with_capacity(prior.len() + surfaced.len());

	for id in prior {
		if seen.insert(*id) {
			merged.push(*id);
		}
	}

	let mut fresh: Vec<Candidate> =
		surfaced.iter().filter(|candidate| !seen.contains(&candidate.condition_id)).copied().collect();

	fresh.sort_by(ranking::cmp_by_score);

	for candidate in fresh {
		if seen.insert(candidate.condition_id) {
			merged.push(candidate.condition_id);
		}
	}

	merged
}

/// Returns the ids that appear more than once, in first-repeat order.
pub fn duplicate_ids(ids: &[i64]) -> Vec<i64> {
	let mut seen = HashSet::with_capacity(ids.len());
	let mut reported = HashSet::new();
	let mut duplicates = Vec::new();

	for id in ids {
		if !seen.insert(*id) && reported.insert(*id) {
			duplicates.push(*id);
		}
	}

	duplicates
}
