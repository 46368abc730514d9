use std::cmp::Ordering;

/// Ordering key of one condition/treatment-plan association.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PlanRank {
	pub association_id: i64,
	pub is_primary: bool,
	pub priority: i32,
}

pub fn cmp_plan_rank(a: &PlanRank, b: &PlanRank) -> Ordering {
	b.is_primary
		.cmp(&a.is_primary)
		.then_with(|| b.priority.cmp(&a.priority))
		.then_with(|| a.association_id.cmp(&b.association_id))
}

/// Primary plans first, then priority descending, then association order. Keeps at most `limit`.
pub fn order_treatment_plans<T, F>(mut plans: Vec<T>, limit: usize, rank: F) -> Vec<T>
where
	F: Fn(&T) -> PlanRank,
{
	plans.sort_by(|a, b| cmp_plan_rank(&rank(a), &rank(b)));
	plans.truncate(limit);

	plans
}
