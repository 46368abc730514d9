const INIT_SQL: &str = include_str!("../../../sql/init.sql");

pub fn render_schema() -> String {
	let mut out = String::new();

	for line in INIT_SQL.lines() {
		match line.trim().strip_prefix("\\ir ") {
			Some(path) => out.push_str(table_sql(path.trim()).unwrap_or(line)),
			None => out.push_str(line),
		}

		out.push('\n');
	}

	out
}

/// Splits rendered schema into executable statements.
pub fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').map(str::trim).filter(|statement| !statement.is_empty())
}

fn table_sql(path: &str) -> Option<&'static str> {
	let sql = match path {
		"tables/001_conditions.sql" => include_str!("../../../sql/tables/001_conditions.sql"),
		"tables/002_exclusion_methods.sql" =>
			include_str!("../../../sql/tables/002_exclusion_methods.sql"),
		"tables/003_treatment_plans.sql" =>
			include_str!("../../../sql/tables/003_treatment_plans.sql"),
		"tables/004_condition_exclusion_methods.sql" =>
			include_str!("../../../sql/tables/004_condition_exclusion_methods.sql"),
		"tables/005_condition_treatment_plans.sql" =>
			include_str!("../../../sql/tables/005_condition_treatment_plans.sql"),
		"tables/006_conversations.sql" => include_str!("../../../sql/tables/006_conversations.sql"),
		"tables/007_messages.sql" => include_str!("../../../sql/tables/007_messages.sql"),
		"tables/008_diseases.sql" => include_str!("../../../sql/tables/008_diseases.sql"),
		"tables/009_symptoms.sql" => include_str!("../../../sql/tables/009_symptoms.sql"),
		"tables/010_disease_symptom_associations.sql" =>
			include_str!("../../../sql/tables/010_disease_symptom_associations.sql"),
		_ => return None,
	};

	Some(sql)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_include_is_expanded() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "), "Unexpanded include in rendered schema.");
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS disease_symptom_associations"));
	}

	#[test]
	fn statements_skip_blank_fragments() {
		let parts: Vec<&str> = statements("SELECT 1;\n\n;SELECT 2;").collect();

		assert_eq!(parts, vec!["SELECT 1", "SELECT 2"]);
	}
}
