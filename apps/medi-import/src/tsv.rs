use color_eyre::eyre;

/// A tab-separated file with a header row. Rows whose column count differs from the header are
/// dropped and counted in `skipped`.
#[derive(Debug)]
pub struct Table {
	pub header: Vec<String>,
	pub rows: Vec<Vec<String>>,
	pub skipped: u64,
}
impl Table {
	pub fn parse(raw: &str) -> Self {
		let mut lines = raw.lines().filter(|line| !line.trim().is_empty());
		let header: Vec<String> = lines
			.next()
			.map(|line| split(line).into_iter().map(str::to_string).collect())
			.unwrap_or_default();
		let mut rows = Vec::new();
		let mut skipped = 0;

		for line in lines {
			let values = split(line);

			if values.len() == header.len() {
				rows.push(values.into_iter().map(str::to_string).collect());
			} else {
				skipped += 1;
			}
		}

		Self { header, rows, skipped }
	}

	pub fn column(&self, name: &str) -> eyre::Result<usize> {
		self.header
			.iter()
			.position(|column| column == name)
			.ok_or_else(|| eyre::eyre!("Missing column {name}."))
	}
}

/// Trimmed cell value, `None` when empty.
pub fn cell(row: &[String], index: usize) -> Option<&str> {
	row.get(index).map(|value| value.trim()).filter(|value| !value.is_empty())
}

fn split(line: &str) -> Vec<&str> {
	line.trim_end_matches(['\r', '\n']).split('\t').collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_header_and_skips_ragged_rows() {
		let raw = "Disease_CUI\tDisease_Name\tAlias\n\
			C0011849\tDiabetes mellitus\t\n\
			C0020538\tHypertension\n\
			\n\
			C0004096\tAsthma\tBronchial asthma\r\n";
		let table = Table::parse(raw);

		assert_eq!(table.header, vec!["Disease_CUI", "Disease_Name", "Alias"]);
		assert_eq!(table.rows.len(), 2);
		assert_eq!(table.skipped, 1);
		assert_eq!(cell(&table.rows[0], 2), None);
		assert_eq!(cell(&table.rows[1], 2), Some("Bronchial asthma"));
		assert_eq!(table.column("Alias").ok(), Some(2));
		assert!(table.column("Definition").is_err());
	}

	#[test]
	fn empty_input_has_no_rows() {
		let table = Table::parse("");

		assert!(table.header.is_empty());
		assert!(table.rows.is_empty());
		assert_eq!(table.skipped, 0);
	}
}
