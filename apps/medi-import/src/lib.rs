//! Loads the SympGAN disease, symptom, and association tables into Postgres.

pub mod tsv;

use std::{
	collections::BTreeMap,
	fs,
	path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use medi_storage::{
	db::Db,
	sympgan::{self, NewDisease, NewSymptom},
};

use crate::tsv::{Table, cell};

pub const DISEASES_FILE: &str = "diseases.tsv";
pub const SYMPTOMS_FILE: &str = "symptoms.tsv";
pub const ASSOCIATIONS_FILE: &str = "symptom_disease_associations.tsv";

#[derive(Debug, Parser)]
#[command(
	version = medi_cli::VERSION,
	rename_all = "kebab",
	styles = medi_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "DIR", default_value = "data/sympgan")]
	pub data_dir: PathBuf,
	#[arg(long, value_name = "N", default_value_t = 1_000)]
	pub batch_size: usize,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
	pub diseases: u64,
	pub symptoms: u64,
	pub associations: u64,
	pub skipped: u64,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = medi_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	if args.batch_size == 0 {
		return Err(eyre::eyre!("--batch-size must be greater than zero."));
	}

	let diseases = read_table(&args.data_dir.join(DISEASES_FILE))?;
	let symptoms = read_table(&args.data_dir.join(SYMPTOMS_FILE))?;
	let associations = read_table(&args.data_dir.join(ASSOCIATIONS_FILE))?;
	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let mut report = ImportReport {
		skipped: diseases.skipped + symptoms.skipped + associations.skipped,
		..ImportReport::default()
	};

	import_diseases(&db, &diseases, args.batch_size, &mut report).await?;
	import_symptoms(&db, &symptoms, args.batch_size, &mut report).await?;
	import_associations(&db, &associations, args.batch_size, &mut report).await?;

	let json = serde_json::to_string_pretty(&report)?;

	println!("{json}");

	Ok(())
}

fn read_table(path: &Path) -> color_eyre::Result<Table> {
	let raw = fs::read_to_string(path)
		.wrap_err_with(|| format!("Failed to read SympGAN file at {}.", path.display()))?;

	Ok(Table::parse(&raw))
}

async fn import_diseases(
	db: &Db,
	table: &Table,
	batch_size: usize,
	report: &mut ImportReport,
) -> color_eyre::Result<()> {
	let cui = table.column("Disease_CUI")?;
	let name = table.column("Disease_Name")?;
	let alias = table.column("Alias")?;
	let definition = table.column("Definition")?;
	let external_ids = table.column("External_Ids")?;

	for (batch_index, batch) in table.rows.chunks(batch_size).enumerate() {
		let mut tx = db.pool.begin().await?;

		for row in batch {
			let (Some(cui), Some(name)) = (cell(row, cui), cell(row, name)) else {
				report.skipped += 1;

				continue;
			};

			sympgan::upsert_disease(
				&mut *tx,
				&NewDisease {
					cui,
					name,
					alias: cell(row, alias),
					definition: cell(row, definition),
					external_ids: cell(row, external_ids),
				},
			)
			.await?;

			report.diseases += 1;
		}

		tx.commit().await?;

		info!(batch = batch_index + 1, diseases = report.diseases, "Imported disease batch.");
	}

	Ok(())
}

async fn import_symptoms(
	db: &Db,
	table: &Table,
	batch_size: usize,
	report: &mut ImportReport,
) -> color_eyre::Result<()> {
	let cui = table.column("Symptom_CUI")?;
	let name = table.column("Symptom_Name")?;
	let alias = table.column("Alias")?;
	let definition = table.column("Definition")?;
	let external_ids = table.column("External_Ids")?;

	for (batch_index, batch) in table.rows.chunks(batch_size).enumerate() {
		let mut tx = db.pool.begin().await?;

		for row in batch {
			let (Some(cui), Some(name)) = (cell(row, cui), cell(row, name)) else {
				report.skipped += 1;

				continue;
			};

			sympgan::upsert_symptom(
				&mut *tx,
				&NewSymptom {
					cui,
					name,
					alias: cell(row, alias),
					definition: cell(row, definition),
					external_ids: cell(row, external_ids),
					full_description: None,
					summary: None,
				},
			)
			.await?;

			report.symptoms += 1;
		}

		tx.commit().await?;

		info!(batch = batch_index + 1, symptoms = report.symptoms, "Imported symptom batch.");
	}

	Ok(())
}

/// Pairs whose CUIs are unknown, or that already exist, insert nothing.
async fn import_associations(
	db: &Db,
	table: &Table,
	batch_size: usize,
	report: &mut ImportReport,
) -> color_eyre::Result<()> {
	let disease_cui = table.column("Disease_CUI")?;
	let symptom_cui = table.column("Symptom_CUI")?;
	let source = table.column("Source")?;

	for (batch_index, batch) in table.rows.chunks(batch_size).enumerate() {
		let (by_source, skipped) = group_by_source(batch, disease_cui, symptom_cui, source);
		let mut tx = db.pool.begin().await?;

		report.skipped += skipped;

		for (source, (disease_cuis, symptom_cuis)) in &by_source {
			report.associations +=
				sympgan::link_by_cui(&mut *tx, disease_cuis, symptom_cuis, source.as_deref())
					.await?;
		}

		tx.commit().await?;

		info!(
			batch = batch_index + 1,
			associations = report.associations,
			"Imported association batch."
		);
	}

	Ok(())
}

type CuiPairs = (Vec<String>, Vec<String>);

fn group_by_source(
	rows: &[Vec<String>],
	disease_cui: usize,
	symptom_cui: usize,
	source: usize,
) -> (BTreeMap<Option<String>, CuiPairs>, u64) {
	let mut grouped: BTreeMap<Option<String>, CuiPairs> = BTreeMap::new();
	let mut skipped = 0;

	for row in rows {
		let (Some(disease), Some(symptom)) = (cell(row, disease_cui), cell(row, symptom_cui)) else {
			skipped += 1;

			continue;
		};
		let pairs = grouped.entry(cell(row, source).map(str::to_string)).or_default();

		pairs.0.push(disease.to_string());
		pairs.1.push(symptom.to_string());
	}

	(grouped, skipped)
}
