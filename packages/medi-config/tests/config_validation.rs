use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use medi_config::Error;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let mut table = root.as_table_mut().expect("Template config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn expect_validation(raw: &str, needle: &str) {
	match medi_config::from_toml_str(raw) {
		Err(Error::Validation { message }) => {
			assert!(message.contains(needle), "Unexpected validation message: {message}");
		},
		other => panic!("Expected validation error mentioning {needle}, got {other:?}."),
	}
}

fn write_temp_config(raw: &str) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("Clock before epoch.").as_nanos();
	let path = env::temp_dir().join(format!(
		"medi_config_{}_{}_{}.toml",
		std::process::id(),
		nanos,
		COUNTER.fetch_add(1, Ordering::SeqCst)
	));

	fs::write(&path, raw).expect("Failed to write temp config.");

	path
}

#[test]
fn sample_config_loads_and_normalizes_blank_secrets() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML);
	let cfg = medi_config::load(&path).expect("Sample config must load.");

	fs::remove_file(&path).expect("Failed to remove temp config.");

	assert_eq!(cfg.retrieval.top_k, 5);
	assert_eq!(cfg.storage.qdrant.vector_dim, 1_024);
	assert!(cfg.storage.qdrant.api_key.is_none());
	assert!(cfg.security.api_auth_token.is_none());
}

#[test]
fn retrieval_section_defaults_when_omitted() {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");

	root.as_table_mut().expect("Template config must be a table.").remove("retrieval");

	let raw = toml::to_string(&root).expect("Failed to render template config.");
	let cfg = medi_config::from_toml_str(&raw).expect("Config without [retrieval] must load.");

	assert_eq!(cfg.retrieval.top_k, 5);
	assert_eq!(cfg.retrieval.max_top_k, 20);
	assert!((cfg.retrieval.similarity_threshold - 0.7).abs() < f32::EPSILON);
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	let raw = sample_with("providers.embedding", "dimensions", Value::Integer(768));

	expect_validation(&raw, "providers.embedding.dimensions must match");
}

#[test]
fn top_k_must_not_exceed_max_top_k() {
	let raw = sample_with("retrieval", "top_k", Value::Integer(21));

	expect_validation(&raw, "retrieval.top_k");
}

#[test]
fn threshold_must_be_within_unit_range() {
	let raw = sample_with("retrieval", "similarity_threshold", Value::Float(1.5));

	expect_validation(&raw, "retrieval.similarity_threshold");
}

#[test]
fn expand_limit_must_be_positive() {
	let raw = sample_with("retrieval", "expand_limit", Value::Integer(0));

	expect_validation(&raw, "retrieval.expand_limit");
}

#[test]
fn embedding_api_key_must_be_present() {
	let raw = sample_with("providers.embedding", "api_key", Value::String(" ".to_string()));

	expect_validation(&raw, "api_key must be non-empty");
}

#[test]
fn missing_file_reports_path() {
	let path = env::temp_dir().join("medi_config_missing_file.toml");
	let err = medi_config::load(&path).expect_err("Missing file must fail.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}
