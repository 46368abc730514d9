mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Knowledge, Postgres, Providers, Qdrant, Retrieval, Security,
	Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	finish(cfg)
}

pub fn from_toml_str(raw: &str) -> Result<Config> {
	let cfg: Config = toml::from_str(raw).map_err(|err| Error::ParseInline { source: err })?;

	finish(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::validation("service.http_bind must be non-empty."));
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::validation("service.admin_bind must be non-empty."));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::validation("storage.postgres.pool_max_conns must be greater than zero."));
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::validation("storage.qdrant.collection must be non-empty."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::validation(
			"providers.embedding.dimensions must be greater than zero.",
		));
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::validation(
			"providers.embedding.dimensions must match storage.qdrant.vector_dim.",
		));
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::validation("Provider embedding api_key must be non-empty."));
	}
	if cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::validation(
			"providers.embedding.timeout_ms must be greater than zero.",
		));
	}

	validate_retrieval(&cfg.retrieval)?;

	if cfg.knowledge.summary_max_chars == 0 {
		return Err(Error::validation("knowledge.summary_max_chars must be greater than zero."));
	}
	if cfg.knowledge.page_limit_max == 0 {
		return Err(Error::validation("knowledge.page_limit_max must be greater than zero."));
	}

	Ok(())
}

fn validate_retrieval(retrieval: &Retrieval) -> Result<()> {
	if retrieval.max_top_k == 0 {
		return Err(Error::validation("retrieval.max_top_k must be greater than zero."));
	}
	if retrieval.top_k == 0 || retrieval.top_k > retrieval.max_top_k {
		return Err(Error::validation(
			"retrieval.top_k must be greater than zero and at most retrieval.max_top_k.",
		));
	}
	if !retrieval.similarity_threshold.is_finite() {
		return Err(Error::validation("retrieval.similarity_threshold must be a finite number."));
	}
	if !(0.0..=1.0).contains(&retrieval.similarity_threshold) {
		return Err(Error::validation(
			"retrieval.similarity_threshold must be in the range 0.0-1.0.",
		));
	}
	if retrieval.expand_limit == 0 {
		return Err(Error::validation("retrieval.expand_limit must be greater than zero."));
	}
	if retrieval.max_query_chars == 0 {
		return Err(Error::validation("retrieval.max_query_chars must be greater than zero."));
	}
	if retrieval.upstream_timeout_ms == 0 {
		return Err(Error::validation("retrieval.upstream_timeout_ms must be greater than zero."));
	}
	if retrieval.index_batch_size == 0 {
		return Err(Error::validation("retrieval.index_batch_size must be greater than zero."));
	}

	Ok(())
}

fn finish(mut cfg: Config) -> Result<Config> {
	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

fn normalize(cfg: &mut Config) {
	for slot in [
		&mut cfg.storage.qdrant.api_key,
		&mut cfg.security.api_auth_token,
		&mut cfg.security.admin_auth_token,
	] {
		if slot.as_deref().map(|value| value.trim().is_empty()).unwrap_or(false) {
			*slot = None;
		}
	}
}
