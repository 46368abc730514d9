use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub knowledge: Knowledge,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
	pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Knobs for a consultation turn. Request fields override `top_k` and `similarity_threshold`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub top_k: u32,
	pub max_top_k: u32,
	pub similarity_threshold: f32,
	/// Cap on exclusion methods and on treatment plans returned per condition.
	pub expand_limit: u32,
	pub max_query_chars: u32,
	/// Applied separately to the embedding call and to the nearest-neighbor query.
	pub upstream_timeout_ms: u64,
	pub index_batch_size: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			top_k: 5,
			max_top_k: 20,
			similarity_threshold: 0.7,
			expand_limit: 5,
			max_query_chars: 1_000,
			upstream_timeout_ms: 10_000,
			index_batch_size: 32,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Knowledge {
	pub summary_max_chars: u32,
	pub page_limit_max: u32,
}
impl Default for Knowledge {
	fn default() -> Self {
		Self { summary_max_chars: 500, page_limit_max: 1_000 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
	pub admin_auth_token: Option<String>,
}
