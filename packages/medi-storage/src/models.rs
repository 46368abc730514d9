use serde::Serialize;
use sqlx::types::Json;
use time::OffsetDateTime;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Condition {
	pub id: i64,
	pub name: String,
	pub full_description: Option<String>,
	pub summary: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl Condition {
	/// Text mirrored into the vector index.
	pub fn index_text(&self) -> &str {
		if self.summary.trim().is_empty() { self.name.as_str() } else { self.summary.as_str() }
	}
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct ExclusionMethod {
	pub id: i64,
	pub name: String,
	pub description: Option<String>,
	pub procedure_steps: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct TreatmentPlan {
	pub id: i64,
	pub name: String,
	pub description: Option<String>,
	pub medications: Vec<String>,
	pub procedures: Vec<String>,
	pub factors: Vec<String>,
	pub contraindications: Vec<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct ConditionExclusionMethod {
	pub id: i64,
	pub condition_id: i64,
	pub exclusion_method_id: i64,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct ConditionTreatmentPlan {
	pub id: i64,
	pub condition_id: i64,
	pub treatment_plan_id: i64,
	pub is_primary: bool,
	pub priority: i32,
	pub notes: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

/// A treatment plan joined with the association that links it to one condition.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct LinkedTreatmentPlan {
	pub association_id: i64,
	pub is_primary: bool,
	pub priority: i32,
	pub notes: Option<String>,
	#[sqlx(flatten)]
	#[serde(flatten)]
	pub plan: TreatmentPlan,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Conversation {
	pub id: i64,
	pub title: String,
	pub department: Option<String>,
	pub patient_id: Option<i64>,
	pub user_id: Option<i64>,
	pub progress: Json<Vec<i64>>,
	pub progress_version: i64,
	#[serde(with = "crate::time_serde")]
	pub started_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ProgressRow {
	pub progress: Json<Vec<i64>>,
	pub progress_version: i64,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Message {
	pub id: i64,
	pub conversation_id: i64,
	pub role: Option<String>,
	pub content: String,
	#[serde(with = "crate::time_serde")]
	pub sent_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Disease {
	pub id: i64,
	pub cui: String,
	pub name: String,
	pub alias: Option<String>,
	pub definition: Option<String>,
	pub external_ids: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Symptom {
	pub id: i64,
	pub cui: String,
	pub name: String,
	pub alias: Option<String>,
	pub definition: Option<String>,
	pub external_ids: Option<String>,
	pub full_description: Option<String>,
	pub summary: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct DiseaseSymptomAssociation {
	pub id: i64,
	pub disease_id: i64,
	pub symptom_id: i64,
	pub source: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}
