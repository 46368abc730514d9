use axum::{
	Json, Router,
	body::Body,
	extract::{Path, Query, State},
	http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{delete, get, patch, post},
};
use serde::Serialize;

use medi_domain::progress::SessionProgress;
use medi_service::{
	ConsultRequest, ConsultResponse, EmbedRequest, EmbedResponse, Error, ListResponse, PageRequest,
	RebuildReport, ReplaceProgressRequest, SearchRequest, SearchResponse,
	conditions::{ConditionDetail, CreateConditionRequest, UpdateConditionRequest},
	conversations::{CreateConversationRequest, UpdateConversationRequest},
	exclusion_methods::{
		CreateExclusionMethodRequest, LinkExclusionMethodRequest, UpdateExclusionMethodRequest,
	},
	messages::{CreateMessageRequest, UpdateMessageRequest},
	sympgan::{
		CreateDiseaseRequest, CreateSymptomRequest, KnowledgeSearchRequest,
		LinkDiseaseSymptomRequest, UpdateDiseaseRequest, UpdateSymptomRequest,
	},
	treatment_plans::{
		CreateTreatmentPlanRequest, LinkTreatmentPlanRequest, UpdatePlanLinkRequest,
		UpdateTreatmentPlanRequest,
	},
};
use medi_storage::models::{
	Condition, ConditionExclusionMethod, ConditionTreatmentPlan, Conversation, Disease,
	DiseaseSymptomAssociation, ExclusionMethod, LinkedTreatmentPlan, Message, Symptom,
	TreatmentPlan,
};

use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone, Debug)]
struct AuthToken(Option<String>);

pub fn router(state: AppState) -> Router {
	let token = AuthToken(state.service.cfg.security.api_auth_token.clone());
	let v1 = Router::new()
		.route("/consultation/query", post(consult))
		.route("/consultation/search", get(search))
		.route("/embedding/embed", get(embed_query_text).post(embed))
		.route("/conditions", get(list_conditions).post(create_condition))
		.route(
			"/conditions/{condition_id}",
			get(get_condition).patch(update_condition).delete(delete_condition),
		)
		.route(
			"/conditions/{condition_id}/exclusion-methods",
			get(condition_exclusion_methods).post(link_exclusion_method),
		)
		.route(
			"/conditions/{condition_id}/treatment-plans",
			get(condition_treatment_plans).post(link_treatment_plan),
		)
		.route("/condition-exclusion-methods/{association_id}", delete(unlink_exclusion_method))
		.route(
			"/condition-treatment-plans/{association_id}",
			patch(update_plan_link).delete(unlink_treatment_plan),
		)
		.route("/exclusion-methods", get(list_exclusion_methods).post(create_exclusion_method))
		.route(
			"/exclusion-methods/{method_id}",
			get(get_exclusion_method).patch(update_exclusion_method).delete(delete_exclusion_method),
		)
		.route("/treatment-plans", get(list_treatment_plans).post(create_treatment_plan))
		.route(
			"/treatment-plans/{plan_id}",
			get(get_treatment_plan).patch(update_treatment_plan).delete(delete_treatment_plan),
		)
		.route("/conversations", get(list_conversations).post(create_conversation))
		.route(
			"/conversations/{conversation_id}",
			get(get_conversation).patch(update_conversation).delete(delete_conversation),
		)
		.route(
			"/conversations/{conversation_id}/progress",
			get(get_progress).put(replace_progress),
		)
		.route(
			"/conversations/{conversation_id}/messages",
			get(list_messages).post(create_message),
		)
		.route(
			"/messages/{message_id}",
			get(get_message).patch(update_message).delete(delete_message),
		)
		.route("/diseases", get(list_diseases).post(create_disease))
		.route("/diseases/search/{query}", get(search_diseases))
		.route(
			"/diseases/{disease_id}",
			get(get_disease).patch(update_disease).delete(delete_disease),
		)
		.route("/diseases/{disease_id}/symptoms", get(disease_symptoms))
		.route("/symptoms", get(list_symptoms).post(create_symptom))
		.route("/symptoms/search/{query}", get(search_symptoms))
		.route(
			"/symptoms/{symptom_id}",
			get(get_symptom).patch(update_symptom).delete(delete_symptom),
		)
		.route("/symptoms/{symptom_id}/diseases", get(symptom_diseases))
		.route("/disease-symptom-associations", post(link_disease_symptom))
		.layer(middleware::from_fn_with_state(token, auth_middleware));

	Router::new().route("/health", get(health)).nest("/v1", v1).with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	let token = AuthToken(state.service.cfg.security.admin_auth_token.clone());

	Router::new()
		.route("/v1/admin/rebuild_index", post(rebuild_index))
		.layer(middleware::from_fn_with_state(token, auth_middleware))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn consult(
	State(state): State<AppState>,
	Json(payload): Json<ConsultRequest>,
) -> ApiResult<Json<ConsultResponse>> {
	Ok(Json(state.service.consult(payload).await?))
}

async fn search(
	State(state): State<AppState>,
	Query(query): Query<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
	Ok(Json(state.service.search(query).await?))
}

async fn embed(
	State(state): State<AppState>,
	Json(payload): Json<EmbedRequest>,
) -> ApiResult<Json<EmbedResponse>> {
	Ok(Json(state.service.embed_text(payload).await?))
}

async fn embed_query_text(
	State(state): State<AppState>,
	Query(query): Query<EmbedRequest>,
) -> ApiResult<Json<EmbedResponse>> {
	Ok(Json(state.service.embed_text(query).await?))
}

async fn list_conditions(
	State(state): State<AppState>,
	Query(page): Query<PageRequest>,
) -> ApiResult<Json<ListResponse<Condition>>> {
	Ok(Json(state.service.list_conditions(page).await?))
}

async fn create_condition(
	State(state): State<AppState>,
	Json(payload): Json<CreateConditionRequest>,
) -> ApiResult<(StatusCode, Json<Condition>)> {
	Ok((StatusCode::CREATED, Json(state.service.create_condition(payload).await?)))
}

async fn get_condition(
	State(state): State<AppState>,
	Path(condition_id): Path<i64>,
) -> ApiResult<Json<ConditionDetail>> {
	Ok(Json(state.service.get_condition(condition_id).await?))
}

async fn update_condition(
	State(state): State<AppState>,
	Path(condition_id): Path<i64>,
	Json(payload): Json<UpdateConditionRequest>,
) -> ApiResult<Json<Condition>> {
	Ok(Json(state.service.update_condition(condition_id, payload).await?))
}

async fn delete_condition(
	State(state): State<AppState>,
	Path(condition_id): Path<i64>,
) -> ApiResult<StatusCode> {
	state.service.delete_condition(condition_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn condition_exclusion_methods(
	State(state): State<AppState>,
	Path(condition_id): Path<i64>,
) -> ApiResult<Json<ListResponse<ExclusionMethod>>> {
	Ok(Json(state.service.condition_exclusion_methods(condition_id).await?))
}

async fn link_exclusion_method(
	State(state): State<AppState>,
	Path(condition_id): Path<i64>,
	Json(payload): Json<LinkExclusionMethodRequest>,
) -> ApiResult<(StatusCode, Json<ConditionExclusionMethod>)> {
	let link = state.service.link_exclusion_method(condition_id, payload).await?;

	Ok((StatusCode::CREATED, Json(link)))
}

async fn unlink_exclusion_method(
	State(state): State<AppState>,
	Path(association_id): Path<i64>,
) -> ApiResult<StatusCode> {
	state.service.unlink_exclusion_method(association_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn condition_treatment_plans(
	State(state): State<AppState>,
	Path(condition_id): Path<i64>,
) -> ApiResult<Json<ListResponse<LinkedTreatmentPlan>>> {
	Ok(Json(state.service.condition_treatment_plans(condition_id).await?))
}

async fn link_treatment_plan(
	State(state): State<AppState>,
	Path(condition_id): Path<i64>,
	Json(payload): Json<LinkTreatmentPlanRequest>,
) -> ApiResult<(StatusCode, Json<ConditionTreatmentPlan>)> {
	let link = state.service.link_treatment_plan(condition_id, payload).await?;

	Ok((StatusCode::CREATED, Json(link)))
}

async fn update_plan_link(
	State(state): State<AppState>,
	Path(association_id): Path<i64>,
	Json(payload): Json<UpdatePlanLinkRequest>,
) -> ApiResult<Json<ConditionTreatmentPlan>> {
	Ok(Json(state.service.update_plan_link(association_id, payload).await?))
}

async fn unlink_treatment_plan(
	State(state): State<AppState>,
	Path(association_id): Path<i64>,
) -> ApiResult<StatusCode> {
	state.service.unlink_treatment_plan(association_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn list_exclusion_methods(
	State(state): State<AppState>,
	Query(page): Query<PageRequest>,
) -> ApiResult<Json<ListResponse<ExclusionMethod>>> {
	Ok(Json(state.service.list_exclusion_methods(page).await?))
}

async fn create_exclusion_method(
	State(state): State<AppState>,
	Json(payload): Json<CreateExclusionMethodRequest>,
) -> ApiResult<(StatusCode, Json<ExclusionMethod>)> {
	Ok((StatusCode::CREATED, Json(state.service.create_exclusion_method(payload).await?)))
}

async fn get_exclusion_method(
	State(state): State<AppState>,
	Path(method_id): Path<i64>,
) -> ApiResult<Json<ExclusionMethod>> {
	Ok(Json(state.service.get_exclusion_method(method_id).await?))
}

async fn update_exclusion_method(
	State(state): State<AppState>,
	Path(method_id): Path<i64>,
	Json(payload): Json<UpdateExclusionMethodRequest>,
) -> ApiResult<Json<ExclusionMethod>> {
	Ok(Json(state.service.update_exclusion_method(method_id, payload).await?))
}

async fn delete_exclusion_method(
	State(state): State<AppState>,
	Path(method_id): Path<i64>,
) -> ApiResult<StatusCode> {
	state.service.delete_exclusion_method(method_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn list_treatment_plans(
	State(state): State<AppState>,
	Query(page): Query<PageRequest>,
) -> ApiResult<Json<ListResponse<TreatmentPlan>>> {
	Ok(Json(state.service.list_treatment_plans(page).await?))
}

async fn create_treatment_plan(
	State(state): State<AppState>,
	Json(payload): Json<CreateTreatmentPlanRequest>,
) -> ApiResult<(StatusCode, Json<TreatmentPlan>)> {
	Ok((StatusCode::CREATED, Json(state.service.create_treatment_plan(payload).await?)))
}

async fn get_treatment_plan(
	State(state): State<AppState>,
	Path(plan_id): Path<i64>,
) -> ApiResult<Json<TreatmentPlan>> {
	Ok(Json(state.service.get_treatment_plan(plan_id).await?))
}

async fn update_treatment_plan(
	State(state): State<AppState>,
	Path(plan_id): Path<i64>,
	Json(payload): Json<UpdateTreatmentPlanRequest>,
) -> ApiResult<Json<TreatmentPlan>> {
	Ok(Json(state.service.update_treatment_plan(plan_id, payload).await?))
}

async fn delete_treatment_plan(
	State(state): State<AppState>,
	Path(plan_id): Path<i64>,
) -> ApiResult<StatusCode> {
	state.service.delete_treatment_plan(plan_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn list_conversations(
	State(state): State<AppState>,
	Query(page): Query<PageRequest>,
) -> ApiResult<Json<ListResponse<Conversation>>> {
	Ok(Json(state.service.list_conversations(page).await?))
}

async fn create_conversation(
	State(state): State<AppState>,
	Json(payload): Json<CreateConversationRequest>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
	Ok((StatusCode::CREATED, Json(state.service.create_conversation(payload).await?)))
}

async fn get_conversation(
	State(state): State<AppState>,
	Path(conversation_id): Path<i64>,
) -> ApiResult<Json<Conversation>> {
	Ok(Json(state.service.get_conversation(conversation_id).await?))
}

async fn update_conversation(
	State(state): State<AppState>,
	Path(conversation_id): Path<i64>,
	Json(payload): Json<UpdateConversationRequest>,
) -> ApiResult<Json<Conversation>> {
	Ok(Json(state.service.update_conversation(conversation_id, payload).await?))
}

async fn delete_conversation(
	State(state): State<AppState>,
	Path(conversation_id): Path<i64>,
) -> ApiResult<StatusCode> {
	state.service.delete_conversation(conversation_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn get_progress(
	State(state): State<AppState>,
	Path(conversation_id): Path<i64>,
) -> ApiResult<Json<SessionProgress>> {
	Ok(Json(state.service.get_progress(conversation_id).await?))
}

async fn replace_progress(
	State(state): State<AppState>,
	Path(conversation_id): Path<i64>,
	Json(payload): Json<ReplaceProgressRequest>,
) -> ApiResult<Json<SessionProgress>> {
	Ok(Json(state.service.replace_progress(conversation_id, payload).await?))
}

async fn list_messages(
	State(state): State<AppState>,
	Path(conversation_id): Path<i64>,
	Query(page): Query<PageRequest>,
) -> ApiResult<Json<ListResponse<Message>>> {
	Ok(Json(state.service.list_messages(conversation_id, page).await?))
}

async fn create_message(
	State(state): State<AppState>,
	Path(conversation_id): Path<i64>,
	Json(payload): Json<CreateMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
	let message = state.service.create_message(conversation_id, payload).await?;

	Ok((StatusCode::CREATED, Json(message)))
}

async fn get_message(
	State(state): State<AppState>,
	Path(message_id): Path<i64>,
) -> ApiResult<Json<Message>> {
	Ok(Json(state.service.get_message(message_id).await?))
}

async fn update_message(
	State(state): State<AppState>,
	Path(message_id): Path<i64>,
	Json(payload): Json<UpdateMessageRequest>,
) -> ApiResult<Json<Message>> {
	Ok(Json(state.service.update_message(message_id, payload).await?))
}

async fn delete_message(
	State(state): State<AppState>,
	Path(message_id): Path<i64>,
) -> ApiResult<StatusCode> {
	state.service.delete_message(message_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn list_diseases(
	State(state): State<AppState>,
	Query(page): Query<PageRequest>,
) -> ApiResult<Json<ListResponse<Disease>>> {
	Ok(Json(state.service.list_diseases(page).await?))
}

async fn create_disease(
	State(state): State<AppState>,
	Json(payload): Json<CreateDiseaseRequest>,
) -> ApiResult<(StatusCode, Json<Disease>)> {
	Ok((StatusCode::CREATED, Json(state.service.create_disease(payload).await?)))
}

async fn search_diseases(
	State(state): State<AppState>,
	Path(query): Path<String>,
	Query(params): Query<KnowledgeSearchRequest>,
) -> ApiResult<Json<ListResponse<Disease>>> {
	Ok(Json(state.service.search_diseases(&query, params).await?))
}

async fn get_disease(
	State(state): State<AppState>,
	Path(disease_id): Path<i64>,
) -> ApiResult<Json<Disease>> {
	Ok(Json(state.service.get_disease(disease_id).await?))
}

async fn update_disease(
	State(state): State<AppState>,
	Path(disease_id): Path<i64>,
	Json(payload): Json<UpdateDiseaseRequest>,
) -> ApiResult<Json<Disease>> {
	Ok(Json(state.service.update_disease(disease_id, payload).await?))
}

async fn delete_disease(
	State(state): State<AppState>,
	Path(disease_id): Path<i64>,
) -> ApiResult<StatusCode> {
	state.service.delete_disease(disease_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn disease_symptoms(
	State(state): State<AppState>,
	Path(disease_id): Path<i64>,
) -> ApiResult<Json<ListResponse<Symptom>>> {
	Ok(Json(state.service.disease_symptoms(disease_id).await?))
}

async fn list_symptoms(
	State(state): State<AppState>,
	Query(page): Query<PageRequest>,
) -> ApiResult<Json<ListResponse<Symptom>>> {
	Ok(Json(state.service.list_symptoms(page).await?))
}

async fn create_symptom(
	State(state): State<AppState>,
	Json(payload): Json<CreateSymptomRequest>,
) -> ApiResult<(StatusCode, Json<Symptom>)> {
	Ok((StatusCode::CREATED, Json(state.service.create_symptom(payload).await?)))
}

async fn search_symptoms(
	State(state): State<AppState>,
	Path(query): Path<String>,
	Query(params): Query<KnowledgeSearchRequest>,
) -> ApiResult<Json<ListResponse<Symptom>>> {
	Ok(Json(state.service.search_symptoms(&query, params).await?))
}

async fn get_symptom(
	State(state): State<AppState>,
	Path(symptom_id): Path<i64>,
) -> ApiResult<Json<Symptom>> {
	Ok(Json(state.service.get_symptom(symptom_id).await?))
}

async fn update_symptom(
	State(state): State<AppState>,
	Path(symptom_id): Path<i64>,
	Json(payload): Json<UpdateSymptomRequest>,
) -> ApiResult<Json<Symptom>> {
	Ok(Json(state.service.update_symptom(symptom_id, payload).await?))
}

async fn delete_symptom(
	State(state): State<AppState>,
	Path(symptom_id): Path<i64>,
) -> ApiResult<StatusCode> {
	state.service.delete_symptom(symptom_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn symptom_diseases(
	State(state): State<AppState>,
	Path(symptom_id): Path<i64>,
) -> ApiResult<Json<ListResponse<Disease>>> {
	Ok(Json(state.service.symptom_diseases(symptom_id).await?))
}

async fn link_disease_symptom(
	State(state): State<AppState>,
	Json(payload): Json<LinkDiseaseSymptomRequest>,
) -> ApiResult<Json<DiseaseSymptomAssociation>> {
	Ok(Json(state.service.link_disease_symptom(payload).await?))
}

async fn rebuild_index(State(state): State<AppState>) -> ApiResult<Json<RebuildReport>> {
	Ok(Json(state.service.rebuild_index().await?))
}

async fn auth_middleware(
	State(token): State<AuthToken>,
	req: Request<Body>,
	next: Next,
) -> Response {
	if !is_authorized(req.headers(), &token) {
		return json_error(
			StatusCode::UNAUTHORIZED,
			"unauthorized",
			"A valid Bearer token is required.",
			None,
		)
		.into_response();
	}

	next.run(req).await
}

fn is_authorized(headers: &HeaderMap, token: &AuthToken) -> bool {
	match token.0.as_deref() {
		None => true,
		Some(expected) => read_bearer_token(headers).is_some_and(|token| token == expected),
	}
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let message = err.to_string();

		match err {
			Error::InvalidQuery { .. } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_query", message, None),
			Error::InvalidRequest { .. } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			Error::InvalidProgress { unknown_ids, duplicate_ids, .. } => {
				let fields = unknown_ids
					.iter()
					.chain(&duplicate_ids)
					.map(|id| id.to_string())
					.collect();

				json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_progress", message, Some(fields))
			},
			Error::EmbeddingUnavailable { .. } =>
				json_error(StatusCode::SERVICE_UNAVAILABLE, "embedding_unavailable", message, None),
			Error::IndexUnavailable { .. } =>
				json_error(StatusCode::SERVICE_UNAVAILABLE, "index_unavailable", message, None),
			Error::UpstreamTimeout { .. } =>
				json_error(StatusCode::GATEWAY_TIMEOUT, "upstream_timeout", message, None),
			Error::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", message, None),
			Error::Conflict { .. } => json_error(StatusCode::CONFLICT, "conflict", message, None),
			Error::VersionConflict { .. } =>
				json_error(StatusCode::CONFLICT, "version_conflict", message, None),
			Error::Storage { .. } => {
				tracing::error!(error = %message, "Storage failure.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"storage_error",
					"Internal storage error.",
					None,
				)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bearer_tokens_are_checked_when_configured() {
		let mut headers = HeaderMap::new();
		let required = AuthToken(Some("secret".to_string()));

		assert!(is_authorized(&headers, &AuthToken(None)));
		assert!(!is_authorized(&headers, &required));

		headers.insert(AUTHORIZATION, "Bearer wrong".parse().unwrap());

		assert!(!is_authorized(&headers, &required));

		headers.insert(AUTHORIZATION, "Bearer  secret ".parse().unwrap());

		assert!(is_authorized(&headers, &required));
	}

	#[test]
	fn upstream_failures_map_to_gateway_statuses() {
		let index = ApiError::from(Error::IndexUnavailable { message: "refused".to_string() });
		let embedding =
			ApiError::from(Error::EmbeddingUnavailable { message: "refused".to_string() });
		let timeout =
			ApiError::from(Error::UpstreamTimeout { stage: "vector search", timeout_ms: 20 });

		assert_eq!(index.status, StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(index.error_code, "index_unavailable");
		assert_eq!(embedding.status, StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(timeout.status, StatusCode::GATEWAY_TIMEOUT);
		assert_eq!(timeout.error_code, "upstream_timeout");
	}

	#[test]
	fn progress_errors_list_offending_ids() {
		let err = ApiError::from(Error::InvalidProgress {
			message: "bad".to_string(),
			unknown_ids: vec![99],
			duplicate_ids: vec![4],
		});

		assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(err.error_code, "invalid_progress");
		assert_eq!(
			err.fields,
			Some(vec!["99".to_string(), "4".to_string()])
		);
	}
}
