//! Admin pairing API - matching, trio expansion, approvals, and statistics.

use super::{AppState, JsonBody, middleware_auth::RequireAdmin, required};
use crate::{
    core::{
        auth::AuthContext,
        pairing::{self, ExternalPartner, ExternalPartnerKind},
        statistics, submission,
        submission::PartnerDetailsUpdate,
    },
    entities::PairingType,
    errors::Result,
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Deserialize)]
pub(super) struct CreatePairPayload {
    #[serde(default)]
    user_1_id: String,
    #[serde(default)]
    user_2_id: String,
    #[serde(default)]
    batch_id: String,
}

/// POST /pairing/create - Pair two registered students.
pub(super) async fn handler_create(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    JsonBody(payload): JsonBody<CreatePairPayload>,
) -> Result<Json<Value>> {
    let created = pairing::create_system_match(
        &state.db,
        &actor,
        &payload.user_1_id,
        &payload.user_2_id,
        &payload.batch_id,
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Pairing created successfully",
        "pairing": created,
    })))
}

#[derive(Deserialize)]
pub(super) struct AddToPairPayload {
    pairing_id: Option<i64>,
    #[serde(default)]
    user_id: String,
}

/// POST /pairing/add-to-pair - Expand a pair into a trio.
pub(super) async fn handler_add_to_pair(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    JsonBody(payload): JsonBody<AddToPairPayload>,
) -> Result<Json<Value>> {
    let pairing_id = required(payload.pairing_id, "pairing_id")?;
    let updated = pairing::add_third_member(&state.db, &actor, pairing_id, &payload.user_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User added to pair successfully",
        "pairing": updated,
    })))
}

#[derive(Deserialize)]
pub(super) struct ApproveExternalPayload {
    submission_id: Option<i64>,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    partner_name: String,
    partner_relationship: Option<String>,
    partner_notes: Option<String>,
}

async fn approve_external(
    state: &AppState,
    actor: &AuthContext,
    kind: ExternalPartnerKind,
    payload: ApproveExternalPayload,
) -> Result<Json<Value>> {
    let submission_id = required(payload.submission_id, "submission_id")?;
    let partner = ExternalPartner {
        name: payload.partner_name,
        relationship: payload.partner_relationship,
        notes: payload.partner_notes,
    };
    let created = pairing::approve_external_match(
        &state.db,
        actor,
        kind,
        submission_id,
        &payload.user_id,
        partner,
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Pairing approved successfully",
        "pairing": created,
    })))
}

/// POST /pairing/approve-family - Approve a family partner.
pub(super) async fn handler_approve_family(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    JsonBody(payload): JsonBody<ApproveExternalPayload>,
) -> Result<Json<Value>> {
    approve_external(&state, &actor, ExternalPartnerKind::Family, payload).await
}

/// POST /pairing/approve-tarteel - Approve an external listening partner.
pub(super) async fn handler_approve_tarteel(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    JsonBody(payload): JsonBody<ApproveExternalPayload>,
) -> Result<Json<Value>> {
    approve_external(&state, &actor, ExternalPartnerKind::Tarteel, payload).await
}

#[derive(Deserialize)]
pub(super) struct ApproveSelfMatchPayload {
    submission_id: Option<i64>,
    #[serde(default)]
    user_1_id: String,
    #[serde(default)]
    user_2_id: String,
}

/// POST /pairing/approve - Approve a self-declared pair.
pub(super) async fn handler_approve_self_match(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    JsonBody(payload): JsonBody<ApproveSelfMatchPayload>,
) -> Result<Json<Value>> {
    let submission_id = required(payload.submission_id, "submission_id")?;
    let approval = pairing::approve_self_match(
        &state.db,
        &actor,
        submission_id,
        &payload.user_1_id,
        &payload.user_2_id,
    )
    .await?;
    let message = if approval.already_paired {
        "Users were already paired, submissions approved"
    } else {
        "Pairing approved successfully"
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "already_paired": approval.already_paired,
        "pairing": approval.pairing,
    })))
}

#[derive(Deserialize)]
pub(super) struct RejectPayload {
    submission_id: Option<i64>,
    reason: Option<String>,
}

/// POST /pairing/reject - Send a request back to the system-match pool.
pub(super) async fn handler_reject(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    JsonBody(payload): JsonBody<RejectPayload>,
) -> Result<Json<Value>> {
    let submission_id = required(payload.submission_id, "submission_id")?;
    let rejected =
        submission::reject_pairing_request(&state.db, &actor, submission_id, payload.reason)
            .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Pairing request rejected",
        "submission": rejected,
    })))
}

#[derive(Deserialize)]
pub(super) struct ChangePartnerTypePayload {
    submission_id: Option<i64>,
    new_partner_type: Option<PairingType>,
    partner_name: Option<String>,
    partner_relationship: Option<String>,
    partner_notes: Option<String>,
}

/// POST /pairing/change-partner-type - Move a confirmation to another type.
pub(super) async fn handler_change_partner_type(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    JsonBody(payload): JsonBody<ChangePartnerTypePayload>,
) -> Result<Json<Value>> {
    let submission_id = required(payload.submission_id, "submission_id")?;
    let new_type = required(payload.new_partner_type, "new_partner_type")?;
    let details = PartnerDetailsUpdate {
        partner_name: payload.partner_name,
        partner_relationship: payload.partner_relationship,
        partner_notes: payload.partner_notes,
    };
    let changed =
        submission::change_partner_type(&state.db, &actor, submission_id, new_type, details)
            .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Partner type changed to {}", new_type.as_str()),
        "submission": changed,
    })))
}

#[derive(Deserialize)]
pub(super) struct UserBatchQuery {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    batch_id: String,
}

/// GET /pairing/delete - The confirmed pairing a user would lose.
pub(super) async fn handler_details(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    Query(params): Query<UserBatchQuery>,
) -> Result<Json<Value>> {
    let found =
        pairing::get_pairing_for_user(&state.db, &actor, &params.user_id, &params.batch_id).await?;
    Ok(Json(json!({ "success": true, "pairing": found })))
}

/// DELETE /pairing/delete - Dissolve a user's pairing.
pub(super) async fn handler_dissolve(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    Query(params): Query<UserBatchQuery>,
) -> Result<Json<Value>> {
    let dissolved =
        pairing::dissolve_pairing(&state.db, &actor, &params.user_id, &params.batch_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Pairing dissolved",
        "pairing": dissolved,
    })))
}

#[derive(Deserialize)]
pub(super) struct BatchQuery {
    #[serde(default)]
    batch_id: String,
}

/// GET /pairing/statistics - Submitted and approved counts per partner type.
pub(super) async fn handler_statistics(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    Query(params): Query<BatchQuery>,
) -> Result<Json<Value>> {
    let stats = statistics::pairing_statistics(&state.db, &actor, &params.batch_id).await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}
