//! Student self-service pairing API.

use super::{AppState, JsonBody, middleware_auth::RequireAuth, required};
use crate::{
    core::{
        pairing,
        submission::{self, PartnerDetailsUpdate, PartnerPreference},
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
pub(super) struct MyPairingQuery {
    #[serde(default)]
    batch_id: String,
}

/// GET /user/pairing - The caller's confirmed pairing in a batch.
pub(super) async fn handler_my_pairing(
    State(state): State<Arc<AppState>>,
    RequireAuth(actor): RequireAuth,
    Query(params): Query<MyPairingQuery>,
) -> Result<Json<Value>> {
    let found =
        pairing::get_pairing_for_user(&state.db, &actor, &actor.user_id, &params.batch_id).await?;
    Ok(Json(json!({ "success": true, "pairing": found })))
}

#[derive(Deserialize)]
pub(super) struct PreferencePayload {
    #[serde(default)]
    batch_id: String,
    partner_type: Option<PairingType>,
    partner_user_id: Option<String>,
    partner_name: Option<String>,
    partner_relationship: Option<String>,
    partner_notes: Option<String>,
}

/// POST /user/pairing/preference - Declare how the caller wants to be paired.
pub(super) async fn handler_declare_preference(
    State(state): State<Arc<AppState>>,
    RequireAuth(actor): RequireAuth,
    JsonBody(payload): JsonBody<PreferencePayload>,
) -> Result<Json<Value>> {
    let partner_type = required(payload.partner_type, "partner_type")?;
    let pref = PartnerPreference {
        partner_type,
        partner_user_id: payload.partner_user_id,
        partner_name: payload.partner_name,
        partner_relationship: payload.partner_relationship,
        partner_notes: payload.partner_notes,
    };
    let saved =
        submission::declare_partner_preference(&state.db, &actor, &payload.batch_id, pref).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Partner preference submitted",
        "submission": saved,
    })))
}

#[derive(Deserialize)]
pub(super) struct UpdateDetailsPayload {
    submission_id: Option<i64>,
    partner_name: Option<String>,
    partner_relationship: Option<String>,
    partner_notes: Option<String>,
}

/// PATCH /user/pairing/update - Edit the caller's family or tarteel partner.
pub(super) async fn handler_update_partner_details(
    State(state): State<Arc<AppState>>,
    RequireAuth(actor): RequireAuth,
    JsonBody(payload): JsonBody<UpdateDetailsPayload>,
) -> Result<Json<Value>> {
    let submission_id = required(payload.submission_id, "submission_id")?;
    let update = PartnerDetailsUpdate {
        partner_name: payload.partner_name,
        partner_relationship: payload.partner_relationship,
        partner_notes: payload.partner_notes,
    };
    let updated =
        submission::update_partner_details(&state.db, &actor, submission_id, update).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Partner details updated successfully",
        "data": updated,
    })))
}
