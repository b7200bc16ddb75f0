//! Halaqah API - creation, roster view, join, leave, and waitlist promotion.

use super::{
    AppState, JsonBody,
    middleware_auth::{RequireAdmin, RequireAuth},
    required,
};
use crate::{
    core::halaqah::{self, NewHalaqah},
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Deserialize)]
pub(super) struct CreateHalaqahPayload {
    #[serde(default)]
    batch_id: String,
    #[serde(default)]
    name: String,
    max_students: Option<i32>,
    waitlist_max: Option<i32>,
}

/// POST /halaqah - Create a halaqah (admin).
pub(super) async fn handler_create(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    JsonBody(payload): JsonBody<CreateHalaqahPayload>,
) -> Result<Json<Value>> {
    let created = halaqah::create_halaqah(
        &state.db,
        &actor,
        NewHalaqah {
            batch_id: payload.batch_id,
            name: payload.name,
            max_students: payload.max_students,
            waitlist_max: payload.waitlist_max,
        },
    )
    .await?;
    Ok(Json(json!({ "success": true, "halaqah": created })))
}

/// GET /halaqah/{id}/students - Roster, waitlist, and quota.
pub(super) async fn handler_students(
    State(state): State<Arc<AppState>>,
    RequireAuth(_actor): RequireAuth,
    Path(halaqah_id): Path<i64>,
) -> Result<Json<Value>> {
    let roster = halaqah::list_students(&state.db, halaqah_id).await?;
    Ok(Json(json!({ "success": true, "data": roster })))
}

#[derive(Deserialize)]
pub(super) struct StudentPayload {
    #[serde(alias = "thalibah_id")]
    student_id: Option<String>,
}

/// POST /halaqah/{id}/join - Take a seat or a waitlist slot.
pub(super) async fn handler_join(
    State(state): State<Arc<AppState>>,
    RequireAuth(actor): RequireAuth,
    Path(halaqah_id): Path<i64>,
    JsonBody(payload): JsonBody<StudentPayload>,
) -> Result<Json<Value>> {
    let student_id = required(payload.student_id, "student_id")?;
    let result = halaqah::join(&state.db, &actor, halaqah_id, &student_id).await?;

    let message = match result.position {
        None => "Successfully joined the halaqah".to_string(),
        Some(position) => format!("Added to waitlist at position {position}"),
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "status": result.status,
        "waitlist_position": result.position,
        "enrollment": result.enrollment,
    })))
}

/// POST /halaqah/{id}/leave - Drop out, promoting the next waitlisted student.
pub(super) async fn handler_leave(
    State(state): State<Arc<AppState>>,
    RequireAuth(actor): RequireAuth,
    Path(halaqah_id): Path<i64>,
    JsonBody(payload): JsonBody<StudentPayload>,
) -> Result<Json<Value>> {
    let student_id = required(payload.student_id, "student_id")?;
    let result = halaqah::leave(&state.db, &actor, halaqah_id, &student_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Successfully left the halaqah",
        "promoted_student": result.promoted.map(|p| p.student_id),
    })))
}

/// POST /halaqah/{id}/promote-waitlist - Move a waitlisted student to active (admin).
pub(super) async fn handler_promote_waitlist(
    State(state): State<Arc<AppState>>,
    RequireAdmin(actor): RequireAdmin,
    Path(halaqah_id): Path<i64>,
    JsonBody(payload): JsonBody<StudentPayload>,
) -> Result<Json<Value>> {
    let student_id = required(payload.student_id, "student_id")?;
    let promoted =
        halaqah::promote_from_waitlist(&state.db, &actor, halaqah_id, &student_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Student promoted from waitlist",
        "enrollment": promoted,
    })))
}
