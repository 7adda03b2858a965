use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::Html,
    Json,
};
use tracing::info;

use registry_common::person::{Person, PersonPayload};
use registry_common::store::PersonStore;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::render::render_person_page;

pub async fn create_student(
    _: AdminAuth,
    State(store): State<Arc<dyn PersonStore>>,
    payload: Result<Json<PersonPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Person>), ApiError> {
    let Json(payload) = payload?;

    let new_person = payload.into_new_person()?;
    let person = store.insert(new_person).await?;

    metrics::counter!("registry_students_created_total").increment(1);
    info!(id = person.id, "registered student");

    Ok((StatusCode::CREATED, Json(person)))
}

pub async fn get_student(
    _: AdminAuth,
    State(store): State<Arc<dyn PersonStore>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Person>, ApiError> {
    let Path(id) = id?;

    Ok(Json(find_student(store.as_ref(), id).await?))
}

pub async fn student_page(
    _: AdminAuth,
    State(store): State<Arc<dyn PersonStore>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Html<String>, ApiError> {
    let Path(id) = id?;
    let person = find_student(store.as_ref(), id).await?;

    Ok(Html(render_person_page(&person)))
}

async fn find_student(store: &dyn PersonStore, id: i64) -> Result<Person, ApiError> {
    store.find_by_id(id).await?.ok_or(ApiError::NotFound)
}
