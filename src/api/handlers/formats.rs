use crate::AppState;
use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct FormatsResponse {
    /// Sorted, lowercase extensions
    pub supported_input_formats: Vec<String>,
    /// Sorted, lowercase extensions
    pub supported_output_formats: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/formats",
    responses(
        (status = 200, description = "Supported input and output formats", body = FormatsResponse)
    ),
    tag = "convert"
)]
pub async fn list_formats(State(state): State<AppState>) -> Json<FormatsResponse> {
    let formats = state.conversions.formats();
    Json(FormatsResponse {
        supported_input_formats: formats.inputs(),
        supported_output_formats: formats.outputs(),
    })
}
