use crate::AppState;
use crate::api::error::{AppError, ErrorResponse};
use crate::models::Upload;
use crate::utils::validation::normalize_target_format;
use axum::{
    body::Body,
    extract::{Multipart, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::Response,
};
use futures::TryStreamExt;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

/// Multipart form accepted by `POST /convert` (documentation only).
#[derive(ToSchema)]
pub struct ConvertForm {
    /// The media file to convert
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Desired output extension, e.g. `mp4` or `mp3`
    pub target_format: String,
    /// Output file name without extension; defaults to the input's name
    pub filename: Option<String>,
}

#[utoipa::path(
    post,
    path = "/convert",
    request_body(content = ConvertForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Converted file, streamed as an attachment"),
        (status = 400, description = "Missing input or unsupported conversion", body = ErrorResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse),
        (status = 500, description = "Conversion tool failed", body = ErrorResponse)
    ),
    tag = "convert"
)]
pub async fn convert_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload: Option<Upload> = None;
    let mut target_format: Option<String> = None;
    let mut output_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            // A `file` part without a filename is a plain form value, not an upload.
            "file" if field.file_name().is_some() => {
                let original_filename = field.file_name().unwrap_or_default().to_string();
                if original_filename.is_empty() {
                    return Err(AppError::BadRequest("no selected file".to_string()));
                }

                let body_with_io_error = field.map_err(std::io::Error::other);
                let mut reader = StreamReader::new(body_with_io_error);

                upload = Some(
                    state
                        .conversions
                        .upload_to_staging(&original_filename, &mut reader)
                        .await?,
                );
            }
            "target_format" => {
                let value = field.text().await.map_err(multipart_error)?;
                // Sent ahead of the file, a blank format fails before anything is staged.
                if upload.is_none() && normalize_target_format(&value).is_none() {
                    return Err(missing_target_format());
                }
                target_format = Some(value);
            }
            "filename" => {
                output_name = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("no file part".to_string()))?;
    let target_format = target_format
        .as_deref()
        .and_then(normalize_target_format)
        .ok_or_else(missing_target_format)?;

    let artifact = state
        .conversions
        .convert(upload, &target_format, output_name.as_deref())
        .await?;

    let content_type = content_type_for(&artifact.extension);
    let content_disposition = attachment_disposition(&artifact.download_name);

    let (len, stream) = artifact.file.into_stream().await.map_err(|e| {
        AppError::Internal(format!(
            "Converted file {} is not readable: {}",
            artifact.download_name, e
        ))
    })?;

    tracing::info!(
        "📤 Streaming {} ({} bytes) for {}",
        artifact.download_name,
        len,
        artifact.id
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, len)
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

fn missing_target_format() -> AppError {
    AppError::BadRequest("target_format is required (e.g., mp4, mp3)".to_string())
}

fn multipart_error(e: MultipartError) -> AppError {
    let err_msg = e.to_string();
    if err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}

/// `attachment` with a quoted ASCII fallback plus the RFC 5987 UTF-8 form.
pub(crate) fn attachment_disposition(filename: &str) -> String {
    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .collect::<String>();
    let fallback_filename = if ascii_filename.is_empty() {
        "file"
    } else {
        &ascii_filename
    };

    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    )
}

pub(crate) fn content_type_for(extension: &str) -> mime::Mime {
    let essence = match extension {
        "mp4" | "m4v" | "f4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mov" | "qt" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "mpeg" | "mpg" => "video/mpeg",
        "3gp" => "video/3gpp",
        "ts" => "video/mp2t",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "opus" => "audio/opus",
        "m4a" => "audio/mp4",
        "aiff" => "audio/aiff",
        "amr" => "audio/amr",
        "wma" => "audio/x-ms-wma",
        _ => return mime::APPLICATION_OCTET_STREAM,
    };
    essence.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}
