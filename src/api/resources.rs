use std::io;

use axum::Json;
use axum::extract::{Multipart, Path, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{error, info, warn};

use super::events::{parse_event_id, require_event};
use super::extract::AdminUser;
use crate::db::repository;
use crate::error::AppError;
use crate::models::{Id, MessageResponse, NewResource, Resource};
use crate::state::AppState;
use crate::uploads::{StoredFile, UploadError, UploadStore};

/// Multipart field that carries the file.
pub const FILE_FIELD: &str = "file";

// only unreserved characters stay literal in `filename*`
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

struct ReceivedFile {
    stored: StoredFile,
    original_name: String,
    mime: String,
}

fn parse_resource_id(raw: &str) -> Result<Id, AppError> {
    Id::parse(raw).map_err(|_| AppError::invalid_id("resource"))
}

pub async fn list_resources(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Vec<Resource>>, AppError> {
    let event_id = parse_event_id(&event_id)?;
    require_event(&state, &event_id).await?;
    let resources = repository::fetch_resources_by_event_id(&state.db, &event_id).await?;
    Ok(Json(resources))
}

pub async fn upload_resource(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(event_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Resource>), AppError> {
    let event_id = parse_event_id(&event_id)?;
    require_event(&state, &event_id).await?;

    let mut received = Vec::new();
    if let Err(e) = receive_files(&state.uploads, &mut multipart, &mut received).await {
        discard(&state.uploads, &received).await;
        return Err(e);
    }

    let file = match received.len() {
        0 => return Err(AppError::BadRequest("No file uploaded".to_string())),
        1 => received.remove(0),
        _ => {
            discard(&state.uploads, &received).await;
            return Err(AppError::BadRequest(
                "Only one file may be uploaded per request".to_string(),
            ));
        }
    };

    let new = NewResource {
        event_id: event_id.clone(),
        filename: file.stored.filename.clone(),
        original_name: file.original_name.clone(),
        file_path: file.stored.relative_path.clone(),
        file_type: file.mime.clone(),
        file_size: i64::try_from(file.stored.size).unwrap_or(i64::MAX),
        uploaded_by_id: Some(admin.id),
    };

    match repository::insert_resource(&state.db, new).await {
        Ok(resource) => {
            info!(
                "Stored resource {} ({}, {} bytes) for event {}",
                resource.id, resource.original_name, resource.file_size, event_id
            );
            Ok((StatusCode::CREATED, Json(resource)))
        }
        Err(e) => {
            state.uploads.remove_quietly(&file.stored.relative_path).await;
            Err(e.into())
        }
    }
}

/// Streams every `file` field to disk. Files written before an error are
/// left in `received` for the caller to discard.
async fn receive_files(
    uploads: &UploadStore,
    multipart: &mut Multipart,
    received: &mut Vec<ReceivedFile>,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(UploadError::from)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Uploaded file has no name".to_string()))?;
        let mime = field.content_type().unwrap_or_default().to_string();

        if !UploadStore::is_allowed(&mime) {
            warn!("Rejected upload '{}' with type '{}'", original_name, mime);
            return Err(AppError::UnsupportedMediaType(
                "File type not allowed. Check allowed formats.".to_string(),
            ));
        }

        let stored = uploads.store(FILE_FIELD, &original_name, field).await?;
        received.push(ReceivedFile {
            stored,
            original_name,
            mime,
        });
    }
    Ok(())
}

async fn discard(uploads: &UploadStore, received: &[ReceivedFile]) {
    for file in received {
        uploads.remove_quietly(&file.stored.relative_path).await;
    }
}

/// Streams the stored file from disk; range and conditional requests are
/// handled by `ServeFile`.
pub async fn download_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    let id = parse_resource_id(&id)?;
    let resource = repository::find_resource_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource record not found".to_string()))?;

    let path = match state.uploads.locate(&resource.file_path).await {
        Ok(path) => path,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            error!(
                "File for resource {} missing at {}",
                resource.id, resource.file_path
            );
            return Err(AppError::NotFound(
                "File not found on server storage.".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    };

    if response.status().is_success() {
        let content_type = HeaderValue::from_str(&resource.file_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        let disposition = HeaderValue::from_str(&content_disposition(&resource.original_name))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, content_type);
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}

pub async fn delete_resource(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_resource_id(&id)?;
    let resource = repository::find_resource_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))?;

    if let Err(e) = state.uploads.delete(&resource.file_path).await {
        error!(
            "Error deleting file {}: {}. Proceeding to delete database record.",
            resource.file_path, e
        );
    }
    repository::delete_resource(&state.db, &id).await?;
    info!("Deleted resource {}", id);

    Ok(Json(MessageResponse::new("Resource deleted successfully")))
}

/// `attachment` header with an ASCII fallback name plus the RFC 5987
/// encoded original.
pub fn content_disposition(original_name: &str) -> String {
    let fallback: String = original_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let encoded = utf8_percent_encode(original_name, FILENAME_ENCODE_SET);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}
