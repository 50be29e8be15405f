//! Image upload and download routes.
//!
//! ```text
//! POST /api/upload/image            - One image, multipart field `file`
//! POST /api/upload/images           - Several images, multipart field `files`
//! GET  /api/files/{filename}        - Any stored file, served by `ServeFile`
//! GET  /api/files/image/{filename}  - Stored images only, cacheable
//! ```

use axum::{
    body::Bytes,
    extract::{
        Multipart, Request, State,
        multipart::MultipartRejection,
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{instrument, warn};

use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::services::files::{FileError, FileStore, StoredFile, is_image_name};
use crate::state::AppState;

const SINGLE_FIELD: &str = "file";
const MULTI_FIELD: &str = "files";
const IMAGE_CACHE_CONTROL: &str = "max-age=3600";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub file: StoredFile,
}

#[derive(Debug, Serialize)]
pub struct MultiUploadResponse {
    pub success: bool,
    pub message: String,
    pub files: Vec<StoredFile>,
    pub errors: Vec<String>,
}

/// One multipart part, read into memory.
struct Part {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

/// Read every part named `field`, ignoring the rest.
async fn read_parts(multipart: &mut Multipart, field: &str) -> Result<Vec<Part>> {
    let mut parts = Vec::new();
    while let Some(part) = multipart.next_field().await? {
        if part.name() != Some(field) {
            continue;
        }
        let file_name = part.file_name().map(str::to_owned);
        let content_type = part.content_type().map(str::to_owned);
        let bytes = part.bytes().await?;
        parts.push(Part {
            file_name,
            content_type,
            bytes,
        });
    }
    Ok(parts)
}

async fn store(files: &FileStore, part: &Part) -> std::result::Result<StoredFile, FileError> {
    files
        .store_image(
            part.file_name.as_deref(),
            part.content_type.as_deref(),
            &part.bytes,
        )
        .await
}

/// POST /api/upload/image
///
/// # Errors
///
/// Returns 400 for a missing, empty, non-image, or SVG file and 413 when it is too large.
#[instrument(skip(state, caller, multipart), fields(caller = %caller.id))]
pub async fn upload_image(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart?;
    let parts = read_parts(&mut multipart, SINGLE_FIELD).await?;
    let part = parts
        .first()
        .ok_or_else(|| AppError::BadRequest(format!("Missing multipart field '{SINGLE_FIELD}'")))?;

    let file = store(state.files(), part).await?;
    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded".to_owned(),
        file,
    }))
}

/// POST /api/upload/images
///
/// Each file is stored independently; failures are reported per file.
///
/// # Errors
///
/// Returns 400 when no file or too many files arrive.
#[instrument(skip(state, caller, multipart), fields(caller = %caller.id))]
pub async fn upload_images(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<MultiUploadResponse>> {
    let mut multipart = multipart?;
    let parts = read_parts(&mut multipart, MULTI_FIELD).await?;
    state.files().validate_count(parts.len())?;

    let mut files = Vec::with_capacity(parts.len());
    let mut errors = Vec::new();
    for part in &parts {
        match store(state.files(), part).await {
            Ok(file) => files.push(file),
            Err(e) => {
                let name = part.file_name.as_deref().unwrap_or("unnamed");
                warn!(file = name, error = %e, "Upload rejected");
                errors.push(format!("{name}: {e}"));
            }
        }
    }

    let message = format!("{} of {} files uploaded", files.len(), parts.len());
    Ok(Json(MultiUploadResponse {
        success: errors.is_empty(),
        message,
        files,
        errors,
    }))
}

/// Hand a stored file to `ServeFile`, which sets the content type from the
/// extension and answers range and conditional requests.
async fn serve(files: &FileStore, filename: &str, request: Request) -> Result<Response> {
    let path = files.path_of(filename)?;
    let Ok(response) = ServeFile::new(path).oneshot(request).await;
    if response.status() == StatusCode::NOT_FOUND {
        return Err(FileError::NotFound.into());
    }

    // Anything not stored by the image upload is offered as a download.
    let mode = if is_image_name(filename) { "inline" } else { "attachment" };
    let mut response = response.into_response();
    let disposition = HeaderValue::from_str(&format!(
        "{mode}; filename=\"{}\"",
        filename.replace('"', "")
    ))
    .map_err(|_| AppError::from(FileError::InvalidName))?;
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

/// GET /api/files/{filename}
///
/// # Errors
///
/// Returns 400 for names that could escape the upload directory and 404 if missing.
#[instrument(skip(state, request))]
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response> {
    serve(state.files(), &filename, request).await
}

/// GET /api/files/image/{filename}
///
/// Cache headers are added by the route layer in [`super::file_routes`].
///
/// # Errors
///
/// Returns 400 for non-image names and 404 if missing.
#[instrument(skip(state, request))]
pub async fn image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response> {
    state.files().path_of(&filename)?;
    if !is_image_name(&filename) {
        return Err(AppError::BadRequest("Not an image file".to_owned()));
    }
    serve(state.files(), &filename, request).await
}

/// `Cache-Control` for successful image responses only.
pub(super) fn image_cache_control(response: &Response) -> Option<HeaderValue> {
    response
        .status()
        .is_success()
        .then(|| HeaderValue::from_static(IMAGE_CACHE_CONTROL))
}
