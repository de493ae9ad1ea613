use crate::{
    error::AppError,
    formats, pages,
    models::{DownloadForm, FetchForm},
    ytdlp::{self, EngineError},
    AppState,
};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use std::fmt::Display;
use std::path::Path;
use tokio_util::io::ReaderStream;

const NOTICE_COOKIE: &str = "notice";
const CLEAR_NOTICE_COOKIE: &str = "notice=; Max-Age=0; Path=/";
const COMPLETE_COOKIE: &str = "downloadComplete=true; Max-Age=20; Path=/";

// ===================================================================
//                          NOTICE COOKIES
// ===================================================================

/// Redirects to the input form carrying a transient, flash-style notice.
fn notice_redirect(message: &str) -> Response {
    let value = utf8_percent_encode(message, NON_ALPHANUMERIC).to_string();
    let cookie = format!("{NOTICE_COOKIE}={value}; Max-Age=30; Path=/; HttpOnly");
    ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}

/// Reads the pending notice, if any, from the request's cookies.
fn take_notice(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|c| c.strip_prefix("notice="))
        .map(|v| percent_decode_str(v).decode_utf8_lossy().to_string())
        .filter(|v| !v.is_empty())
}

// ===================================================================
//                          PAGE HANDLERS
// ===================================================================

/// # GET / - Renders the input form, showing and clearing any pending notice.
pub async fn index(headers: HeaderMap) -> Response {
    match take_notice(&headers) {
        Some(notice) => (
            [(header::SET_COOKIE, CLEAR_NOTICE_COOKIE.to_string())],
            pages::index_page(Some(&notice), None),
        )
            .into_response(),
        None => pages::index_page(None, None).into_response(),
    }
}

/// # POST / - Fetches metadata for a URL and re-renders the page with the
/// curated quality menus.
pub async fn fetch_info(State(state): State<AppState>, Form(form): Form<FetchForm>) -> Response {
    let url = form.url.trim();
    if url.is_empty() {
        return notice_redirect("Please paste a video URL to get started.");
    }

    match ytdlp::fetch_video_info(url, &state.config).await {
        Ok(info) => {
            let video_options = formats::build_video_options(&info);
            let audio_options = formats::audio_options();
            tracing::info!(
                "Fetched metadata for '{}': {} video option(s)",
                url,
                video_options.len()
            );
            pages::index_page(None, Some((url, &info, &video_options, &audio_options)))
                .into_response()
        }
        Err(_) => notice_redirect(
            "❌ Could not retrieve video information. The URL may be invalid or the video is private.",
        ),
    }
}

pub async fn terms() -> Response {
    pages::terms_page().into_response()
}

pub async fn privacy() -> Response {
    pages::privacy_page().into_response()
}

pub async fn about() -> Response {
    pages::about_page().into_response()
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

// ===================================================================
//                          DOWNLOAD HANDLER
// ===================================================================

/// How a download attempt can fail, from the user's point of view.
enum DownloadFailure {
    /// Recoverable: redirect back to the form with a notice.
    Notice(String),
    /// The finished file resolved outside the download directory.
    Forbidden,
    /// Anything else; logged with context, user sees a generic notice.
    Unexpected(anyhow::Error),
}

impl<E> From<E> for DownloadFailure
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Unexpected(err.into())
    }
}

fn download_failed(e: impl Display) -> DownloadFailure {
    DownloadFailure::Notice(format!(
        "❌ Download failed. This can happen with private or age-restricted videos. Error: {e}"
    ))
}

/// # POST /download - Runs the extraction engine to completion and serves the
/// resulting file as an attachment.
pub async fn download(State(state): State<AppState>, Form(form): Form<DownloadForm>) -> Response {
    match handle_download(&state, &form).await {
        Ok(response) => response,
        Err(DownloadFailure::Notice(message)) => notice_redirect(&message),
        Err(DownloadFailure::Forbidden) => AppError::Forbidden.into_response(),
        Err(DownloadFailure::Unexpected(e)) => {
            tracing::error!("Unexpected error while downloading '{}': {:?}", form.video_url, e);
            notice_redirect("❌ An unexpected server error occurred. Please try again later.")
        }
    }
}

async fn handle_download(
    state: &AppState,
    form: &DownloadForm,
) -> Result<Response, DownloadFailure> {
    if form.video_url.is_empty() || form.kind.is_empty() || form.selection.is_empty() {
        return Err(DownloadFailure::Notice(
            "Invalid download request. Please select a format.".to_string(),
        ));
    }

    // Metadata is fetched fresh here even though the page load already fetched
    // it; the title (and thus the output path) must reflect current upstream
    // state, so no cache sits between the two calls.
    let info = ytdlp::fetch_video_info(&form.video_url, &state.config)
        .await
        .map_err(download_failed)?;

    let safe_title = formats::sanitize_filename(info.title.as_deref().unwrap_or("video"));
    let plan = ytdlp::build_download_plan(&form.kind, &form.selection, &safe_title, &state.config)
        .map_err(download_failed)?;

    tracing::info!("Starting download for '{}'", safe_title);
    let file_path = ytdlp::run_download(&form.video_url, &plan, &state.config)
        .await
        .map_err(|e| match e {
            EngineError::Spawn(_) => DownloadFailure::Unexpected(e.into()),
            other => download_failed(other),
        })?;

    // The path came from a directory scan; make sure it has not escaped the
    // download directory before handing it to the client.
    let canonical_base = tokio::fs::canonicalize(state.config.download_dir()).await?;
    let canonical_file = tokio::fs::canonicalize(&file_path).await?;
    if !canonical_file.starts_with(&canonical_base) {
        return Err(DownloadFailure::Forbidden);
    }

    let filename = canonical_file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    tracing::info!("Download finished. Sending file: '{}'", filename);

    serve_attachment(&canonical_file, &filename).await
}

/// Streams a finished file back as an attachment, with the short-lived
/// completion cookie the front-end watches for.
async fn serve_attachment(path: &Path, filename: &str) -> Result<Response, DownloadFailure> {
    let file = tokio::fs::File::open(path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(path)),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition_for(filename))?,
    );
    headers.insert(header::SET_COOKIE, HeaderValue::from_static(COMPLETE_COOKIE));

    Ok((headers, body).into_response())
}

/// Attachment disposition with an ASCII fallback name plus the RFC 5987
/// encoded form for titles that kept non-ASCII alphanumerics.
fn content_disposition_for(filename: &str) -> String {
    let ascii: String = filename.chars().filter(|c| c.is_ascii() && *c != '"').collect();
    let encoded = utf8_percent_encode(filename, NON_ALPHANUMERIC);
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp4") => "video/mp4",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}
