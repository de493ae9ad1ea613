use crate::config::Config;
use crate::models::VideoInfo;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::{wrappers::LinesStream, StreamExt};
use walkdir::WalkDir;

/// Fixed browser identity sent with every engine invocation; extractors are
/// noticeably less likely to trip server-side bot detection with it.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGE: &str = "Accept-Language:en-US,en;q=0.5";

static PROGRESS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[download\]\s+(?P<progress>[\d\.]+)%\s+of\s+~?\s*(?P<size>[\d\.\w/]+)(?:\s+at\s+(?P<speed>[\d\.\w/]+))?\s+ETA\s+(?P<eta>[\d:]+)").unwrap()
});

// === Errors ===

/// The user's download request could not be turned into an engine invocation.
#[derive(Debug, PartialEq, Eq)]
pub enum SelectionError {
    /// Download type was neither "video" nor "audio".
    UnknownType(String),
    /// Video selection token lacked the `{format_id}_{height}` separator.
    MalformedToken(String),
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::UnknownType(kind) => {
                write!(f, "Invalid download type specified: {kind}")
            }
            SelectionError::MalformedToken(token) => {
                write!(f, "Invalid video selection format: {token}")
            }
        }
    }
}

impl std::error::Error for SelectionError {}

/// A failure reported by (or around) the external yt-dlp process.
#[derive(Debug)]
pub enum EngineError {
    /// The yt-dlp binary could not be started at all.
    Spawn(std::io::Error),
    /// The process ran and failed; carries its stderr text.
    Failed(String),
    /// Metadata output was not the JSON document we expect.
    Parse(serde_json::Error),
    /// The engine reported success but the output file is nowhere to be found.
    MissingOutput,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Spawn(e) => write!(f, "could not start yt-dlp: {e}"),
            EngineError::Failed(stderr) => write!(f, "{}", stderr.trim()),
            EngineError::Parse(e) => write!(f, "unreadable metadata from yt-dlp: {e}"),
            EngineError::MissingOutput => {
                write!(f, "Downloaded file could not be found on the server")
            }
        }
    }
}

impl std::error::Error for EngineError {}

// === Download Plan ===

/// The concrete engine configuration for one download invocation. Built fresh
/// per request; deterministic on (title, selection), so identical concurrent
/// requests share an output path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    /// yt-dlp `-f` format selector expression.
    pub selector: String,
    /// `-o` output template; the engine substitutes `%(ext)s`.
    pub output_template: String,
    /// Deterministic filename stem used to locate the finished file.
    pub output_stem: String,
    /// Post-processing flags (audio extraction or merge container).
    pub postprocess_args: Vec<String>,
}

/// Arguments shared by every engine invocation: quiet single-item operation,
/// per-item error tolerance, relaxed certificate checking, the browser
/// identity, and the optional upstream proxy.
pub fn base_args(config: &Config) -> Vec<String> {
    let mut args = vec![
        "--quiet".to_string(),
        "--no-playlist".to_string(),
        "--ignore-errors".to_string(),
        "--no-check-certificate".to_string(),
        "--user-agent".to_string(),
        USER_AGENT.to_string(),
        "--add-header".to_string(),
        ACCEPT_LANGUAGE.to_string(),
    ];
    if let Some(proxy) = &config.proxy_url {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }
    args
}

/// Builds the engine configuration for a chosen quality.
///
/// The audio branch passes the selection through as the target bitrate without
/// validating membership in the fixed menu. The video branch splits the
/// system-generated `{format_id}_{height}` token on its first underscore and
/// falls back to best-at-height, then best overall, should the named format
/// vanish between the metadata fetch and the download.
pub fn build_download_plan(
    kind: &str,
    selection: &str,
    safe_title: &str,
    config: &Config,
) -> Result<DownloadPlan, SelectionError> {
    match kind {
        "audio" => {
            let stem = format!("{safe_title} [{selection}kbps]");
            Ok(DownloadPlan {
                selector: "bestaudio/best".to_string(),
                output_template: template_for(config, &stem),
                output_stem: stem,
                postprocess_args: vec![
                    "--extract-audio".to_string(),
                    "--audio-format".to_string(),
                    "mp3".to_string(),
                    "--audio-quality".to_string(),
                    format!("{selection}K"),
                ],
            })
        }
        "video" => {
            let (format_id, height) = selection
                .split_once('_')
                .ok_or_else(|| SelectionError::MalformedToken(selection.to_string()))?;
            let stem = format!("{safe_title} [{height}p]");
            Ok(DownloadPlan {
                selector: format!("{format_id}+bestaudio/bestvideo[height={height}]+bestaudio/best"),
                output_template: template_for(config, &stem),
                output_stem: stem,
                postprocess_args: vec![
                    "--merge-output-format".to_string(),
                    "mp4".to_string(),
                ],
            })
        }
        other => Err(SelectionError::UnknownType(other.to_string())),
    }
}

fn template_for(config: &Config, stem: &str) -> String {
    config.download_dir().join(format!("{stem}.%(ext)s")).to_string_lossy().to_string()
}

// === Engine Invocations ===

/// Fetches comprehensive video metadata via `yt-dlp --dump-single-json`.
pub async fn fetch_video_info(url: &str, config: &Config) -> Result<VideoInfo, EngineError> {
    let output = Command::new("yt-dlp")
        .args(base_args(config))
        .arg("--dump-single-json")
        .arg(url)
        .output()
        .await
        .map_err(EngineError::Spawn)?;

    if !output.status.success() || output.stdout.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        tracing::error!("yt-dlp metadata fetch failed for '{}': {}", url, stderr.trim());
        return Err(EngineError::Failed(stderr));
    }

    serde_json::from_slice(&output.stdout).map_err(EngineError::Parse)
}

/// Runs one download to completion and returns the finished file's path.
///
/// This blocks the calling request worker for the full fetch+transcode; there
/// is no cancellation if the client goes away and no timeout at this layer.
pub async fn run_download(
    url: &str,
    plan: &DownloadPlan,
    config: &Config,
) -> Result<PathBuf, EngineError> {
    let mut cmd = Command::new("yt-dlp");
    cmd.args(base_args(config))
        .arg("--progress")
        .arg("--newline")
        .arg("-f")
        .arg(&plan.selector)
        .arg("-o")
        .arg(&plan.output_template)
        .args(&plan.postprocess_args)
        .arg(url)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(EngineError::Spawn)?;

    if let Some(stdout) = child.stdout.take() {
        let reader = BufReader::new(stdout).lines();
        let mut lines = LinesStream::new(reader);
        while let Some(Ok(line)) = lines.next().await {
            if let Some(caps) = PROGRESS_REGEX.captures(&line) {
                tracing::debug!(
                    progress = caps.name("progress").map_or("", |m| m.as_str()),
                    speed = caps.name("speed").map_or("", |m| m.as_str()),
                    eta = caps.name("eta").map_or("", |m| m.as_str()),
                    "download progress"
                );
            }
        }
    }

    let output = child.wait_with_output().await.map_err(EngineError::Spawn)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        tracing::error!("yt-dlp download failed for '{}': {}", url, stderr.trim());
        return Err(EngineError::Failed(stderr));
    }

    resolve_output_file(&config.download_dir(), &plan.output_stem)
        .ok_or(EngineError::MissingOutput)
}

/// Locates the finished file for a plan. The template's `%(ext)s` is resolved
/// by the engine after post-processing, so the final extension is discovered
/// by scanning the download directory for the stem. Partial-download artifacts
/// are skipped.
pub fn resolve_output_file(download_dir: &Path, stem: &str) -> Option<PathBuf> {
    let prefix = format!("{stem}.");
    WalkDir::new(download_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .find(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            name.starts_with(&prefix)
                && !name.ends_with(".part")
                && !name.ends_with(".ytdl")
                && !name.ends_with(".temp")
        })
}
