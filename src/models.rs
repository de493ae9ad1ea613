use serde::{Deserialize, Deserializer, Serialize};

// === yt-dlp Wire Models ===

/// The top-level JSON output of `yt-dlp --dump-single-json`.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct VideoInfo {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub formats: Vec<Format>,
    pub thumbnail: Option<String>,
    pub uploader: Option<String>,
}

/// One candidate media stream offered by the extractor for a source video.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Format {
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    pub height: Option<u32>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
}

impl Format {
    /// yt-dlp reports an absent codec as the literal string "none".
    pub fn has_video(&self) -> bool {
        matches!(self.vcodec.as_deref(), Some(v) if v != "none")
    }

    pub fn has_audio(&self) -> bool {
        matches!(self.acodec.as_deref(), Some(a) if a != "none")
    }
}

/// Extractors occasionally emit the duration as a string or omit it entirely;
/// anything that is not a JSON number becomes `None` rather than a parse error.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(serde_json::Value::as_f64))
}

// === Curated Option Models ===

/// A single user-facing video quality choice, at most one per target height.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct VideoQualityOption {
    pub resolution: String,
    pub format_id: String,
    pub height: u32,
    pub note: &'static str,
}

impl VideoQualityOption {
    /// The form value round-tripped through the download request.
    pub fn selection_token(&self) -> String {
        format!("{}_{}", self.format_id, self.height)
    }
}

/// A fixed audio quality choice.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioQualityOption {
    pub quality: &'static str,
    pub bitrate: &'static str,
}

// === Form Payloads ===

/// `POST /` body: the URL to inspect.
#[derive(Deserialize, Debug)]
pub struct FetchForm {
    #[serde(default)]
    pub url: String,
}

/// `POST /download` body: the user's selection.
#[derive(Deserialize, Debug)]
pub struct DownloadForm {
    #[serde(default)]
    pub video_url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub selection: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_accepts_numbers() {
        let info: VideoInfo = serde_json::from_str(r#"{"title":"t","duration":212.4}"#).unwrap();
        assert_eq!(info.duration, Some(212.4));
    }

    #[test]
    fn duration_tolerates_non_numeric_values() {
        let info: VideoInfo = serde_json::from_str(r#"{"title":"t","duration":"abc"}"#).unwrap();
        assert_eq!(info.duration, None);

        let info: VideoInfo = serde_json::from_str(r#"{"title":"t","duration":null}"#).unwrap();
        assert_eq!(info.duration, None);

        let info: VideoInfo = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(info.duration, None);
    }

    #[test]
    fn codec_flags_treat_none_string_as_absent() {
        let f: Format =
            serde_json::from_str(r#"{"format_id":"137","vcodec":"avc1","acodec":"none"}"#).unwrap();
        assert!(f.has_video());
        assert!(!f.has_audio());

        let f: Format = serde_json::from_str(r#"{"format_id":"140"}"#).unwrap();
        assert!(!f.has_video());
        assert!(!f.has_audio());
    }

    #[test]
    fn selection_token_joins_id_and_height() {
        let opt = VideoQualityOption {
            resolution: "1080p (FHD)".to_string(),
            format_id: "137".to_string(),
            height: 1080,
            note: "MP4",
        };
        assert_eq!(opt.selection_token(), "137_1080");
    }
}
