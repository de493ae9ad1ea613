use crate::models::{AudioQualityOption, VideoInfo, VideoQualityOption};

/// The fixed resolution tiers offered to users.
const TARGET_HEIGHTS: [u32; 5] = [4320, 2160, 1440, 1080, 720];

fn height_label(height: u32) -> Option<&'static str> {
    match height {
        4320 => Some("8K"),
        2160 => Some("4K"),
        1440 => Some("2K"),
        1080 => Some("FHD"),
        720 => Some("HD"),
        _ => None,
    }
}

/// Curates the raw extractor format list into at most one choice per target
/// height, sorted highest first.
///
/// Only video-only mp4 streams are eligible (the audio track is merged in at
/// download time). The first format seen at a given height wins; later entries
/// at the same height are discarded even if they carry a higher bitrate.
pub fn build_video_options(info: &VideoInfo) -> Vec<VideoQualityOption> {
    let mut options: Vec<VideoQualityOption> = Vec::new();

    for format in &info.formats {
        let Some(height) = format.height else {
            continue;
        };
        if !TARGET_HEIGHTS.contains(&height) {
            continue;
        }
        if options.iter().any(|o| o.height == height) {
            continue;
        }
        if !format.has_video() || format.has_audio() || format.ext != "mp4" {
            continue;
        }

        let resolution = match height_label(height) {
            Some(label) => format!("{height}p ({label})"),
            None => format!("{height}p"),
        };
        options.push(VideoQualityOption {
            resolution,
            format_id: format.format_id.clone(),
            height,
            note: "MP4",
        });
    }

    options.sort_by(|a, b| b.height.cmp(&a.height));
    options
}

/// The fixed audio quality menu.
pub fn audio_options() -> [AudioQualityOption; 2] {
    [
        AudioQualityOption { quality: "320 kbps (Highest)", bitrate: "320" },
        AudioQualityOption { quality: "192 kbps (Standard)", bitrate: "192" },
    ]
}

/// Strips characters that are unsafe in filenames. Only alphanumerics plus
/// space, dot, underscore and hyphen survive; everything else is dropped, and
/// trailing whitespace is trimmed. An all-invalid title yields an empty string,
/// which downstream path construction tolerates.
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Renders a duration in seconds as `HH:MM:SS` (or `MM:SS` under an hour).
/// A missing duration renders as "N/A".
pub fn format_duration(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds else {
        return "N/A".to_string();
    };
    let total = seconds as i64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Format;

    fn fmt(id: &str, height: Option<u32>, vcodec: &str, acodec: &str, ext: &str) -> Format {
        Format {
            format_id: id.to_string(),
            ext: ext.to_string(),
            height,
            vcodec: Some(vcodec.to_string()),
            acodec: Some(acodec.to_string()),
        }
    }

    fn info_with(formats: Vec<Format>) -> VideoInfo {
        VideoInfo { formats, ..Default::default() }
    }

    #[test]
    fn empty_format_list_yields_no_options() {
        assert!(build_video_options(&info_with(vec![])).is_empty());
    }

    #[test]
    fn picks_one_option_per_height_first_seen_wins() {
        let info = info_with(vec![
            fmt("248", Some(1080), "vp9", "none", "webm"),
            fmt("137", Some(1080), "avc1", "none", "mp4"),
            fmt("399", Some(1080), "av01", "none", "mp4"),
        ]);
        let options = build_video_options(&info);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].format_id, "137");
        assert_eq!(options[0].resolution, "1080p (FHD)");
        assert_eq!(options[0].note, "MP4");
    }

    #[test]
    fn ignores_heights_outside_target_set() {
        let info = info_with(vec![
            fmt("134", Some(360), "avc1", "none", "mp4"),
            fmt("135", Some(480), "avc1", "none", "mp4"),
            fmt("136", Some(540), "avc1", "none", "mp4"),
        ]);
        assert!(build_video_options(&info).is_empty());
    }

    #[test]
    fn ignores_muxed_and_non_mp4_streams_even_at_target_height() {
        let info = info_with(vec![
            // muxed: carries audio
            fmt("22", Some(720), "avc1", "mp4a", "mp4"),
            // wrong container
            fmt("247", Some(720), "vp9", "none", "webm"),
            // audio-only
            fmt("140", None, "none", "mp4a", "m4a"),
        ]);
        assert!(build_video_options(&info).is_empty());
    }

    #[test]
    fn output_is_sorted_descending_by_height() {
        let info = info_with(vec![
            fmt("136", Some(720), "avc1", "none", "mp4"),
            fmt("401", Some(2160), "av01", "none", "mp4"),
            fmt("137", Some(1080), "avc1", "none", "mp4"),
            fmt("571", Some(4320), "av01", "none", "mp4"),
            fmt("400", Some(1440), "av01", "none", "mp4"),
        ]);
        let heights: Vec<u32> = build_video_options(&info).iter().map(|o| o.height).collect();
        assert_eq!(heights, vec![4320, 2160, 1440, 1080, 720]);
    }

    #[test]
    fn no_duplicate_heights_and_all_in_target_set() {
        let info = info_with(vec![
            fmt("a", Some(720), "avc1", "none", "mp4"),
            fmt("b", Some(720), "avc1", "none", "mp4"),
            fmt("c", Some(1080), "avc1", "none", "mp4"),
            fmt("d", Some(144), "avc1", "none", "mp4"),
        ]);
        let options = build_video_options(&info);
        let mut heights: Vec<u32> = options.iter().map(|o| o.height).collect();
        heights.dedup();
        assert_eq!(heights.len(), options.len());
        assert!(options.iter().all(|o| TARGET_HEIGHTS.contains(&o.height)));
    }

    #[test]
    fn labels_follow_fixed_table() {
        for (height, expected) in [
            (4320, "4320p (8K)"),
            (2160, "2160p (4K)"),
            (1440, "1440p (2K)"),
            (1080, "1080p (FHD)"),
            (720, "720p (HD)"),
        ] {
            let info = info_with(vec![fmt("x", Some(height), "avc1", "none", "mp4")]);
            assert_eq!(build_video_options(&info)[0].resolution, expected);
        }
    }

    #[test]
    fn audio_menu_is_fixed() {
        let options = audio_options();
        assert_eq!(options[0].bitrate, "320");
        assert_eq!(options[0].quality, "320 kbps (Highest)");
        assert_eq!(options[1].bitrate, "192");
        assert_eq!(options[1].quality, "192 kbps (Standard)");
    }

    #[test]
    fn sanitize_drops_unsafe_characters() {
        assert_eq!(sanitize_filename("My Video! Title.mp4"), "My Video Title.mp4");
        assert_eq!(sanitize_filename("a/b\\c:d*e?f\"g<h>i|j"), "abcdefghij");
        assert_eq!(sanitize_filename("trailing   "), "trailing");
    }

    #[test]
    fn sanitize_handles_empty_and_all_invalid_input() {
        assert_eq!(sanitize_filename(""), "");
        assert_eq!(sanitize_filename("!?*"), "");
    }

    #[test]
    fn duration_renders_clock_strings() {
        assert_eq!(format_duration(Some(3661.0)), "01:01:01");
        assert_eq!(format_duration(Some(59.0)), "00:59");
        assert_eq!(format_duration(Some(600.0)), "10:00");
        assert_eq!(format_duration(Some(0.0)), "00:00");
        assert_eq!(format_duration(Some(3599.9)), "59:59");
        assert_eq!(format_duration(None), "N/A");
    }
}
