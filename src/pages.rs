use crate::formats::format_duration;
use crate::models::{AudioQualityOption, VideoInfo, VideoQualityOption};
use axum::response::Html;

/// Escapes user-controlled text for HTML body and attribute positions.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(page_title: &str, notice: Option<&str>, body: &str) -> Html<String> {
    let notice_html = match notice {
        Some(msg) => format!(r#"<div class="notice">{}</div>"#, escape_html(msg)),
        None => String::new(),
    };
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{page_title} - TubeSpire</title>
<style>
body{{font-family:system-ui,sans-serif;max-width:760px;margin:2rem auto;padding:0 1rem;color:#222}}
header a{{color:#c00;text-decoration:none;font-weight:700;font-size:1.4rem}}
nav a{{margin-right:1rem;color:#555;text-decoration:none}}
.notice{{background:#fff3cd;border:1px solid #ffe08a;padding:.75rem 1rem;border-radius:6px;margin:1rem 0}}
.card{{border:1px solid #ddd;border-radius:8px;padding:1rem;margin:1rem 0}}
.card img{{max-width:240px;border-radius:6px}}
input[type=url]{{width:70%;padding:.5rem}}
button{{padding:.5rem 1rem;background:#c00;color:#fff;border:0;border-radius:6px;cursor:pointer}}
select{{padding:.4rem}}
footer{{margin-top:3rem;color:#888;font-size:.85rem}}
</style>
</head>
<body>
<header><a href="/">TubeSpire</a></header>
<nav><a href="/about">About</a><a href="/terms">Terms</a><a href="/privacy">Privacy</a></nav>
{notice_html}
{body}
<footer><p>Downloads are for personal use only. Respect creators and copyright law.</p></footer>
</body>
</html>"#
    ))
}

/// The main page. With metadata present, renders the curated quality menus;
/// without it, just the URL form.
pub fn index_page(
    notice: Option<&str>,
    fetched: Option<(&str, &VideoInfo, &[VideoQualityOption], &[AudioQualityOption])>,
) -> Html<String> {
    let mut body = String::from(
        r#"<h1>Download videos in the quality you want</h1>
<form method="post" action="/">
<input type="url" name="url" placeholder="Paste a video URL" required>
<button type="submit">Fetch</button>
</form>"#,
    );

    if let Some((url, info, video_options, audio_options)) = fetched {
        let title = escape_html(info.title.as_deref().unwrap_or("Untitled"));
        let uploader = escape_html(info.uploader.as_deref().unwrap_or("Unknown"));
        let duration = format_duration(info.duration);
        let url_attr = escape_html(url);

        let thumbnail = match &info.thumbnail {
            Some(src) => format!(r#"<img src="{}" alt="thumbnail">"#, escape_html(src)),
            None => String::new(),
        };

        let video_choices: String = video_options
            .iter()
            .map(|o| {
                format!(
                    r#"<option value="{}">{} — {}</option>"#,
                    escape_html(&o.selection_token()),
                    escape_html(&o.resolution),
                    o.note,
                )
            })
            .collect();

        let audio_choices: String = audio_options
            .iter()
            .map(|o| format!(r#"<option value="{}">{}</option>"#, o.bitrate, o.quality))
            .collect();

        let video_form = if video_options.is_empty() {
            "<p>No MP4 video streams available at the offered resolutions.</p>".to_string()
        } else {
            format!(
                r#"<form method="post" action="/download">
<input type="hidden" name="video_url" value="{url_attr}">
<input type="hidden" name="type" value="video">
<label>Video quality <select name="selection">{video_choices}</select></label>
<button type="submit">Download MP4</button>
</form>"#
            )
        };

        body.push_str(&format!(
            r#"<div class="card">
{thumbnail}
<h2>{title}</h2>
<p>{uploader} · {duration}</p>
{video_form}
<form method="post" action="/download">
<input type="hidden" name="video_url" value="{url_attr}">
<input type="hidden" name="type" value="audio">
<label>Audio quality <select name="selection">{audio_choices}</select></label>
<button type="submit">Download MP3</button>
</form>
</div>"#
        ));
    }

    layout("Video Downloader", notice, &body)
}

pub fn terms_page() -> Html<String> {
    layout(
        "Terms of Service",
        None,
        r#"<h1>Terms of Service</h1>
<p>TubeSpire is provided as-is, without warranty of any kind. You are solely
responsible for ensuring that your use of this service complies with the laws
of your jurisdiction and with the terms of the platforms you download from.</p>
<p>Only download content you own or have permission to save. Abuse of the
service may result in access being withdrawn.</p>"#,
    )
}

pub fn privacy_page() -> Html<String> {
    layout(
        "Privacy Policy",
        None,
        r#"<h1>Privacy Policy</h1>
<p>TubeSpire does not require an account and does not build user profiles.
URLs you submit are passed to the extraction engine to serve your request and
appear in standard server logs, which rotate out.</p>
<p>Downloaded files are stored temporarily on the server for delivery and are
not indexed or published.</p>"#,
    )
}

pub fn about_page() -> Html<String> {
    layout(
        "About",
        None,
        r#"<h1>About TubeSpire</h1>
<p>TubeSpire is a small, focused tool: paste a video URL, pick a quality, and
get an MP4 or MP3 back. No queues, no accounts, no clutter.</p>
<p>Conversion quality tiers range from 720p HD up to 8K where the source
provides them, and audio extraction at 320 or 192 kbps.</p>"#,
    )
}

pub fn not_found_page() -> Html<String> {
    layout(
        "Page Not Found",
        None,
        r#"<h1>404 — Page Not Found</h1>
<p>The page you were looking for does not exist. <a href="/">Back to the downloader</a>.</p>"#,
    )
}

pub fn forbidden_page() -> Html<String> {
    layout(
        "Forbidden",
        None,
        r#"<h1>403 — Forbidden</h1>
<p>You do not have permission to access this resource. <a href="/">Back to the downloader</a>.</p>"#,
    )
}

pub fn internal_error_page() -> Html<String> {
    layout(
        "Server Error",
        None,
        r#"<h1>500 — Something Went Wrong</h1>
<p>An unexpected server error occurred. Please try again later.
<a href="/">Back to the downloader</a>.</p>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Format;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape_html(r#"<script>"x" & 'y'</script>"#),
            "&lt;script&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn index_page_embeds_selection_tokens_and_escaped_title() {
        let info = VideoInfo {
            title: Some("Tom & Jerry <Best Of>".to_string()),
            duration: Some(61.0),
            formats: vec![Format {
                format_id: "137".to_string(),
                ext: "mp4".to_string(),
                height: Some(1080),
                vcodec: Some("avc1".to_string()),
                acodec: Some("none".to_string()),
            }],
            thumbnail: None,
            uploader: None,
        };
        let video_options = crate::formats::build_video_options(&info);
        let audio_options = crate::formats::audio_options();
        let page =
            index_page(None, Some(("https://example.com/v", &info, &video_options, &audio_options)));
        let html = page.0;

        assert!(html.contains(r#"value="137_1080""#));
        assert!(html.contains("Tom &amp; Jerry &lt;Best Of&gt;"));
        assert!(!html.contains("<Best Of>"));
        assert!(html.contains("01:01"));
        assert!(html.contains(r#"value="320""#));
        assert!(html.contains(r#"value="192""#));
    }

    #[test]
    fn index_page_without_metadata_shows_only_the_form() {
        let html = index_page(Some("Could not retrieve video information."), None).0;
        assert!(html.contains("Paste a video URL"));
        assert!(html.contains("Could not retrieve video information."));
        assert!(!html.contains("/download"));
    }
}
