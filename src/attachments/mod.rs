//! Attachment badge rules and the inline-image pipeline.
//!
//! Pasted images used to be stored as `data:` URLs inside the note HTML. On
//! load they are uploaded as attachments and the `src` is rewritten to the
//! attachment URL. Decoding and rewriting are pure; only the uploads touch the
//! network.

use crate::api::{attachment_url, ApiClient, ApiError};
use crate::models::Attachment;
use base64::Engine;
use futures::future::join_all;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub(crate) const UPLOADING_CLASS: &str = "image-uploading-placeholder";

const IMAGE_EXTENSIONS: [&str; 9] = [
    "png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "avif", "ico",
];

static DATA_IMAGE_SRC: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"src=["'](data:image/[a-zA-Z0-9.+-]+;base64,[A-Za-z0-9+/=\s]+)["']"#).ok()
});

#[derive(Debug, Error)]
pub(crate) enum AttachmentError {
    #[error("not a base64 image data URL")]
    InvalidDataUrl,
    #[error("base64 decode failed: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

fn extension(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Image by mime type; falls back to the file extension when the type is missing or generic.
pub(crate) fn is_image(att: &Attachment) -> bool {
    let mime = att.file_type.as_deref().unwrap_or("").trim();
    if mime.starts_with("image/") {
        return true;
    }
    let generic = mime.is_empty() || mime == "application/octet-stream";
    generic
        && extension(att.display_name())
            .or_else(|| extension(&att.filename))
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether `content` links to attachment `id`. The id must end at a URL or
/// attribute boundary, so `attachments/1` does not match `attachments/12`.
fn references_attachment(content: &str, id: &str) -> bool {
    if id.is_empty() {
        return false;
    }
    let needle = format!("attachments/{id}");
    content.match_indices(&needle).any(|(at, _)| {
        content[at + needle.len()..]
            .chars()
            .next()
            .is_none_or(|c| matches!(c, '"' | '\'' | '?' | '#' | ')' | '&' | '<' | ' '))
    })
}

/// Rendered inside the note body rather than listed as a file.
pub(crate) fn is_inline(att: &Attachment, note_content: &str) -> bool {
    is_image(att) && references_attachment(note_content, &att.id)
}

/// The paperclip badge shows only for attachments that are not inline images.
pub(crate) fn has_attachment_badge(attachments: &[Attachment], note_content: &str) -> bool {
    attachments.iter().any(|a| !is_inline(a, note_content))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DecodedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn filename(&self, index: usize) -> String {
        let ext = match self.mime.as_str() {
            "image/jpeg" => "jpg",
            "image/svg+xml" => "svg",
            other => other.strip_prefix("image/").unwrap_or("png"),
        };
        format!("pasted-image-{}.{ext}", index + 1)
    }
}

/// Distinct `data:image/...;base64,` sources in document order.
pub(crate) fn find_data_images(html: &str) -> Vec<String> {
    let Some(re) = DATA_IMAGE_SRC.as_ref() else {
        return vec![];
    };
    let mut out: Vec<String> = vec![];
    for c in re.captures_iter(html) {
        let src = c[1].to_string();
        if !out.contains(&src) {
            out.push(src);
        }
    }
    out
}

pub(crate) fn decode_data_url(src: &str) -> Result<DecodedImage, AttachmentError> {
    let rest = src
        .strip_prefix("data:")
        .ok_or(AttachmentError::InvalidDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(AttachmentError::InvalidDataUrl)?;
    let mime = meta
        .strip_suffix(";base64")
        .filter(|m| m.starts_with("image/"))
        .ok_or(AttachmentError::InvalidDataUrl)?;

    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(cleaned)?;
    Ok(DecodedImage {
        mime: mime.to_string(),
        bytes,
    })
}

/// Replaces each `from` source with its `to` URL.
pub(crate) fn rewrite_sources(html: &str, replacements: &[(String, String)]) -> String {
    replacements
        .iter()
        .fold(html.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct MigrationReport {
    /// New attachment ids, one per converted image.
    pub converted: Vec<String>,
    /// `(image index, reason)` for every image that stayed inline.
    pub failed: Vec<(usize, String)>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.converted.is_empty() && self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        match (self.converted.len(), self.failed.len()) {
            (c, 0) => format!("{c} image(s) converted to attachments"),
            (0, f) => format!("{f} image(s) could not be converted"),
            (c, f) => format!("{c} image(s) converted, {f} failed"),
        }
    }
}

async fn upload_one(
    api: &ApiClient,
    note_id: &str,
    workspace: &str,
    index: usize,
    src: &str,
) -> Result<String, AttachmentError> {
    let img = decode_data_url(src)?;
    let name = img.filename(index);
    let id = api
        .upload_attachment(note_id, workspace, &name, &img.mime, img.bytes)
        .await?;
    Ok(id)
}

/// Result of uploading a note's inline images.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Migration {
    /// `(data URL, attachment URL)` for each uploaded image.
    pub replacements: Vec<(String, String)>,
    pub report: MigrationReport,
}

impl Migration {
    /// Rewrites the image sources in `live_html`, the body as it is now, so text
    /// typed while the uploads ran is kept. `None` when nothing changed.
    pub fn apply_to(&self, live_html: &str) -> Option<String> {
        let out = rewrite_sources(live_html, &self.replacements);
        (out != live_html).then_some(out)
    }
}

/// Uploads every inline base64 image of `html` concurrently.
/// Returns `None` when the content holds no such images.
pub(crate) async fn migrate_base64_images(
    api: &ApiClient,
    note_id: &str,
    workspace: &str,
    html: &str,
) -> Option<Migration> {
    let sources = find_data_images(html);
    if sources.is_empty() {
        return None;
    }

    let results = join_all(
        sources
            .iter()
            .enumerate()
            .map(|(i, src)| upload_one(api, note_id, workspace, i, src)),
    )
    .await;

    let mut migration = Migration::default();
    for (i, (src, res)) in sources.iter().zip(results).enumerate() {
        match res {
            Ok(id) => {
                migration
                    .replacements
                    .push((src.clone(), attachment_url(note_id, &id)));
                migration.report.converted.push(id);
            }
            Err(e) => {
                log::warn!("inline image {i} of note {note_id} was not converted: {e}");
                migration.report.failed.push((i, e.to_string()));
            }
        }
    }
    Some(migration)
}

pub(crate) fn uploading_placeholder(token: &str) -> String {
    format!(r#"<img class="{UPLOADING_CLASS}" data-upload-id="{token}" alt="Uploading...">"#)
}

fn placeholder_regex(token: &str) -> Option<Regex> {
    Regex::new(&format!(
        r#"<img class="{UPLOADING_CLASS}" data-upload-id="{}"[^>]*>"#,
        regex::escape(token)
    ))
    .ok()
}

/// Swaps the placeholder for the uploaded image, or drops it when `url` is `None`.
pub(crate) fn resolve_placeholder(html: &str, token: &str, url: Option<&str>) -> String {
    let Some(re) = placeholder_regex(token) else {
        return html.to_string();
    };
    let replacement = url
        .map(|u| format!(r#"<img src="{u}" alt="image">"#))
        .unwrap_or_default();
    re.replace(html, regex::NoExpand(&replacement)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn att(id: &str, name: &str, mime: Option<&str>) -> Attachment {
        Attachment {
            id: id.into(),
            filename: format!("stored_{name}"),
            original_filename: Some(name.into()),
            file_type: mime.map(str::to_string),
            file_size: Some(10),
            uploaded_at: None,
        }
    }

    #[test]
    fn referenced_image_is_inline() {
        let content = r#"<img src="/api/v1/notes/4/attachments/a1">"#;
        assert!(is_inline(&att("a1", "cat.png", Some("image/png")), content));
        assert!(!is_inline(&att("a2", "cat.png", Some("image/png")), content));
    }

    #[test]
    fn id_prefix_of_another_attachment_is_not_inline() {
        let content = r#"<img src="/api/v1/notes/4/attachments/12">"#;
        let short = att("1", "a.png", Some("image/png"));
        assert!(!is_inline(&short, content));
        assert!(is_inline(&att("12", "b.png", Some("image/png")), content));
        assert!(has_attachment_badge(&[short], content));

        assert!(is_inline(&att("1", "a.png", Some("image/png")), "attachments/1?w=2"));
        assert!(is_inline(&att("1", "a.png", Some("image/png")), "attachments/1"));
    }

    #[test]
    fn referenced_pdf_is_not_inline() {
        let content = "see attachments/p1";
        assert!(!is_inline(&att("p1", "doc.pdf", Some("application/pdf")), content));
    }

    #[test]
    fn extension_fallback_only_for_generic_mime() {
        assert!(is_image(&att("1", "photo.JPG", None)));
        assert!(is_image(&att("1", "photo.webp", Some("application/octet-stream"))));
        assert!(!is_image(&att("1", "photo.png", Some("text/plain"))));
    }

    #[test]
    fn badge_ignores_inline_images() {
        let content = "attachments/a1";
        let only_inline = vec![att("a1", "x.png", Some("image/png"))];
        assert!(!has_attachment_badge(&only_inline, content));

        let with_file = vec![
            att("a1", "x.png", Some("image/png")),
            att("b2", "report.pdf", Some("application/pdf")),
        ];
        assert!(has_attachment_badge(&with_file, content));
        assert!(!has_attachment_badge(&[], content));
    }

    #[test]
    fn data_images_are_found_once_each() {
        let html = r#"<p><img src="data:image/png;base64,iVBORw0K"><img src='data:image/gif;base64,R0lG'><img src="data:image/png;base64,iVBORw0K"></p>"#;
        assert_eq!(
            find_data_images(html),
            vec!["data:image/png;base64,iVBORw0K", "data:image/gif;base64,R0lG"]
        );
    }

    #[test]
    fn decode_reads_mime_and_bytes() {
        let img = decode_data_url("data:image/jpeg;base64,aGVs\nbG8=").expect("decodes");
        assert_eq!(img.mime, "image/jpeg");
        assert_eq!(img.bytes, b"hello");
        assert_eq!(img.filename(0), "pasted-image-1.jpg");
    }

    #[test]
    fn decode_rejects_non_images_and_bad_payloads() {
        assert!(matches!(
            decode_data_url("data:text/plain;base64,aGk="),
            Err(AttachmentError::InvalidDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,!!!"),
            Err(AttachmentError::Decode(_))
        ));
    }

    #[test]
    fn rewrite_replaces_every_occurrence() {
        let html = r#"<img src="data:a"><img src="data:a"><img src="data:b">"#;
        let out = rewrite_sources(html, &[("data:a".into(), "/x/1".into())]);
        assert_eq!(out, r#"<img src="/x/1"><img src="/x/1"><img src="data:b">"#);
    }

    #[test]
    fn migration_rewrites_the_live_body() {
        let migration = Migration {
            replacements: vec![("data:image/png;base64,AAAA".into(), "/api/v1/notes/3/attachments/9".into())],
            report: MigrationReport {
                converted: vec!["9".into()],
                failed: vec![],
            },
        };
        let typed_since_load = r#"<p><img src="data:image/png;base64,AAAA"></p><p>abc</p>"#;
        assert_eq!(
            migration.apply_to(typed_since_load).as_deref(),
            Some(r#"<p><img src="/api/v1/notes/3/attachments/9"></p><p>abc</p>"#)
        );
        assert_eq!(migration.apply_to("<p>image already removed</p>"), None);
    }

    #[test]
    fn report_keeps_failures_separate() {
        let report = MigrationReport {
            converted: vec!["a".into()],
            failed: vec![(1, "network".into())],
        };
        assert_eq!(report.summary(), "1 image(s) converted, 1 failed");
    }

    #[test]
    fn placeholder_resolves_to_url_or_disappears() {
        let html = format!("<p>a{}b</p>", uploading_placeholder("t1"));
        assert_eq!(
            resolve_placeholder(&html, "t1", Some("/api/v1/notes/1/attachments/z")),
            r#"<p>a<img src="/api/v1/notes/1/attachments/z" alt="image">b</p>"#
        );
        assert_eq!(resolve_placeholder(&html, "t1", None), "<p>ab</p>");
        assert_eq!(resolve_placeholder(&html, "other", None), html);
    }
}
