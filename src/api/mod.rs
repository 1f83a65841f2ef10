mod save;

pub(crate) use save::{parse_save_response, SaveNoteRequest, SaveOutcome};

use crate::models::{Attachment, Folder, Note, NoteType, ShareSettings, ShareTarget, Workspace};
use crate::tags::same_tag;
use futures::future::{select, Either};
use serde::Serialize;
use std::future::Future;
use thiserror::Error;
use wasm_bindgen::JsCast;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub(crate) enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Parse(String),
    #[error("{0}")]
    Rejected(String),
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self::Parse(e.to_string())
    }

    /// Failures worth retrying later without user action.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Resolves after `ms` on the browser timer queue.
pub(crate) async fn sleep_ms(ms: u32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(win) = web_sys::window() {
            let _ = win
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms as i32);
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

/// Races `fut` against a timer. The losing request is not aborted, only ignored.
pub(crate) async fn with_timeout<T>(
    fut: impl Future<Output = ApiResult<T>>,
    ms: u32,
) -> ApiResult<T> {
    let fut = Box::pin(fut);
    let timer = Box::pin(sleep_ms(ms));
    match select(fut, timer).await {
        Either::Left((res, _)) => res,
        Either::Right(((), _)) => Err(ApiError::Timeout),
    }
}

/// Maps a raw HTTP answer onto the backend's `{success, message, ...}` envelope.
pub(crate) fn interpret_response(status: u16, body: &str) -> ApiResult<serde_json::Value> {
    if status == 401 {
        return Err(ApiError::Unauthorized);
    }

    let parsed = serde_json::from_str::<serde_json::Value>(body);
    let message = parsed.as_ref().ok().and_then(|v| {
        v.get("message")
            .or_else(|| v.get("error"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    });

    if !(200..300).contains(&status) {
        return Err(ApiError::Http {
            status,
            message: message.unwrap_or_else(|| body.chars().take(200).collect()),
        });
    }

    let value = parsed.map_err(ApiError::parse)?;
    if value.get("success").and_then(|s| s.as_bool()) == Some(false) {
        return Err(ApiError::Rejected(
            message.unwrap_or_else(|| "Request failed".to_string()),
        ));
    }
    Ok(value)
}

/// Deserialises each element of `data[field]`, skipping malformed entries.
fn parse_list<T: serde::de::DeserializeOwned>(data: &serde_json::Value, field: &str) -> Vec<T> {
    let Some(list) = data.get(field).and_then(|v| v.as_array()) else {
        return vec![];
    };
    list.iter()
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("skipping malformed {field} entry: {e}");
                None
            }
        })
        .collect()
}

pub(crate) fn parse_note_response(data: &serde_json::Value) -> ApiResult<Note> {
    let note = data
        .get("note")
        .ok_or_else(|| ApiError::Parse("response is missing `note`".to_string()))?;
    let note: Note = serde_json::from_value(note.clone()).map_err(ApiError::parse)?;
    if note.id.trim().is_empty() {
        return Err(ApiError::Parse("note id is empty".to_string()));
    }
    Ok(note)
}

pub(crate) fn parse_tag_list(data: &serde_json::Value) -> Vec<String> {
    let mut tags: Vec<String> = data
        .get("tags")
        .and_then(|v| v.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|t| t.as_str())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    tags.sort_by_key(|t| t.to_lowercase());
    tags.dedup_by(|a, b| same_tag(a, b));
    tags
}

fn absolute_url(url: &str, base: &str) -> String {
    if url.starts_with("//") {
        let scheme = base.split_once("://").map(|(s, _)| s).unwrap_or("https");
        format!("{scheme}:{url}")
    } else if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        url.to_string()
    }
}

/// Public link of a share response, made absolute against `base`.
/// `None` when the item is not shared.
pub(crate) fn parse_share_link(
    data: &serde_json::Value,
    base: &str,
    target: &ShareTarget,
) -> Option<String> {
    if data.get("public").and_then(|p| p.as_bool()) == Some(false) {
        return None;
    }
    let non_empty = |key: &str| {
        data.get(key)
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    if let Some(url) = non_empty("url") {
        return Some(absolute_url(&url, base));
    }
    non_empty("token").map(|t| format!("{base}{}{}", target.public_prefix(), urlencoding::encode(&t)))
}

pub(crate) fn attachment_url(note_id: &str, attachment_id: &str) -> String {
    format!("/api/v1/notes/{note_id}/attachments/{attachment_id}")
}

#[derive(Serialize, Clone, Debug)]
pub(crate) struct CreateNoteRequest {
    pub heading: String,
    pub workspace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    pub content: String,
}

#[derive(Serialize, Clone, Debug)]
struct MoveNoteRequest<'a> {
    folder_id: &'a str,
    workspace: &'a str,
}

#[derive(Serialize, Clone, Debug)]
struct MoveFolderRequest<'a> {
    /// `None` moves the folder to the workspace root.
    new_parent_folder_id: Option<&'a str>,
    workspace: &'a str,
}

#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    fn http(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    fn url(&self, path: &str) -> String {
        let base = if self.base_url.is_empty() {
            web_sys::window()
                .and_then(|w| w.location().origin().ok())
                .unwrap_or_default()
        } else {
            self.base_url.clone()
        };
        format!("{base}{path}")
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> ApiResult<serde_json::Value> {
        let res = req
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(ApiError::network)?;
        let status = res.status().as_u16();
        let body = res.text().await.map_err(ApiError::network)?;
        interpret_response(status, &body)
    }

    pub async fn list_workspaces(&self) -> ApiResult<Vec<Workspace>> {
        let data = self
            .send(self.http().get(self.url("/api/v1/workspaces")))
            .await?;
        Ok(parse_list(&data, "workspaces"))
    }

    pub async fn list_folders(&self, workspace: &str) -> ApiResult<Vec<Folder>> {
        let data = self
            .send(
                self.http()
                    .get(self.url("/api/v1/folders"))
                    .query(&[("workspace", workspace)]),
            )
            .await?;
        Ok(parse_list(&data, "folders"))
    }

    pub async fn list_notes(&self, workspace: &str, folder_id: Option<&str>) -> ApiResult<Vec<Note>> {
        let mut req = self
            .http()
            .get(self.url("/api/v1/notes"))
            .query(&[("workspace", workspace)]);
        if let Some(folder_id) = folder_id {
            req = req.query(&[("folder_id", folder_id)]);
        }
        let data = self.send(req).await?;
        Ok(parse_list(&data, "notes"))
    }

    pub async fn get_note(
        &self,
        note_id: &str,
        workspace: &str,
        cache_bust: Option<i64>,
    ) -> ApiResult<Note> {
        let mut req = self
            .http()
            .get(self.url(&format!("/api/v1/notes/{note_id}")))
            .query(&[("workspace", workspace)]);
        if let Some(stamp) = cache_bust {
            req = req.query(&[("_refresh", stamp.to_string())]);
        }
        let data = self.send(req).await?;
        parse_note_response(&data)
    }

    pub async fn create_note(&self, req_body: &CreateNoteRequest) -> ApiResult<Note> {
        let data = self
            .send(self.http().post(self.url("/api/v1/notes")).json(req_body))
            .await?;
        parse_note_response(&data)
    }

    pub async fn delete_note(&self, note_id: &str, workspace: &str) -> ApiResult<()> {
        self.send(
            self.http()
                .delete(self.url(&format!("/api/v1/notes/{note_id}")))
                .query(&[("workspace", workspace)]),
        )
        .await
        .map(|_| ())
    }

    /// Legacy form-encoded save. The body is not the JSON envelope; see [`parse_save_response`].
    pub async fn save_note(&self, req_body: &SaveNoteRequest) -> ApiResult<Option<String>> {
        let res = self
            .http()
            .post(self.url("/updatenote.php"))
            .header("X-Requested-With", "XMLHttpRequest")
            .form(req_body)
            .send()
            .await
            .map_err(ApiError::network)?;

        let status = res.status().as_u16();
        let body = res.text().await.map_err(ApiError::network)?;
        if status == 401 {
            return Err(ApiError::Unauthorized);
        }
        if !(200..300).contains(&status) {
            return Err(ApiError::Http {
                status,
                message: body.chars().take(200).collect(),
            });
        }

        match parse_save_response(&body) {
            SaveOutcome::Saved { last_saved } => Ok(last_saved),
            SaveOutcome::Rejected(msg) => Err(ApiError::Rejected(msg)),
        }
    }

    /// Fire-and-forget `PATCH` with `keepalive`, so it outlives the page.
    /// Returns whether the browser accepted the request.
    pub fn keepalive_save(&self, req: &SaveNoteRequest) -> bool {
        let Some(win) = web_sys::window() else {
            return false;
        };
        let Ok(body) = serde_json::to_string(&req.as_update()) else {
            return false;
        };
        let Ok(headers) = web_sys::Headers::new() else {
            return false;
        };
        if headers.set("Content-Type", "application/json").is_err()
            || headers.set("X-Requested-With", "XMLHttpRequest").is_err()
        {
            return false;
        }

        let init = web_sys::RequestInit::new();
        init.set_method("PATCH");
        init.set_headers(&headers);
        init.set_body(&wasm_bindgen::JsValue::from_str(&body));
        // web-sys does not expose `set_keepalive`; set the dictionary key directly.
        let _ = js_sys::Reflect::set(&init, &"keepalive".into(), &true.into());

        let url = self.url(&format!("/api/v1/notes/{}", req.id));
        // The response is never awaited; the page is going away.
        let _ = win.fetch_with_str_and_init(&url, &init);
        true
    }

    /// Content-only `sendBeacon` save, the fallback when `keepalive` is unavailable.
    /// Returns whether the browser queued the beacon.
    pub fn beacon_save(&self, note_id: &str, content: &str, workspace: &str) -> bool {
        let Some(win) = web_sys::window() else {
            return false;
        };
        let Ok(form) = web_sys::FormData::new() else {
            return false;
        };
        if form.append_with_str("content", content).is_err()
            || form.append_with_str("workspace", workspace).is_err()
        {
            return false;
        }
        win.navigator()
            .send_beacon_with_opt_form_data(
                &self.url(&format!("/api/v1/notes/{note_id}/beacon")),
                Some(&form),
            )
            .unwrap_or(false)
    }

    pub async fn toggle_favorite(&self, note_id: &str, workspace: &str) -> ApiResult<bool> {
        let data = self
            .send(self.http().post(self.url("/api_favorites.php")).form(&[
                ("action", "toggle_favorite"),
                ("note_id", note_id),
                ("workspace", workspace),
            ]))
            .await?;
        let fav = data.get("is_favorite");
        Ok(fav.and_then(|v| v.as_bool()).unwrap_or(false)
            || fav.and_then(|v| v.as_i64()).unwrap_or(0) != 0)
    }

    pub async fn move_note_to_folder(
        &self,
        note_id: &str,
        folder_id: &str,
        workspace: &str,
    ) -> ApiResult<()> {
        self.send(
            self.http()
                .post(self.url(&format!("/api/v1/notes/{note_id}/folder")))
                .json(&MoveNoteRequest {
                    folder_id,
                    workspace,
                }),
        )
        .await
        .map(|_| ())
    }

    pub async fn remove_note_from_folder(&self, note_id: &str, workspace: &str) -> ApiResult<()> {
        self.send(
            self.http()
                .post(self.url(&format!("/api/v1/notes/{note_id}/remove-folder")))
                .json(&serde_json::json!({ "workspace": workspace })),
        )
        .await
        .map(|_| ())
    }

    pub async fn move_folder(
        &self,
        folder_id: &str,
        new_parent_id: Option<&str>,
        workspace: &str,
    ) -> ApiResult<()> {
        self.send(
            self.http()
                .post(self.url(&format!("/api/v1/folders/{folder_id}/move")))
                .json(&MoveFolderRequest {
                    new_parent_folder_id: new_parent_id,
                    workspace,
                }),
        )
        .await
        .map(|_| ())
    }

    /// Current public link of `target`, if any.
    pub async fn get_share(&self, target: &ShareTarget) -> ApiResult<Option<String>> {
        let data = self
            .send(self.http().get(self.url(&target.api_path())))
            .await?;
        Ok(parse_share_link(&data, &self.url(""), target))
    }

    /// Creates the public link, or renews it with a new token.
    pub async fn create_share(
        &self,
        target: &ShareTarget,
        settings: &ShareSettings,
    ) -> ApiResult<Option<String>> {
        let data = self
            .send(self.http().post(self.url(&target.api_path())).json(settings))
            .await?;
        Ok(parse_share_link(&data, &self.url(""), target))
    }

    /// Changes password and indexing of an existing link; the token stays.
    pub async fn update_share(
        &self,
        target: &ShareTarget,
        settings: &ShareSettings,
    ) -> ApiResult<Option<String>> {
        let data = self
            .send(self.http().patch(self.url(&target.api_path())).json(settings))
            .await?;
        Ok(parse_share_link(&data, &self.url(""), target))
    }

    pub async fn revoke_share(&self, target: &ShareTarget) -> ApiResult<()> {
        self.send(self.http().delete(self.url(&target.api_path())))
            .await
            .map(|_| ())
    }

    pub async fn list_tags(&self, workspace: Option<&str>) -> ApiResult<Vec<String>> {
        let mut req = self.http().get(self.url("/api/v1/tags"));
        if let Some(ws) = workspace.filter(|w| !w.is_empty()) {
            req = req.query(&[("workspace", ws)]);
        }
        let data = self.send(req).await?;
        Ok(parse_tag_list(&data))
    }

    pub async fn list_attachments(&self, note_id: &str, workspace: &str) -> ApiResult<Vec<Attachment>> {
        let data = self
            .send(
                self.http()
                    .get(self.url(&format!("/api/v1/notes/{note_id}/attachments")))
                    .query(&[("workspace", workspace)]),
            )
            .await?;
        Ok(parse_list(&data, "attachments"))
    }

    /// Uploads one file and returns the new attachment id.
    pub async fn upload_attachment(
        &self,
        note_id: &str,
        workspace: &str,
        filename: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<String> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(if mime.is_empty() { "application/octet-stream" } else { mime })
            .map_err(ApiError::network)?;
        let form = reqwest::multipart::Form::new()
            .text("note_id", note_id.to_string())
            .text("workspace", workspace.to_string())
            .part("file", part);

        let data = self
            .send(
                self.http()
                    .post(self.url(&format!("/api/v1/notes/{note_id}/attachments")))
                    .multipart(form),
            )
            .await?;

        data.get("attachment_id")
            .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_i64().map(|n| n.to_string())))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::Parse("upload response is missing attachment_id".to_string()))
    }

    pub async fn delete_attachment(
        &self,
        note_id: &str,
        attachment_id: &str,
        workspace: &str,
    ) -> ApiResult<()> {
        self.send(
            self.http()
                .delete(self.url(&attachment_url(note_id, attachment_id)))
                .query(&[("workspace", workspace)]),
        )
        .await
        .map(|_| ())
    }
}

/// Reads a browser `File` into memory for a multipart upload.
pub(crate) async fn read_file_bytes(file: &web_sys::File) -> ApiResult<Vec<u8>> {
    let buf = wasm_bindgen_futures::JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| ApiError::Parse(format!("{e:?}")))?;
    let buf = buf
        .dyn_into::<js_sys::ArrayBuffer>()
        .map_err(|_| ApiError::Parse("file read did not return an ArrayBuffer".to_string()))?;
    Ok(js_sys::Uint8Array::new(&buf).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_status_wins() {
        assert_eq!(interpret_response(401, "{}"), Err(ApiError::Unauthorized));
    }

    #[test]
    fn success_false_is_rejection_with_message() {
        let err = interpret_response(200, r#"{"success":false,"message":"Note not found"}"#)
            .expect_err("should reject");
        assert_eq!(err, ApiError::Rejected("Note not found".into()));
        assert!(!err.is_transient());
    }

    #[test]
    fn http_error_prefers_json_message() {
        let err = interpret_response(404, r#"{"success":false,"error":"Folder not found"}"#)
            .expect_err("should fail");
        assert_eq!(
            err,
            ApiError::Http {
                status: 404,
                message: "Folder not found".into()
            }
        );
    }

    #[test]
    fn server_errors_are_transient() {
        let err = interpret_response(502, "Bad gateway").expect_err("should fail");
        assert!(err.is_transient());
        assert!(ApiError::Timeout.is_transient());
    }

    #[test]
    fn non_json_success_is_parse_error() {
        assert!(matches!(
            interpret_response(200, "<html>"),
            Err(ApiError::Parse(_))
        ));
    }

    #[test]
    fn note_response_requires_id() {
        let ok = serde_json::json!({"success": true, "note": {"id": 42, "heading": "H", "content": "<p>x</p>"}});
        assert_eq!(parse_note_response(&ok).expect("note").id, "42");

        let missing = serde_json::json!({"success": true});
        assert!(parse_note_response(&missing).is_err());
    }

    #[test]
    fn lists_skip_malformed_entries() {
        let data = serde_json::json!({"folders": [
            {"id": 1, "name": "Work", "parent_id": null},
            {"name": "no id"},
            {"id": "3", "name": "Sub", "parent_id": 1}
        ]});
        let folders: Vec<Folder> = parse_list(&data, "folders");
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[1].parent_id.as_deref(), Some("1"));
    }

    #[test]
    fn tag_list_is_sorted_and_unique() {
        let data = serde_json::json!({"success": true, "tags": ["work", "Alpha", "", "WORK", "beta"]});
        assert_eq!(parse_tag_list(&data), vec!["Alpha", "beta", "work"]);
    }

    #[test]
    fn non_ascii_tags_dedup_ignoring_case() {
        let data = serde_json::json!({"tags": ["Été", "été", "Ölfarbe", "ölfarbe"]});
        assert_eq!(parse_tag_list(&data).len(), 2);
    }

    #[test]
    fn share_links_are_made_absolute() {
        let note = ShareTarget::Note {
            id: "4".into(),
            title: "Plan".into(),
        };
        let folder = ShareTarget::Folder {
            id: "9".into(),
            name: "Work".into(),
        };
        let base = "https://notes.example";

        let relative = serde_json::json!({"success": true, "public": true, "url": "//notes.example/abc"});
        assert_eq!(
            parse_share_link(&relative, base, &note).as_deref(),
            Some("https://notes.example/abc")
        );
        let token_only = serde_json::json!({"success": true, "token": "t 1"});
        assert_eq!(
            parse_share_link(&token_only, base, &folder).as_deref(),
            Some("https://notes.example/folder/t%201")
        );
        let unshared = serde_json::json!({"success": true, "public": false});
        assert_eq!(parse_share_link(&unshared, base, &note), None);
    }

    #[test]
    fn attachment_url_shape() {
        assert_eq!(attachment_url("42", "abc"), "/api/v1/notes/42/attachments/abc");
    }

    #[test]
    fn move_folder_to_root_sends_null_parent() {
        let body = MoveFolderRequest {
            new_parent_folder_id: None,
            workspace: "Poznote",
        };
        let v = serde_json::to_value(&body).expect("serialize");
        assert!(v["new_parent_folder_id"].is_null());
    }
}
