use axum::{
    extract::{Json, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    feed::sort_newest_first,
    models::issue::{Department, FieldChange, IssueFilter, NewIssue, Priority},
    responses::JsonResponse,
    routes::auth::session::AuthSession,
    services::object_store::object_key,
    state::AppState,
    utils::display_id::next_display_id,
};

pub mod sse;

pub use sse::issue_events;

const MAX_ROOM_NUMBER_LEN: usize = 50;
const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 4000;
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const IMAGE_NAMESPACE: &str = "fir-images";

#[derive(Default)]
struct SubmitFields {
    room_number: Option<String>,
    issue_title: Option<String>,
    description: Option<String>,
    priority: Option<String>,
    image: Option<(String, Vec<u8>)>,
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, Response> {
    field.text().await.map_err(|err| {
        warn!("Malformed multipart field: {:?}", err);
        JsonResponse::bad_request("Malformed upload").into_response()
    })
}

async fn collect_fields(mut multipart: Multipart) -> Result<SubmitFields, Response> {
    let mut fields = SubmitFields::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warn!("Malformed multipart submission: {:?}", err);
                return Err(JsonResponse::bad_request("Malformed upload").into_response());
            }
        };

        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "room_number" => fields.room_number = Some(read_text(field).await?),
            "issue_title" => fields.issue_title = Some(read_text(field).await?),
            "description" => fields.description = Some(read_text(field).await?),
            "priority" => fields.priority = Some(read_text(field).await?),
            "image" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "photo".to_string());
                let bytes = field.bytes().await.map_err(|err| {
                    warn!("Failed to read image field: {:?}", err);
                    JsonResponse::bad_request("Malformed upload").into_response()
                })?;
                fields.image = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }
    Ok(fields)
}

fn required_trimmed(
    value: Option<String>,
    label: &str,
    max_len: usize,
) -> Result<String, Response> {
    let trimmed = value.as_deref().unwrap_or("").trim().to_string();
    if trimmed.is_empty() {
        return Err(
            JsonResponse::bad_request(&format!("{} is required", label)).into_response(),
        );
    }
    if trimmed.len() > max_len {
        return Err(JsonResponse::bad_request(&format!("{} is too long", label)).into_response());
    }
    Ok(trimmed)
}

/// Accepts a new FIR as a multipart form: `room_number`, `issue_title` and
/// `description` are required text fields, `priority` is optional text and
/// `image` an optional file. Validation runs before the photo is uploaded,
/// and the upload before the row insert, so a failed upload leaves no row
/// behind while a failed insert can orphan a stored photo.
pub async fn submit_issue(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    multipart: Multipart,
) -> Response {
    let fields = match collect_fields(multipart).await {
        Ok(fields) => fields,
        Err(resp) => return resp,
    };

    let room_number = match required_trimmed(fields.room_number, "Room number", MAX_ROOM_NUMBER_LEN)
    {
        Ok(value) => value,
        Err(resp) => return resp,
    };
    let issue_title = match required_trimmed(fields.issue_title, "Issue title", MAX_TITLE_LEN) {
        Ok(value) => value,
        Err(resp) => return resp,
    };
    let description = match required_trimmed(fields.description, "Description", MAX_DESCRIPTION_LEN)
    {
        Ok(value) => value,
        Err(resp) => return resp,
    };

    let priority = match fields.priority.as_deref() {
        None | Some("") => Priority::default(),
        Some(raw) => match Priority::parse(raw) {
            Some(priority) => priority,
            None => {
                return JsonResponse::bad_request("Unknown priority").into_response();
            }
        },
    };

    let image = match fields.image {
        Some((_, bytes)) if bytes.is_empty() => {
            return JsonResponse::bad_request("Image file is empty").into_response();
        }
        Some((_, bytes)) if bytes.len() > MAX_IMAGE_BYTES => {
            return JsonResponse::bad_request("Image is too large").into_response();
        }
        other => other,
    };

    let image_url = match image {
        Some((filename, bytes)) => {
            let key = object_key(IMAGE_NAMESPACE, &claims.id, &filename);
            match state.object_store.put_object(&key, &bytes).await {
                Ok(url) => Some(url),
                Err(err) => {
                    error!(?err, %key, "failed to store issue photo");
                    return JsonResponse::bad_gateway_with_code(
                        "Image upload failed",
                        "upload_failed",
                    )
                    .into_response();
                }
            }
        }
        None => None,
    };

    let display_id = match state.db.list_display_ids().await {
        Ok(ids) => next_display_id(ids),
        Err(err) => {
            error!(?err, "failed to read display ids for new issue");
            return JsonResponse::server_error("Unable to submit issue right now").into_response();
        }
    };

    let new_issue = NewIssue {
        display_id,
        room_number,
        issue_title,
        description,
        priority,
        status: Default::default(),
        department: Default::default(),
        image_url: image_url.clone(),
        submitted_by: claims.id.clone(),
    };

    match state.db.insert_issue(new_issue).await {
        Ok(issue) => {
            state.feed.notify();
            (
                StatusCode::CREATED,
                Json(json!({ "success": true, "issue": issue })),
            )
                .into_response()
        }
        Err(err) => {
            error!(?err, "failed to persist issue");
            if let Some(url) = image_url {
                warn!(%url, "stored photo is orphaned after failed insert");
            }
            JsonResponse::server_error("Unable to submit issue right now").into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub department: Option<Department>,
    /// Case-insensitive substring over display id, room, title, description.
    #[serde(default)]
    pub q: Option<String>,
}

pub async fn list_issues(
    State(state): State<AppState>,
    AuthSession(_claims): AuthSession,
    Query(query): Query<ListQuery>,
) -> Response {
    let issues = match state.db.list_issues().await {
        Ok(issues) => issues,
        Err(err) => {
            error!(?err, "failed to list issues");
            return JsonResponse::server_error("Unable to load issues right now").into_response();
        }
    };

    let filter = IssueFilter {
        priority: query.priority,
        department: query.department,
    };
    let needle = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());

    let mut matching: Vec<_> = issues
        .into_iter()
        .filter(|issue| filter.matches(issue))
        .filter(|issue| needle.map_or(true, |q| issue.matches_search(q)))
        .collect();
    sort_newest_first(&mut matching);

    Json(json!({ "success": true, "issues": matching })).into_response()
}

pub async fn get_issue(
    State(state): State<AppState>,
    AuthSession(_claims): AuthSession,
    Path(issue_id): Path<Uuid>,
) -> Response {
    match state.db.find_issue_by_id(issue_id).await {
        Ok(Some(issue)) => Json(json!({ "success": true, "issue": issue })).into_response(),
        Ok(None) => JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to load issue");
            JsonResponse::server_error("Unable to load issue right now").into_response()
        }
    }
}

/// Applies one triage edit, e.g. `{"field": "status", "value": "in_progress"}`.
/// The server stamps `updated_at`; concurrent edits resolve last-writer-wins.
pub async fn update_issue(
    State(state): State<AppState>,
    AuthSession(_claims): AuthSession,
    Path(issue_id): Path<Uuid>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let change: FieldChange = match serde_json::from_value(body) {
        Ok(change) => change,
        Err(err) => {
            warn!(%issue_id, "rejected issue update: {}", err);
            return JsonResponse::bad_request("Unknown field or value").into_response();
        }
    };

    match state.db.update_issue_field(issue_id, change).await {
        Ok(Some(issue)) => {
            state.feed.notify();
            Json(json!({ "success": true, "issue": issue })).into_response()
        }
        Ok(None) => JsonResponse::not_found("Issue not found").into_response(),
        Err(err) => {
            error!(?err, %issue_id, "failed to update issue");
            JsonResponse::server_error("Unable to update issue right now").into_response()
        }
    }
}
