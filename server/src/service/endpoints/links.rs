//! Link endpoints and the preset link types

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::{Validate, ValidateUrl};

use crate::patch::Patch;
use crate::persistence::traits::LinkRepository;
use crate::persistence::{now_timestamp, with_timeout, Link, NewLink, Persistence};
use crate::service::context::AppState;
use crate::service::converters::{convert_link, LinkResponse};
use crate::service::error::ApiError;
use crate::service::extractors::{ApiJson, ApiPath, AuthUser};
use crate::storage::{spawn_cleanup, StoredImage};

const MAX_TITLE_CHARS: usize = 100;

/// A common social network offered as a shortcut when adding a link.
#[derive(Debug, Clone, Serialize)]
pub struct LinkType {
    pub name: &'static str,
    pub icon_url: &'static str,
    pub base_url: &'static str,
    pub placeholder: &'static str,
}

pub const COMMON_LINK_TYPES: &[LinkType] = &[
    LinkType {
        name: "Twitter/X",
        icon_url: "https://cdn.jsdelivr.net/npm/simple-icons@v9/icons/x.svg",
        base_url: "https://x.com/",
        placeholder: "username",
    },
    LinkType {
        name: "GitHub",
        icon_url: "https://cdn.jsdelivr.net/npm/simple-icons@v9/icons/github.svg",
        base_url: "https://github.com/",
        placeholder: "username",
    },
    LinkType {
        name: "Instagram",
        icon_url: "https://cdn.jsdelivr.net/npm/simple-icons@v9/icons/instagram.svg",
        base_url: "https://instagram.com/",
        placeholder: "username",
    },
];

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    pub profile_id: i64,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub title: String,
    #[validate(url(message = "must be a valid URL"))]
    pub url: String,
    pub description: Option<String>,
    pub image_base64: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LinkPatch {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub url: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub image_base64: Patch<String>,
}

impl LinkPatch {
    fn is_empty(&self) -> bool {
        self.title.is_unchanged()
            && self.url.is_unchanged()
            && self.description.is_unchanged()
            && self.image_base64.is_unchanged()
    }
}

#[derive(Debug, Serialize)]
pub struct LinkEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub link: LinkResponse,
}

#[derive(Debug, Serialize)]
pub struct LinkListResponse {
    pub links: Vec<LinkResponse>,
    pub total: usize,
}

/// Apply the text fields of `patch` to `link`, leaving the image alone.
fn apply_text_fields(link: &mut Link, patch: &mut LinkPatch) -> Result<(), ApiError> {
    match std::mem::take(&mut patch.title) {
        Patch::Unchanged => {}
        Patch::Clear => return Err(ApiError::validation("title cannot be null")),
        Patch::Set(title) => {
            let title = title.trim();
            if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
                return Err(ApiError::validation("title must be 1 to 100 characters"));
            }
            link.title = title.to_string();
        }
    }
    match std::mem::take(&mut patch.url) {
        Patch::Unchanged => {}
        Patch::Clear => return Err(ApiError::validation("url cannot be null")),
        Patch::Set(url) => {
            if !url.validate_url() {
                return Err(ApiError::validation("url must be a valid URL"));
            }
            link.url = url;
        }
    }
    std::mem::take(&mut patch.description).apply_text(&mut link.description);
    Ok(())
}

async fn load_link<D: Persistence>(state: &AppState<D>, id: i64) -> Result<Link, ApiError> {
    with_timeout(state.settings.timeouts.db, state.store.links().get_link(id))
        .await?
        .ok_or_else(|| ApiError::not_found("link not found"))
}

async fn load_owned<D: Persistence>(
    state: &AppState<D>,
    caller: &AuthUser,
    id: i64,
) -> Result<Link, ApiError> {
    let link = load_link(state, id).await?;
    state
        .profiles
        .get_owned(caller.user_id, link.profile_id)
        .await?;
    Ok(link)
}

pub async fn list_link_types() -> Json<Value> {
    Json(json!({ "link_types": COMMON_LINK_TYPES }))
}

pub async fn create_link<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiJson(mut req): ApiJson<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkEnvelope>), ApiError> {
    req.title = req.title.trim().to_string();
    req.validate()?;
    tracing::info!(profile_id = req.profile_id, "HTTP create_link");
    state
        .profiles
        .get_owned(caller.user_id, req.profile_id)
        .await?;

    let image_ref = match req.image_base64.as_deref().map(str::trim) {
        Some(payload) if !payload.is_empty() => Some(state.images.store_base64(payload).await?),
        _ => None,
    };

    let new = NewLink {
        profile_id: req.profile_id,
        title: req.title,
        url: req.url,
        description: req.description,
        image_ref,
    };
    let written = with_timeout(
        state.settings.timeouts.db,
        state.store.links().create_link(&new),
    )
    .await;
    let link = match written {
        Ok(link) => link,
        Err(e) => {
            spawn_cleanup(state.images.clone(), new.image_ref.into_iter().collect());
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(LinkEnvelope {
            message: Some("link created"),
            link: convert_link(link, &state.settings.public_url),
        }),
    ))
}

pub async fn get_link<D: Persistence>(
    State(state): State<AppState<D>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<LinkEnvelope>, ApiError> {
    tracing::info!(link_id = id, "HTTP get_link");
    let link = load_link(&state, id).await?;
    Ok(Json(LinkEnvelope {
        message: None,
        link: convert_link(link, &state.settings.public_url),
    }))
}

pub async fn list_profile_links<D: Persistence>(
    State(state): State<AppState<D>>,
    ApiPath(profile_id): ApiPath<i64>,
) -> Result<Json<LinkListResponse>, ApiError> {
    tracing::info!(profile_id, "HTTP list_profile_links");
    let links = with_timeout(
        state.settings.timeouts.db,
        state.store.links().list_links(profile_id),
    )
    .await?;
    let links: Vec<LinkResponse> = links
        .into_iter()
        .map(|l| convert_link(l, &state.settings.public_url))
        .collect();
    Ok(Json(LinkListResponse {
        total: links.len(),
        links,
    }))
}

pub async fn get_link_image<D: Persistence>(
    State(state): State<AppState<D>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    let link = load_link(&state, id).await?;
    let reference = link
        .image_ref
        .ok_or_else(|| ApiError::not_found("link has no image"))?;
    match state.images.load(&reference).await? {
        StoredImage::Bytes {
            bytes,
            content_type,
        } => Ok(([(CONTENT_TYPE, content_type)], bytes).into_response()),
        StoredImage::Redirect(url) => Ok(Redirect::temporary(&url).into_response()),
        StoredImage::Missing => Err(ApiError::not_found("image not found")),
    }
}

pub async fn update_link<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(mut patch): ApiJson<LinkPatch>,
) -> Result<Json<LinkEnvelope>, ApiError> {
    tracing::info!(link_id = id, "HTTP update_link");
    if patch.is_empty() {
        return Err(ApiError::validation("no fields to update"));
    }

    let mut link = load_owned(&state, &caller, id).await?;
    apply_text_fields(&mut link, &mut patch)?;

    let previous_image = link.image_ref.clone();
    match patch.image_base64.empty_as_clear() {
        Patch::Unchanged => {}
        Patch::Clear => link.image_ref = None,
        Patch::Set(payload) => link.image_ref = Some(state.images.store_base64(&payload).await?),
    }
    link.updated_at = now_timestamp();
    let image_changed = link.image_ref != previous_image;

    let written = with_timeout(
        state.settings.timeouts.db,
        state.store.links().update_link(&link),
    )
    .await;
    let fresh_image = link.image_ref.clone();
    let (stale, result) = match written {
        Ok(true) => (previous_image, Ok(())),
        Ok(false) => (fresh_image, Err(ApiError::not_found("link not found"))),
        Err(e) => (fresh_image, Err(e.into())),
    };
    if image_changed {
        spawn_cleanup(state.images.clone(), stale.into_iter().collect());
    }
    result?;

    Ok(Json(LinkEnvelope {
        message: Some("link updated"),
        link: convert_link(link, &state.settings.public_url),
    }))
}

pub async fn delete_link<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(link_id = id, "HTTP delete_link");
    let link = load_owned(&state, &caller, id).await?;

    let deleted = with_timeout(
        state.settings.timeouts.db,
        state.store.links().delete_link(id),
    )
    .await?;
    if !deleted {
        return Err(ApiError::not_found("link not found"));
    }
    spawn_cleanup(state.images.clone(), link.image_ref.into_iter().collect());
    Ok(Json(json!({ "message": "link deleted" })))
}
