// SPDX-License-Identifier: PMPL-1.0-or-later
//! Request handlers for the `/person` resource.
//!
//! Every method on every `/person` path lands in [`dispatch`], which picks
//! the handler by method. Handlers return `Result<Response, ApiError>` and
//! let the error type choose the status.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use person_storage::{Person, PersonId, StorageError};
use tracing::{debug, instrument};

use crate::combine::combine_filters;
use crate::error::ApiError;
use crate::AppState;

/// Path prefix preceding the identifier segment.
const ITEM_PREFIX: &str = "/person/";

/// Route a `/person` request to the handler for its method.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let result = match method {
        Method::GET => read_persons(&state, &uri).await,
        Method::POST => create_person(&state, &headers, &body).await,
        Method::PUT => update_person(&state, &headers, &body).await,
        Method::DELETE => delete_person(&state, &uri).await,
        _ => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

#[instrument(skip(state, headers, body))]
async fn create_person(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, ApiError> {
    let person = decode_person(headers, body)?;
    let stored = state.storage.add(person).await?;
    debug!(id = %stored.id, "person created");
    Ok((StatusCode::CREATED, Json(stored)).into_response())
}

#[instrument(skip(state))]
async fn read_persons(state: &AppState, uri: &Uri) -> Result<Response, ApiError> {
    if let Some(segment) = identifier_segment(uri) {
        let id = parse_id(segment)?;
        let person = state.storage.get_by_id(id).await?;
        return Ok(Json(person).into_response());
    }

    let params = query_params(uri)?;
    if params.is_empty() {
        let persons = state.storage.get_all().await?;
        if persons.is_empty() {
            return Err(ApiError::NotFound("no persons stored".to_string()));
        }
        return Ok(Json(persons).into_response());
    }

    let by_name = match first_value(&params, "name") {
        Some(name) => found_or_empty(state.storage.get_by_name(name).await)?,
        None => Vec::new(),
    };
    let by_communication = match first_value(&params, "communication") {
        Some(value) => found_or_empty(state.storage.get_by_communication(value).await)?,
        None => Vec::new(),
    };

    let persons = combine_filters(by_name, by_communication);
    if persons.is_empty() {
        return Err(ApiError::NotFound("no person matches the query".to_string()));
    }
    Ok(Json(persons).into_response())
}

#[instrument(skip(state, headers, body))]
async fn update_person(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, ApiError> {
    let person = decode_person(headers, body)?;
    let stored = match state.storage.update(person.clone()).await {
        Ok(updated) => updated,
        Err(StorageError::NotFound(_)) => {
            debug!(id = %person.id, "update missed, adding");
            // A conflict here means a concurrent writer won; report it as a failure.
            state
                .storage
                .add(person)
                .await
                .map_err(|err| ApiError::Backend(err.to_string()))?
        }
        Err(err) => return Err(ApiError::Backend(err.to_string())),
    };
    Ok(Json(stored).into_response())
}

#[instrument(skip(state))]
async fn delete_person(state: &AppState, uri: &Uri) -> Result<Response, ApiError> {
    let segment = identifier_segment(uri)
        .ok_or_else(|| ApiError::InvalidIdentifier("missing person id".to_string()))?;
    let id = parse_id(segment)?;
    state.storage.delete(id).await?;
    debug!(%id, "person deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// True when the request declares a JSON body.
///
/// Only the media type is compared; parameters such as `charset` are ignored.
pub(crate) fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|media| media.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// Validate content type and decode a person with a usable identifier.
fn decode_person(headers: &HeaderMap, body: &[u8]) -> Result<Person, ApiError> {
    if !is_json(headers) {
        return Err(ApiError::WrongContentType);
    }
    let person: Person =
        serde_json::from_slice(body).map_err(|err| ApiError::InvalidBody(err.to_string()))?;
    if person.id.is_nil() {
        return Err(ApiError::InvalidBody("person id must not be nil".to_string()));
    }
    Ok(person)
}

/// The part of the path after `/person/`, if non-empty.
fn identifier_segment(uri: &Uri) -> Option<&str> {
    uri.path()
        .strip_prefix(ITEM_PREFIX)
        .filter(|segment| !segment.is_empty())
}

fn parse_id(segment: &str) -> Result<PersonId, ApiError> {
    segment
        .parse()
        .map_err(|err| ApiError::InvalidIdentifier(format!("{segment}: {err}")))
}

fn query_params(uri: &Uri) -> Result<Vec<(String, String)>, ApiError> {
    let Query(params) = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map_err(|rejection| ApiError::InvalidIdentifier(rejection.body_text()))?;
    Ok(params)
}

/// First value given for `key`, unless it is empty.
fn first_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// A filter that matched nothing contributes an empty set.
fn found_or_empty(result: Result<Vec<Person>, StorageError>) -> Result<Vec<Person>, ApiError> {
    match result {
        Ok(persons) => Ok(persons),
        Err(StorageError::NotFound(_)) => Ok(Vec::new()),
        Err(err) => Err(ApiError::Backend(err.to_string())),
    }
}
