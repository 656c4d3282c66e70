// Bookstore API
// Copyright 2025 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Entry point to the REST server.
//!
//! Every API is put in its own `.rs` file, using a name like `<entity>_<method>.rs`.  This may
//! seem overkill, but putting every API in its own file makes it easy to ensure all the
//! integration tests for the given API truly belong to that API.
//!
//! More specifically, the `tests` module within an API should define a `route` method that
//! returns the HTTP method and the API path under test.  All integration tests within the module
//! then rely on `route` to obtain this information, ensuring that they all test the desired API.

use crate::db::{Db, Tx};
use crate::driver::{Driver, DriverError};
use crate::model::ModelError;
use async_trait::async_trait;
use axum::body::HttpBody;
use axum::extract::{FromRequest, Request};
use axum::http::header::AsHeaderName;
use axum::http::{self, HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::{Json, Router};
use log::warn;
use serde::{Deserialize, Serialize};

mod book_delete;
mod book_get;
mod book_put;
mod books_get;
mod books_post;
mod customer_delete;
mod customer_get;
mod customer_put;
mod customers_get;
mod customers_post;
mod dtos;
mod metrics_get;

/// Frontend errors.  These are the errors that are visible to the user on failed requests.
#[derive(Debug, PartialEq, thiserror::Error)]
pub(crate) enum RestError {
    /// Catch-all error type for all unexpected errors.
    #[error("{0}")]
    InternalError(String),

    /// Indicates an error in the contents of the request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Indicates that a requested entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that a request that should have empty content did not.
    #[error("Content should be empty")]
    PayloadNotEmpty,
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::AlreadyExists(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::BackendError(_) => RestError::InternalError(e.to_string()),
            DriverError::InvalidInput(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::NotFound(_) => RestError::NotFound(e.to_string()),
        }
    }
}

impl From<ModelError> for RestError {
    fn from(e: ModelError) -> Self {
        RestError::InvalidRequest(e.to_string())
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            RestError::InternalError(ref e) => {
                warn!("Internal error: {}", e);
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
            RestError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            RestError::NotFound(_) => http::StatusCode::NOT_FOUND,
            RestError::PayloadNotEmpty => http::StatusCode::PAYLOAD_TOO_LARGE,
        };

        let response = ErrorResponse { message: self.to_string() };

        (status, Json(response)).into_response()
    }
}

/// Result type for this module.
pub(crate) type RestResult<T> = Result<T, RestError>;

/// Representation of the details of an error response.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ErrorResponse {
    /// Textual representation of the error message.
    pub(crate) message: String,
}

/// A request body extractor that forbids any content.
///
/// Any API that doesn't expect a body should use this to ensure we don't get garbage data that we
/// don't care about.  This future-proofs the service.
pub(crate) struct EmptyBody {}

#[async_trait]
impl<S> FromRequest<S> for EmptyBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        if req.into_body().is_end_stream() {
            Ok(EmptyBody {})
        } else {
            Err(RestError::PayloadNotEmpty)
        }
    }
}

/// Extracts the header `name` from `headers` and ensures it has at most one value.
pub(crate) fn get_unique_header<K: AsHeaderName + Copy>(
    headers: &HeaderMap,
    name: K,
) -> RestResult<Option<&HeaderValue>> {
    let mut iter = headers.get_all(name).iter();
    let value = iter.next();
    if iter.next().is_some() {
        return Err(RestError::InvalidRequest(format!(
            "Header {} cannot have more than one value",
            name.as_str()
        )));
    }
    Ok(value)
}

/// Checks whether the `Accept` header in `headers` asks for an XML response.
///
/// The media ranges in the header are inspected in order and the first one we recognize wins.
/// Requests with no `Accept` header, or with ranges we know nothing about, get the JSON default.
pub(crate) fn wants_xml(headers: &HeaderMap) -> RestResult<bool> {
    let value = match get_unique_header(headers, &http::header::ACCEPT)? {
        Some(value) => value,
        None => return Ok(false),
    };
    let value = value
        .to_str()
        .map_err(|e| RestError::InvalidRequest(format!("Invalid Accept header: {}", e)))?;

    for range in value.split(',') {
        let media_type = range.split(';').next().unwrap_or("").trim();
        match media_type {
            "application/xml" | "text/xml" => return Ok(true),
            "application/json" | "application/*" | "*/*" => return Ok(false),
            _ => (),
        }
    }
    Ok(false)
}

/// Renders `value` as an XML document with the given `root` element.
pub(crate) fn to_xml<T: Serialize>(root: &str, value: &T) -> RestResult<String> {
    quick_xml::se::to_string_with_root(root, value)
        .map_err(|e| RestError::InternalError(format!("Cannot render XML: {}", e)))
}

/// A response payload in the representation chosen by the request's `Accept` header.
pub(crate) enum Negotiated<T> {
    /// The payload rendered as JSON, which is the default representation.
    Json(T),

    /// The payload pre-rendered as an XML document.
    Xml(String),
}

impl<T: Serialize> Negotiated<T> {
    /// Renders `value` in the representation chosen by `headers`, using `root` as the document
    /// element if the choice is XML.
    pub(crate) fn new(headers: &HeaderMap, root: &str, value: T) -> RestResult<Self> {
        if wants_xml(headers)? {
            Ok(Negotiated::Xml(to_xml(root, &value)?))
        } else {
            Ok(Negotiated::Json(value))
        }
    }
}

impl<T: Serialize> IntoResponse for Negotiated<T> {
    fn into_response(self) -> axum::response::Response {
        match self {
            Negotiated::Json(value) => Json(value).into_response(),
            Negotiated::Xml(text) => {
                ([(http::header::CONTENT_TYPE, "application/xml")], text).into_response()
            }
        }
    }
}

/// Builds the header map that decorates every customer response, with `value` describing the
/// operation that was performed.
pub(crate) fn custom_header(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Custom-Header", HeaderValue::from_static(value));
    headers
}

/// Creates the router for the application.
pub(crate) fn app<D>(driver: Driver<D>) -> Router
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    use axum::routing::get;
    Router::new()
        .route("/books", get(books_get::handler).post(books_post::handler))
        .route(
            "/books/:id",
            get(book_get::handler).put(book_put::handler).delete(book_delete::handler),
        )
        .route("/customers", get(customers_get::handler).post(customers_post::handler))
        .route(
            "/customers/:id",
            get(customer_get::handler).put(customer_put::handler).delete(customer_delete::handler),
        )
        .route("/metrics", get(metrics_get::handler))
        .with_state(driver)
}
