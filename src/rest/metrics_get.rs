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

//! API to expose the metrics registry in the Prometheus text format.

use crate::db::{Db, Tx};
use crate::driver::Driver;
use crate::rest::{EmptyBody, RestError};
use axum::extract::State;
use axum::http;
use axum::response::IntoResponse;

/// API handler.
pub(crate) async fn handler<D>(
    State(driver): State<Driver<D>>,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError>
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    let text = driver
        .metrics()
        .encode()
        .map_err(|e| RestError::InternalError(format!("Cannot encode metrics: {}", e)))?;
    Ok(([(http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], text))
}
