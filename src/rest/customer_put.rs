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

//! API to update an existing customer.

use crate::db::{Db, Tx};
use crate::driver::Driver;
use crate::model::CustomerId;
use crate::rest::dtos::CustomerDto;
use crate::rest::{custom_header, Negotiated, RestError};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

/// API handler.
pub(crate) async fn handler<D>(
    State(driver): State<Driver<D>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(dto): Json<CustomerDto>,
) -> Result<impl IntoResponse, RestError>
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    let fields = dto.into_new_customer()?;
    let customer = driver.update_customer(CustomerId::new(id), fields).await?;
    let payload = Negotiated::new(&headers, "customer", CustomerDto::from_customer(&customer))?;
    Ok((custom_header("CustomerUpdated"), payload))
}
