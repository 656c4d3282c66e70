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

//! API to create a new customer.

use crate::db::{Db, Tx};
use crate::driver::Driver;
use crate::rest::dtos::CustomerDto;
use crate::rest::{custom_header, Negotiated, RestError};
use axum::extract::State;
use axum::http::{self, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;

/// API handler.
pub(crate) async fn handler<D>(
    State(driver): State<Driver<D>>,
    headers: HeaderMap,
    Json(dto): Json<CustomerDto>,
) -> Result<impl IntoResponse, RestError>
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    let fields = dto.into_new_customer()?;
    let customer = driver.create_customer(fields).await?;
    let dto = CustomerDto::from_customer(&customer);
    Ok((
        http::StatusCode::CREATED,
        custom_header("CustomerCreated"),
        Negotiated::new(&headers, "customer", dto)?,
    ))
}
