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

//! API to get one book.

use crate::db::{Db, Tx};
use crate::driver::Driver;
use crate::model::BookId;
use crate::rest::dtos::BookDto;
use crate::rest::{EmptyBody, Negotiated, RestError};
use axum::extract::{Path, State};
use axum::http::HeaderMap;

/// API handler.
pub(crate) async fn handler<D>(
    State(driver): State<Driver<D>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<Negotiated<BookDto>, RestError>
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    let book = driver.get_book(BookId::new(id)).await?;
    Negotiated::new(&headers, "book", BookDto::from_book(&book))
}
