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

//! API to list all books.

use crate::db::{Db, Tx};
use crate::driver::Driver;
use crate::rest::dtos::{BookDto, BooksDocument};
use crate::rest::{to_xml, wants_xml, EmptyBody, Negotiated, RestError};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;

/// API handler.
pub(crate) async fn handler<D>(
    State(driver): State<Driver<D>>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError>
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    let books = driver.get_books().await?;
    let dtos = books.iter().map(BookDto::from_book).collect::<Vec<_>>();
    if wants_xml(&headers)? {
        Ok(Negotiated::Xml(to_xml("books", &BooksDocument::new(dtos))?))
    } else {
        Ok(Negotiated::Json(dtos))
    }
}
