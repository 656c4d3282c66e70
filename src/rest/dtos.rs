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

//! Wire representations of the entities and their conversions to and from the model types.
//!
//! The DTOs carry raw wire types on purpose: inbound payloads are untrusted, so the conversions
//! to the model types validate every field and report all violations at once instead of stopping
//! at the first one.

use crate::model::{
    Author, Book, Customer, CustomerName, EmailAddress, Isbn, ModelError, ModelResult, NewBook,
    NewCustomer, Price, Title,
};
use crate::rest::{RestError, RestResult};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Base path under which the book APIs are served.
pub(crate) const BOOKS_PATH: &str = "/books";

/// Base path under which the customer APIs are served.
pub(crate) const CUSTOMERS_PATH: &str = "/customers";

/// A single hyperlink to a resource.
#[derive(Clone, Deserialize, Serialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct Link {
    /// Target of the link.
    pub(crate) href: String,
}

/// The links block attached to every outbound DTO.
#[derive(Clone, Deserialize, Serialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct SelfLinks {
    /// Link to the resource itself.
    #[serde(rename = "self")]
    pub(crate) self_link: Link,
}

/// Builds the links block for the resource `id` under `base_path`.
fn self_links(base_path: &str, id: i64) -> SelfLinks {
    SelfLinks { self_link: Link { href: format!("{}/{}", base_path, id) } }
}

/// Records the validation failure of `field`, if any, in `messages`.
fn collect_violation<T>(field: &str, result: &ModelResult<T>, messages: &mut Vec<String>) {
    if let Err(e) = result {
        messages.push(format!("{}: {}", field, e));
    }
}

/// Validates that the required field `what` is present in the inbound payload.  Absent fields
/// go through the same per-field reporting as invalid ones.
fn require<T>(what: &str, value: Option<T>) -> ModelResult<T> {
    value.ok_or_else(|| ModelError(format!("{} is required", what)))
}

/// Wire representation of a book.
#[derive(Clone, Deserialize, Serialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct BookDto {
    /// Identifier of the book.  Absent from inbound payloads (and ignored if present, as the
    /// server manages identifiers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<i64>,

    /// Title of the book.  Required, but kept optional so that its absence is reported by the
    /// validators rather than by the codec.
    pub(crate) title: Option<String>,

    /// Author of the book.  Required, see `title`.
    pub(crate) author: Option<String>,

    /// Price of the book.  Required, see `title`.
    pub(crate) price: Option<f64>,

    /// ISBN of the book.  Required, see `title`.
    pub(crate) isbn: Option<String>,

    /// Links block, only present in outbound payloads.
    #[serde(default, rename = "_links", skip_serializing_if = "Option::is_none")]
    pub(crate) links: Option<SelfLinks>,
}

impl BookDto {
    /// Converts the model entity `book` to its wire representation, attaching the self-link.
    pub(crate) fn from_book(book: &Book) -> Self {
        Self {
            id: Some(book.id().as_i64()),
            title: Some(book.title().as_str().to_owned()),
            author: Some(book.author().as_str().to_owned()),
            price: Some(book.price().as_f64()),
            isbn: Some(book.isbn().as_str().to_owned()),
            links: Some(self_links(BOOKS_PATH, book.id().as_i64())),
        }
    }

    /// Validates all fields of the inbound payload and converts them to the model
    /// representation.  Reports every violated field in a single error.
    pub(crate) fn into_new_book(self) -> RestResult<NewBook> {
        let title = require("Title", self.title).and_then(Title::new);
        let author = require("Author", self.author).and_then(Author::new);
        let price = require("Price", self.price).and_then(Price::new);
        let isbn = require("ISBN", self.isbn).and_then(Isbn::new);

        let mut messages = vec![];
        collect_violation("title", &title, &mut messages);
        collect_violation("author", &author, &mut messages);
        collect_violation("price", &price, &mut messages);
        collect_violation("isbn", &isbn, &mut messages);
        if !messages.is_empty() {
            return Err(RestError::InvalidRequest(messages.join("; ")));
        }

        Ok(NewBook::new(title?, author?, price?, isbn?))
    }
}

/// Wire representation of a customer.
#[derive(Clone, Deserialize, Serialize)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct CustomerDto {
    /// Identifier of the customer.  Absent from inbound payloads (and ignored if present, as the
    /// server manages identifiers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<i64>,

    /// Name of the customer.  Required, but kept optional so that its absence is reported by
    /// the validators rather than by the codec.
    pub(crate) name: Option<String>,

    /// Email address of the customer.  Required, see `name`.
    pub(crate) email: Option<String>,

    /// Postal address of the customer.  Optional, and always rendered in outbound payloads so
    /// that clients see an explicit null.
    #[serde(default)]
    pub(crate) address: Option<String>,

    /// Links block, only present in outbound payloads.
    #[serde(default, rename = "_links", skip_serializing_if = "Option::is_none")]
    pub(crate) links: Option<SelfLinks>,
}

impl CustomerDto {
    /// Converts the model entity `customer` to its wire representation, attaching the self-link.
    pub(crate) fn from_customer(customer: &Customer) -> Self {
        Self {
            id: Some(customer.id().as_i64()),
            name: Some(customer.name().as_str().to_owned()),
            email: Some(customer.email().as_str().to_owned()),
            address: customer.address().clone(),
            links: Some(self_links(CUSTOMERS_PATH, customer.id().as_i64())),
        }
    }

    /// Validates all fields of the inbound payload and converts them to the model
    /// representation.  Reports every violated field in a single error.
    pub(crate) fn into_new_customer(self) -> RestResult<NewCustomer> {
        let name = require("Name", self.name).and_then(CustomerName::new);
        let email = require("Email", self.email).and_then(EmailAddress::new);

        let mut messages = vec![];
        collect_violation("name", &name, &mut messages);
        collect_violation("email", &email, &mut messages);
        if !messages.is_empty() {
            return Err(RestError::InvalidRequest(messages.join("; ")));
        }

        Ok(NewCustomer::new(name?, email?, self.address))
    }
}

/// Document element that wraps book collections in XML responses.
#[derive(Constructor, Serialize)]
#[cfg_attr(test, derive(Debug))]
pub(crate) struct BooksDocument {
    /// The books in the collection, one `book` element each.
    #[serde(rename = "book")]
    books: Vec<BookDto>,
}

/// Document element that wraps customer collections in XML responses.
#[derive(Constructor, Serialize)]
#[cfg_attr(test, derive(Debug))]
pub(crate) struct CustomersDocument {
    /// The customers in the collection, one `customer` element each.
    #[serde(rename = "customer")]
    customers: Vec<CustomerDto>,
}
