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

//! High-level data types and their validation rules.
//!
//! All fields that reach this module come from untrusted wire data, so every constrained value
//! is wrapped in a newtype whose constructor enforces the constraint.  Once a value exists, the
//! rest of the crate can rely on it being well-formed.

use derive_getters::Getters;
use derive_more::Constructor;

mod emailaddress;
pub(crate) use emailaddress::EmailAddress;
mod isbn;
pub(crate) use isbn::Isbn;

/// An invalid value was passed to a type constructor.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
pub(crate) struct ModelError(pub(crate) String);

/// Result type for this module.
pub(crate) type ModelResult<T> = Result<T, ModelError>;

/// Maximum length of the free-form text fields per the schema.
pub(crate) const MAX_TEXT_LENGTH: usize = 100;

/// Validates a free-form text field `s`, naming the field `what` in any error.
///
/// The length limit counts characters, not bytes, so multibyte text gets the same budget as
/// ASCII does.
fn validate_text(what: &str, s: String) -> ModelResult<String> {
    if s.is_empty() {
        return Err(ModelError(format!("{} cannot be empty", what)));
    }
    if s.chars().count() > MAX_TEXT_LENGTH {
        return Err(ModelError(format!("{} is too long", what)));
    }
    Ok(s)
}

/// Identifier of a book, assigned by the database on insertion.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct BookId(i64);

impl BookId {
    /// Creates a new book identifier from a raw integer.
    pub(crate) fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the identifier as an `i64`.
    pub(crate) fn as_i64(&self) -> i64 {
        self.0
    }
}

/// Identifier of a customer, assigned by the database on insertion.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct CustomerId(i64);

impl CustomerId {
    /// Creates a new customer identifier from a raw integer.
    pub(crate) fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the identifier as an `i64`.
    pub(crate) fn as_i64(&self) -> i64 {
        self.0
    }
}

/// Title of a book.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Title(String);

impl Title {
    /// Creates a new title from an untrusted string `s`, making sure it is valid.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        Ok(Self(validate_text("Title", s.into())?))
    }

    /// Returns a string view of the title.
    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Author of a book.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Author(String);

impl Author {
    /// Creates a new author from an untrusted string `s`, making sure it is valid.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        Ok(Self(validate_text("Author", s.into())?))
    }

    /// Returns a string view of the author.
    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Name of a customer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CustomerName(String);

impl CustomerName {
    /// Creates a new customer name from an untrusted string `s`, making sure it is valid.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        Ok(Self(validate_text("Name", s.into())?))
    }

    /// Returns a string view of the name.
    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Price of a book.
///
/// Prices travel over the wire and through the database as floating point numbers, so the only
/// constraints we can enforce are that the number is finite and not negative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Price(f64);

impl Price {
    /// Creates a new price from a raw number `n`, making sure it is valid.
    pub(crate) fn new(n: f64) -> ModelResult<Self> {
        if !n.is_finite() {
            return Err(ModelError("Price must be a finite number".to_owned()));
        }
        if n < 0.0 {
            return Err(ModelError("Price cannot be negative".to_owned()));
        }
        Ok(Self(n))
    }

    /// Returns the price as an `f64`.
    pub(crate) fn as_f64(&self) -> f64 {
        self.0
    }
}

/// A book as stored in the database.
#[derive(Clone, Constructor, Getters)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct Book {
    /// Identifier of the book.
    #[getter(copy)]
    id: BookId,

    /// Title of the book.
    title: Title,

    /// Author of the book.
    author: Author,

    /// Price of the book.
    price: Price,

    /// ISBN of the book.
    isbn: Isbn,
}

/// The fields of a book before the database has assigned it an identifier.  Used for both
/// creations and full-record updates.
#[derive(Clone, Constructor, Getters)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct NewBook {
    /// Title of the book.
    title: Title,

    /// Author of the book.
    author: Author,

    /// Price of the book.
    price: Price,

    /// ISBN of the book.
    isbn: Isbn,
}

impl NewBook {
    /// Attaches the identifier `id` to the fields to form a full book record.
    pub(crate) fn into_book(self, id: BookId) -> Book {
        Book { id, title: self.title, author: self.author, price: self.price, isbn: self.isbn }
    }
}

/// A customer as stored in the database.
#[derive(Clone, Constructor, Getters)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct Customer {
    /// Identifier of the customer.
    #[getter(copy)]
    id: CustomerId,

    /// Name of the customer.
    name: CustomerName,

    /// Email address of the customer.
    email: EmailAddress,

    /// Postal address of the customer, if known.  Free-form and unconstrained.
    address: Option<String>,
}

/// The fields of a customer before the database has assigned it an identifier.
#[derive(Clone, Constructor, Getters)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct NewCustomer {
    /// Name of the customer.
    name: CustomerName,

    /// Email address of the customer.
    email: EmailAddress,

    /// Postal address of the customer, if known.
    address: Option<String>,
}

impl NewCustomer {
    /// Attaches the identifier `id` to the fields to form a full customer record.
    pub(crate) fn into_customer(self, id: CustomerId) -> Customer {
        Customer { id, name: self.name, email: self.email, address: self.address }
    }
}
