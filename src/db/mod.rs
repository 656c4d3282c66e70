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

//! Database abstraction in terms of the operations needed by the server.
//!
//! There are two database implementations: the PostgreSQL backend is for production use and the
//! SQLite backend exists to support unit tests, so it is only compiled in test builds.  Both are
//! exercised by the same backend-parameterized test suite in `tests`.

use crate::model::{Book, BookId, Customer, CustomerId, ModelError, NewBook, NewCustomer};
use async_trait::async_trait;

pub(crate) mod postgres;
#[cfg(test)]
pub(crate) mod sqlite;

/// Database errors.  Any unexpected errors that come from the database are classified as
/// `BackendError`, but errors we know about have more specific types.
#[derive(Debug, thiserror::Error, PartialEq)]
pub(crate) enum DbError {
    /// Indicates that a request to create an entry failed because it already exists.
    #[error("Already exists")]
    AlreadyExists,

    /// Catch-all error type for unexpected database errors.
    #[error("Database error: {0}")]
    BackendError(String),

    /// Indicates a failure processing the data that already exists in the database.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// Indicates that a requested entry does not exist.
    #[error("Entity not found")]
    NotFound,

    /// Indicates that the database is not available (maybe because of too many active concurrent
    /// connections).
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub(crate) type DbResult<T> = Result<T, DbError>;

/// A transaction without any service-specific operations.
#[async_trait]
pub(crate) trait BareTx {
    /// Commits the transaction.  The transaction is rolled back on drop unless this is called.
    async fn commit(self) -> DbResult<()>;

    /// Initializes the database schema managed by this transaction type.
    async fn migrate(&mut self) -> DbResult<()> {
        Ok(())
    }

    /// Initializes the database schema for testing purposes.
    async fn migrate_test(&mut self) -> DbResult<()> {
        self.migrate().await
    }
}

/// Abstraction over the database connection.
#[async_trait]
pub(crate) trait Db {
    /// Type of the wrapped sqlx transaction.
    type SqlxTx: Send + Sync + 'static;

    /// Type of the transactions created by this database.
    type Tx: BareTx + From<Self::SqlxTx> + Send + Sync + 'static;

    /// Begins a transaction.
    ///
    /// It is the responsibility of the caller to call `commit` on the returned transaction.
    async fn begin(&self) -> DbResult<Self::Tx>;
}

/// A transaction with high-level operations that deal with our types.
#[async_trait]
pub(crate) trait Tx: BareTx {
    /// Gets all existing books in ascending identifier order.
    async fn get_books(&mut self) -> DbResult<Vec<Book>>;

    /// Gets the book with identifier `id`, failing with `DbError::NotFound` if it does not exist.
    async fn get_book(&mut self, id: BookId) -> DbResult<Book>;

    /// Checks whether a book with identifier `id` exists.
    async fn has_book(&mut self, id: BookId) -> DbResult<bool>;

    /// Inserts a new book with the fields in `book` and returns the book with its
    /// database-assigned identifier.
    async fn create_book(&mut self, book: &NewBook) -> DbResult<Book>;

    /// Overwrites all fields of the book with `book.id()` with the values in `book`, failing with
    /// `DbError::NotFound` if it does not exist.
    async fn update_book(&mut self, book: &Book) -> DbResult<()>;

    /// Deletes the book with identifier `id`, failing with `DbError::NotFound` if it does not
    /// exist.
    async fn delete_book(&mut self, id: BookId) -> DbResult<()>;

    /// Counts the books currently in the database.
    async fn count_books(&mut self) -> DbResult<i64>;

    /// Gets all existing customers in ascending identifier order.
    async fn get_customers(&mut self) -> DbResult<Vec<Customer>>;

    /// Gets the customer with identifier `id`, failing with `DbError::NotFound` if it does not
    /// exist.
    async fn get_customer(&mut self, id: CustomerId) -> DbResult<Customer>;

    /// Checks whether a customer with identifier `id` exists.
    async fn has_customer(&mut self, id: CustomerId) -> DbResult<bool>;

    /// Inserts a new customer with the fields in `customer` and returns the customer with its
    /// database-assigned identifier.
    async fn create_customer(&mut self, customer: &NewCustomer) -> DbResult<Customer>;

    /// Overwrites all fields of the customer with `customer.id()` with the values in `customer`,
    /// failing with `DbError::NotFound` if it does not exist.
    async fn update_customer(&mut self, customer: &Customer) -> DbResult<()>;

    /// Deletes the customer with identifier `id`, failing with `DbError::NotFound` if it does
    /// not exist.
    async fn delete_customer(&mut self, id: CustomerId) -> DbResult<()>;
}
