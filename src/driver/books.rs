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

//! Operations on books.

use crate::db::{BareTx, Db, DbError, Tx};
use crate::driver::{Driver, DriverError, DriverResult};
use crate::model::{Book, BookId, NewBook};

/// Rewrites a database error `e` that affected the book `id` to name the book in the message.
fn book_error(id: BookId, e: DbError) -> DriverError {
    match e {
        DbError::NotFound => {
            DriverError::NotFound(format!("Book not found with ID: {}", id.as_i64()))
        }
        e => e.into(),
    }
}

impl<D> Driver<D>
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    /// Gets all existing books in ascending identifier order.
    pub(crate) async fn get_books(self) -> DriverResult<Vec<Book>> {
        let mut tx = self.db.begin().await?;
        let books = tx.get_books().await?;
        tx.commit().await?;
        Ok(books)
    }

    /// Gets the book with identifier `id`.
    pub(crate) async fn get_book(self, id: BookId) -> DriverResult<Book> {
        let mut tx = self.db.begin().await?;
        let book = tx.get_book(id).await.map_err(|e| book_error(id, e))?;
        tx.commit().await?;
        Ok(book)
    }

    /// Creates a new book with the given `fields` and returns it with its assigned identifier.
    pub(crate) async fn create_book(self, fields: NewBook) -> DriverResult<Book> {
        let mut tx = self.db.begin().await?;
        let book = tx.create_book(&fields).await?;
        let count = tx.count_books().await?;
        tx.commit().await?;
        self.metrics.set_books_count(count);
        Ok(book)
    }

    /// Overwrites all fields of the book `id` with `fields`.  The identifier of the stored book
    /// never changes, even if the caller supplied a different one in the request payload.
    pub(crate) async fn update_book(self, id: BookId, fields: NewBook) -> DriverResult<Book> {
        let book = fields.into_book(id);
        let mut tx = self.db.begin().await?;
        tx.update_book(&book).await.map_err(|e| book_error(id, e))?;
        tx.commit().await?;
        Ok(book)
    }

    /// Deletes the book with identifier `id`.
    pub(crate) async fn delete_book(self, id: BookId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        tx.delete_book(id).await.map_err(|e| book_error(id, e))?;
        let count = tx.count_books().await?;
        tx.commit().await?;
        self.metrics.set_books_count(count);
        Ok(())
    }

    /// Synchronizes the metrics gauges with the data currently in the database.  Used at startup,
    /// given that the gauges are process-local and start at zero.
    pub(crate) async fn refresh_metrics(self) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        let count = tx.count_books().await?;
        tx.commit().await?;
        self.metrics.set_books_count(count);
        Ok(())
    }
}
