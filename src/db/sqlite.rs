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

//! Implementation of the database abstraction using an in-memory SQLite database, which only
//! exists to support unit tests.

use crate::db::{BareTx, Db, DbError, DbResult, Tx};
use crate::model::*;
use derivative::Derivative;
use futures::lock::Mutex;
use futures::TryStreamExt;
use sqlx::sqlite::SqlitePool;
use sqlx::{Row, Sqlite, Transaction};
use std::marker::PhantomData;

/// Schema to use to initialize the test database.
const SCHEMA: &str = include_str!("sqlite.sql");

/// Takes a raw SQLx error `e` and converts it to our generic error type.
pub(crate) fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        e if e.to_string().contains("FOREIGN KEY constraint failed") => DbError::NotFound,
        e if e.to_string().contains("UNIQUE constraint failed") => DbError::AlreadyExists,
        e => DbError::BackendError(e.to_string()),
    }
}

/// A database instance backed by an in-memory SQLite database.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub(crate) struct SqliteDb<T>
where
    T: BareTx + From<Mutex<Transaction<'static, Sqlite>>> + Send + Sync + 'static,
{
    /// Shared SQLite connection pool.  This is a cloneable type that all concurrent
    /// transactions can use it concurrently.
    pool: SqlitePool,

    /// Marker for the unused type `T`.
    _phantom_tx: PhantomData<T>,
}

impl<T> SqliteDb<T>
where
    T: BareTx + From<Mutex<Transaction<'static, Sqlite>>> + Send + Sync + 'static,
{
    /// Creates a new connection to an empty in-memory database.
    async fn connect_internal() -> DbResult<Self> {
        let pool = SqlitePool::connect(":memory:").await.map_err(map_sqlx_error)?;
        Ok(Self { pool, _phantom_tx: PhantomData })
    }
}

#[async_trait::async_trait]
impl<T> Db for SqliteDb<T>
where
    T: BareTx + From<Mutex<Transaction<'static, Sqlite>>> + Send + Sync + 'static,
{
    type SqlxTx = Mutex<Transaction<'static, Sqlite>>;
    type Tx = T;

    async fn begin(&self) -> DbResult<Self::Tx> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Self::Tx::from(Mutex::from(tx)))
    }
}

/// Helper function to initialize the database with a schema.  Use in implementations of
/// `BareTx::migrate`.
async fn run_schema(tx: &mut Mutex<Transaction<'static, Sqlite>>, schema: &str) -> DbResult<()> {
    // Strip out comments from the schema so that we can safely separate the statements by
    // looking for semicolons.
    let schema = regex::RegexBuilder::new("--.*$")
        .multi_line(true)
        .build()
        .expect("Hardcoded regex must be valid")
        .replace_all(schema, "");

    let mut tx = tx.lock().await;
    for query_str in schema.split(';') {
        if query_str.trim().is_empty() {
            continue;
        }
        sqlx::query(query_str).execute(&mut **tx).await.map_err(map_sqlx_error)?;
    }
    Ok(())
}

/// Converts a `books` table `row` into a `Book`, validating the persisted data.
fn book_from_row(row: &sqlx::sqlite::SqliteRow) -> DbResult<Book> {
    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
    let title: String = row.try_get("title").map_err(map_sqlx_error)?;
    let author: String = row.try_get("author").map_err(map_sqlx_error)?;
    let price: f64 = row.try_get("price").map_err(map_sqlx_error)?;
    let isbn: String = row.try_get("isbn").map_err(map_sqlx_error)?;
    Ok(Book::new(
        BookId::new(id),
        Title::new(title)?,
        Author::new(author)?,
        Price::new(price)?,
        Isbn::new(isbn)?,
    ))
}

/// Converts a `customers` table `row` into a `Customer`, validating the persisted data.
fn customer_from_row(row: &sqlx::sqlite::SqliteRow) -> DbResult<Customer> {
    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
    let name: String = row.try_get("name").map_err(map_sqlx_error)?;
    let email: String = row.try_get("email").map_err(map_sqlx_error)?;
    let address: Option<String> = row.try_get("address").map_err(map_sqlx_error)?;
    Ok(Customer::new(
        CustomerId::new(id),
        CustomerName::new(name)?,
        EmailAddress::new(email)?,
        address,
    ))
}

/// A transaction backed by a SQLite database.
pub(crate) struct SqliteTx {
    /// Inner transaction type to obtain access to the raw sqlx transaction.
    tx: Mutex<Transaction<'static, Sqlite>>,
}

impl From<Mutex<Transaction<'static, Sqlite>>> for SqliteTx {
    fn from(tx: Mutex<Transaction<'static, Sqlite>>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl BareTx for SqliteTx {
    async fn commit(mut self) -> DbResult<()> {
        let tx = self.tx.into_inner();
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn migrate(&mut self) -> DbResult<()> {
        run_schema(&mut self.tx, SCHEMA).await
    }
}

#[async_trait::async_trait]
impl Tx for SqliteTx {
    async fn get_books(&mut self) -> DbResult<Vec<Book>> {
        let mut tx = self.tx.lock().await;

        let query_str = "SELECT id, title, author, price, isbn FROM books ORDER BY id";
        let mut rows = sqlx::query(query_str).fetch(&mut **tx);

        let mut books = vec![];
        while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
            books.push(book_from_row(&row)?);
        }
        Ok(books)
    }

    async fn get_book(&mut self, id: BookId) -> DbResult<Book> {
        let mut tx = self.tx.lock().await;

        let query_str = "SELECT id, title, author, price, isbn FROM books WHERE id = ?";
        let row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        book_from_row(&row)
    }

    async fn has_book(&mut self, id: BookId) -> DbResult<bool> {
        let mut tx = self.tx.lock().await;

        let query_str = "SELECT id FROM books WHERE id = ?";
        let maybe_row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(maybe_row.is_some())
    }

    async fn create_book(&mut self, book: &NewBook) -> DbResult<Book> {
        let mut tx = self.tx.lock().await;

        let query_str = "INSERT INTO books (title, author, price, isbn) VALUES (?, ?, ?, ?)";
        let done = sqlx::query(query_str)
            .bind(book.title().as_str())
            .bind(book.author().as_str())
            .bind(book.price().as_f64())
            .bind(book.isbn().as_str())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Insertion affected more than one row".to_owned()));
        }
        Ok(book.clone().into_book(BookId::new(done.last_insert_rowid())))
    }

    async fn update_book(&mut self, book: &Book) -> DbResult<()> {
        let mut tx = self.tx.lock().await;

        let query_str = "UPDATE books SET title = ?, author = ?, price = ?, isbn = ? WHERE id = ?";
        let done = sqlx::query(query_str)
            .bind(book.title().as_str())
            .bind(book.author().as_str())
            .bind(book.price().as_f64())
            .bind(book.isbn().as_str())
            .bind(book.id().as_i64())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(DbError::NotFound);
        } else if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Update affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn delete_book(&mut self, id: BookId) -> DbResult<()> {
        let mut tx = self.tx.lock().await;

        let query_str = "DELETE FROM books WHERE id = ?";
        let done = sqlx::query(query_str)
            .bind(id.as_i64())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(DbError::NotFound);
        } else if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Deletion affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn count_books(&mut self) -> DbResult<i64> {
        let mut tx = self.tx.lock().await;

        let query_str = "SELECT COUNT(*) AS count FROM books";
        let row =
            sqlx::query(query_str).fetch_one(&mut **tx).await.map_err(map_sqlx_error)?;
        row.try_get("count").map_err(map_sqlx_error)
    }

    async fn get_customers(&mut self) -> DbResult<Vec<Customer>> {
        let mut tx = self.tx.lock().await;

        let query_str = "SELECT id, name, email, address FROM customers ORDER BY id";
        let mut rows = sqlx::query(query_str).fetch(&mut **tx);

        let mut customers = vec![];
        while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
            customers.push(customer_from_row(&row)?);
        }
        Ok(customers)
    }

    async fn get_customer(&mut self, id: CustomerId) -> DbResult<Customer> {
        let mut tx = self.tx.lock().await;

        let query_str = "SELECT id, name, email, address FROM customers WHERE id = ?";
        let row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        customer_from_row(&row)
    }

    async fn has_customer(&mut self, id: CustomerId) -> DbResult<bool> {
        let mut tx = self.tx.lock().await;

        let query_str = "SELECT id FROM customers WHERE id = ?";
        let maybe_row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(maybe_row.is_some())
    }

    async fn create_customer(&mut self, customer: &NewCustomer) -> DbResult<Customer> {
        let mut tx = self.tx.lock().await;

        let query_str = "INSERT INTO customers (name, email, address) VALUES (?, ?, ?)";
        let done = sqlx::query(query_str)
            .bind(customer.name().as_str())
            .bind(customer.email().as_str())
            .bind(customer.address().as_deref())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Insertion affected more than one row".to_owned()));
        }
        Ok(customer.clone().into_customer(CustomerId::new(done.last_insert_rowid())))
    }

    async fn update_customer(&mut self, customer: &Customer) -> DbResult<()> {
        let mut tx = self.tx.lock().await;

        let query_str = "UPDATE customers SET name = ?, email = ?, address = ? WHERE id = ?";
        let done = sqlx::query(query_str)
            .bind(customer.name().as_str())
            .bind(customer.email().as_str())
            .bind(customer.address().as_deref())
            .bind(customer.id().as_i64())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(DbError::NotFound);
        } else if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Update affected more than one row".to_owned()));
        }
        Ok(())
    }

    async fn delete_customer(&mut self, id: CustomerId) -> DbResult<()> {
        let mut tx = self.tx.lock().await;

        let query_str = "DELETE FROM customers WHERE id = ?";
        let done = sqlx::query(query_str)
            .bind(id.as_i64())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(DbError::NotFound);
        } else if done.rows_affected() != 1 {
            return Err(DbError::BackendError("Deletion affected more than one row".to_owned()));
        }
        Ok(())
    }
}

/// Test utilities for the SQLite backend.
pub(crate) mod testutils {
    use super::*;

    /// Initializes an in-memory test database.
    pub(crate) async fn setup<T>() -> SqliteDb<T>
    where
        T: BareTx + From<Mutex<Transaction<'static, Sqlite>>> + Send + Sync + 'static,
    {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        let db = SqliteDb::connect_internal().await.unwrap();

        let mut tx: T = db.begin().await.unwrap();
        tx.migrate_test().await.unwrap();
        tx.commit().await.unwrap();

        db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::generate_db_tests;

    generate_db_tests!(testutils::setup::<SqliteTx>().await);
}
