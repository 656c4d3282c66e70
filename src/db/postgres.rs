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

//! Implementation of the database abstraction using PostgreSQL.

use crate::db::{BareTx, Db, DbError, DbResult, Tx};
use crate::env::get_required_var;
use crate::model::*;
use derivative::Derivative;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgDatabaseError, PgPoolOptions};
use sqlx::{Postgres, Row, Transaction};
use std::marker::PhantomData;

/// Schema to use to initialize the production database.
const SCHEMA: &str = include_str!("postgres.sql");

/// Takes a raw SQLx error `e` and converts it to our generic error type.
pub(crate) fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::Database(e) => match e.downcast_ref::<PgDatabaseError>().code() {
            "23503" /* foreign_key_violation */ => DbError::NotFound,
            "23505" /* unique_violation */ => DbError::AlreadyExists,
            "53300" /* too_many_connections */ => DbError::Unavailable,
            number => DbError::BackendError(format!("pgsql error {}: {}", number, e)),
        },
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Options to establish a connection to a PostgreSQL database.
#[derive(Derivative)]
#[derivative(Debug, Default)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct PostgresOptions {
    /// Host to connect to.
    pub host: String,

    /// Port to connect to (typically 5432).
    pub port: u16,

    /// Database name to connect to.
    pub database: String,

    /// Username to establish the connection with.
    pub username: String,

    /// Password to establish the connection with.
    #[derivative(Debug = "ignore")]
    pub password: String,
}

impl PostgresOptions {
    /// Initializes a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_HOST`, `<prefix>_PORT`, `<prefix>_DATABASE`,
    /// `<prefix>_USERNAME` and `<prefix>_PASSWORD`.
    pub fn from_env(prefix: &str) -> Result<PostgresOptions, String> {
        Ok(PostgresOptions {
            host: get_required_var::<String>(prefix, "HOST")?,
            port: get_required_var::<u16>(prefix, "PORT")?,
            database: get_required_var::<String>(prefix, "DATABASE")?,
            username: get_required_var::<String>(prefix, "USERNAME")?,
            password: get_required_var::<String>(prefix, "PASSWORD")?,
        })
    }
}

/// A database instance backed by a PostgreSQL database.
#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub(crate) struct PostgresDb<T>
where
    T: BareTx + From<Transaction<'static, Postgres>> + Send + Sync + 'static,
{
    /// Shared PostgreSQL connection pool.  This is a cloneable type that all concurrent
    /// transactions can use it concurrently.
    pool: sqlx::postgres::PgPool,

    /// Marker for the unused type `T`.
    _phantom_tx: PhantomData<T>,
}

impl<T> PostgresDb<T>
where
    T: BareTx + From<Transaction<'static, Postgres>> + Send + Sync + 'static,
{
    /// Creates a new connection with a set of pool options.
    ///
    /// Note that this does *not* establish the connection.
    fn connect_lazy_with_pool_options(opts: PostgresOptions, pool_options: PgPoolOptions) -> Self {
        let options = PgConnectOptions::new()
            .host(&opts.host)
            .port(opts.port)
            .database(&opts.database)
            .username(&opts.username)
            .password(&opts.password);

        let pool = pool_options.connect_lazy_with(options);

        Self { pool, _phantom_tx: PhantomData }
    }

    /// Creates a new connection based on a dynamic pool and runs the schema migration.
    pub(crate) async fn connect(opts: PostgresOptions) -> DbResult<Self> {
        let db = Self::connect_lazy_with_pool_options(opts, PgPoolOptions::new());

        let mut tx: T = db.begin().await?;
        tx.migrate().await?;
        tx.commit().await?;

        Ok(db)
    }
}

#[async_trait::async_trait]
impl<T> Db for PostgresDb<T>
where
    T: BareTx + From<Transaction<'static, Postgres>> + Send + Sync + 'static,
{
    type SqlxTx = Transaction<'static, Postgres>;
    type Tx = T;

    async fn begin(&self) -> DbResult<Self::Tx> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Self::Tx::from(tx))
    }
}

/// Helper function to initialize the database with a schema.  Use in implementations of
/// `BareTx::migrate`.
async fn run_schema(tx: &mut Transaction<'static, Postgres>, schema: &str) -> DbResult<()> {
    // Strip out comments from the schema so that we can safely separate the statements by
    // looking for semicolons.
    let schema = regex::RegexBuilder::new("--.*$")
        .multi_line(true)
        .build()
        .expect("Hardcoded regex must be valid")
        .replace_all(schema, "");

    for query_str in schema.split(';') {
        if query_str.trim().is_empty() {
            continue;
        }
        sqlx::query(query_str).execute(&mut **tx).await.map_err(map_sqlx_error)?;
    }
    Ok(())
}

/// Converts a `books` table `row` into a `Book`, validating the persisted data.
fn book_from_row(row: &sqlx::postgres::PgRow) -> DbResult<Book> {
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
fn customer_from_row(row: &sqlx::postgres::PgRow) -> DbResult<Customer> {
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

/// A transaction backed by a PostgreSQL database.
pub(crate) struct PostgresTx {
    /// Inner transaction type to obtain access to the raw sqlx transaction.
    tx: Transaction<'static, Postgres>,
}

impl From<Transaction<'static, Postgres>> for PostgresTx {
    fn from(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl BareTx for PostgresTx {
    async fn commit(mut self) -> DbResult<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn migrate(&mut self) -> DbResult<()> {
        run_schema(&mut self.tx, SCHEMA).await
    }
}

#[async_trait::async_trait]
impl Tx for PostgresTx {
    async fn get_books(&mut self) -> DbResult<Vec<Book>> {
        let query_str = "SELECT id, title, author, price, isbn FROM books ORDER BY id";
        let mut rows = sqlx::query(query_str).fetch(&mut *self.tx);

        let mut books = vec![];
        while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
            books.push(book_from_row(&row)?);
        }
        Ok(books)
    }

    async fn get_book(&mut self, id: BookId) -> DbResult<Book> {
        let query_str = "SELECT id, title, author, price, isbn FROM books WHERE id = $1";
        let row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        book_from_row(&row)
    }

    async fn has_book(&mut self, id: BookId) -> DbResult<bool> {
        let query_str = "SELECT id FROM books WHERE id = $1";
        let maybe_row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(maybe_row.is_some())
    }

    async fn create_book(&mut self, book: &NewBook) -> DbResult<Book> {
        let query_str =
            "INSERT INTO books (title, author, price, isbn) VALUES ($1, $2, $3, $4) RETURNING id";
        let row = sqlx::query(query_str)
            .bind(book.title().as_str())
            .bind(book.author().as_str())
            .bind(book.price().as_f64())
            .bind(book.isbn().as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
        Ok(book.clone().into_book(BookId::new(id)))
    }

    async fn update_book(&mut self, book: &Book) -> DbResult<()> {
        let query_str =
            "UPDATE books SET title = $1, author = $2, price = $3, isbn = $4 WHERE id = $5";
        let done = sqlx::query(query_str)
            .bind(book.title().as_str())
            .bind(book.author().as_str())
            .bind(book.price().as_f64())
            .bind(book.isbn().as_str())
            .bind(book.id().as_i64())
            .execute(&mut *self.tx)
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
        let query_str = "DELETE FROM books WHERE id = $1";
        let done = sqlx::query(query_str)
            .bind(id.as_i64())
            .execute(&mut *self.tx)
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
        let query_str = "SELECT COUNT(*) AS count FROM books";
        let row =
            sqlx::query(query_str).fetch_one(&mut *self.tx).await.map_err(map_sqlx_error)?;
        row.try_get("count").map_err(map_sqlx_error)
    }

    async fn get_customers(&mut self) -> DbResult<Vec<Customer>> {
        let query_str = "SELECT id, name, email, address FROM customers ORDER BY id";
        let mut rows = sqlx::query(query_str).fetch(&mut *self.tx);

        let mut customers = vec![];
        while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
            customers.push(customer_from_row(&row)?);
        }
        Ok(customers)
    }

    async fn get_customer(&mut self, id: CustomerId) -> DbResult<Customer> {
        let query_str = "SELECT id, name, email, address FROM customers WHERE id = $1";
        let row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        customer_from_row(&row)
    }

    async fn has_customer(&mut self, id: CustomerId) -> DbResult<bool> {
        let query_str = "SELECT id FROM customers WHERE id = $1";
        let maybe_row = sqlx::query(query_str)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(maybe_row.is_some())
    }

    async fn create_customer(&mut self, customer: &NewCustomer) -> DbResult<Customer> {
        let query_str =
            "INSERT INTO customers (name, email, address) VALUES ($1, $2, $3) RETURNING id";
        let row = sqlx::query(query_str)
            .bind(customer.name().as_str())
            .bind(customer.email().as_str())
            .bind(customer.address().as_deref())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
        Ok(customer.clone().into_customer(CustomerId::new(id)))
    }

    async fn update_customer(&mut self, customer: &Customer) -> DbResult<()> {
        let query_str = "UPDATE customers SET name = $1, email = $2, address = $3 WHERE id = $4";
        let done = sqlx::query(query_str)
            .bind(customer.name().as_str())
            .bind(customer.email().as_str())
            .bind(customer.address().as_deref())
            .bind(customer.id().as_i64())
            .execute(&mut *self.tx)
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
        let query_str = "DELETE FROM customers WHERE id = $1";
        let done = sqlx::query(query_str)
            .bind(id.as_i64())
            .execute(&mut *self.tx)
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
