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

//! REST service that manages the books and customers of a small bookstore.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub(crate) mod db;
use db::postgres::{PostgresDb, PostgresTx};
pub use db::postgres::PostgresOptions;
pub(crate) mod driver;
use driver::Driver;
pub(crate) mod metrics;
use metrics::Metrics;
pub(crate) mod env;
pub(crate) mod model;
mod rest;
use rest::app;

/// Instantiates all resources to serve the application on `addr`.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(addr: SocketAddr, db_opts: PostgresOptions) -> Result<(), Box<dyn Error>> {
    let db = PostgresDb::<PostgresTx>::connect(db_opts).await?;
    let metrics = Arc::from(Metrics::new()?);
    let driver = Driver::new(db, metrics);
    driver.clone().refresh_metrics().await?;
    let app = app(driver);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
