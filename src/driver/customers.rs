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

//! Operations on customers.

use crate::db::{BareTx, Db, DbError, Tx};
use crate::driver::{Driver, DriverError, DriverResult};
use crate::model::{Customer, CustomerId, NewCustomer};

/// Rewrites a database error `e` that affected the customer `id` to name the customer in the
/// message.
fn customer_error(id: CustomerId, e: DbError) -> DriverError {
    match e {
        DbError::NotFound => {
            DriverError::NotFound(format!("Customer not found with ID: {}", id.as_i64()))
        }
        e => e.into(),
    }
}

impl<D> Driver<D>
where
    D: Db + Clone + Send + Sync + 'static,
    D::Tx: Tx + Send + Sync + 'static,
{
    /// Gets all existing customers in ascending identifier order.
    pub(crate) async fn get_customers(self) -> DriverResult<Vec<Customer>> {
        let mut tx = self.db.begin().await?;
        let customers = tx.get_customers().await?;
        tx.commit().await?;
        Ok(customers)
    }

    /// Gets the customer with identifier `id`.
    pub(crate) async fn get_customer(self, id: CustomerId) -> DriverResult<Customer> {
        let mut tx = self.db.begin().await?;
        let customer = tx.get_customer(id).await.map_err(|e| customer_error(id, e))?;
        tx.commit().await?;
        Ok(customer)
    }

    /// Creates a new customer with the given `fields` and returns it with its assigned
    /// identifier.
    pub(crate) async fn create_customer(self, fields: NewCustomer) -> DriverResult<Customer> {
        let mut tx = self.db.begin().await?;
        let customer = tx.create_customer(&fields).await?;
        tx.commit().await?;
        Ok(customer)
    }

    /// Overwrites all fields of the customer `id` with `fields`.  The identifier of the stored
    /// customer never changes, even if the caller supplied a different one in the request
    /// payload.
    pub(crate) async fn update_customer(
        self,
        id: CustomerId,
        fields: NewCustomer,
    ) -> DriverResult<Customer> {
        let customer = fields.into_customer(id);
        let mut tx = self.db.begin().await?;
        tx.update_customer(&customer).await.map_err(|e| customer_error(id, e))?;
        tx.commit().await?;
        Ok(customer)
    }

    /// Deletes the customer with identifier `id`.
    pub(crate) async fn delete_customer(self, id: CustomerId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        tx.delete_customer(id).await.map_err(|e| customer_error(id, e))?;
        tx.commit().await?;
        Ok(())
    }
}
