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

//! Prometheus metrics maintained by the service.

use prometheus::{IntGauge, Registry, TextEncoder};

/// Container for the metrics registry and the individual metrics in it.
pub(crate) struct Metrics {
    /// Registry that aggregates all metrics for exposition.
    registry: Registry,

    /// Number of books currently in the store.
    books_count: IntGauge,
}

impl Metrics {
    /// Creates the metrics registry and registers all metrics in it.
    pub(crate) fn new() -> Result<Metrics, prometheus::Error> {
        let registry = Registry::new();

        let books_count =
            IntGauge::new("bookstore_books_count", "Number of books currently in the store")?;
        registry.register(Box::new(books_count.clone()))?;

        Ok(Metrics { registry, books_count })
    }

    /// Updates the books gauge to `count`.
    pub(crate) fn set_books_count(&self, count: i64) {
        self.books_count.set(count);
    }

    /// Renders all metrics in the Prometheus text exposition format.
    pub(crate) fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }

    /// Returns the current value of the books gauge.
    #[cfg(test)]
    pub(crate) fn books_count(&self) -> i64 {
        self.books_count.get()
    }
}
