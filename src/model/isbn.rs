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

//! The `Isbn` data type.

use crate::model::{ModelError, ModelResult};

/// Minimum length of an ISBN (the ISBN-10 form without separators).
pub(crate) const MIN_ISBN_LENGTH: usize = 10;

/// Maximum length of an ISBN (the ISBN-13 form without separators).
pub(crate) const MAX_ISBN_LENGTH: usize = 13;

/// The ISBN of a book.
///
/// We only constrain the length.  Check digits vary between the ISBN-10 and ISBN-13 forms and
/// the store has no need to verify them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Isbn(String);

impl Isbn {
    /// Creates a new ISBN from an untrusted string `s`, making sure it is valid.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();

        if s.is_empty() {
            return Err(ModelError("ISBN cannot be empty".to_owned()));
        }
        if s.len() < MIN_ISBN_LENGTH || s.len() > MAX_ISBN_LENGTH {
            return Err(ModelError(format!(
                "ISBN must have between {} and {} characters",
                MIN_ISBN_LENGTH, MAX_ISBN_LENGTH
            )));
        }

        Ok(Self(s))
    }

    /// Returns a string view of the ISBN.
    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }
}
