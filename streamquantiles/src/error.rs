// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Error types for quantile sketch operations

use std::fmt;

use tracing::error;

/// ErrorKind is all kinds of Error of streamquantiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A construction or query argument is out of its valid range.
    InvalidParameter,
    /// A query was issued before the sketch was finalized.
    NotFinalized,
    /// A query was issued on a sketch that ingested no effective item.
    EmptyStream,
    /// The sketch detected an internal consistency failure and refuses to answer.
    CapacityInvariantViolation,
}

impl ErrorKind {
    /// Convert this error kind instance into static str.
    pub const fn into_static(self) -> &'static str {
        match self {
            ErrorKind::InvalidParameter => "InvalidParameter",
            ErrorKind::NotFinalized => "NotFinalized",
            ErrorKind::EmptyStream => "EmptyStream",
            ErrorKind::CapacityInvariantViolation => "CapacityInvariantViolation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Error is the error struct returned by all streamquantiles functions.
#[derive(Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<(&'static str, String)>,
}

impl Error {
    /// Create a new Error with error kind and message.
    ///
    /// # Examples
    ///
    /// ```
    /// use streamquantiles::error::{Error, ErrorKind};
    ///
    /// let error = Error::new(ErrorKind::InvalidParameter, "epsilon must be in (0, 1)")
    ///     .with_context("epsilon", 1.5);
    /// assert_eq!(error.kind(), ErrorKind::InvalidParameter);
    /// assert!(error.to_string().contains("epsilon: 1.5"));
    /// ```
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::default(),
        }
    }

    /// Add more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Return error's kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return error's message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

// Constructors used across the sketches.
impl Error {
    pub(crate) fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter, message)
    }

    pub(crate) fn not_finalized() -> Self {
        Self::new(
            ErrorKind::NotFinalized,
            "finalize() must be called before querying the sketch",
        )
    }

    pub(crate) fn empty_stream() -> Self {
        Self::new(ErrorKind::EmptyStream, "the sketch has not ingested any item")
    }

    pub(crate) fn invariant_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapacityInvariantViolation, message)
    }

    /// Logs an internal consistency failure of a sketch.
    ///
    /// # Panics
    ///
    /// Panics in debug builds. Release builds keep the error so the sketch
    /// can refuse every later query.
    pub(crate) fn report_violation(self, sketch: &'static str) -> Self {
        error!(sketch, error = %self, "quantile sketch is inconsistent");
        if cfg!(debug_assertions) {
            panic!("{sketch} sketch is inconsistent: {self}");
        }
        self
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // If alternate has been specified, we will print like Debug.
        if f.alternate() {
            let mut de = f.debug_struct("Error");
            de.field("kind", &self.kind);
            de.field("message", &self.message);
            de.field("context", &self.context);
            return de.finish();
        }

        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        writeln!(f)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "Context:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "   {k}: {v}")?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.context.is_empty() {
            write!(f, ", context: {{ ")?;
            write!(
                f,
                "{}",
                self.context
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
