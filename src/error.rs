// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the starlet facade.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for starlet operations.
pub type Result<T> = std::result::Result<T, StarletError>;

/// Main error type for starlet.
#[derive(Error, Debug)]
pub enum StarletError {
    /// Compilation, decoding or evaluation failed
    #[error(transparent)]
    Engine(#[from] starlet_engine::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error("invalid configuration {path}: {source}")]
    Config {
        /// The configuration file, or `<string>` for inline text
        path: PathBuf,
        /// The parse failure
        #[source]
        source: toml::de::Error,
    },
}

impl From<starlet_engine::StaticErrors> for StarletError {
    fn from(err: starlet_engine::StaticErrors) -> Self {
        StarletError::Engine(err.into())
    }
}

impl From<starlet_engine::EvalError> for StarletError {
    fn from(err: starlet_engine::EvalError) -> Self {
        StarletError::Engine(err.into())
    }
}
