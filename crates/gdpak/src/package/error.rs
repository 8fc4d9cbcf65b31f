// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Package error types

use super::format::FormatError;
use super::store::StoreError;
use crate::object::ObjectError;
use crate::stream::StreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("package '{package}' not found at {location}")]
    FileNotFound { package: String, location: String },

    #[error("package '{package}' uses unregistered class '{class}'")]
    ClassNotFound { package: String, class: String },

    #[error("package '{package}' needs '{object}' from package '{owner}', which does not exist")]
    MissingExternalObject {
        package: String,
        object: String,
        owner: String,
    },

    #[error("package '{package}' is malformed: {source}")]
    MalformedPackage {
        package: String,
        #[source]
        source: FormatError,
    },

    #[error("cyclic package dependency: {}", chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },

    #[error("package '{package}': {source}")]
    UnresolvableReference {
        package: String,
        #[source]
        source: StreamError,
    },

    #[error("package '{package}': '{object}' is a {found} in memory but a {expected} on disk")]
    ClassMismatch {
        package: String,
        object: String,
        expected: String,
        found: String,
    },

    #[error("package '{package}': parent name '{parent}' is shared by several objects")]
    AmbiguousParent { package: String, parent: String },

    #[error("package '{package}': '{object}' wrote {written} bytes, dry run measured {measured}")]
    SizeMismatch {
        package: String,
        object: String,
        measured: u64,
        written: u64,
    },

    #[error("no package named '{0}'")]
    PackageNotFound(String),

    #[error("'{0}' is not a package")]
    NotAPackage(String),

    #[error("package file '{file}' declares name '{declared}', already used by another package")]
    NameConflict { file: String, declared: String },

    #[error("package '{package}': stream error: {source}")]
    Stream {
        package: String,
        #[source]
        source: StreamError,
    },

    #[error("store error: {0}")]
    Store(StoreError),

    #[error(transparent)]
    Object(#[from] ObjectError),
}

impl PackageError {
    pub(crate) fn malformed(package: &str, source: impl Into<FormatError>) -> Self {
        Self::MalformedPackage {
            package: package.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn from_store(package: &str, error: StoreError) -> Self {
        match error {
            StoreError::NotFound { location } => Self::FileNotFound {
                package: package.to_string(),
                location,
            },
            other => Self::Store(other),
        }
    }

    /// Classify a stream failure raised while saving.
    pub(crate) fn from_save_stream(package: &str, error: StreamError) -> Self {
        match error {
            StreamError::StaleReference(id) => Self::Object(ObjectError::StaleObject(id)),
            StreamError::UnresolvableReference { .. } => Self::UnresolvableReference {
                package: package.to_string(),
                source: error,
            },
            other => Self::Stream {
                package: package.to_string(),
                source: other,
            },
        }
    }

    /// Stream failures while loading mean the payload does not match its tables.
    pub(crate) fn from_load_stream(package: &str, error: StreamError) -> Self {
        Self::malformed(package, FormatError::Payload(error))
    }
}
