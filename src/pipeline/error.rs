//! Error types for the track-prediction pipeline.
//!
//! Every failure is local to one grade boundary's run: the caller reports it
//! and keeps going with the remaining boundaries. Only `DataLoad` (the source
//! table itself) aborts a whole invocation.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

use super::schema::GradeBoundary;

/// Errors that can occur while screening features, training, or evaluating.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source student table could not be read or is structurally invalid.
    #[error("failed to load student table from '{path}': {reason}")]
    DataLoad { path: PathBuf, reason: String },

    /// Feature screening produced no usable predictors for a grade boundary.
    ///
    /// Raised instead of returning an empty score table, so nothing
    /// downstream can silently train on zero features.
    #[error("no usable predictors for grade boundary {boundary}")]
    NoFeatures { boundary: GradeBoundary },

    /// After dropping rows with incomplete grade history, a partition is too
    /// small or effectively single-class.
    #[error(
        "insufficient data for grade boundary {boundary}: {reason}; \
         provide more rows with complete grade history for this horizon"
    )]
    InsufficientData {
        boundary: GradeBoundary,
        reason: String,
    },

    /// A track label outside the expected Academic/TVL pair.
    ///
    /// The positive/negative metric convention assumes exactly those two
    /// labels, so this is fatal for the metric computation path.
    #[error("unexpected track label '{label}'; expected 'Academic' or 'TVL'")]
    LabelMismatch { label: String },

    /// An underlying dataframe operation failed.
    #[error(transparent)]
    Polars(#[from] PolarsError),
}
