//! Pipeline module - orchestrates the screen/assemble/train/evaluate steps

pub mod average;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod insights;
pub mod loader;
pub mod model;
pub mod schema;
pub mod significance;

pub use average::*;
pub use error::PipelineError;
pub use evaluation::*;
pub use features::*;
pub use insights::*;
pub use loader::*;
pub use model::*;
pub use schema::{
    candidate_predictors, grade_prefix, GradeBoundary, Track, AGE_COLUMN, GENDER_COLUMN,
    GRADE_LEVELS, SIGNIFICANCE_ALPHA, SPLIT_SEED, SUBJECTS, TARGET_COLUMN, TEST_FRACTION,
};
pub use significance::*;
