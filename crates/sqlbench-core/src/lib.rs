//! # sqlbench-core
//!
//! Result classification and inline-edit statement synthesis for a SQL
//! workbench.
//!
//! This crate provides:
//! - A lexical extractor that pulls a candidate table name and the FROM
//!   clause body out of raw SQL text
//! - An editability classifier that decides whether a query result maps
//!   one-to-one onto rows of a single table
//! - A synthesizer for the UPDATE, INSERT and DELETE statements that apply
//!   inline edits
//!
//! Nothing here performs I/O. Executing the synthesized statements is the
//! job of the query service wired in by `sqlbench-client`.
//!
//! ## Classifying a Result
//!
//! ```rust
//! use sqlbench_core::{classify, ResultSet, Scalar, Verdict};
//!
//! let result = ResultSet::new(
//!     vec!["id".into(), "name".into()],
//!     vec![vec![Scalar::Int(1), Scalar::Text("Ada".into())]],
//! )
//! .unwrap();
//!
//! let verdict = classify("SELECT id, name FROM users WHERE id < 10", &result);
//! assert_eq!(
//!     verdict,
//!     Verdict::Editable {
//!         table: "users".into(),
//!         id_column: "id".into(),
//!     }
//! );
//! ```
//!
//! ## Synthesizing Statements
//!
//! Values are inlined as quoted literals. The empty string becomes `NULL`
//! and embedded single quotes are doubled:
//!
//! ```rust
//! use sqlbench_core::synth::synthesize_update;
//!
//! let sql = synthesize_update("users", "id", "5", "name", "O'Brien");
//! assert_eq!(sql, "UPDATE users SET name = 'O''Brien' WHERE id = 5");
//! ```
//!
//! Table and column names are interpolated as-is. They come from the
//! extractor and the result schema, and the query service is trusted to
//! reject anything malformed.

pub mod classify;
pub mod extract;
pub mod result;
pub mod synth;

pub use classify::{classify, is_id_column, ReadOnlyReason, Verdict};
pub use extract::{extract_from_clause_body, extract_table};
pub use result::{ResultSet, Row, Scalar, ShapeError};
pub use synth::{insertable_columns, synthesize_delete, synthesize_insert, synthesize_update};
