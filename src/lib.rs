//! # tdc-bench: Leakage-Aware Splits and Sealed Benchmark Evaluation
//!
//! **Version**: 0.1.0
//!
//! tdc-bench partitions therapeutic datasets into train/valid/test without
//! entity leakage and scores submissions against sealed test labels over a
//! fixed list of seeds.
//!
//! ## Design Principles
//!
//! - **No leakage**: group-aware splits never put one scaffold (or cold-column
//!   value) in two partitions
//! - **Determinism**: a split is a pure function of (dataset, policy, seed)
//! - **Sealed labels**: test labels are only read to produce a metric value
//! - **No silent drops**: excluded and discarded records are reported
//!
//! ## Example Usage
//!
//! ```rust
//! use tdc_bench::dataset::{Dataset, Label, Record};
//! use tdc_bench::keyer::ColumnKeyer;
//! use tdc_bench::split::{SplitEngine, SplitPolicy};
//!
//! let records = (0..30)
//!     .map(|i| {
//!         Record::builder(format!("m{i}"), Label::Scalar(0.0))
//!             .field("Scaffold", format!("s{}", i % 6))
//!             .build()
//!     })
//!     .collect();
//! let dataset = Dataset::new("toy", records)?;
//!
//! let keyer = ColumnKeyer::new("Scaffold");
//! let policy = SplitPolicy::scaffold([0.7, 0.1, 0.2], 42)?;
//! let outcome = SplitEngine::with_keyer(&keyer).split(&dataset, &policy)?;
//! assert_eq!(outcome.partition().len(), 30);
//! # Ok::<(), tdc_bench::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod benchmark;
pub mod dataset;
pub mod error;
pub mod keyer;
pub mod leaderboard;
pub mod metric;
pub mod oracle;
pub mod split;

pub use error::{Error, Result};
