//! Seeded synthetic record generation.
//!
//! This crate composes believable, reproducible records from weighted
//! reference tables and pluggable producers. A record is described as a tree
//! of elements: leaves produce values, lists repeat an element a drawn number
//! of times, and maps bind labels to child elements. Later fields may read
//! fields produced earlier in the same record through slash-separated paths.
//!
//! # Overview
//!
//! The crate supports:
//!
//! - Loading weighted tables (relative or cumulative, optionally gzipped)
//! - Sampling labels with a single uniform draw per label
//! - Count policies for list lengths (constant, uniform range, normal)
//! - Composing records with a seeded random source for reproducibility
//! - Building composers from JSON composition plans
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use record_synth::{
//!     CountPolicy, Element, FakerLeaf, GenderLeaf, KeyedTableLeaf, RecordComposer, WeightedTable,
//! };
//!
//! let male = WeightedTable::from_entries([("JAMES", 3.318), ("JOHN", 3.271)], false)
//!     .expect("male table");
//! let female = WeightedTable::from_entries([("MARY", 2.629), ("PATRICIA", 1.073)], false)
//!     .expect("female table");
//!
//! let mut address = Element::map();
//! address
//!     .add_field("city", Element::leaf(FakerLeaf::CityName))
//!     .expect("unique label");
//!
//! let mut composer = RecordComposer::new(42);
//! composer
//!     .add_field("gender", Element::leaf(GenderLeaf::new(0.5).expect("probability")))
//!     .expect("unique label");
//! composer
//!     .add_field(
//!         "first_name",
//!         Element::leaf(
//!             KeyedTableLeaf::new("/gender", [("M", Arc::new(male)), ("F", Arc::new(female))])
//!                 .expect("tables"),
//!         ),
//!     )
//!     .expect("unique label");
//! composer
//!     .add_field(
//!         "addresses",
//!         Element::list(address, CountPolicy::uniform_range(1, 3).expect("range")),
//!     )
//!     .expect("unique label");
//!
//! let records = composer.generate_batch(3).expect("generation succeeds");
//! assert_eq!(records.len(), 3);
//! ```

mod atomic_io;
mod composer;
mod context;
mod count;
mod element;
mod error;
pub mod generate_cli;
mod leaves;
mod plan;
mod table;
mod value;

pub use composer::RecordComposer;
pub use context::{GenerationContext, PATH_SEPARATOR, SynthRng};
pub use count::CountPolicy;
pub use element::{Element, ListElement, MapElement, Producer};
pub use error::{CompositionError, GenerationError, PlanError, SampleError, TableError};
pub use leaves::{
    Constant, FakerLeaf, GenderLeaf, KeyedTableLeaf, OptionalLeaf, SelectorFallback, TableLeaf,
    UuidLeaf,
};
pub use plan::{BuiltPlan, CompositionPlan, CountSpec, ElementSpec, FieldSpec, TableSpec};
pub use table::{Delimiter, TableOptions, WeightedTable};
pub use value::{Record, Value};
