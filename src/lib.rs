//! Neobatch: streaming export of graph entities for neo4j-admin bulk import
//!
//! This crate turns a stream of typed nodes and relationships into the
//! header/part CSV layout consumed by `neo4j-admin import`, plus the shell
//! call that loads them:
//!
//! 1. **Dispatch** -- Pull entities one at a time, skip malformed edges,
//!    drop duplicate identifiers and group the rest by label
//! 2. **Schema** -- Resolve each label's property types once, from the
//!    ontology when declared, otherwise from the first instance seen
//! 3. **Batching** -- Validate every entity against its label's schema and
//!    flush fixed-size batches to new, monotonically numbered part files
//! 4. **Headers** -- Write one header per label whose columns line up with
//!    the part file fields, then compile the `neo4j-admin import` call
//!
//! # Architecture
//!
//! - **Streaming** -- Only the pending batch per label is held in memory
//! - **Explicit column order** -- Properties are kept in name order, so
//!   header and data columns can never drift apart
//! - **Write-once part files** -- Each flush creates a new file; an output
//!   directory can be extended by later runs
//! - **Idempotent headers** -- An existing header is never overwritten
//!
//! Runs against the same output directory must be serialized by the caller:
//! part file indices are discovered from the directory listing.
//!
//! # Key Modules
//!
//! - [`writer`] -- The stream dispatcher and its run state
//! - [`schema`] -- Property type resolution and neo4j type mapping
//! - [`dedup`] -- Duplicate identifier tracking and reporting
//! - [`batch`] -- Batch validation and line formatting
//! - [`parts`] -- Part file naming, index discovery and writing
//! - [`header`] -- Header files
//! - [`call`] -- The neo4j-admin import call
//! - [`ontology`] -- Ontology and label translation collaborators
//! - [`input`] -- JSON Lines entity reader with bzip2 support
//! - [`verify`] -- Header/part alignment check of a finished directory
//! - [`models`] -- Entities and property values
//! - [`config`] -- Writer configuration and constants
//! - [`error`] -- Error taxonomy
//! - [`stats`] -- Write counters
//!
//! # Example Usage
//!
//! ```bash
//! neobatch write -i entities.jsonl.bz2 -s schema.json -o out/ --batch-size 100000
//! neobatch verify -o out/
//! ```

pub mod batch;
pub mod call;
pub mod config;
pub mod dedup;
pub mod error;
pub mod header;
pub mod input;
pub mod models;
pub mod ontology;
pub mod parts;
pub mod schema;
pub mod stats;
pub mod verify;
pub mod writer;

pub use error::{Result, WriteError};
pub use models::{Edge, Entity, EntityKind, Node, PropValue, Properties};
pub use writer::{BatchWriter, DispatchState};
