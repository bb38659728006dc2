//! Namespaced storage of instances with their parameters and results.
//!
//! An *instance* is the record of one running or completed unit of work,
//! owned by an executable or an invoker. Each instance has named
//! *parameters* (inputs) and *results* (outputs) that are stored as
//! independent entries next to the instance record. This crate maps that
//! object model onto a flat, prefix-scannable key space and serializes every
//! value according to its declared type.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         InstanceDb                          │
//! │        instances()  │  parameters()  │  results()           │
//! │     (validation, key construction, type resolution)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   BackendDriver trait                       │
//! │   (set, get, remove, remove_all, list, get_all)             │
//! ├───────────────────────────┬─────────────────────────────────┤
//! │ DocumentDriver            │ PoolDriver                      │
//! │ (embedded document store) │ (in `instancedb-pool`)          │
//! └───────────────────────────┴─────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use instancedb::{Args, InstanceDb, InstanceDbConfig, Value};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = InstanceDb::in_memory(InstanceDbConfig::default())?;
//!
//!     // Store an instance; its parameters become separate entries.
//!     let args = Args::new()
//!         .id("2")
//!         .invoker("testinv")
//!         .instance(json!({ "status": "running", "parameters": { "foo": "bar" } }));
//!     db.instances().set(&args).await?;
//!
//!     let instance = db.instances().get(&args).await?.expect("stored above");
//!     assert_eq!(instance.parameters_stored, vec!["foo"]);
//!
//!     let foo = db.parameters().get(&args.clone().name("foo")).await?;
//!     assert_eq!(foo, Some(Value::from("bar")));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Key Layout
//!
//! See [`KeySpace`]. The layout is persisted and bit-exact across drivers.
//!
//! # Error Handling
//!
//! All operations return [`DbResult<T>`]. Invalid arguments are rejected
//! before any driver call. Stored payloads that do not decode as their
//! declared type are returned raw instead of failing;
//! [`BackendDriver::decode_failures`] counts them.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the [`conformance`] driver suite and the `testutil` module (sample
//!   schema, handle factories, façade scenarios). Enable this in `[dev-dependencies]` for
//!   integration tests.

pub mod args;
pub mod codec;
pub mod config;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod conformance;
pub mod db;
pub mod document;
pub mod driver;
pub mod error;
pub mod fields;
pub mod instances;
pub mod keys;
pub mod memory;
pub mod schema;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use args::{
    Args, Embed, FieldRequest, InstanceRequest, field_request, instance_request, owner_request,
};
pub use codec::{DecodeMonitor, Decoded};
pub use config::{BackendKind, DEFAULT_SCOPE, InstanceDbConfig};
pub use db::InstanceDb;
pub use document::{Document, DocumentCollection, DocumentDriver};
pub use driver::BackendDriver;
pub use error::{BoxError, DbError, DbResult};
pub use fields::Fields;
pub use instances::{InstanceRecord, Instances, StoredInstance};
pub use keys::{KeySpace, Target, WILDCARD, leaf_name};
pub use memory::MemoryCollection;
pub use schema::{ApiSchema, FieldSchema, OwnerSchema, TypeResolver, TypeSelection};
pub use types::{FieldKind, Owner, Value, ValueType};
