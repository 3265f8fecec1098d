// rust/modelstore-core/src/storage/mod.rs

//! Object storage access.
//!
//! All components share one [`ObjectBackend`], normally an
//! [`ObjectStoreBackend`] built from configuration:
//!
//! - [`ObjectResolver`] lists objects and resolves them into [`ObjectHandle`]s
//! - [`ObjectReader`] fetches the content behind a handle
//! - [`ObjectWriter`] uploads local files and creates folder markers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use modelstore_core::storage::{ObjectReader, ObjectResolver, ObjectStoreBackend};
//!
//! # async fn example() -> modelstore_core::Result<()> {
//! let backend = Arc::new(ObjectStoreBackend::local("./buckets"));
//! let resolver = ObjectResolver::new(backend);
//!
//! let handle = resolver.resolve("datasets", "train.csv").await?;
//! let table = ObjectReader::default().read_table(&handle).await?;
//! println!("{} rows", table.num_rows());
//! # Ok(())
//! # }
//! ```

mod backend;
mod reader;
mod resolver;
mod store;
mod writer;

pub use backend::{ObjectBackend, ObjectMeta, ObjectSummary};
pub use reader::{ObjectContent, ObjectReader, ReadOptions};
pub use resolver::{ObjectHandle, ObjectResolver};
pub use store::{ObjectStoreBackend, FOLDER_MARKER_OBJECT};
pub use writer::{ObjectWriter, UploadOptions, UploadReceipt};

#[cfg(test)]
pub(crate) mod testing;
