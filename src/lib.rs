//! Generate native message types for Tilebox datasets.
//!
//! A dataset's type is published by the catalog as a protobuf descriptor. This
//! crate rewrites that descriptor into a self-contained schema unit, bundles it
//! with the well-known files it depends on, and runs it through a code
//! generator speaking the protoc plugin protocol.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use tilebox_generate::{Options, RustBackend, TileboxClient, generate_dataset};
//!
//! let client = TileboxClient::new("https://api.tilebox.com", "my-api-key")?;
//! let path = generate_dataset(
//!     &client,
//!     &RustBackend::default(),
//!     "open_data.copernicus.sentinel1_sar",
//!     &Options::new("protogen"),
//! )
//! .await?;
//! println!("{}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cli;
pub mod codegen;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod request;
pub mod rewrite;
pub mod well_known;
pub mod writer;

pub use backend::{GenerationBackend, PluginBackend};
pub use codegen::{ExternPaths, RustBackend};
pub use error::{Error, Result, Stage};
pub use fetch::{DatasetFetcher, FetchError, TileboxClient};
pub use pipeline::{Options, generate_dataset};
pub use request::ValidationError;
pub use rewrite::Overrides;
