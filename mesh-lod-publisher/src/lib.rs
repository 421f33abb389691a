//! Multi-resolution glTF publishing for textured OBJ model libraries
pub mod asset;
pub mod batch;
pub mod bounds;
pub mod cli;
pub mod config;
pub mod converter;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod material;
pub mod pipeline;
pub mod simplifier;
pub mod texture;
pub mod tools;

pub use batch::{AssetOutcome, BatchDriver, BatchReport};
pub use config::{PublisherConfig, TierSpec};
pub use error::{PublishError, Result};
