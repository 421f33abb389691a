//! Shared constants for the mesh LOD publishing pipeline
pub mod coordinate_system;
pub mod files;
pub mod tiers;
