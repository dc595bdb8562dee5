//! Parser module: line rewriting, marker handling and YAML parsing

pub mod markers;
mod transformer;
mod yaml;

pub use transformer::{transform, LineTransformer};
pub use yaml::parse_yaml;
