//! Service layer

pub mod sibling_directory;

pub use sibling_directory::SiblingDirectory;
