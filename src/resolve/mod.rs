pub mod archive;
pub mod builder;
pub mod chooser;
pub mod collector;
pub mod filters;
pub mod groups;
pub mod resolver;
