mod dataset;
mod workspace;

pub use dataset::Dataset;
pub use workspace::Workspace;
