mod edit;
mod generate;
mod studio;
mod upload;

#[cfg(test)]
mod mock;

pub use edit::{EditOutcome, EditPipeline};
pub use generate::GenerationPipeline;
pub use studio::Studio;
pub use upload::UploadPipeline;
