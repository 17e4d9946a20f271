mod store;
mod types;

pub use store::{GenerationTicket, PageStore, PageSummary, Snapshot};
pub use types::{PageState, Pan, UiState, MAX_ZOOM, MIN_ZOOM};
