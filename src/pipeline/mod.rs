//! The migration pipeline.
//!
//! [`CatalogReader`] pulls tracks from a [`SourceCatalog`], [`TrackMatcher`]
//! finds a destination item for each, [`PlaylistWriter`] appends it, and
//! [`Orchestrator`] drives the whole run. Every destination call is throttled
//! by the shared [`Dispatcher`].

mod catalog;
mod dispatcher;
mod matcher;
mod orchestrator;
mod progress;
mod reader;
mod summary;
mod writer;

pub use catalog::{DestinationCatalog, SourceCatalog};
pub use dispatcher::{DispatchPermit, Dispatcher};
pub use matcher::{TOPIC_MARKER, TrackMatcher, primary_query, relaxed_query, select_candidate};
pub use orchestrator::{
    DEFAULT_DESCRIPTION, ExportState, Orchestrator, RunState, select_collections,
};
pub use progress::{NoProgress, ProgressObserver};
pub use reader::CatalogReader;
pub use summary::{RunSummary, TrackOutcome};
pub use writer::PlaylistWriter;
