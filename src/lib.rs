pub mod config;
pub mod dashboard;
pub mod document;
pub mod error;
pub mod loader;
pub mod session;
pub mod stats;
pub mod timestamp;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::config::{DashboardConfig, MediaTypeLabel};
    pub use crate::dashboard::{render_all, render_tab, Panel, Stat, Tab, TabView};
    pub use crate::document::{Collection, ExportDocument, Relation};
    pub use crate::error::{DocumentError, LoadError};
    pub use crate::loader::{load, load_async, FileKind, UploadedFile};
    pub use crate::session::{LoadOutcome, LoadTicket, Session};
    pub use crate::stats::{ContactCount, TypeCount};
}
