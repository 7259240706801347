pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use services::notes::{visible_sections, CallNotesService, DraftSessions, NotesAutosave};
pub use services::quotes::QuoteService;
