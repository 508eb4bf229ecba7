pub use super::history_entry::Entity as HistoryEntry;
pub use super::project::Entity as Project;
