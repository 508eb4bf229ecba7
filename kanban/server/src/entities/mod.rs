pub mod prelude;

pub mod history_entry;
pub mod project;
pub mod sea_orm_active_enums;
