use sea_orm::entity::prelude::*;

use super::sea_orm_active_enums::ProjectStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: ProjectStatus,
    pub started_at: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
    pub archived: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::history_entry::Entity")]
    HistoryEntry,
}

impl Related<super::history_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HistoryEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
