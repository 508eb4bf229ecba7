use sea_orm::entity::prelude::*;
use serde::Deserialize;

/// Column a project sits in on the board.
///
/// The string values are what the database stores and what the move route
/// accepts in its `novo_status` segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum ProjectStatus {
    #[sea_orm(string_value = "pendente")]
    #[serde(rename = "pendente")]
    Pending,
    #[sea_orm(string_value = "andamento")]
    #[serde(rename = "andamento")]
    InProgress,
    #[sea_orm(string_value = "concluido")]
    #[serde(rename = "concluido")]
    Completed,
}

impl ProjectStatus {
    /// Value used in URLs and in the `status` columns.
    pub fn slug(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pendente",
            ProjectStatus::InProgress => "andamento",
            ProjectStatus::Completed => "concluido",
        }
    }

    /// Human readable label shown in the templates.
    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "Pendente",
            ProjectStatus::InProgress => "Em andamento",
            ProjectStatus::Completed => "Concluído",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}
