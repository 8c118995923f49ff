use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: i32,
    pub filename: String,
    pub storage_path: String,
    pub size_kb: f64,
    /// Id of this document inside the external analysis service,
    /// assigned when the upload is acknowledged.
    pub external_id: i64,
    pub created_at: DateTime,
}

impl Model {
    /// File type used for price-rule lookup: the extension of the stored
    /// filename, lowercased. Empty when the filename has no extension.
    pub fn file_type(&self) -> String {
        file_type_of(&self.filename)
    }
}

pub fn file_type_of(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("")
        .to_lowercase()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItem,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::file_type_of;

    #[test]
    fn file_type_is_lowercased_extension() {
        assert_eq!(file_type_of("report.PDF"), "pdf");
        assert_eq!(file_type_of("archive.tar.gz"), "gz");
    }

    #[test]
    fn file_type_is_empty_without_extension() {
        assert_eq!(file_type_of("README"), "");
        assert_eq!(file_type_of(""), "");
    }
}
