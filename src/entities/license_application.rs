use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "license_applications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i64,
    #[sea_orm(unique)]
    pub application_number: String,
    pub person_id: i64,
    pub user_group_id: i64,
    pub location_id: Option<i64>,
    pub license_category: String,
    pub application_type: String, // NEW | RENEWAL | UPGRADE | DUPLICATE
    pub status: String,
    pub submitted_at: Option<i64>,
    pub status_changed_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
