use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "persons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i64,
    pub user_group_id: i64,
    pub id_type: String,
    pub id_number: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub surname: String,
    pub date_of_birth: Option<Date>,
    pub gender: String,
    pub nationality: Option<String>,
    pub language_preference: Option<String>,
    pub email: Option<String>,
    pub phone_mobile: Option<String>,
    pub postal_code: Option<String>,
    pub validation_status: String, // PENDING | VALIDATED | REJECTED | UNDER_REVIEW | EXPIRED
    pub state: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
