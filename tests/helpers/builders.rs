#![allow(dead_code)]

use chrono::NaiveDate;
use linc::authz::AuthorityLevel;
use linc::codes::{ProvinceCode, UserGroupCode};
use linc::entities::{location, person, user_group};
use linc::storage::locations::{self, NewLocation};
use linc::storage::persons::{self, PersonInput};
use linc::storage::user_groups::{self, NewUserGroup};
use linc::storage::users::{self, NewUser, User};
use sea_orm::DatabaseConnection;

pub const TEST_PASSWORD: &str = "password123";

/// Builder for creating test user groups
pub struct GroupBuilder {
    code: String,
    name: String,
    province: Option<String>,
    level: AuthorityLevel,
    provincial_help_desk: bool,
    national_help_desk: bool,
}

impl GroupBuilder {
    pub fn new(code: &str, level: AuthorityLevel) -> Self {
        Self {
            code: code.to_string(),
            name: format!("Group {code}"),
            province: None,
            level,
            provincial_help_desk: false,
            national_help_desk: false,
        }
    }

    pub fn province(mut self, province: &str) -> Self {
        self.province = Some(province.to_string());
        self
    }

    pub fn provincial_help_desk(mut self) -> Self {
        self.provincial_help_desk = true;
        self
    }

    pub fn national_help_desk(mut self) -> Self {
        self.national_help_desk = true;
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> user_group::Model {
        user_groups::create(
            db,
            NewUserGroup {
                code: UserGroupCode::parse(&self.code).expect("valid group code"),
                name: self.name,
                province_code: self
                    .province
                    .map(|p| ProvinceCode::parse(&p).expect("valid province code")),
                authority_level: self.level,
                is_provincial_help_desk: self.provincial_help_desk,
                is_national_help_desk: self.national_help_desk,
            },
        )
        .await
        .expect("Failed to create test user group")
    }
}

/// Builder for creating test users
pub struct UserBuilder {
    username: String,
    password: String,
    email: Option<String>,
    user_group_id: i64,
}

impl UserBuilder {
    pub fn new(username: &str, user_group_id: i64) -> Self {
        Self {
            username: username.to_string(),
            password: TEST_PASSWORD.to_string(),
            email: None,
            user_group_id,
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> User {
        users::create(
            db,
            self.user_group_id,
            NewUser {
                username: self.username,
                password: self.password,
                email: self.email,
                first_name: "Test".to_string(),
                surname: "User".to_string(),
                user_group_id: Some(self.user_group_id),
                office_id: None,
            },
        )
        .await
        .expect("Failed to create test user")
    }
}

/// Builder for creating persons that pass the South African person rules
pub struct PersonBuilder {
    user_group_id: i64,
    input: PersonInput,
}

impl PersonBuilder {
    pub fn new(user_group_id: i64) -> Self {
        Self {
            user_group_id,
            input: PersonInput {
                id_type: Some("RSA_ID".to_string()),
                id_number: Some("8001015009087".to_string()),
                first_name: Some("Thabo".to_string()),
                surname: Some("Mokoena".to_string()),
                date_of_birth: NaiveDate::from_ymd_opt(1980, 1, 1),
                gender: Some("01".to_string()),
                nationality: Some("ZA".to_string()),
                language_preference: Some("EN".to_string()),
                postal_code: Some("2001".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn id_number(mut self, id_number: &str) -> Self {
        self.input.id_number = Some(id_number.to_string());
        self
    }

    pub fn surname(mut self, surname: &str) -> Self {
        self.input.surname = Some(surname.to_string());
        self
    }

    pub fn born(mut self, date_of_birth: Option<NaiveDate>) -> Self {
        self.input.date_of_birth = date_of_birth;
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> person::Model {
        persons::create(db, self.user_group_id, self.input)
            .await
            .expect("Failed to create test person")
    }
}

/// Builder for creating test locations
pub struct LocationBuilder {
    user_group_id: i64,
    code: String,
    province: Option<String>,
}

impl LocationBuilder {
    pub fn new(code: &str, user_group_id: i64) -> Self {
        Self {
            user_group_id,
            code: code.to_string(),
            province: None,
        }
    }

    pub fn province(mut self, province: &str) -> Self {
        self.province = Some(province.to_string());
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> location::Model {
        locations::create(
            db,
            self.user_group_id,
            NewLocation {
                user_group_id: Some(self.user_group_id),
                office_id: None,
                location_code: self.code.clone(),
                name: format!("Testing centre {}", self.code),
                address_line1: "1 Main Road".to_string(),
                address_line2: None,
                city: "Cape Town".to_string(),
                province_code: self.province,
                postal_code: Some("8001".to_string()),
            },
        )
        .await
        .expect("Failed to create test location")
    }
}
