use sea_orm_migration::{prelude::*, schema::*};

use crate::id_column;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Enable foreign keys for SQLite
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
            manager
                .get_connection()
                .execute_unprepared("PRAGMA foreign_keys = ON")
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(UserGroups::Table)
                    .if_not_exists()
                    .col(id_column(manager, UserGroups::Id))
                    .col(
                        ColumnDef::new(UserGroups::Code)
                            .string_len(4)
                            .not_null()
                            .unique_key(),
                    )
                    .col(string(UserGroups::Name))
                    .col(string_len_null(UserGroups::ProvinceCode, 2))
                    .col(string(UserGroups::AuthorityLevel))
                    .col(
                        ColumnDef::new(UserGroups::IsProvincialHelpDesk)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(UserGroups::IsNationalHelpDesk)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(UserGroups::State)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(big_integer(UserGroups::CreatedAt))
                    .col(big_integer(UserGroups::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_groups_province")
                    .table(UserGroups::Table)
                    .col(UserGroups::ProvinceCode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Offices::Table)
                    .if_not_exists()
                    .col(id_column(manager, Offices::Id))
                    .col(big_integer(Offices::UserGroupId))
                    .col(string_len(Offices::OfficeCode, 1))
                    .col(string(Offices::Name))
                    .col(
                        ColumnDef::new(Offices::State)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(big_integer(Offices::CreatedAt))
                    .col(big_integer(Offices::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offices_user_group")
                            .from(Offices::Table, Offices::UserGroupId)
                            .to(UserGroups::Table, UserGroups::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_offices_group_code")
                    .table(Offices::Table)
                    .col(Offices::UserGroupId)
                    .col(Offices::OfficeCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Locations::Table)
                    .if_not_exists()
                    .col(id_column(manager, Locations::Id))
                    .col(big_integer(Locations::UserGroupId))
                    .col(big_integer_null(Locations::OfficeId))
                    .col(
                        ColumnDef::new(Locations::LocationCode)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(string(Locations::Name))
                    .col(string(Locations::AddressLine1))
                    .col(string_null(Locations::AddressLine2))
                    .col(string(Locations::City))
                    .col(string_len_null(Locations::ProvinceCode, 2))
                    .col(string_null(Locations::PostalCode))
                    .col(
                        ColumnDef::new(Locations::State)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(big_integer(Locations::CreatedAt))
                    .col(big_integer(Locations::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_locations_user_group")
                            .from(Locations::Table, Locations::UserGroupId)
                            .to(UserGroups::Table, UserGroups::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_locations_office")
                            .from(Locations::Table, Locations::OfficeId)
                            .to(Offices::Table, Offices::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(id_column(manager, Users::Id))
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(string(Users::PasswordHash))
                    .col(string_null(Users::Email))
                    .col(string(Users::FirstName))
                    .col(string(Users::Surname))
                    .col(big_integer(Users::UserGroupId))
                    .col(big_integer_null(Users::OfficeId))
                    .col(
                        ColumnDef::new(Users::State)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(big_integer(Users::CreatedAt))
                    .col(big_integer(Users::UpdatedAt))
                    .col(big_integer_null(Users::LastLoginAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_user_group")
                            .from(Users::Table, Users::UserGroupId)
                            .to(UserGroups::Table, UserGroups::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserLocationAssignments::Table)
                    .if_not_exists()
                    .col(id_column(manager, UserLocationAssignments::Id))
                    .col(big_integer(UserLocationAssignments::UserId))
                    .col(big_integer(UserLocationAssignments::LocationId))
                    .col(string(UserLocationAssignments::Role))
                    .col(
                        ColumnDef::new(UserLocationAssignments::State)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(big_integer(UserLocationAssignments::AssignedAt))
                    .col(big_integer_null(UserLocationAssignments::AssignedBy))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignments_user")
                            .from(
                                UserLocationAssignments::Table,
                                UserLocationAssignments::UserId,
                            )
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignments_location")
                            .from(
                                UserLocationAssignments::Table,
                                UserLocationAssignments::LocationId,
                            )
                            .to(Locations::Table, Locations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_assignments_user_location_role")
                    .table(UserLocationAssignments::Table)
                    .col(UserLocationAssignments::UserId)
                    .col(UserLocationAssignments::LocationId)
                    .col(UserLocationAssignments::Role)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Persons::Table)
                    .if_not_exists()
                    .col(id_column(manager, Persons::Id))
                    .col(big_integer(Persons::UserGroupId))
                    .col(string(Persons::IdType))
                    .col(string(Persons::IdNumber))
                    .col(string(Persons::FirstName))
                    .col(string_null(Persons::MiddleName))
                    .col(string(Persons::Surname))
                    .col(date_null(Persons::DateOfBirth))
                    .col(string_len(Persons::Gender, 2))
                    .col(string_null(Persons::Nationality))
                    .col(string_null(Persons::LanguagePreference))
                    .col(string_null(Persons::Email))
                    .col(string_null(Persons::PhoneMobile))
                    .col(string_null(Persons::PostalCode))
                    .col(
                        ColumnDef::new(Persons::ValidationStatus)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Persons::State)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(big_integer(Persons::CreatedAt))
                    .col(big_integer(Persons::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_persons_user_group")
                            .from(Persons::Table, Persons::UserGroupId)
                            .to(UserGroups::Table, UserGroups::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_persons_identity")
                    .table(Persons::Table)
                    .col(Persons::IdType)
                    .col(Persons::IdNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LicenseApplications::Table)
                    .if_not_exists()
                    .col(id_column(manager, LicenseApplications::Id))
                    .col(
                        ColumnDef::new(LicenseApplications::ApplicationNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(big_integer(LicenseApplications::PersonId))
                    .col(big_integer(LicenseApplications::UserGroupId))
                    .col(big_integer_null(LicenseApplications::LocationId))
                    .col(string(LicenseApplications::LicenseCategory))
                    .col(string(LicenseApplications::ApplicationType))
                    .col(string(LicenseApplications::Status))
                    .col(big_integer_null(LicenseApplications::SubmittedAt))
                    .col(big_integer(LicenseApplications::StatusChangedAt))
                    .col(big_integer(LicenseApplications::CreatedAt))
                    .col(big_integer(LicenseApplications::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_applications_person")
                            .from(LicenseApplications::Table, LicenseApplications::PersonId)
                            .to(Persons::Table, Persons::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_applications_user_group")
                            .from(
                                LicenseApplications::Table,
                                LicenseApplications::UserGroupId,
                            )
                            .to(UserGroups::Table, UserGroups::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_applications_status")
                    .table(LicenseApplications::Table)
                    .col(LicenseApplications::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccessTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessTokens::Token)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(big_integer(AccessTokens::UserId))
                    .col(big_integer(AccessTokens::CreatedAt))
                    .col(big_integer(AccessTokens::ExpiresAt))
                    .col(
                        ColumnDef::new(AccessTokens::Revoked)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_tokens_user")
                            .from(AccessTokens::Table, AccessTokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_access_tokens_expires")
                    .table(AccessTokens::Table)
                    .col(AccessTokens::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(JobExecutions::Table)
                    .if_not_exists()
                    .col(id_column(manager, JobExecutions::Id))
                    .col(string(JobExecutions::JobName))
                    .col(big_integer(JobExecutions::StartedAt))
                    .col(big_integer_null(JobExecutions::CompletedAt))
                    .col(boolean_null(JobExecutions::Success))
                    .col(string_null(JobExecutions::ErrorMessage))
                    .col(big_integer_null(JobExecutions::RecordsProcessed))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobExecutions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccessTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LicenseApplications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Persons::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserLocationAssignments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Locations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Offices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserGroups::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum UserGroups {
    Table,
    Id,
    Code,
    Name,
    ProvinceCode,
    AuthorityLevel,
    IsProvincialHelpDesk,
    IsNationalHelpDesk,
    State,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Offices {
    Table,
    Id,
    UserGroupId,
    OfficeCode,
    Name,
    State,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Locations {
    Table,
    Id,
    UserGroupId,
    OfficeId,
    LocationCode,
    Name,
    AddressLine1,
    AddressLine2,
    City,
    ProvinceCode,
    PostalCode,
    State,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    Email,
    FirstName,
    Surname,
    UserGroupId,
    OfficeId,
    State,
    CreatedAt,
    UpdatedAt,
    LastLoginAt,
}

#[derive(DeriveIden)]
enum UserLocationAssignments {
    Table,
    Id,
    UserId,
    LocationId,
    Role,
    State,
    AssignedAt,
    AssignedBy,
}

#[derive(DeriveIden)]
enum Persons {
    Table,
    Id,
    UserGroupId,
    IdType,
    IdNumber,
    FirstName,
    MiddleName,
    Surname,
    DateOfBirth,
    Gender,
    Nationality,
    LanguagePreference,
    Email,
    PhoneMobile,
    PostalCode,
    ValidationStatus,
    State,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LicenseApplications {
    Table,
    Id,
    ApplicationNumber,
    PersonId,
    UserGroupId,
    LocationId,
    LicenseCategory,
    ApplicationType,
    Status,
    SubmittedAt,
    StatusChangedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AccessTokens {
    Table,
    Token,
    UserId,
    CreatedAt,
    ExpiresAt,
    Revoked,
}

#[derive(DeriveIden)]
enum JobExecutions {
    Table,
    Id,
    JobName,
    StartedAt,
    CompletedAt,
    Success,
    ErrorMessage,
    RecordsProcessed,
}
