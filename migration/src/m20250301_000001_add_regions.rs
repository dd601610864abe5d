use sea_orm_migration::{prelude::*, schema::*};

use crate::id_column;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Registered authorities (testing centres, registering authorities)
        // run by a user group
        manager
            .create_table(
                Table::create()
                    .table(Regions::Table)
                    .if_not_exists()
                    .col(id_column(manager, Regions::Id))
                    .col(big_integer(Regions::UserGroupId))
                    .col(
                        ColumnDef::new(Regions::RegionCode)
                            .string_len(4)
                            .not_null()
                            .unique_key(),
                    )
                    .col(string(Regions::Name))
                    .col(string_len(Regions::RegionType, 2))
                    .col(string_len(Regions::ProvinceCode, 2))
                    .col(
                        ColumnDef::new(Regions::RegistrationStatus)
                            .string_len(1)
                            .not_null()
                            .default("2"),
                    )
                    .col(big_integer_null(Regions::SuspendedUntil))
                    .col(string_null(Regions::ContactPerson))
                    .col(string_null(Regions::PhoneNumber))
                    .col(string_null(Regions::Email))
                    .col(text_null(Regions::OperationalNotes))
                    .col(
                        ColumnDef::new(Regions::State)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(big_integer(Regions::CreatedAt))
                    .col(big_integer(Regions::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_regions_user_group")
                            .from(Regions::Table, Regions::UserGroupId)
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
                    .name("idx_regions_province")
                    .table(Regions::Table)
                    .col(Regions::ProvinceCode)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Regions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserGroups {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Regions {
    Table,
    Id,
    UserGroupId,
    RegionCode,
    Name,
    RegionType,
    ProvinceCode,
    RegistrationStatus,
    SuspendedUntil,
    ContactPerson,
    PhoneNumber,
    Email,
    OperationalNotes,
    State,
    CreatedAt,
    UpdatedAt,
}
