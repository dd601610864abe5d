pub use sea_orm_migration::prelude::*;

mod m20250101_000001_initial_schema;
mod m20250115_000001_add_audit_logs;
mod m20250301_000001_add_regions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_initial_schema::Migration),
            Box::new(m20250115_000001_add_audit_logs::Migration),
            Box::new(m20250301_000001_add_regions::Migration),
        ]
    }
}

/// Auto-increment primary key column. Postgres gets BIGSERIAL, SQLite needs
/// INTEGER for rowid aliasing.
pub(crate) fn id_column<T: IntoIden>(manager: &SchemaManager, col: T) -> ColumnDef {
    match manager.get_database_backend() {
        sea_orm::DatabaseBackend::Postgres => ColumnDef::new(col)
            .big_integer()
            .not_null()
            .auto_increment()
            .primary_key()
            .to_owned(),
        _ => ColumnDef::new(col)
            .integer()
            .not_null()
            .auto_increment()
            .primary_key()
            .to_owned(),
    }
}
