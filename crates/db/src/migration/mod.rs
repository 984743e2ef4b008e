//! Database migrations.
//!
//! Each migration is raw SQL executed through `execute_unprepared`; the
//! schema is the source of truth and entities mirror it by hand.

use sea_orm_migration::prelude::*;

mod m20260826_000001_initial;

/// Migrator collecting every schema migration in order.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260826_000001_initial::Migration)]
    }
}
