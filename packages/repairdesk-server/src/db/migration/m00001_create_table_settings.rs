use crate::db::settings;
use sea_orm::sea_query::Table;
use sea_orm::{DbErr, DeriveMigrationName};
use sea_orm_migration::{MigrationTrait, SchemaManager, schema};

#[derive(DeriveMigrationName)]
pub(crate) struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(settings::Entity)
            .if_not_exists()
            .col(schema::pk_auto(settings::Column::Id))
            .col(schema::string_uniq(settings::Column::Key))
            .col(schema::text(settings::Column::Value))
            .col(schema::timestamp_with_time_zone(settings::Column::CreatedAt))
            .col(schema::timestamp_with_time_zone(settings::Column::UpdatedAt))
            .to_owned();
        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(settings::Entity).to_owned())
            .await
    }
}
