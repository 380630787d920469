pub(crate) mod settings;
pub mod initialize;
mod migration;

pub use settings::Entity as SettingRows;

/// 单连接的内存数据库，已执行迁移
#[cfg(test)]
pub(crate) async fn test_db() -> sea_orm::DatabaseConnection {
    let mut options = sea_orm::ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await.unwrap();
    initialize::initial(&db).await.unwrap();
    db
}
