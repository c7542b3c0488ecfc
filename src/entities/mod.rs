pub mod prelude;

pub mod challenges;
pub mod configs;
pub mod notifications;
pub mod solves;
pub mod teams;
pub mod users;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema};

use prelude::*;

/// Creates the platform tables this plugin reads and writes, leaving existing ones untouched.
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, Configs).await?;
    create_table(db, Challenges).await?;
    create_table(db, Teams).await?;
    create_table(db, Users).await?;
    create_table(db, Solves).await?;
    create_table(db, Notifications).await?;
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    db.execute(builder.build(schema.create_table_from_entity(entity).if_not_exists())).await?;
    Ok(())
}
