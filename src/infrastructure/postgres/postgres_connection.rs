use std::time::Duration;

use anyhow::{Context, Result};
use diesel::{
    PgConnection,
    r2d2::{ConnectionManager, Pool},
};

use crate::config::config_model::Database;

pub type PgPoolSquad = Pool<ConnectionManager<PgConnection>>;

pub fn establish_connection(database: &Database) -> Result<PgPoolSquad> {
    let manager = ConnectionManager::<PgConnection>::new(&database.url);
    let pool = Pool::builder()
        .max_size(database.max_connections)
        .min_idle(Some(database.min_idle))
        .connection_timeout(Duration::from_secs(database.connect_timeout))
        .build(manager)
        .context("unable to create postgres connection pool")?;

    // Fail at startup rather than on the first request.
    pool.get().context("unable to connect to postgres")?;

    Ok(pool)
}
