//! Connections to the database holding the tables.
//!
//! Everything goes through sqlx's `Any` driver, so the same table source
//! works against any database whose driver is compiled in (see the
//! `postgres` and `sqlite` features).

use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::RelResult;

mod decode;

pub(crate) use decode::decode_row;

/// Open a pool of connections to `url`.
///
/// Scans hold one connection for as long as they run, so evaluating a
/// relation that reads several tables at once needs more than one.
pub async fn connect(
    url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> RelResult<AnyPool> {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(url)
        .await?;

    Ok(pool)
}

/// A pool that does not connect until first used.
pub fn connect_lazy(url: &str) -> RelResult<AnyPool> {
    sqlx::any::install_default_drivers();

    Ok(AnyPoolOptions::new().connect_lazy(url)?)
}
