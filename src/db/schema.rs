//! Registrant table definition and creation

use diesel::prelude::*;
use tracing::info;

use crate::error::Result;

diesel::table! {
    registrants (id) {
        id -> BigInt,
        name -> Text,
        phone -> Text,
        status -> Text,
        channel -> Text,
        registered_at -> Text,
    }
}

/// Create the registrants table if it does not exist yet
pub fn ensure_schema(conn: &mut SqliteConnection) -> Result<()> {
    // AUTOINCREMENT keeps ids strictly increasing even after deletes
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS registrants (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name TEXT NOT NULL,
            phone TEXT NOT NULL,
            status TEXT NOT NULL,
            channel TEXT NOT NULL,
            registered_at TEXT NOT NULL
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE INDEX IF NOT EXISTS idx_registrants_name_status ON registrants(name, status)",
    )
    .execute(conn)?;

    info!("Registrants table ready");
    Ok(())
}
