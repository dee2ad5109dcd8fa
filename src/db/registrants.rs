//! Registrant CRUD operations using Diesel
//!
//! Each mutation is a single statement, so concurrent writers to the same row
//! are ordered by SQLite and the last one wins.

use diesel::prelude::*;
use tracing::info;

use super::models::{current_timestamp, NewRegistrant, Registrant, RegistrantPatch};
use super::schema::registrants;
use crate::error::Result;

pub const ADMIN_NAME: &str = "Admin";
pub const ADMIN_STATUS: &str = "admin";
const ADMIN_PHONE: &str = "N/A";
const ADMIN_CHANNEL: &str = "offline";

// ============================================================================
// Read Operations
// ============================================================================

/// All registrants in id order
pub fn list_registrants(conn: &mut SqliteConnection) -> Result<Vec<Registrant>> {
    Ok(registrants::table
        .select(Registrant::as_select())
        .order(registrants::id.asc())
        .load(conn)?)
}

pub fn get_registrant(conn: &mut SqliteConnection, id: i64) -> Result<Option<Registrant>> {
    Ok(registrants::table
        .find(id)
        .select(Registrant::as_select())
        .first(conn)
        .optional()?)
}

pub fn count_registrants(conn: &mut SqliteConnection) -> Result<i64> {
    Ok(registrants::table.count().get_result(conn)?)
}

/// Number of rows matching the bootstrap admin identity
pub fn count_admins(conn: &mut SqliteConnection) -> Result<i64> {
    Ok(registrants::table
        .filter(registrants::name.eq(ADMIN_NAME))
        .filter(registrants::status.eq(ADMIN_STATUS))
        .count()
        .get_result(conn)?)
}

// ============================================================================
// Write Operations
// ============================================================================

/// Insert a registrant and return its assigned id
pub fn insert_registrant(conn: &mut SqliteConnection, new: &NewRegistrant) -> Result<i64> {
    Ok(diesel::insert_into(registrants::table)
        .values(new)
        .returning(registrants::id)
        .get_result(conn)?)
}

/// Apply a partial update. Returns the number of rows affected.
pub fn patch_registrant(
    conn: &mut SqliteConnection,
    id: i64,
    patch: &RegistrantPatch,
) -> Result<usize> {
    Ok(diesel::update(registrants::table.find(id))
        .set(patch)
        .execute(conn)?)
}

/// Overwrite every mutable field. Returns the number of rows affected.
pub fn replace_registrant(
    conn: &mut SqliteConnection,
    id: i64,
    values: &NewRegistrant,
) -> Result<usize> {
    Ok(diesel::update(registrants::table.find(id))
        .set(values)
        .execute(conn)?)
}

/// Delete a registrant. Returns the number of rows affected.
pub fn delete_registrant(conn: &mut SqliteConnection, id: i64) -> Result<usize> {
    Ok(diesel::delete(registrants::table.find(id)).execute(conn)?)
}

/// Insert the administrative record unless one already exists.
///
/// Must run inside a write-locking transaction (the pool's write path opens
/// one) so that two bootstraps racing on the same file still end with a
/// single admin row. Returns true when a row was inserted.
pub fn ensure_admin(conn: &mut SqliteConnection) -> Result<bool> {
    if count_admins(conn)? > 0 {
        return Ok(false);
    }

    let admin = NewRegistrant {
        name: ADMIN_NAME.to_string(),
        phone: ADMIN_PHONE.to_string(),
        status: ADMIN_STATUS.to_string(),
        channel: ADMIN_CHANNEL.to_string(),
        registered_at: current_timestamp(),
    };
    let id = insert_registrant(conn, &admin)?;
    info!(id = id, "Default admin record inserted");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::ensure_schema;

    fn open_conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        ensure_schema(&mut conn).unwrap();
        conn
    }

    fn sample(name: &str) -> NewRegistrant {
        NewRegistrant {
            name: name.to_string(),
            phone: "6281234".to_string(),
            status: "active".to_string(),
            channel: "web".to_string(),
            registered_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut conn = open_conn();
        let id = insert_registrant(&mut conn, &sample("Budi")).unwrap();
        let row = get_registrant(&mut conn, id).unwrap().unwrap();
        assert_eq!(row.name, "Budi");
        assert_eq!(row.status, "active");
        assert!(get_registrant(&mut conn, id + 100).unwrap().is_none());
    }

    #[test]
    fn test_ids_increase_after_delete() {
        let mut conn = open_conn();
        let first = insert_registrant(&mut conn, &sample("a")).unwrap();
        let second = insert_registrant(&mut conn, &sample("b")).unwrap();
        assert!(second > first);

        assert_eq!(delete_registrant(&mut conn, second).unwrap(), 1);
        let third = insert_registrant(&mut conn, &sample("c")).unwrap();
        assert!(third > second, "ids must not be reused");
    }

    #[test]
    fn test_patch_touches_only_supplied_fields() {
        let mut conn = open_conn();
        let id = insert_registrant(&mut conn, &sample("Budi")).unwrap();
        let patch = RegistrantPatch {
            status: Some("offline".to_string()),
            ..RegistrantPatch::default()
        };
        assert_eq!(patch_registrant(&mut conn, id, &patch).unwrap(), 1);

        let row = get_registrant(&mut conn, id).unwrap().unwrap();
        assert_eq!(row.status, "offline");
        assert_eq!(row.name, "Budi");
        assert_eq!(row.channel, "web");
    }

    #[test]
    fn test_mutations_on_missing_row_affect_nothing() {
        let mut conn = open_conn();
        let patch = RegistrantPatch {
            name: Some("x".to_string()),
            ..RegistrantPatch::default()
        };
        assert_eq!(patch_registrant(&mut conn, 9999, &patch).unwrap(), 0);
        assert_eq!(replace_registrant(&mut conn, 9999, &sample("x")).unwrap(), 0);
        assert_eq!(delete_registrant(&mut conn, 9999).unwrap(), 0);
    }

    #[test]
    fn test_ensure_admin_is_idempotent() {
        let mut conn = open_conn();
        assert!(ensure_admin(&mut conn).unwrap());
        assert!(!ensure_admin(&mut conn).unwrap());
        assert!(!ensure_admin(&mut conn).unwrap());
        assert_eq!(count_admins(&mut conn).unwrap(), 1);

        let admin = &list_registrants(&mut conn).unwrap()[0];
        assert_eq!(admin.phone, "N/A");
        assert_eq!(admin.channel, "offline");
    }
}
