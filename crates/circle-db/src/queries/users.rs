//! User account queries.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use circle_models::{Gender, User, UserId};

use crate::error::DbResult;
use crate::queries::parse_column;
use crate::queries::profiles;

pub(crate) const USER_COLUMNS: &str = "u.id, u.email, u.username, u.password_hash, u.bio, \
     u.date_of_birth, u.gender, u.profile_picture, u.is_private_account, u.is_staff, \
     u.is_active, u.created_at";

/// Fields needed to create an account.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub bio: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub is_staff: bool,
}

/// Map a row selected with [`USER_COLUMNS`] starting at `offset`.
pub(crate) fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<User> {
    let gender: Option<String> = row.get(offset + 6)?;
    Ok(User {
        id: UserId(row.get(offset)?),
        email: row.get(offset + 1)?,
        username: row.get(offset + 2)?,
        password_hash: row.get(offset + 3)?,
        bio: row.get(offset + 4)?,
        date_of_birth: row.get(offset + 5)?,
        gender: gender.map(|g| parse_column(offset + 6, g)).transpose()?,
        profile_picture: row.get(offset + 7)?,
        is_private_account: row.get(offset + 8)?,
        is_staff: row.get(offset + 9)?,
        is_active: row.get(offset + 10)?,
        created_at: row.get(offset + 11)?,
    })
}

/// Create a user together with its profile.
///
/// Run inside a transaction so a failed profile insert doesn't leave an
/// account without a profile.
pub fn insert_user(conn: &Connection, new: &NewUser) -> DbResult<User> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO users (email, username, password_hash, bio, date_of_birth, gender, is_staff, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            new.email,
            new.username,
            new.password_hash,
            new.bio,
            new.date_of_birth,
            new.gender.map(|g| g.as_str()),
            new.is_staff,
            created_at,
        ],
    )?;
    let id = UserId(conn.last_insert_rowid());

    let bio = if new.bio.is_empty() { None } else { Some(new.bio.as_str()) };
    profiles::insert_profile(conn, id, bio, new.date_of_birth)?;

    Ok(User {
        id,
        email: new.email.clone(),
        username: new.username.clone(),
        password_hash: new.password_hash.clone(),
        bio: new.bio.clone(),
        date_of_birth: new.date_of_birth,
        gender: new.gender,
        profile_picture: None,
        is_private_account: false,
        is_staff: new.is_staff,
        is_active: true,
        created_at,
    })
}

fn get_one(conn: &Connection, filter: &str, value: &dyn rusqlite::ToSql) -> DbResult<Option<User>> {
    let sql = format!("SELECT {} FROM users u WHERE {}", USER_COLUMNS, filter);
    let user = conn
        .query_row(&sql, [value], |row| user_from_row(row, 0))
        .optional()?;
    Ok(user)
}

pub fn get_user(conn: &Connection, id: UserId) -> DbResult<Option<User>> {
    get_one(conn, "u.id = ?1", &id.get())
}

/// Case-insensitive e-mail lookup.
pub fn get_user_by_email(conn: &Connection, email: &str) -> DbResult<Option<User>> {
    get_one(conn, "u.email = ?1", &email.trim())
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> DbResult<Option<User>> {
    get_one(conn, "u.username = ?1", &username)
}

pub fn email_exists(conn: &Connection, email: &str) -> DbResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        [email.trim()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn username_exists(conn: &Connection, username: &str) -> DbResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
        [username],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// All users, oldest account first.
pub fn list_users(conn: &Connection) -> DbResult<Vec<User>> {
    let sql = format!("SELECT {} FROM users u ORDER BY u.id", USER_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map([], |row| user_from_row(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

pub fn set_private_account(conn: &Connection, id: UserId, private: bool) -> DbResult<()> {
    conn.execute(
        "UPDATE users SET is_private_account = ?2 WHERE id = ?1",
        params![id.get(), private],
    )?;
    Ok(())
}

pub fn set_user_picture(conn: &Connection, id: UserId, picture: Option<&str>) -> DbResult<()> {
    conn.execute(
        "UPDATE users SET profile_picture = ?2 WHERE id = ?1",
        params![id.get(), picture],
    )?;
    Ok(())
}

pub fn set_staff(conn: &Connection, id: UserId, staff: bool) -> DbResult<()> {
    conn.execute(
        "UPDATE users SET is_staff = ?2 WHERE id = ?1",
        params![id.get(), staff],
    )?;
    Ok(())
}

pub fn set_active(conn: &Connection, id: UserId, active: bool) -> DbResult<()> {
    conn.execute(
        "UPDATE users SET is_active = ?2 WHERE id = ?1",
        params![id.get(), active],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{db, user};
    use crate::DbError;

    #[test]
    fn test_insert_and_lookup() {
        let db = db();
        let ada = user(&db, "ada");

        let by_email = db
            .with_conn(|c| get_user_by_email(c, "ADA@example.com"))
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, ada.id);

        let by_name = db.with_conn(|c| get_user_by_username(c, "ada")).unwrap().unwrap();
        assert_eq!(by_name.email, "ada@example.com");
        assert!(by_name.is_active);
        assert!(!by_name.is_staff);

        assert!(db.with_conn(|c| get_user_by_username(c, "nobody")).unwrap().is_none());
    }

    #[test]
    fn test_profile_created_with_user() {
        let db = db();
        let ada = user(&db, "ada");
        let profile = db.with_conn(|c| profiles::get_profile(c, ada.id)).unwrap();
        assert!(profile.is_some());
    }

    #[test]
    fn test_unique_email_and_username() {
        let db = db();
        user(&db, "ada");

        let dup_email: DbResult<User> = db.with_tx(|tx| {
            insert_user(
                tx,
                &NewUser {
                    email: "Ada@Example.com".to_string(),
                    username: "other".to_string(),
                    password_hash: "h".to_string(),
                    ..Default::default()
                },
            )
        });
        assert!(matches!(dup_email, Err(DbError::Conflict(_))));

        assert!(db.with_conn(|c| email_exists(c, "ada@EXAMPLE.com")).unwrap());
        assert!(db.with_conn(|c| username_exists(c, "ada")).unwrap());
        assert!(!db.with_conn(|c| username_exists(c, "Ada")).unwrap());
    }

    #[test]
    fn test_flags_and_listing() {
        let db = db();
        let ada = user(&db, "ada");
        user(&db, "bob");

        db.with_conn(|c| set_private_account(c, ada.id, true)).unwrap();
        db.with_conn(|c| set_staff(c, ada.id, true)).unwrap();
        db.with_conn(|c| set_user_picture(c, ada.id, Some("profile_pictures/a.png")))
            .unwrap();

        let users = db.with_conn(list_users).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "ada");
        assert!(users[0].is_private_account);
        assert!(users[0].is_staff);
        assert_eq!(users[0].profile_picture.as_deref(), Some("profile_pictures/a.png"));
    }
}
