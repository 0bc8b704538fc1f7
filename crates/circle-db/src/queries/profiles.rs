//! Profile queries.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use circle_models::{Profile, UserId};

use crate::error::{DbError, DbResult};

/// Changes to apply to a profile. `None` leaves a field untouched,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub bio: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub date_of_birth: Option<Option<NaiveDate>>,
}

pub fn insert_profile(
    conn: &Connection,
    user_id: UserId,
    bio: Option<&str>,
    date_of_birth: Option<NaiveDate>,
) -> DbResult<()> {
    conn.execute(
        "INSERT INTO profiles (user_id, bio, date_of_birth, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id.get(), bio, date_of_birth, Utc::now()],
    )?;
    Ok(())
}

pub fn get_profile(conn: &Connection, user_id: UserId) -> DbResult<Option<Profile>> {
    let profile = conn
        .query_row(
            "SELECT user_id, bio, profile_picture, location, date_of_birth, created_at
             FROM profiles WHERE user_id = ?1",
            [user_id.get()],
            |row| {
                Ok(Profile {
                    user_id: UserId(row.get(0)?),
                    bio: row.get(1)?,
                    profile_picture: row.get(2)?,
                    location: row.get(3)?,
                    date_of_birth: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(profile)
}

/// Apply `changes` and return the updated profile.
pub fn update_profile(conn: &Connection, user_id: UserId, changes: &ProfileChanges) -> DbResult<Profile> {
    let mut profile = get_profile(conn, user_id)?
        .ok_or_else(|| DbError::not_found(format!("profile for user {}", user_id)))?;

    if let Some(bio) = &changes.bio {
        profile.bio = bio.clone();
    }
    if let Some(location) = &changes.location {
        profile.location = location.clone();
    }
    if let Some(date_of_birth) = changes.date_of_birth {
        profile.date_of_birth = date_of_birth;
    }

    conn.execute(
        "UPDATE profiles SET bio = ?2, location = ?3, date_of_birth = ?4 WHERE user_id = ?1",
        params![user_id.get(), profile.bio, profile.location, profile.date_of_birth],
    )?;
    Ok(profile)
}

/// Replace the profile picture, returning the previous path.
pub fn set_profile_picture(
    conn: &Connection,
    user_id: UserId,
    picture: Option<&str>,
) -> DbResult<Option<String>> {
    let previous: Option<String> = conn
        .query_row(
            "SELECT profile_picture FROM profiles WHERE user_id = ?1",
            [user_id.get()],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| DbError::not_found(format!("profile for user {}", user_id)))?;

    conn.execute(
        "UPDATE profiles SET profile_picture = ?2 WHERE user_id = ?1",
        params![user_id.get(), picture],
    )?;
    Ok(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{db, user};

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let db = db();
        let ada = user(&db, "ada");

        db.with_conn(|c| {
            update_profile(
                c,
                ada.id,
                &ProfileChanges {
                    bio: Some(Some("Mathematician".to_string())),
                    location: Some(Some("London".to_string())),
                    ..Default::default()
                },
            )
        })
        .unwrap();

        let profile = db
            .with_conn(|c| {
                update_profile(
                    c,
                    ada.id,
                    &ProfileChanges {
                        location: Some(None),
                        ..Default::default()
                    },
                )
            })
            .unwrap();
        assert_eq!(profile.bio.as_deref(), Some("Mathematician"));
        assert_eq!(profile.location, None);

        let stored = db.with_conn(|c| get_profile(c, ada.id)).unwrap().unwrap();
        assert_eq!(stored.bio.as_deref(), Some("Mathematician"));
    }

    #[test]
    fn test_set_picture_returns_previous() {
        let db = db();
        let ada = user(&db, "ada");
        let first = db.with_conn(|c| set_profile_picture(c, ada.id, Some("p/1.png"))).unwrap();
        assert_eq!(first, None);
        let second = db.with_conn(|c| set_profile_picture(c, ada.id, Some("p/2.png"))).unwrap();
        assert_eq!(second.as_deref(), Some("p/1.png"));
    }

    #[test]
    fn test_update_missing_profile() {
        let db = db();
        let result = db.with_conn(|c| update_profile(c, UserId(99), &ProfileChanges::default()));
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }
}
