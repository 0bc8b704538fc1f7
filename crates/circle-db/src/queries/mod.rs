//! Query modules. Every function takes a `&Connection` so it can run inside
//! a caller-owned transaction.

pub mod engagement;
pub mod friends;
pub mod posts;
pub mod profiles;
pub mod users;

use std::str::FromStr;

use rusqlite::types::Type;

/// Parse a TEXT column into an enum, reporting failures as a column conversion error.
pub(crate) fn parse_column<T>(index: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

/// `?, ?, ?` for an `IN (...)` clause with `n` parameters.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
pub(crate) mod test_support {
    use circle_models::User;

    use crate::queries::users::{insert_user, NewUser};
    use crate::Database;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, name: &str) -> User {
        db.with_tx(|tx| {
            insert_user(
                tx,
                &NewUser {
                    email: format!("{}@example.com", name),
                    username: name.to_string(),
                    password_hash: "hash".to_string(),
                    ..Default::default()
                },
            )
        })
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
