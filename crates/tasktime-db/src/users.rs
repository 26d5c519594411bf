//! User accounts.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use tasktime_core::UserId;

use crate::{Database, DbError, format_timestamp, is_constraint_violation, parse_timestamp};

/// A user ready to be stored. The password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    /// Stores a new user. Email uniqueness is case-insensitive.
    pub fn create_user(
        &mut self,
        user: &NewUser,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, DbError> {
        let record = UserRecord {
            id: UserId::generate(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: now,
        };
        let inserted = self.conn.execute(
            "
            INSERT INTO users (id, name, email, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                record.id.as_str(),
                record.name,
                record.email,
                record.password_hash,
                format_timestamp(now),
            ],
        );
        match inserted {
            Ok(_) => Ok(record),
            Err(err) if is_constraint_violation(&err) => {
                Err(DbError::EmailTaken(user.email.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Looks up a user by email, ignoring case.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, name, email, password_hash, created_at
                FROM users
                WHERE email = ?
                ",
                [email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, name, email, password_hash, created_at)| -> Result<_, DbError> {
            Ok(UserRecord {
                id: UserId::new(id)?,
                name,
                email,
                password_hash,
                created_at: parse_timestamp(&created_at, "created_at")?,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::at;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Asha".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$hash".to_string(),
        }
    }

    #[test]
    fn create_and_find_user() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let created = db
            .create_user(&new_user("a@x.com"), at("2025-03-10T00:00:00Z"))
            .unwrap();

        let found = db.find_user_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn email_lookup_ignores_case() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.create_user(&new_user("a@x.com"), at("2025-03-10T00:00:00Z"))
            .unwrap();

        assert!(db.find_user_by_email("A@X.COM").unwrap().is_some());
        assert!(db.find_user_by_email("b@x.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.create_user(&new_user("a@x.com"), at("2025-03-10T00:00:00Z"))
            .unwrap();

        let err = db
            .create_user(&new_user("A@x.com"), at("2025-03-10T00:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, DbError::EmailTaken(email) if email == "A@x.com"));
    }
}
