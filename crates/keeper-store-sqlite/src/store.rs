//! [`SqliteStore`] — users, sessions and profiles in one SQLite file.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use keeper_core::{
  identity::{Session, User},
  profile::{NewProfile, Profile, ProfileUpdate},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawProfile, RawSession, RawUser, decode_dt, encode_dt, encode_privacy, encode_role,
    encode_uuid,
  },
  schema::SCHEMA,
  token,
};

/// How long an access token lives unless configured otherwise.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60;

// ─── Store ───────────────────────────────────────────────────────────────────

/// The Keeper's identity service backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:        tokio_rusqlite::Connection,
  session_ttl: Duration,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS) })
  }

  pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
    self.session_ttl = ttl;
    self
  }

  pub fn session_ttl(&self) -> Duration { self.session_ttl }

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user. Fails with [`Error::EmailTaken`] if the address is
  /// already registered, in any letter case.
  pub async fn register(&self, email: &str, password: &str) -> Result<User> {
    let email = email.trim().to_owned();
    let password = password.to_owned();
    let password_hash = tokio::task::spawn_blocking(move || token::hash_password(&password))
      .await
      .map_err(|e| Error::Hash(e.to_string()))??;

    let user = User { id: Uuid::new_v4(), email, email_verified: true };
    let id_str = encode_uuid(user.id);
    let email_str = user.email.clone();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, email, password_hash, email_verified, created_at)
           VALUES (?1, ?2, ?3, 1, ?4)",
          rusqlite::params![id_str, email_str, password_hash, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from)
      .map_err(|e| {
        if e.is_unique_violation() { Error::EmailTaken(user.email.clone()) } else { e }
      })?;

    info!(user_id = %user.id, "registered user");
    Ok(user)
  }

  pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS),
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(self.credentials(email).await?.map(|(user, _)| user))
  }

  async fn credentials(&self, email: &str) -> Result<Option<(User, String)>> {
    let email = email.trim().to_owned();
    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {}, password_hash FROM users WHERE email = ?1",
                RawUser::COLUMNS
              ),
              rusqlite::params![email],
              |row| Ok((RawUser::from_row(row)?, row.get::<_, String>(3)?)),
            )
            .optional()?,
        )
      })
      .await?;
    row
      .map(|(raw, hash)| -> Result<_> { Ok((raw.into_user()?, hash)) })
      .transpose()
  }

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Check a password and open a session. An unknown address and a wrong
  /// password both fail with [`Error::InvalidCredentials`].
  pub async fn authenticate(&self, email: &str, password: &str) -> Result<Session> {
    let Some((user, hash)) = self.credentials(email).await? else {
      debug!("sign-in for unknown address");
      return Err(Error::InvalidCredentials);
    };

    let password = password.to_owned();
    let verified = tokio::task::spawn_blocking(move || token::verify_password(&password, &hash))
      .await
      .map_err(|e| Error::Hash(e.to_string()))?;
    if !verified {
      debug!(user_id = %user.id, "sign-in with wrong password");
      return Err(Error::InvalidCredentials);
    }

    self.open_session(user).await
  }

  /// Issue a fresh token pair for `user`.
  pub async fn open_session(&self, user: User) -> Result<Session> {
    let session = self.mint(user);
    let session_id = encode_uuid(Uuid::new_v4());
    let user_id = encode_uuid(session.user.id);
    let access_hash = token::digest(&session.access_token);
    let refresh_hash = token::digest(&session.refresh_token);
    let expires_at = encode_dt(session.expires_at);
    let created_at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (
             session_id, user_id, access_hash, refresh_hash, expires_at, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            session_id,
            user_id,
            access_hash,
            refresh_hash,
            expires_at,
            created_at,
          ],
        )?;
        Ok(())
      })
      .await?;

    debug!(user_id = %session.user.id, expires_at = %session.expires_at, "opened session");
    Ok(session)
  }

  fn mint(&self, user: User) -> Session {
    Session {
      access_token: token::generate(),
      refresh_token: token::generate(),
      expires_at: Utc::now() + self.session_ttl,
      user,
    }
  }

  async fn session_by(
    &self,
    column: &'static str,
    value: &str,
  ) -> Result<Option<(String, DateTime<Utc>, User)>> {
    let hash = token::digest(value);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT s.session_id, s.expires_at, u.user_id, u.email, u.email_verified
                 FROM sessions s JOIN users u ON u.user_id = s.user_id
                 WHERE s.{column} = ?1"
              ),
              rusqlite::params![hash],
              RawSession::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|raw| -> Result<_> {
        Ok((raw.session_id, decode_dt(&raw.expires_at)?, raw.user.into_user()?))
      })
      .transpose()
  }

  /// The user behind a live access token; `None` if the token is unknown,
  /// revoked or expired.
  pub async fn validate(&self, access_token: &str) -> Result<Option<User>> {
    Ok(self.resolve(access_token).await?.map(|(user, _)| user))
  }

  /// Like [`validate`](Self::validate), also reporting when the token
  /// expires.
  pub async fn resolve(&self, access_token: &str) -> Result<Option<(User, DateTime<Utc>)>> {
    let now = Utc::now();
    Ok(
      self
        .session_by("access_hash", access_token)
        .await?
        .filter(|(_, expires_at, _)| *expires_at > now)
        .map(|(_, expires_at, user)| (user, expires_at)),
    )
  }

  /// Exchange a refresh token for a new token pair. Both old tokens stop
  /// working. Refresh tokens outlive their access token until revoked.
  pub async fn refresh(&self, refresh_token: &str) -> Result<Session> {
    let (session_id, _, user) = self
      .session_by("refresh_hash", refresh_token)
      .await?
      .ok_or(Error::InvalidToken)?;

    let session = self.mint(user);
    let access_hash = token::digest(&session.access_token);
    let refresh_hash = token::digest(&session.refresh_token);
    let expires_at = encode_dt(session.expires_at);

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE sessions SET access_hash = ?2, refresh_hash = ?3, expires_at = ?4
           WHERE session_id = ?1",
          rusqlite::params![session_id, access_hash, refresh_hash, expires_at],
        )?)
      })
      .await?;
    if updated == 0 {
      // Revoked between the lookup and the rotation.
      return Err(Error::InvalidToken);
    }

    debug!(user_id = %session.user.id, "rotated session tokens");
    Ok(session)
  }

  /// End the session holding `access_token`. Unknown tokens are ignored.
  pub async fn revoke(&self, access_token: &str) -> Result<()> {
    let hash = token::digest(access_token);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE access_hash = ?1", rusqlite::params![hash])?)
      })
      .await?;
    debug!(removed, "revoked session");
    Ok(())
  }

  /// Drop every session whose access token has expired and report how many
  /// went.
  pub async fn purge_expired_sessions(&self) -> Result<usize> {
    let now = Utc::now();
    let rows: Vec<(String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT session_id, expires_at FROM sessions")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut expired = Vec::new();
    for (id, expires_at) in rows {
      if decode_dt(&expires_at)? <= now {
        expired.push(id);
      }
    }
    let count = expired.len();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for id in &expired {
          tx.execute("DELETE FROM sessions WHERE session_id = ?1", rusqlite::params![id])?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    if count > 0 {
      info!(count, "purged expired sessions");
    }
    Ok(count)
  }

  // ── Profiles ──────────────────────────────────────────────────────────

  pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(user_id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM profiles WHERE user_id = ?1", RawProfile::COLUMNS),
              rusqlite::params![id_str],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawProfile::into_profile).transpose()
  }

  /// Create the profile for a user who has none. Fails with
  /// [`Error::ProfileExists`] otherwise.
  pub async fn insert_profile(&self, new: NewProfile) -> Result<Profile> {
    let user_id = new.user_id;
    let profile = new.into_profile(Utc::now());
    self
      .write_profile(&profile, false)
      .await
      .map_err(|e| if e.is_unique_violation() { Error::ProfileExists(user_id) } else { e })?;
    info!(%user_id, role = %profile.role, "created profile");
    Ok(profile)
  }

  /// Create or overwrite a profile, keeping the original `created_at`.
  pub async fn upsert_profile(&self, new: NewProfile) -> Result<Profile> {
    let user_id = new.user_id;
    let profile = new.into_profile(Utc::now());
    self.write_profile(&profile, true).await?;
    self
      .get_profile(user_id)
      .await?
      .ok_or(Error::ProfileNotFound(user_id))
  }

  async fn write_profile(&self, profile: &Profile, upsert: bool) -> Result<()> {
    let user_id = encode_uuid(profile.user_id);
    let email = profile.email.clone();
    let full_name = profile.full_name.clone();
    let employee_id = profile.employee_id.clone();
    let role = encode_role(profile.role);
    let department = profile.department.clone();
    let phone = profile.phone.clone();
    let emergency_contact = profile.emergency_contact.clone();
    let floor_number = profile.floor_number;
    let office_location = profile.office_location.clone();
    let privacy_settings = encode_privacy(&profile.privacy_settings)?;
    let is_active = profile.is_active;
    let created_at = encode_dt(profile.created_at);
    let updated_at = encode_dt(profile.updated_at);

    let on_conflict = if upsert {
      "ON CONFLICT (user_id) DO UPDATE SET
         email = excluded.email, full_name = excluded.full_name,
         employee_id = excluded.employee_id, role = excluded.role,
         department = excluded.department, phone = excluded.phone,
         emergency_contact = excluded.emergency_contact,
         floor_number = excluded.floor_number,
         office_location = excluded.office_location,
         privacy_settings = excluded.privacy_settings,
         is_active = excluded.is_active, updated_at = excluded.updated_at"
    } else {
      ""
    };

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO profiles ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, \
             ?12, ?13, ?14) {on_conflict}",
            RawProfile::COLUMNS
          ),
          rusqlite::params![
            user_id,
            email,
            full_name,
            employee_id,
            role,
            department,
            phone,
            emergency_contact,
            floor_number,
            office_location,
            privacy_settings,
            is_active,
            created_at,
            updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Apply a partial update and return the stored result. The read and the
  /// write share one immediate transaction, so concurrent updates to the same
  /// profile apply one after the other.
  pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Profile> {
    let id_str = encode_uuid(user_id);
    let profile = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let raw = tx
          .query_row(
            &format!("SELECT {} FROM profiles WHERE user_id = ?1", RawProfile::COLUMNS),
            rusqlite::params![id_str],
            RawProfile::from_row,
          )
          .optional()?;
        let Some(raw) = raw else { return Ok(None) };

        let prepared = (|| -> Result<_> {
          let mut profile = raw.into_profile()?;
          update.apply_to(&mut profile, Utc::now());
          let privacy_settings = encode_privacy(&profile.privacy_settings)?;
          Ok((profile, privacy_settings))
        })();
        let (profile, privacy_settings) = match prepared {
          Ok(prepared) => prepared,
          Err(e) => return Ok(Some(Err(e))),
        };

        // `role`, `email` and `created_at` are never written here.
        tx.execute(
          "UPDATE profiles SET
             full_name = ?2, employee_id = ?3, department = ?4, phone = ?5,
             emergency_contact = ?6, floor_number = ?7, office_location = ?8,
             privacy_settings = ?9, is_active = ?10, updated_at = ?11
           WHERE user_id = ?1",
          rusqlite::params![
            id_str,
            profile.full_name,
            profile.employee_id,
            profile.department,
            profile.phone,
            profile.emergency_contact,
            profile.floor_number,
            profile.office_location,
            privacy_settings,
            profile.is_active,
            encode_dt(profile.updated_at),
          ],
        )?;
        tx.commit()?;
        Ok(Some(Ok(profile)))
      })
      .await?
      .ok_or(Error::ProfileNotFound(user_id))??;

    debug!(%user_id, "updated profile");
    Ok(profile)
  }
}
