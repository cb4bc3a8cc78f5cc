use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use rand::rngs::OsRng;
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Represents an account in the `users` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Primary key ID (auto-incremented).
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User's unique email address, stored lowercased.
    pub email: String,
    /// Securely hashed password string.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Subscription plan: free or pro.
    pub plan: Plan,
    /// Gradings charged against the day in `last_use_date`.
    pub uses_today: i32,
    /// Local calendar date of the most recent charged grading.
    pub last_use_date: Option<NaiveDate>,
    /// Timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Enum representing subscription plans.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "plan_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Plan {
    #[sea_orm(string_value = "free")]
    Free,

    #[sea_orm(string_value = "pro")]
    Pro,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Activation codes this user has redeemed.
    #[sea_orm(has_many = "super::activation_code::Entity")]
    ActivationCode,
}

impl Related<super::activation_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivationCode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Usage counters captured at the moment a grading was charged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub plan: Plan,
    pub uses_today: i32,
    /// Daily limit in force for this user; `None` means unlimited.
    pub limit: Option<i32>,
}

/// Outcome of the atomic quota check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UsageDecision {
    /// The grading was charged; counters reflect the new state.
    Granted(UsageSnapshot),
    /// The daily limit is already spent. Nothing was mutated.
    Denied { uses_today: i32, limit: i32 },
}

impl Model {
    /// Creates a new user with a hashed password. The email is trimmed and
    /// lowercased before storage so lookups are case-insensitive.
    pub async fn create(
        db: &DatabaseConnection,
        email: &str,
        password: &str,
    ) -> Result<Self, DbErr> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DbErr::Custom("Invalid email address".into()));
        }
        if password.is_empty() {
            return Err(DbErr::Custom("Password must not be empty".into()));
        }

        let password_hash = Self::hash_password(password)
            .map_err(|e| DbErr::Custom(format!("Failed to hash password: {}", e)))?;

        let now = Utc::now();
        let user = ActiveModel {
            email: Set(email),
            password_hash: Set(password_hash),
            plan: Set(Plan::Free),
            uses_today: Set(0),
            last_use_date: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        user.insert(db).await
    }

    /// Looks a user up by email (case-insensitive).
    pub async fn find_by_email(
        db: &DatabaseConnection,
        email: &str,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::Email.eq(email.trim().to_lowercase()))
            .one(db)
            .await
    }

    /// Verifies an email/password pair. Returns the user on success,
    /// `None` for an unknown email or a wrong password.
    pub async fn verify_credentials(
        db: &DatabaseConnection,
        email: &str,
        password: &str,
    ) -> Result<Option<Self>, DbErr> {
        let Some(user) = Self::find_by_email(db, email).await? else {
            return Ok(None);
        };
        if user.verify_password(password) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Hashes a plaintext password using Argon2 with a random salt.
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Verifies a plaintext password against the stored hash.
    pub fn verify_password(&self, password: &str) -> bool {
        PasswordHash::new(&self.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Atomically checks this user's daily quota and, if allowed, charges one
    /// grading. The check and the increment run in a single transaction so
    /// concurrent requests cannot both slip under the limit.
    ///
    /// Counters that belong to an earlier calendar date are treated as zero;
    /// the stored date only advances when a grading is actually charged.
    /// A denial mutates nothing.
    pub async fn record_usage(
        db: &DatabaseConnection,
        user_id: i64,
        free_daily_limit: i32,
    ) -> Result<UsageDecision, DbErr> {
        let today = Local::now().date_naive();

        db.transaction::<_, UsageDecision, DbErr>(move |txn| {
            Box::pin(async move {
                let user = Entity::find_by_id(user_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| DbErr::RecordNotFound(format!("User {} not found", user_id)))?;

                let effective_uses = if user.last_use_date == Some(today) {
                    user.uses_today
                } else {
                    0
                };

                let limit = match user.plan {
                    Plan::Free => Some(free_daily_limit),
                    Plan::Pro => None,
                };

                if let Some(limit) = limit {
                    if effective_uses >= limit {
                        return Ok(UsageDecision::Denied {
                            uses_today: effective_uses,
                            limit,
                        });
                    }
                }

                let plan = user.plan;
                let new_uses = effective_uses + 1;
                let mut active: ActiveModel = user.into();
                active.uses_today = Set(new_uses);
                active.last_use_date = Set(Some(today));
                active.updated_at = Set(Utc::now());
                active.update(txn).await?;

                Ok(UsageDecision::Granted(UsageSnapshot {
                    plan,
                    uses_today: new_uses,
                    limit,
                }))
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(e) => e,
            TransactionError::Transaction(e) => e,
        })
    }

    /// Upgrades this user's plan.
    pub async fn set_plan(
        db: &DatabaseConnection,
        user_id: i64,
        plan: Plan,
    ) -> Result<(), DbErr> {
        let user = Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("User {} not found", user_id)))?;
        let mut active: ActiveModel = user.into();
        active.plan = Set(plan);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn create_normalizes_email_and_hashes_password() {
        let db = setup_test_db().await;
        let user = Model::create(&db, "  Alice@Example.COM ", "hunter2")
            .await
            .unwrap();

        assert_eq!(user.email, "alice@example.com");
        assert_ne!(user.password_hash, "hunter2");
        assert_eq!(user.plan, Plan::Free);
        assert_eq!(user.uses_today, 0);
        assert!(user.last_use_date.is_none());
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let db = setup_test_db().await;
        assert!(Model::create(&db, "not-an-email", "pw").await.is_err());
        assert!(Model::create(&db, "a@b.com", "").await.is_err());
    }

    #[tokio::test]
    async fn verify_credentials_accepts_only_the_right_password() {
        let db = setup_test_db().await;
        Model::create(&db, "bob@example.com", "secret").await.unwrap();

        let ok = Model::verify_credentials(&db, "BOB@example.com", "secret")
            .await
            .unwrap();
        assert!(ok.is_some());

        let wrong = Model::verify_credentials(&db, "bob@example.com", "nope")
            .await
            .unwrap();
        assert!(wrong.is_none());

        let unknown = Model::verify_credentials(&db, "carol@example.com", "secret")
            .await
            .unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn free_user_is_granted_until_the_limit_then_denied() {
        let db = setup_test_db().await;
        let user = Model::create(&db, "dave@example.com", "pw").await.unwrap();

        for expected in 1..=3 {
            match Model::record_usage(&db, user.id, 3).await.unwrap() {
                UsageDecision::Granted(snap) => {
                    assert_eq!(snap.uses_today, expected);
                    assert_eq!(snap.limit, Some(3));
                }
                other => panic!("expected grant, got {:?}", other),
            }
        }

        match Model::record_usage(&db, user.id, 3).await.unwrap() {
            UsageDecision::Denied { uses_today, limit } => {
                assert_eq!(uses_today, 3);
                assert_eq!(limit, 3);
            }
            other => panic!("expected denial, got {:?}", other),
        }

        // A denial leaves the counters untouched.
        let reloaded = Entity::find_by_id(user.id).one(&db).await.unwrap().unwrap();
        assert_eq!(reloaded.uses_today, 3);
    }

    #[tokio::test]
    async fn stale_counter_resets_on_the_next_grading() {
        let db = setup_test_db().await;
        let user = Model::create(&db, "erin@example.com", "pw").await.unwrap();

        let yesterday = Local::now().date_naive() - chrono::Duration::days(1);
        let mut active: ActiveModel = user.clone().into();
        active.uses_today = Set(99);
        active.last_use_date = Set(Some(yesterday));
        active.update(&db).await.unwrap();

        match Model::record_usage(&db, user.id, 5).await.unwrap() {
            UsageDecision::Granted(snap) => assert_eq!(snap.uses_today, 1),
            other => panic!("expected grant, got {:?}", other),
        }

        let reloaded = Entity::find_by_id(user.id).one(&db).await.unwrap().unwrap();
        assert_eq!(reloaded.uses_today, 1);
        assert_eq!(reloaded.last_use_date, Some(Local::now().date_naive()));
    }

    #[tokio::test]
    async fn pro_user_is_never_denied_but_still_counted() {
        let db = setup_test_db().await;
        let user = Model::create(&db, "frank@example.com", "pw").await.unwrap();
        Model::set_plan(&db, user.id, Plan::Pro).await.unwrap();

        for expected in 1..=10 {
            match Model::record_usage(&db, user.id, 2).await.unwrap() {
                UsageDecision::Granted(snap) => {
                    assert_eq!(snap.uses_today, expected);
                    assert_eq!(snap.limit, None);
                }
                other => panic!("expected grant, got {:?}", other),
            }
        }
    }
}
