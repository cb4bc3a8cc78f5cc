use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use serde::Serialize;

use super::user::Plan;

/// Represents a redeemable upgrade code in the `activation_codes` table.
/// A code is written once: redemption permanently records who consumed it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "activation_codes")]
pub struct Model {
    /// The code string itself.
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    /// Plan the code grants when redeemed.
    pub plan: Plan,
    /// ID of the user who redeemed the code, if any.
    pub redeemed_by: Option<i64>,
    /// When the code was redeemed.
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Timestamp when the code was created.
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The user who redeemed this code.
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RedeemedBy",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Outcome of a redemption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// The code was valid and the user's plan is now upgraded.
    Redeemed(Plan),
    /// No such code exists.
    InvalidCode,
    /// The code exists but was already consumed.
    AlreadyRedeemed,
}

impl Model {
    /// Inserts a fresh, unredeemed code.
    pub async fn create(
        db: &DatabaseConnection,
        code: &str,
        plan: Plan,
    ) -> Result<Self, DbErr> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DbErr::Custom("Activation code must not be empty".into()));
        }

        let model = ActiveModel {
            code: Set(code.to_string()),
            plan: Set(plan),
            redeemed_by: Set(None),
            redeemed_at: Set(None),
            created_at: Set(Utc::now()),
        };
        model.insert(db).await
    }

    /// Redeems a code for the given user. The redemption marker is claimed
    /// with a conditional update so two users racing on the same code can
    /// never both win; the loser sees `AlreadyRedeemed`.
    pub async fn redeem(
        db: &DatabaseConnection,
        code: &str,
        user_id: i64,
    ) -> Result<RedeemOutcome, DbErr> {
        let code = code.trim().to_string();

        db.transaction::<_, RedeemOutcome, DbErr>(move |txn| {
            Box::pin(async move {
                let claimed = Entity::update_many()
                    .col_expr(Column::RedeemedBy, Expr::value(user_id))
                    .col_expr(Column::RedeemedAt, Expr::value(Utc::now()))
                    .filter(Column::Code.eq(code.clone()))
                    .filter(Column::RedeemedBy.is_null())
                    .exec(txn)
                    .await?;

                if claimed.rows_affected == 0 {
                    return match Entity::find_by_id(code).one(txn).await? {
                        Some(_) => Ok(RedeemOutcome::AlreadyRedeemed),
                        None => Ok(RedeemOutcome::InvalidCode),
                    };
                }

                let redeemed = Entity::find_by_id(code)
                    .one(txn)
                    .await?
                    .ok_or_else(|| DbErr::Custom("Claimed code disappeared".into()))?;

                let user = super::user::Entity::find_by_id(user_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| DbErr::RecordNotFound(format!("User {} not found", user_id)))?;
                let mut active: super::user::ActiveModel = user.into();
                active.plan = Set(redeemed.plan);
                active.updated_at = Set(Utc::now());
                active.update(txn).await?;

                Ok(RedeemOutcome::Redeemed(redeemed.plan))
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(e) => e,
            TransactionError::Transaction(e) => e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{self, Plan};
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn redeeming_a_valid_code_upgrades_the_user() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "grace@example.com", "pw").await.unwrap();
        Model::create(&db, "UPGRADE-1", Plan::Pro).await.unwrap();

        let outcome = Model::redeem(&db, "UPGRADE-1", u.id).await.unwrap();
        assert_eq!(outcome, RedeemOutcome::Redeemed(Plan::Pro));

        let reloaded = user::Entity::find_by_id(u.id).one(&db).await.unwrap().unwrap();
        assert_eq!(reloaded.plan, Plan::Pro);

        let code = Entity::find_by_id("UPGRADE-1".to_string())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(code.redeemed_by, Some(u.id));
        assert!(code.redeemed_at.is_some());
    }

    #[tokio::test]
    async fn a_code_can_only_be_redeemed_once() {
        let db = setup_test_db().await;
        let a = user::Model::create(&db, "heidi@example.com", "pw").await.unwrap();
        let b = user::Model::create(&db, "ivan@example.com", "pw").await.unwrap();
        Model::create(&db, "UPGRADE-2", Plan::Pro).await.unwrap();

        assert_eq!(
            Model::redeem(&db, "UPGRADE-2", a.id).await.unwrap(),
            RedeemOutcome::Redeemed(Plan::Pro)
        );
        assert_eq!(
            Model::redeem(&db, "UPGRADE-2", b.id).await.unwrap(),
            RedeemOutcome::AlreadyRedeemed
        );

        // The loser's plan is untouched.
        let reloaded = user::Entity::find_by_id(b.id).one(&db).await.unwrap().unwrap();
        assert_eq!(reloaded.plan, Plan::Free);
    }

    #[tokio::test]
    async fn an_unknown_code_is_rejected() {
        let db = setup_test_db().await;
        let u = user::Model::create(&db, "judy@example.com", "pw").await.unwrap();

        assert_eq!(
            Model::redeem(&db, "NO-SUCH-CODE", u.id).await.unwrap(),
            RedeemOutcome::InvalidCode
        );
    }
}
