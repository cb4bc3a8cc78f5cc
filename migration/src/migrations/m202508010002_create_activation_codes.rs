use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202508010002_create_activation_codes"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("activation_codes"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("code")).string().not_null().primary_key())
                    .col(ColumnDef::new(Alias::new("plan")).string().not_null())
                    .col(ColumnDef::new(Alias::new("redeemed_by")).big_integer())
                    .col(ColumnDef::new(Alias::new("redeemed_at")).timestamp())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activation_codes_redeemed_by")
                            .from(Alias::new("activation_codes"), Alias::new("redeemed_by"))
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("activation_codes")).to_owned())
            .await
    }
}
