use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum CardLoans {
    Table,
    Id,
    Card,
    Lender,
    Borrower,
    BorrowerName,
    Quantity,
    Tag,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CardLoans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CardLoans::Id)
                            .blob()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CardLoans::Card).string().not_null())
                    .col(ColumnDef::new(CardLoans::Lender).big_integer().not_null())
                    .col(ColumnDef::new(CardLoans::Borrower).big_integer().not_null())
                    .col(ColumnDef::new(CardLoans::BorrowerName).string().not_null())
                    .col(ColumnDef::new(CardLoans::Quantity).big_integer().not_null())
                    .col(
                        ColumnDef::new(CardLoans::Tag)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(CardLoans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(CardLoans::Quantity).gt(0))
                    .to_owned(),
            )
            .await?;

        // Return walks rows oldest first inside this key.
        manager
            .create_index(
                Index::create()
                    .name("idx-card_loans-fifo")
                    .table(CardLoans::Table)
                    .col(CardLoans::Card)
                    .col(CardLoans::Lender)
                    .col(CardLoans::Borrower)
                    .col(CardLoans::Tag)
                    .col(CardLoans::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-card_loans-lender-borrower")
                    .table(CardLoans::Table)
                    .col(CardLoans::Lender)
                    .col(CardLoans::Borrower)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx-card_loans-lender-borrower")
                    .table(CardLoans::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx-card_loans-fifo")
                    .table(CardLoans::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(CardLoans::Table).to_owned())
            .await?;
        Ok(())
    }
}
