//! Initial schema migration.
//!
//! Creates every table of Seisan:
//!
//! - `settlements`: shared-expense sessions
//! - `participants`: people sharing a settlement's costs
//! - `currencies`: user supplied exchange rates, per settlement
//! - `items`: purchases, with optional payer and currency
//! - `benefited`: who shares the cost of each item
//!
//! Every child row carries a `position` so lists keep insertion order.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Settlements {
    Table,
    Id,
    Name,
    UpdatedAt,
    LastAccessedAt,
}

#[derive(Iden)]
enum Participants {
    Table,
    Id,
    SettlementId,
    Name,
    Position,
}

#[derive(Iden)]
enum Currencies {
    Table,
    Id,
    SettlementId,
    Symbol,
    Rate,
    Position,
}

#[derive(Iden)]
enum Items {
    Table,
    Id,
    SettlementId,
    Name,
    Price,
    Quantity,
    PayerId,
    CurrencyId,
    Position,
}

#[derive(Iden)]
enum Benefited {
    Table,
    ItemId,
    ParticipantId,
    Position,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Settlements
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Settlements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settlements::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settlements::Name).string().not_null())
                    .col(
                        ColumnDef::new(Settlements::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Settlements::LastAccessedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-settlements-last_accessed_at")
                    .table(Settlements::Table)
                    .col(Settlements::LastAccessedAt)
                    .col(Settlements::Id)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Participants
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participants::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Participants::SettlementId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Participants::Name).string().not_null())
                    .col(
                        ColumnDef::new(Participants::Position)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-participants-settlement_id")
                            .from(Participants::Table, Participants::SettlementId)
                            .to(Settlements::Table, Settlements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-participants-settlement_id-name-unique")
                    .table(Participants::Table)
                    .col(Participants::SettlementId)
                    .col(Participants::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Currencies
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Currencies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Currencies::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Currencies::SettlementId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Currencies::Symbol).string().not_null())
                    .col(ColumnDef::new(Currencies::Rate).double().not_null())
                    .col(
                        ColumnDef::new(Currencies::Position)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-currencies-settlement_id")
                            .from(Currencies::Table, Currencies::SettlementId)
                            .to(Settlements::Table, Settlements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-currencies-settlement_id-symbol-unique")
                    .table(Currencies::Table)
                    .col(Currencies::SettlementId)
                    .col(Currencies::Symbol)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Items::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Items::SettlementId).string().not_null())
                    .col(ColumnDef::new(Items::Name).string().not_null())
                    .col(ColumnDef::new(Items::Price).double().not_null())
                    .col(ColumnDef::new(Items::Quantity).big_integer().not_null())
                    .col(ColumnDef::new(Items::PayerId).string())
                    .col(ColumnDef::new(Items::CurrencyId).string())
                    .col(ColumnDef::new(Items::Position).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-items-settlement_id")
                            .from(Items::Table, Items::SettlementId)
                            .to(Settlements::Table, Settlements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-items-payer_id")
                            .from(Items::Table, Items::PayerId)
                            .to(Participants::Table, Participants::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-items-currency_id")
                            .from(Items::Table, Items::CurrencyId)
                            .to(Currencies::Table, Currencies::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-items-settlement_id-position")
                    .table(Items::Table)
                    .col(Items::SettlementId)
                    .col(Items::Position)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Benefited
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Benefited::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Benefited::ItemId).string().not_null())
                    .col(ColumnDef::new(Benefited::ParticipantId).string().not_null())
                    .col(ColumnDef::new(Benefited::Position).big_integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(Benefited::ItemId)
                            .col(Benefited::ParticipantId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-benefited-item_id")
                            .from(Benefited::Table, Benefited::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-benefited-participant_id")
                            .from(Benefited::Table, Benefited::ParticipantId)
                            .to(Participants::Table, Participants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-benefited-participant_id")
                    .table(Benefited::Table)
                    .col(Benefited::ParticipantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Benefited::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Currencies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Participants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Settlements::Table).to_owned())
            .await?;
        Ok(())
    }
}
