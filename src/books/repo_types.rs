use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Book catalog record. ISBN is the natural key; ownership is set by the
/// first import that names the ISBN and never reassigned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: Uuid,
    pub isbn: String,
    pub name: String,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// The numeric payload of one snapshot row. Blank or unparsable cells
/// coerce to zero during ingestion, so every field is total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryNumbers {
    pub opening_stock: i64,
    pub printed_copies: i64,
    pub sold_copies: i64,
    pub return_copies: i64,
    pub mrp: f64,
    pub amount: f64,
    pub complimentary_damage: i64,
    pub closing_stock: i64,
}

/// Period bounds of one entry, as scanned for the per-user event listing.
#[derive(Debug, Clone, FromRow)]
pub struct PeriodRow {
    pub from_date: OffsetDateTime,
    pub to_date: OffsetDateTime,
}

/// Period bounds joined to the owning user, for the all-users listing.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedPeriodRow {
    pub from_date: OffsetDateTime,
    pub to_date: OffsetDateTime,
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

/// Entry joined to its book, for the exact-range report.
#[derive(Debug, Clone, FromRow)]
pub struct BookEntryRow {
    pub isbn: String,
    pub book_name: String,
    pub from_date: OffsetDateTime,
    pub to_date: OffsetDateTime,
    pub opening_stock: i64,
    pub printed_copies: i64,
    pub sold_copies: i64,
    pub return_copies: i64,
    pub mrp: f64,
    pub amount: f64,
    pub complimentary_damage: i64,
    pub closing_stock: i64,
}

/// Book with owner contact, for the admin catalog listing.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedBookRow {
    pub id: Uuid,
    pub isbn: String,
    pub name: String,
    pub user_id: Uuid,
    pub email: String,
    pub owner_name: Option<String>,
}
