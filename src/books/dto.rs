use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::books::repo_types::{Book, OwnedBookRow};

/// One distinct reporting period seen in a user's entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub from_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub to_date: OffsetDateTime,
}

/// Per-user deduplicated event list for the admin report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUploadEvents {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub events: Vec<UploadEvent>,
}

/// Entry fields as projected into the exact-range report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySnapshot {
    pub opening_stock: i64,
    pub printed_copies: i64,
    pub sold_copies: i64,
    pub return_copies: i64,
    pub mrp: f64,
    pub amount: f64,
    pub complimentary_damage: i64,
    pub closing_stock: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub from_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub to_date: OffsetDateTime,
}

/// A book and its matching entries in the exact-range report. Books with no
/// matching entry never appear.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookEntries {
    pub isbn: String,
    pub book_name: String,
    pub entries: Vec<EntrySnapshot>,
}

/// Book as listed to its owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: Uuid,
    pub isbn: String,
    pub name: String,
}

impl From<Book> for BookSummary {
    fn from(b: Book) -> Self {
        Self {
            id: b.id,
            isbn: b.isbn,
            name: b.name,
        }
    }
}

/// Book plus owner contact, for the admin catalog.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedBook {
    pub id: Uuid,
    pub isbn: String,
    pub name: String,
    pub user_id: Uuid,
    pub owner_email: String,
    pub owner_name: Option<String>,
}

impl From<OwnedBookRow> for OwnedBook {
    fn from(b: OwnedBookRow) -> Self {
        Self {
            id: b.id,
            isbn: b.isbn,
            name: b.name,
            user_id: b.user_id,
            owner_email: b.email,
            owner_name: b.owner_name,
        }
    }
}
