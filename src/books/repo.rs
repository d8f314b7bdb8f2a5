use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::books::repo_types::{
    Book, BookEntryRow, EntryNumbers, OwnedBookRow, OwnedPeriodRow, PeriodRow,
};

impl Book {
    /// Find-or-create keyed on ISBN. The insert defers to the unique
    /// constraint; losing the race means the ISBN already exists, so fall
    /// through to the select and reuse it. Ownership is never reassigned.
    pub async fn find_or_create(
        db: &PgPool,
        isbn: &str,
        name: &str,
        owner_id: Uuid,
    ) -> anyhow::Result<Book> {
        let inserted = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (isbn, name, user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (isbn) DO NOTHING
            RETURNING id, isbn, name, user_id, created_at
            "#,
        )
        .bind(isbn)
        .bind(name)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;

        if let Some(book) = inserted {
            return Ok(book);
        }

        let existing = sqlx::query_as::<_, Book>(
            "SELECT id, isbn, name, user_id, created_at FROM books WHERE isbn = $1",
        )
        .bind(isbn)
        .fetch_optional(db)
        .await?;

        existing.ok_or_else(|| anyhow::anyhow!("book {isbn} missing after conflicting insert"))
    }

    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, isbn, name, user_id, created_at
            FROM books
            WHERE user_id = $1
            ORDER BY isbn
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(books)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<OwnedBookRow>> {
        let books = sqlx::query_as::<_, OwnedBookRow>(
            r#"
            SELECT b.id, b.isbn, b.name, b.user_id, u.email, u.name AS owner_name
            FROM books b
            JOIN users u ON u.id = b.user_id
            ORDER BY b.isbn
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(books)
    }
}

/// Appends one snapshot row. There is no uniqueness on
/// (book_id, from_date, to_date): re-imports create duplicates and the
/// event listings deduplicate at read time.
pub async fn insert_entry(
    db: &PgPool,
    book_id: Uuid,
    from_date: OffsetDateTime,
    to_date: OffsetDateTime,
    numbers: &EntryNumbers,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO entries (
            book_id, from_date, to_date,
            opening_stock, printed_copies, sold_copies, return_copies,
            mrp, amount, complimentary_damage, closing_stock
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(book_id)
    .bind(from_date)
    .bind(to_date)
    .bind(numbers.opening_stock)
    .bind(numbers.printed_copies)
    .bind(numbers.sold_copies)
    .bind(numbers.return_copies)
    .bind(numbers.mrp)
    .bind(numbers.amount)
    .bind(numbers.complimentary_damage)
    .bind(numbers.closing_stock)
    .execute(db)
    .await?;
    Ok(())
}

/// All period bounds for the user's books, newest first.
pub async fn periods_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<PeriodRow>> {
    let rows = sqlx::query_as::<_, PeriodRow>(
        r#"
        SELECT e.from_date, e.to_date
        FROM entries e
        JOIN books b ON b.id = e.book_id
        WHERE b.user_id = $1
        ORDER BY e.from_date DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// All period bounds joined to their owners, newest first across users.
pub async fn periods_for_all(db: &PgPool) -> anyhow::Result<Vec<OwnedPeriodRow>> {
    let rows = sqlx::query_as::<_, OwnedPeriodRow>(
        r#"
        SELECT e.from_date, e.to_date, b.user_id, u.email, u.name
        FROM entries e
        JOIN books b ON b.id = e.book_id
        JOIN users u ON u.id = b.user_id
        ORDER BY e.from_date DESC
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Entries of the user's books matching both bounds exactly. This is not
/// a containment query: an entry sharing only one bound does not match.
pub async fn entries_by_exact_range(
    db: &PgPool,
    user_id: Uuid,
    from_date: OffsetDateTime,
    to_date: OffsetDateTime,
) -> anyhow::Result<Vec<BookEntryRow>> {
    let rows = sqlx::query_as::<_, BookEntryRow>(
        r#"
        SELECT b.isbn, b.name AS book_name, e.from_date, e.to_date,
               e.opening_stock, e.printed_copies, e.sold_copies, e.return_copies,
               e.mrp, e.amount, e.complimentary_damage, e.closing_stock
        FROM entries e
        JOIN books b ON b.id = e.book_id
        WHERE b.user_id = $1 AND e.from_date = $2 AND e.to_date = $3
        ORDER BY b.isbn
        "#,
    )
    .bind(user_id)
    .bind(from_date)
    .bind(to_date)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
