use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::books::dto::{BookEntries, EntrySnapshot, UploadEvent, UserUploadEvents};
use crate::books::repo_types::{BookEntryRow, OwnedPeriodRow, PeriodRow};
use crate::dates::period_key;

/// Collapses duplicate reporting periods: the first occurrence in scan order
/// wins, later rows with the same (from, to) pair are dropped. The scan
/// arrives ordered by from_date descending, so the output keeps that order.
pub fn dedupe_periods(rows: &[PeriodRow]) -> Vec<UploadEvent> {
    let mut seen = HashSet::new();
    let mut events = Vec::new();
    for row in rows {
        if seen.insert(period_key(row.from_date, row.to_date)) {
            events.push(UploadEvent {
                from_date: row.from_date,
                to_date: row.to_date,
            });
        }
    }
    events
}

/// Groups the global scan by owner, keeping users in first-seen order and
/// deduplicating periods independently within each group. Only users with at
/// least one entry appear.
pub fn group_periods_by_user(rows: &[OwnedPeriodRow]) -> Vec<UserUploadEvents> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut seen: HashMap<Uuid, HashSet<String>> = HashMap::new();
    let mut groups: Vec<UserUploadEvents> = Vec::new();

    for row in rows {
        let idx = match index.get(&row.user_id) {
            Some(&i) => i,
            None => {
                groups.push(UserUploadEvents {
                    user_id: row.user_id,
                    email: row.email.clone(),
                    name: row.name.clone(),
                    events: Vec::new(),
                });
                index.insert(row.user_id, groups.len() - 1);
                groups.len() - 1
            }
        };

        let keys = seen.entry(row.user_id).or_default();
        if keys.insert(period_key(row.from_date, row.to_date)) {
            groups[idx].events.push(UploadEvent {
                from_date: row.from_date,
                to_date: row.to_date,
            });
        }
    }

    groups
}

/// Groups exact-range rows by book ISBN in first-seen order. A book with no
/// matching row contributes nothing; there are no zero-filled placeholders.
pub fn group_entries_by_book(rows: Vec<BookEntryRow>) -> Vec<BookEntries> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<BookEntries> = Vec::new();

    for row in rows {
        let idx = match index.get(&row.isbn) {
            Some(&i) => i,
            None => {
                groups.push(BookEntries {
                    isbn: row.isbn.clone(),
                    book_name: row.book_name.clone(),
                    entries: Vec::new(),
                });
                index.insert(row.isbn.clone(), groups.len() - 1);
                groups.len() - 1
            }
        };

        groups[idx].entries.push(EntrySnapshot {
            opening_stock: row.opening_stock,
            printed_copies: row.printed_copies,
            sold_copies: row.sold_copies,
            return_copies: row.return_copies,
            mrp: row.mrp,
            amount: row.amount,
            complimentary_damage: row.complimentary_damage,
            closing_stock: row.closing_stock,
            from_date: row.from_date,
            to_date: row.to_date,
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::OffsetDateTime;

    fn period(from: OffsetDateTime, to: OffsetDateTime) -> PeriodRow {
        PeriodRow {
            from_date: from,
            to_date: to,
        }
    }

    const JAN_1: OffsetDateTime = datetime!(2024-01-01 00:00:00 UTC);
    const JAN_31: OffsetDateTime = datetime!(2024-01-31 00:00:00 UTC);
    const FEB_1: OffsetDateTime = datetime!(2024-02-01 00:00:00 UTC);
    const FEB_29: OffsetDateTime = datetime!(2024-02-29 00:00:00 UTC);

    #[test]
    fn dedupe_keeps_first_occurrence_and_order() {
        let rows = vec![
            period(FEB_1, FEB_29),
            period(JAN_1, JAN_31),
            period(FEB_1, FEB_29),
            period(JAN_1, JAN_31),
        ];
        let events = dedupe_periods(&rows);
        assert_eq!(
            events,
            vec![
                UploadEvent {
                    from_date: FEB_1,
                    to_date: FEB_29
                },
                UploadEvent {
                    from_date: JAN_1,
                    to_date: JAN_31
                },
            ]
        );
    }

    #[test]
    fn dedupe_distinguishes_periods_sharing_from_date() {
        let rows = vec![period(JAN_1, JAN_31), period(JAN_1, FEB_29)];
        assert_eq!(dedupe_periods(&rows).len(), 2);
    }

    #[test]
    fn dedupe_of_empty_scan_is_empty() {
        assert!(dedupe_periods(&[]).is_empty());
    }

    fn owned(
        from: OffsetDateTime,
        to: OffsetDateTime,
        user_id: Uuid,
        email: &str,
    ) -> OwnedPeriodRow {
        OwnedPeriodRow {
            from_date: from,
            to_date: to,
            user_id,
            email: email.into(),
            name: None,
        }
    }

    #[test]
    fn grouping_dedupes_per_user_independently() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        // Same period appears for both users and twice for Alice.
        let rows = vec![
            owned(FEB_1, FEB_29, alice, "alice@example.com"),
            owned(FEB_1, FEB_29, bob, "bob@example.com"),
            owned(FEB_1, FEB_29, alice, "alice@example.com"),
            owned(JAN_1, JAN_31, alice, "alice@example.com"),
        ];

        let groups = group_periods_by_user(&rows);
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].email, "alice@example.com");
        assert_eq!(groups[0].events.len(), 2);
        assert_eq!(groups[0].events[0].from_date, FEB_1);

        assert_eq!(groups[1].email, "bob@example.com");
        assert_eq!(groups[1].events.len(), 1);
    }

    #[test]
    fn grouping_keeps_users_in_first_seen_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let rows = vec![
            owned(FEB_1, FEB_29, first, "first@example.com"),
            owned(JAN_1, JAN_31, second, "second@example.com"),
            owned(JAN_1, JAN_31, first, "first@example.com"),
        ];
        let groups = group_periods_by_user(&rows);
        assert_eq!(groups[0].email, "first@example.com");
        assert_eq!(groups[1].email, "second@example.com");
    }

    #[test]
    fn grouping_omits_users_without_entries() {
        // A user only exists in the output if a row names them.
        assert!(group_periods_by_user(&[]).is_empty());
    }

    fn book_row(isbn: &str, name: &str, sold: i64) -> BookEntryRow {
        BookEntryRow {
            isbn: isbn.into(),
            book_name: name.into(),
            from_date: JAN_1,
            to_date: JAN_31,
            opening_stock: 10,
            printed_copies: 0,
            sold_copies: sold,
            return_copies: 0,
            mrp: 99.5,
            amount: 199.0,
            complimentary_damage: 0,
            closing_stock: 10 - sold,
        }
    }

    #[test]
    fn entries_group_under_their_isbn() {
        let rows = vec![
            book_row("A1", "First", 1),
            book_row("A2", "Second", 2),
            book_row("A1", "First", 3),
        ];
        let groups = group_entries_by_book(rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].isbn, "A1");
        assert_eq!(groups[0].entries.len(), 2);
        assert_eq!(groups[0].entries[1].sold_copies, 3);
        assert_eq!(groups[1].isbn, "A2");
        assert_eq!(groups[1].entries.len(), 1);
    }

    #[test]
    fn no_matching_rows_means_no_groups() {
        assert!(group_entries_by_book(Vec::new()).is_empty());
    }
}
