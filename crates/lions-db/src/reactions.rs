//! Like/dislike toggles on posts and comments.
//!
//! Per (user, target) the state is one of unvoted / liked / disliked:
//! voting the same way twice removes the vote, voting the other way flips it.
//! The (user_id, target) primary key is what guarantees a single row; the
//! read-then-write runs inside an IMMEDIATE transaction so concurrent
//! toggles are serialized by SQLite rather than by application locks.

use lions_types::models::{ReactionCounts, ReactionKind, ReactionState, Vote};
use lions_types::{ForumError, ForumResult};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::debug;

use crate::{Database, FOREIGN_KEY_VIOLATION, is_constraint};

/// Table and target column backing each reaction kind.
fn relation(kind: ReactionKind) -> (&'static str, &'static str) {
    match kind {
        ReactionKind::Post => ("post_reactions", "post_id"),
        ReactionKind::Comment => ("comment_reactions", "comment_id"),
    }
}

fn read_vote(conn: &Connection, kind: ReactionKind, user_id: i64, target_id: i64) -> anyhow::Result<Option<Vote>> {
    let (table, column) = relation(kind);
    let value: Option<i64> = conn
        .query_row(
            &format!("SELECT value FROM {table} WHERE user_id = ?1 AND {column} = ?2"),
            params![user_id, target_id],
            |row| row.get(0),
        )
        .optional()?;
    // The CHECK constraint keeps stored values to ±1.
    Ok(value.map(|v| if v > 0 { Vote::Like } else { Vote::Dislike }))
}

impl Database {
    /// Apply one toggle and return the resulting state.
    ///
    /// Any foreign-key failure is reported as `NotFound(kind)`. That includes
    /// an unknown `user_id`, which callers rule out by taking the id from a
    /// live session.
    pub fn apply_reaction(
        &self,
        user_id: i64,
        kind: ReactionKind,
        target_id: i64,
        vote: Vote,
    ) -> ForumResult<ReactionState> {
        if target_id <= 0 {
            return Err(ForumError::validation(format!("invalid {} id {}", kind.as_str(), target_id)));
        }
        let (table, column) = relation(kind);

        let result = self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let next = match read_vote(&tx, kind, user_id, target_id)? {
                None => {
                    tx.execute(
                        &format!("INSERT INTO {table} (user_id, {column}, value) VALUES (?1, ?2, ?3)"),
                        params![user_id, target_id, vote.value()],
                    )?;
                    Some(vote)
                }
                Some(existing) if existing == vote => {
                    tx.execute(
                        &format!("DELETE FROM {table} WHERE user_id = ?1 AND {column} = ?2"),
                        params![user_id, target_id],
                    )?;
                    None
                }
                Some(_) => {
                    tx.execute(
                        &format!("UPDATE {table} SET value = ?1 WHERE user_id = ?2 AND {column} = ?3"),
                        params![vote.value(), user_id, target_id],
                    )?;
                    Some(vote)
                }
            };

            tx.commit()?;
            Ok(ReactionState::from(next))
        });

        match result {
            Ok(state) => {
                debug!("User {} {} {} -> {:?}", user_id, kind.as_str(), target_id, state);
                Ok(state)
            }
            Err(e) if is_constraint(&e, FOREIGN_KEY_VIOLATION) => Err(ForumError::NotFound(kind.as_str())),
            Err(e) => Err(e.into()),
        }
    }

    /// Current vote of `user_id` on a target, if any.
    pub fn reaction_of(&self, user_id: i64, kind: ReactionKind, target_id: i64) -> ForumResult<ReactionState> {
        let vote = self.with_conn(|conn| read_vote(conn, kind, user_id, target_id))?;
        Ok(ReactionState::from(vote))
    }

    /// Like and dislike totals, always counted from the reaction rows.
    pub fn reaction_counts(&self, kind: ReactionKind, target_id: i64) -> ForumResult<ReactionCounts> {
        let (table, column) = relation(kind);
        Ok(self.with_conn(|conn| {
            Ok(conn.query_row(
                &format!(
                    "SELECT COALESCE(SUM(CASE WHEN value = 1 THEN 1 END), 0),
                            COALESCE(SUM(CASE WHEN value = -1 THEN 1 END), 0)
                     FROM {table} WHERE {column} = ?1"
                ),
                [target_id],
                |row| Ok(ReactionCounts { likes: row.get(0)?, dislikes: row.get(1)? }),
            )?)
        })?)
    }
}
