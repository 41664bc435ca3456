//! Database view models returned by repositories.

/// Row totals per table, used for the post-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub bots: i64,
    pub message_mappings: i64,
    pub verified_users: i64,
    pub blacklist: i64,
}
