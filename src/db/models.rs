use serde::{Deserialize, Serialize};

use crate::types::DerivedRecord;

/// One row of `contest_result`. Natural key is `(user, abc)`.
/// Shared by sqlx (SQLite mirror) and the PostgREST JSON bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContestResultRow {
    pub user: String,
    pub abc: i64,
    pub general_place: i64,
    pub old_rating: Option<i64>,
    pub new_rating: Option<i64>,
    pub highest: i64,
    pub performance: i64,
    pub season: String,
    pub update_highest: i64,
}

impl ContestResultRow {
    pub fn from_derived(user: &str, d: &DerivedRecord) -> Self {
        Self {
            user: user.to_string(),
            abc: d.abc,
            general_place: d.general_place,
            old_rating: d.old_rating,
            new_rating: Some(d.new_rating),
            highest: d.highest,
            performance: d.performance,
            season: d.season.to_string(),
            update_highest: d.update_highest,
        }
    }
}
