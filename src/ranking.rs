use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::types::{DerivedRecord, Season};

/// Rank GP earned for a place within the group (1-based).
pub fn rank_gp(group_place: u32) -> i64 {
    match group_place {
        0 => 0,
        1..=6 => 20 - (group_place as i64 - 1) * 2,
        7..=10 => 9 - (group_place as i64 - 7),
        11..=12 => 5,
        13..=14 => 4,
        15..=16 => 3,
        17..=18 => 2,
        _ => 1,
    }
}

/// Update GP: a quarter of the season's highest-rating gain, rounded down.
pub fn update_gp(highest_delta: i64) -> i64 {
    highest_delta.max(0) / 4
}

/// One user's totals for one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonResult {
    pub user: String,
    pub season: Season,
    pub final_rating: i64,
    pub final_highest: i64,
    /// Highest rating at the end of the season minus at its start.
    pub update_highest: i64,
    pub place_gp: i64,
    pub update_gp: i64,
    pub total_gp: i64,
    /// abc -> place within the group for that contest.
    pub group_places: BTreeMap<i64, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonStandings {
    pub season: Season,
    /// Ordered by total GP, then rank GP, both descending.
    pub results: Vec<SeasonResult>,
}

type UserRecords<'a> = BTreeMap<&'a str, Vec<&'a DerivedRecord>>;

/// Standings for every dated season present in `results`, oldest season first.
/// Records with an unknown season are not ranked.
pub fn season_standings(results: &BTreeMap<String, Vec<DerivedRecord>>) -> Vec<SeasonStandings> {
    let mut by_season: BTreeMap<(i32, u8), (Season, UserRecords<'_>)> = BTreeMap::new();

    for (user, records) in results {
        for record in records {
            let Some(key) = record.season.sort_key() else {
                continue;
            };
            by_season
                .entry(key)
                .or_insert_with(|| (record.season, BTreeMap::new()))
                .1
                .entry(user.as_str())
                .or_default()
                .push(record);
        }
    }

    by_season
        .into_values()
        .map(|(season, users)| standings_for(season, &users))
        .collect()
}

fn standings_for(season: Season, users: &UserRecords<'_>) -> SeasonStandings {
    let places = group_places(users);

    let mut results: Vec<SeasonResult> = users
        .iter()
        .filter_map(|(user, records)| {
            let first = records.first()?;
            let last = records.last()?;

            let group_places: BTreeMap<i64, u32> = records
                .iter()
                .filter_map(|r| places.get(&(*user, r.abc)).map(|p| (r.abc, *p)))
                .collect();
            let place_gp = group_places.values().map(|p| rank_gp(*p)).sum();

            let season_start_highest = first.highest - first.update_highest;
            let update_highest = last.highest - season_start_highest;
            let gain_gp = update_gp(update_highest);

            Some(SeasonResult {
                user: user.to_string(),
                season,
                final_rating: last.new_rating,
                final_highest: last.highest,
                update_highest,
                place_gp,
                update_gp: gain_gp,
                total_gp: place_gp + gain_gp,
                group_places,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.total_gp
            .cmp(&a.total_gp)
            .then(b.place_gp.cmp(&a.place_gp))
            .then_with(|| a.user.cmp(&b.user))
    });

    SeasonStandings { season, results }
}

/// Place of each user among the group for each contest, by general place.
/// Equal general places share a place and the next one is skipped (1, 1, 3).
fn group_places<'a>(users: &UserRecords<'a>) -> HashMap<(&'a str, i64), u32> {
    let mut by_abc: BTreeMap<i64, Vec<(&'a str, i64)>> = BTreeMap::new();
    for (user, records) in users {
        for r in records {
            by_abc.entry(r.abc).or_default().push((*user, r.general_place));
        }
    }

    let mut places = HashMap::new();
    for (abc, mut entries) in by_abc {
        entries.sort_by_key(|(_, general_place)| *general_place);

        let mut prev: Option<(i64, u32)> = None;
        for (i, (user, general_place)) in entries.into_iter().enumerate() {
            let place = match prev {
                Some((prev_general, prev_place)) if prev_general == general_place => prev_place,
                _ => i as u32 + 1,
            };
            prev = Some((general_place, place));
            places.insert((user, abc), place);
        }
    }
    places
}
