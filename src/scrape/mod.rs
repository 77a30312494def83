// src/scrape/mod.rs
//! Sequential traversal of the results page: year → league → event →
//! category, one selection at a time, collecting every result row per
//! discipline. The page only exposes each level after the previous one has
//! been selected, so nothing here can be reordered or parallelized.

use anyhow::Result;
use chrono::{Datelike, Local};
use std::collections::BTreeMap;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::browse::Session;
use crate::config::{Discipline, ScrapeConfig};
use crate::normalize::RawRecord;

// Dropdown element ids on the results page, stable since 2019.
const YEARS_SELECT: &str = "years";
const LEAGUES_SELECT: &str = "indexes";
const EVENTS_SELECT: &str = "events";
const CATEGORIES_SELECT: &str = "categories";

const RESULT_TABLE_ID: &str = "table_id";
const EVENT_TITLE_CLASS: &str = "event_title";
const EVENT_DATE_CLASS: &str = "event_date";

/// Walk the whole selector tree and return the scraped rows per discipline.
pub async fn run(
    session: &Session,
    config: &ScrapeConfig,
) -> Result<BTreeMap<Discipline, Vec<RawRecord>>> {
    session.goto(&config.results_url).await?;
    session.enter_results_frame().await?;

    let current_year = Local::now().year();
    let mut buckets: BTreeMap<Discipline, Vec<RawRecord>> = BTreeMap::new();

    for year in session.option_texts(YEARS_SELECT).await? {
        if is_next_year(&year, current_year) {
            // the site lists next season before any results exist for it
            continue;
        }
        if year == config.stop_year {
            debug!(%year, "year cutoff reached");
            break;
        }
        session.select_option(YEARS_SELECT, &year).await?;
        sleep(config.select_settle()).await;
        info!(%year, "scanning year");

        for league in session.option_texts(LEAGUES_SELECT).await? {
            if is_placeholder(&league) {
                continue;
            }
            if league.contains(&config.league_cutoff) {
                debug!(%league, "league cutoff reached");
                break;
            }
            session.select_option(LEAGUES_SELECT, &league).await?;
            sleep(config.select_settle()).await;

            for event in session.option_texts(EVENTS_SELECT).await? {
                if is_placeholder(&event) || is_cancelled(&event) {
                    continue;
                }
                session.select_option(EVENTS_SELECT, &event).await?;
                sleep(config.select_settle()).await;

                let title = session.class_text(EVENT_TITLE_CLASS).await?;
                let date = session.class_text(EVENT_DATE_CLASS).await?;

                for category in session.option_texts(CATEGORIES_SELECT).await? {
                    if is_placeholder(&category) {
                        continue;
                    }
                    let Some(discipline) = Discipline::classify(&category) else {
                        continue;
                    };
                    if !config.disciplines.contains(&discipline) {
                        continue;
                    }

                    session.select_option(CATEGORIES_SELECT, &category).await?;
                    let (headers, rows) = session.read_table(RESULT_TABLE_ID).await?;
                    let records = attach_event_info(&headers, rows, &title, &date, &category);
                    info!(
                        %title,
                        %category,
                        rows = records.len(),
                        "category scraped"
                    );
                    buckets.entry(discipline).or_default().extend(records);
                }
            }
        }
    }

    Ok(buckets)
}

/// The dropdowns each start with their own placeholder entry. Matched
/// exactly so a real event title starting with "Select " is not skipped.
fn is_placeholder(option_text: &str) -> bool {
    matches!(
        option_text,
        "Select league" | "Select event" | "Select category"
    )
}

fn is_cancelled(event_text: &str) -> bool {
    event_text.contains("CANCELLED")
}

fn is_next_year(year_text: &str, current_year: i32) -> bool {
    year_text
        .parse::<i32>()
        .map_or(false, |y| y == current_year + 1)
}

/// Turn a parsed table into records, prepending the competition context
/// columns. Rows shorter than the header row just contribute fewer pairs.
fn attach_event_info(
    headers: &[String],
    rows: Vec<Vec<String>>,
    title: &str,
    date: &str,
    category: &str,
) -> Vec<RawRecord> {
    rows.into_iter()
        .map(|cells| {
            let mut record: RawRecord = vec![
                ("Competition Title".to_string(), title.to_string()),
                ("Competition Date".to_string(), date.to_string()),
                ("Category".to_string(), category.to_string()),
            ];
            record.extend(headers.iter().cloned().zip(cells));
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_options_are_skipped() {
        assert!(is_placeholder("Select league"));
        assert!(is_placeholder("Select event"));
        assert!(is_placeholder("Select category"));
        assert!(!is_placeholder("World Cup 2021"));
        // an event whose title merely starts with "Select " is real
        assert!(!is_placeholder("Select Trophy Chamonix 2021"));
    }

    #[test]
    fn cancelled_events_are_skipped() {
        assert!(is_cancelled("IFSC World Cup Wujiang 2020 - CANCELLED"));
        assert!(!is_cancelled("IFSC World Cup Meiringen 2021"));
    }

    #[test]
    fn only_the_upcoming_season_is_skipped() {
        assert!(is_next_year("2022", 2021));
        assert!(!is_next_year("2021", 2021));
        assert!(!is_next_year("2020", 2021));
        assert!(!is_next_year("not a year", 2021));
    }

    #[test]
    fn attach_event_info_prepends_context_columns() {
        let headers = vec!["Rank".to_string(), "FIRST".to_string()];
        let rows = vec![vec!["1".to_string(), "Janja".to_string()]];
        let records = attach_event_info(&headers, rows, "World Cup", "2021-05-21", "BOULDER Women");
        assert_eq!(
            records[0],
            vec![
                ("Competition Title".to_string(), "World Cup".to_string()),
                ("Competition Date".to_string(), "2021-05-21".to_string()),
                ("Category".to_string(), "BOULDER Women".to_string()),
                ("Rank".to_string(), "1".to_string()),
                ("FIRST".to_string(), "Janja".to_string()),
            ]
        );
    }

    #[test]
    fn short_rows_contribute_fewer_pairs() {
        let headers = vec!["Rank".to_string(), "FIRST".to_string(), "LAST".to_string()];
        let rows = vec![vec!["1".to_string()]];
        let records = attach_event_info(&headers, rows, "t", "d", "c");
        // 3 context pairs + 1 zipped pair
        assert_eq!(records[0].len(), 4);
    }
}
