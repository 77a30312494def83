// src/config/mod.rs
//! Run configuration. Everything the original hard-coded (cutoff year, league
//! cutoff, alias spellings per discipline) lives here as data, with compiled
//! defaults that match the site as observed; an optional `scraper.yaml` next
//! to the binary overrides any field.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path, path::PathBuf, time::Duration};

use crate::normalize::AliasGroup;

/// The four result disciplines the site publishes categories for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    Lead,
    Speed,
    Boulder,
    Combined,
}

impl Discipline {
    /// Map a category label like "BOULDER Men" or "COMBINED Women & Men" to
    /// its discipline. Combined categories are the ones joining two fields
    /// with `&`, checked first since their labels also contain a discipline
    /// word. Unrecognized labels are skipped by the caller.
    pub fn classify(category: &str) -> Option<Self> {
        if category.contains('&') {
            Some(Self::Combined)
        } else if category.contains("SPEED") {
            Some(Self::Speed)
        } else if category.contains("BOULDER") {
            Some(Self::Boulder)
        } else if category.contains("LEAD") {
            Some(Self::Lead)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Speed => "speed",
            Self::Boulder => "boulder",
            Self::Combined => "combined",
        }
    }
}

/// Per-discipline header alias tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasTables {
    pub lead: Vec<AliasGroup>,
    pub speed: Vec<AliasGroup>,
    pub boulder: Vec<AliasGroup>,
    pub combined: Vec<AliasGroup>,
}

impl AliasTables {
    pub fn for_discipline(&self, discipline: Discipline) -> &[AliasGroup] {
        match discipline {
            Discipline::Lead => &self.lead,
            Discipline::Speed => &self.speed,
            Discipline::Boulder => &self.boulder,
            Discipline::Combined => &self.combined,
        }
    }
}

fn group(canonical: &str, aliases: &[&str]) -> AliasGroup {
    AliasGroup {
        canonical: canonical.to_string(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
    }
}

impl Default for AliasTables {
    /// Every header spelling observed on the site per discipline, transcribed
    /// from years of published result tables.
    fn default() -> Self {
        Self {
            boulder: vec![
                group(
                    "Semifinal",
                    &[
                        "Semi-Final",
                        "Semi Final",
                        "Semifinal",
                        "semi-Final",
                        "SemiFinal",
                        "Semi final",
                        "Semi-final",
                        "Semi - Final",
                        "1/2-Final",
                    ],
                ),
                group(
                    "Qualification 1",
                    &[
                        "1. Qualification (2)",
                        "1. Qualification",
                        "Qualification (Group 1)",
                        "Qualification (group A)",
                        "A Qualification",
                        "A. Qualification",
                        "Qualification A",
                        "Qualification Group A",
                        "Qualification 1",
                    ],
                ),
                group(
                    "Qualification 2",
                    &[
                        "2. Qualification (2)",
                        "2. Qualification",
                        "Qualification (Group 2)",
                        "B Qualification",
                        "Qualification (group B)",
                        "B. Qualification",
                        "Qualification B",
                        "Qualification Group B",
                        "Qualification 2",
                    ],
                ),
            ],
            lead: vec![
                group(
                    "Semifinal",
                    &[
                        "1/2 Final",
                        "Semi-Final",
                        "Semi Final",
                        "SemiFinal",
                        "Semi-final",
                        "1/2 - Final",
                        "1/2-Final",
                        "Semi - Final",
                        "Semifinal",
                    ],
                ),
                group(
                    "Qualification 1",
                    &[
                        "1. Qualification 1",
                        "1. Qualification",
                        "Qualification 1",
                        "1. Qualification:",
                        "1.Qualification",
                        "Group A Qualification",
                        "1 Qualification",
                    ],
                ),
                group(
                    "Qualification 2",
                    &[
                        "2. Qualification",
                        "2. Qualification 2",
                        "Qualification 2",
                        "Group B Qualification",
                    ],
                ),
            ],
            speed: vec![group("1/8 - Final", &["1/8 - Final", "1_8 - Final"])],
            // no header drift observed on combined results so far
            combined: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Results page the whole traversal starts from.
    pub results_url: String,
    /// WebDriver endpoint (chromedriver).
    pub webdriver_url: String,
    pub page_load_timeout_secs: u64,
    /// Extra settle time after the page marker shows up; the results widget
    /// keeps loading well after the page itself does.
    pub page_settle_secs: u64,
    pub element_timeout_secs: u64,
    /// Settle time after clicking a dropdown option.
    pub select_settle_secs: u64,
    /// Year at which the traversal stops, exclusive (older archive pages use
    /// a different layout).
    pub stop_year: String,
    /// League iteration stops when a league name contains this string.
    pub league_cutoff: String,
    /// Disciplines to scrape. The original run collected boulder only; the
    /// default here is all four.
    pub disciplines: Vec<Discipline>,
    pub output_dir: PathBuf,
    /// Concatenate previously saved rows under the union of columns instead
    /// of overwriting the results file.
    pub merge_existing: bool,
    pub alias_tables: AliasTables,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            results_url: "https://www.ifsc-climbing.org/index.php/world-competition/last-result"
                .to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            page_load_timeout_secs: 20,
            page_settle_secs: 10,
            element_timeout_secs: 20,
            select_settle_secs: 3,
            stop_year: "2019".to_string(),
            league_cutoff: "IFSC".to_string(),
            disciplines: vec![
                Discipline::Lead,
                Discipline::Speed,
                Discipline::Boulder,
                Discipline::Combined,
            ],
            output_dir: PathBuf::from("data"),
            merge_existing: false,
            alias_tables: AliasTables::default(),
        }
    }
}

impl ScrapeConfig {
    /// Load from `path` if it exists, otherwise use the compiled defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {:?}", path))
    }

    /// Reject alias tables where one spelling belongs to two groups of the
    /// same discipline; consolidation order would silently decide which
    /// canonical column got the value.
    pub fn validate(&self) -> Result<()> {
        for discipline in [
            Discipline::Lead,
            Discipline::Speed,
            Discipline::Boulder,
            Discipline::Combined,
        ] {
            let mut seen: HashMap<&str, &str> = HashMap::new();
            for group in self.alias_tables.for_discipline(discipline) {
                let mut members: Vec<&str> =
                    group.aliases.iter().map(String::as_str).collect();
                if !members.contains(&group.canonical.as_str()) {
                    members.push(group.canonical.as_str());
                }
                members.sort_unstable();
                members.dedup();
                for member in members {
                    if let Some(other) = seen.insert(member, group.canonical.as_str()) {
                        bail!(
                            "alias `{member}` belongs to both `{other}` and `{}` for {} results",
                            group.canonical,
                            discipline.name()
                        );
                    }
                }
            }
        }
        Ok(())
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_secs(self.page_settle_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn select_settle(&self) -> Duration {
        Duration::from_secs(self.select_settle_secs)
    }
}
