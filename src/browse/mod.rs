// src/browse/mod.rs
//! Browser session driving the results page through a WebDriver endpoint.
//! All element lookups re-find by id on every call: the results widget
//! re-renders after each dropdown selection and cached handles go stale.

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use std::time::Duration;
use thirtyfour::prelude::*;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::ScrapeConfig;

/// Marker that the page shell has rendered; waited on after navigation.
const PAGE_MARKER: &str = "div.uk-section-primary.uk-section.uk-section-xsmall";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

static TH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th").expect("Invalid CSS selector for table headers"));
static TR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Invalid CSS selector for table rows"));
static TD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("Invalid CSS selector for table cells"));

/// One Chrome session. Opened once per run and closed on every exit path.
pub struct Session {
    driver: WebDriver,
    page_load_timeout: Duration,
    page_settle: Duration,
    element_timeout: Duration,
}

impl Session {
    /// Connect to chromedriver and start a headless Chrome instance.
    pub async fn open(config: &ScrapeConfig) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        let chrome_options = json!({
            "args": [
                "--headless",
                "--incognito",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
            ],
            // push-notification prompts interrupt the traversal
            "prefs": { "profile.default_content_setting_values.notifications": 2 },
        });
        caps.insert_base_capability("goog:chromeOptions".to_string(), chrome_options);

        let driver = WebDriver::new(&config.webdriver_url, caps)
            .await
            .with_context(|| {
                format!(
                    "connecting to webdriver at {} (is chromedriver running?)",
                    config.webdriver_url
                )
            })?;

        Ok(Self {
            driver,
            page_load_timeout: config.page_load_timeout(),
            page_settle: config.page_settle(),
            element_timeout: config.element_timeout(),
        })
    }

    /// Navigate to `url` and block until the page marker is displayed, then
    /// give the embedded widget time to settle. A timeout here is fatal to
    /// the run; the caller closes the session and aborts.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.driver.goto(url).await?;
        self.wait_displayed(By::Css(PAGE_MARKER), self.page_load_timeout)
            .await
            .with_context(|| format!("timed out waiting for page {url} to load"))?;
        sleep(self.page_settle).await;
        Ok(())
    }

    /// The result selectors and table live inside the page's single iframe.
    pub async fn enter_results_frame(&self) -> Result<()> {
        let iframe = self
            .driver
            .find(By::Tag("iframe"))
            .await
            .context("results iframe not found")?;
        iframe.enter_frame().await?;
        Ok(())
    }

    /// Visible texts of a `<select>`'s options, in document order.
    pub async fn option_texts(&self, select_id: &str) -> Result<Vec<String>> {
        let select = self.find_select(select_id).await?;
        let options = select.find_all(By::Tag("option")).await?;
        let mut texts = Vec::with_capacity(options.len());
        for option in options {
            texts.push(option.text().await?);
        }
        Ok(texts)
    }

    /// Click the option of `select_id` whose visible text equals `text`.
    pub async fn select_option(&self, select_id: &str, text: &str) -> Result<()> {
        let select = self.find_select(select_id).await?;
        for option in select.find_all(By::Tag("option")).await? {
            if option.text().await? == text {
                option
                    .click()
                    .await
                    .with_context(|| format!("clicking option `{text}` of #{select_id}"))?;
                debug!(select_id, text, "option selected");
                return Ok(());
            }
        }
        Err(anyhow!("option `{text}` not found in #{select_id}"))
    }

    /// Text of the first element with the given class.
    pub async fn class_text(&self, class_name: &str) -> Result<String> {
        let element = self
            .driver
            .find(By::ClassName(class_name))
            .await
            .with_context(|| format!("element .{class_name} not found"))?;
        Ok(element.text().await?)
    }

    /// Wait for the result table to show up, then parse its header and body
    /// rows out of its HTML in one round-trip.
    pub async fn read_table(&self, table_id: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        let table = self
            .wait_displayed(By::Id(table_id), self.element_timeout)
            .await
            .with_context(|| format!("timed out waiting for result table #{table_id}"))?;
        let html = table.outer_html().await?;
        Ok(parse_table(&html))
    }

    pub async fn close(self) -> Result<()> {
        self.driver.quit().await?;
        Ok(())
    }

    async fn find_select(&self, select_id: &str) -> Result<WebElement> {
        self.driver
            .find(By::Id(select_id))
            .await
            .with_context(|| format!("dropdown #{select_id} not found"))
    }

    async fn wait_displayed(&self, by: By, timeout: Duration) -> Result<WebElement> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(element) = self.driver.find(by.clone()).await {
                if element.is_displayed().await.unwrap_or(false) {
                    return Ok(element);
                }
            }
            if Instant::now() >= deadline {
                return Err(anyhow!("element {by:?} not visible within {timeout:?}"));
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

/// Parse a result table's HTML: `th` texts become headers (with the site's
/// ambiguous name columns renamed positionally), each body `tr`'s `td` texts
/// become one row. The header row itself carries no `td` cells and is skipped.
pub fn parse_table(html: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let doc = Html::parse_fragment(html);

    let mut headers: Vec<String> = doc.select(&TH_SELECTOR).map(cell_text).collect();
    fix_name_headers(&mut headers);

    let rows: Vec<Vec<String>> = doc
        .select(&TR_SELECTOR)
        .map(|tr| tr.select(&TD_SELECTOR).map(cell_text).collect::<Vec<_>>())
        .filter(|cells: &Vec<String>| !cells.is_empty())
        .collect();

    (headers, rows)
}

/// The site labels the second and third column ("name") inconsistently and
/// sometimes identically; rename them by position so every year lines up.
fn fix_name_headers(headers: &mut [String]) {
    if headers.len() > 2 {
        headers[1] = "FIRST".to_string();
        headers[2] = "LAST".to_string();
    }
}

fn cell_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <table id="table_id">
            <tr><th>Rank</th><th>Name</th><th>Name</th><th>1. Qualification</th></tr>
            <tr><td>1</td><td>Janja</td><td>Garnbret</td><td>4t4z 8 6</td></tr>
            <tr><td>2</td><td>Akiyo</td><td>Noguchi</td><td>3t4z 5 7</td></tr>
        </table>"#;

    #[test]
    fn parses_headers_and_body_rows() {
        let (headers, rows) = parse_table(SAMPLE);
        assert_eq!(headers, vec!["Rank", "FIRST", "LAST", "1. Qualification"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["1", "Janja", "Garnbret", "4t4z 8 6"]);
        assert_eq!(rows[1], vec!["2", "Akiyo", "Noguchi", "3t4z 5 7"]);
    }

    #[test]
    fn header_row_is_not_emitted_as_data() {
        let (_, rows) = parse_table(SAMPLE);
        assert!(rows.iter().all(|row| row[0] != "Rank"));
    }

    #[test]
    fn short_header_rows_are_left_alone() {
        let mut headers = vec!["Rank".to_string(), "Name".to_string()];
        fix_name_headers(&mut headers);
        assert_eq!(headers, vec!["Rank", "Name"]);
    }

    #[test]
    fn empty_table_parses_to_nothing() {
        let (headers, rows) = parse_table("<table id=\"table_id\"></table>");
        assert!(headers.is_empty());
        assert!(rows.is_empty());
    }
}
