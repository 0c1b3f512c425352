use crate::error::Result;
use crate::page::row::{RawObservation, StatValue, Statistic, StatisticIndex};
use regex::Regex;
use tracing::debug;

/// Link to a secondary data page, e.g. `Plot?data=JOBQ&x=all`.
/// Capture 1 is the series label.
const REFERENCE_RE: &str = r#"Plot\?data=([A-Za-z0-9]{2,8})&(?:amp;)?x=all"#;

/// Any double-quoted string; quotes pair up left to right.
const QUOTED_RE: &str = r#""([^"]*)""#;

/// Whole-string match: at least two whitespace-separated numeric tokens,
/// exponent forms (`1e-3`, `1.5E+2`) included.
const TOKEN_STREAM_RE: &str = concat!(
    r#"^\s*[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?"#,
    r#"(?:\s+[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?)+\s*$"#,
);

/// First numeric substring of a statistic value. Thousands separators are
/// tried first so `1,234.50` is not cut at the comma.
const NUMBER_RE: &str = r#"-?\d{1,3}(?:,\d{3})+(?:\.\d+)?|-?\d+(?:\.\d+)?|-?\.\d+"#;

/// Line break marking the end of a result row.
const ROW_END_RE: &str = r#"(?i)<br\s*/?>"#;

const TAG_RE: &str = r#"<[^>]*>"#;

/// Extracts references, token streams and summary statistics from raw page
/// text. "No match" is never an error: it yields an empty result.
#[derive(Debug, Clone)]
pub struct PageParser {
    reference: Regex,
    quoted: Regex,
    token_stream: Regex,
    number: Regex,
    row_end: Regex,
    tag: Regex,
}

impl PageParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            reference: Regex::new(REFERENCE_RE)?,
            quoted: Regex::new(QUOTED_RE)?,
            token_stream: Regex::new(TOKEN_STREAM_RE)?,
            number: Regex::new(NUMBER_RE)?,
            row_end: Regex::new(ROW_END_RE)?,
            tag: Regex::new(TAG_RE)?,
        })
    }

    /// Labels of the secondary data pages referenced by a station page,
    /// in page order, first occurrence wins.
    pub fn extract_series_references(&self, page: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for caps in self.reference.captures_iter(page) {
            let Some(m) = caps.get(1) else { continue };
            if !out.iter().any(|l| l == m.as_str()) {
                out.push(m.as_str().to_string());
            }
        }
        out
    }

    /// Split the page's day/value token stream into observations tagged
    /// with `label`. A trailing unpaired token is dropped.
    pub fn extract_raw_series(&self, page: &str, label: &str) -> Vec<RawObservation> {
        let Some(stream) = self
            .quoted
            .captures_iter(page)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .find(|s| self.token_stream.is_match(s))
        else {
            debug!(label, "no token stream on series page");
            return Vec::new();
        };

        let tokens: Vec<&str> = stream.split_whitespace().collect();
        if tokens.len() % 2 != 0 {
            debug!(label, tokens = tokens.len(), "odd token count, dropping last token");
        }
        tokens
            .chunks_exact(2)
            .map(|pair| RawObservation {
                day: pair[0].to_string(),
                value: pair[1].to_string(),
                label: label.to_string(),
            })
            .collect()
    }

    /// Scan `label: value` result rows (text terminated by `<BR>`).
    ///
    /// Text after the last `<BR>` on a line is the page footer and is never
    /// a row. Rows that do not split into exactly two colon-separated parts
    /// are skipped.
    pub fn extract_statistics(&self, page: &str) -> StatisticIndex {
        let mut out = StatisticIndex::new();
        for line in page.lines() {
            let pieces: Vec<&str> = self.row_end.split(line).collect();
            if pieces.len() < 2 {
                continue;
            }
            for row in &pieces[..pieces.len() - 1] {
                let text = self.visible_text(row);
                let parts: Vec<&str> = text.split(':').collect();
                if parts.len() != 2 {
                    if !text.is_empty() {
                        debug!(row = %text, "skipping non label:value row");
                    }
                    continue;
                }
                let label = normalize_label(parts[0]);
                let raw = parts[1].trim();
                if label.is_empty() || raw.is_empty() {
                    continue;
                }
                let value = match self.first_number(raw) {
                    Some(v) => StatValue::Numeric(v),
                    None => StatValue::Text(raw.to_string()),
                };
                out.insert(label.clone(), Statistic { label, value });
            }
        }
        out
    }

    fn first_number(&self, s: &str) -> Option<f64> {
        let m = self.number.find(s)?;
        m.as_str().replace(',', "").parse::<f64>().ok()
    }

    fn visible_text(&self, s: &str) -> String {
        let stripped = self.tag.replace_all(s, " ");
        let decoded = stripped.replace("&nbsp;", " ").replace("&amp;", "&");
        decoded.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Uppercase, separators to a single `_`, other punctuation dropped.
///
/// `"Queue Length"` -> `QUEUE_LENGTH`, `"Utilization (%)"` -> `UTILIZATION`.
pub fn normalize_label(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_us = false;
    for ch in s.trim().chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_uppercase());
            last_us = false;
        } else if (ch.is_whitespace() || matches!(ch, '_' | '-' | '.' | '/')) && !last_us {
            out.push('_');
            last_us = true;
        }
    }
    out.trim_matches('_').to_string()
}
