//! Change report content and its two renderings

use crate::models::{format_gbp, Baseline, LedgerDiff};
use chrono::{DateTime, Utc};

const REPORT_TEMPLATE: &str = include_str!("../../templates/report.html");

/// One rendered transaction line.
#[derive(Debug, Clone)]
pub struct EntryRow {
    pub date: String,
    pub description: String,
    pub money: String,
}

/// One rendered cost-code block.
#[derive(Debug, Clone)]
pub struct CostCodeRow {
    pub name: String,
    pub balance: String,
    pub change_in_balance: String,
    pub money_in: String,
    pub money_out: String,
    pub entries: Vec<EntryRow>,
}

/// The content of a change notification, computed once and rendered twice.
///
/// Both [`ChangeReport::to_plain_text`] and [`ChangeReport::to_html`] read
/// the same fields, so the two bodies can differ in presentation but never
/// in content.
#[derive(Debug, Clone)]
pub struct ChangeReport {
    pub society_name: String,
    pub cost_codes: Vec<CostCodeRow>,
    pub total_in: String,
    pub total_out: String,
    pub total_balance: String,
    pub balance_brought_forward: String,
    pub change_in_total_balance: String,
    pub last_check: String,
    pub sheet_url: Option<String>,
}

impl ChangeReport {
    /// Build the report content from a diff and the prior baseline.
    ///
    /// Cost codes whose balance did not move are dropped, and the
    /// grand-total change is the sum of the surviving per-code changes.
    pub fn build(
        diff: &LedgerDiff,
        prior: Option<&Baseline>,
        sheet_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut cost_codes = Vec::new();
        let mut change_in_total = 0.0;
        for (name, code) in &diff.cost_codes {
            if code.change_in_balance == 0.0 {
                continue;
            }
            change_in_total += code.change_in_balance;
            cost_codes.push(CostCodeRow {
                name: name.clone(),
                balance: format_gbp(code.balance),
                change_in_balance: format_gbp(code.change_in_balance),
                money_in: format_gbp(code.money_in),
                money_out: format_gbp(code.money_out),
                entries: code
                    .entries
                    .iter()
                    .map(|entry| EntryRow {
                        date: entry.date.clone(),
                        description: entry.description.clone(),
                        money: format_gbp(entry.money),
                    })
                    .collect(),
            });
        }

        let last_check = match prior {
            Some(baseline) => format!(
                " since the last check {} on {}",
                humanize_since(baseline.artifacts.fetched_at, now),
                baseline
                    .artifacts
                    .fetched_at
                    .format("%A %d %B %Y at %H:%M:%S")
            ),
            None => ", although we don't know how new these changes are".to_string(),
        };

        Self {
            society_name: diff.society_name.clone(),
            cost_codes,
            total_in: format_gbp(diff.grand_total.total_in),
            total_out: format_gbp(diff.grand_total.total_out),
            total_balance: format_gbp(diff.grand_total.total_balance),
            balance_brought_forward: format_gbp(diff.grand_total.balance_brought_forward),
            change_in_total_balance: format_gbp(change_in_total),
            last_check,
            sheet_url,
        }
    }

    /// Render the plain-text body.
    pub fn to_plain_text(&self) -> String {
        let mut text = format!(
            "There have been some changes to the {} ledger{}.\n",
            self.society_name, self.last_check
        );

        for code in &self.cost_codes {
            text.push_str(&format!("\n== {} ==\n", code.name));
            text.push_str(&format!(
                "Balance: {} (change: {})\n",
                code.balance, code.change_in_balance
            ));
            text.push_str(&format!(
                "Money in: {} | Money out: {}\n",
                code.money_in, code.money_out
            ));
            for entry in &code.entries {
                text.push_str(&format!(
                    "  {}  {}  {}\n",
                    entry.date, entry.description, entry.money
                ));
            }
        }

        text.push_str("\n== Grand total ==\n");
        text.push_str(&format!("Total in: {}\n", self.total_in));
        text.push_str(&format!("Total out: {}\n", self.total_out));
        text.push_str(&format!(
            "Balance brought forward: {}\n",
            self.balance_brought_forward
        ));
        text.push_str(&format!("Total balance: {}\n", self.total_balance));
        text.push_str(&format!(
            "Change in total balance: {}\n",
            self.change_in_total_balance
        ));

        if let Some(url) = &self.sheet_url {
            text.push_str(&format!("\nView the updated ledger: {}\n", url));
        }

        text.push_str(
            "\nThis email was sent automatically by ledgerd. If you want to leave \
             some feedback then please reply directly to it.\n",
        );
        text
    }

    /// Render the HTML body from the embedded template.
    pub fn to_html(&self) -> String {
        let mut blocks = String::new();
        for code in &self.cost_codes {
            blocks.push_str(&format!(
                "<h3 style=\"margin-bottom: 4px;\">{}</h3>\n",
                escape_html(&code.name)
            ));
            blocks.push_str(
                "<table cellpadding=\"5\" cellspacing=\"0\" border=\"1\" \
                 style=\"border-collapse: collapse;\">\n",
            );
            blocks.push_str(&format!(
                "<tr><td>Balance</td><td align=\"right\">{}</td></tr>\n",
                code.balance
            ));
            blocks.push_str(&format!(
                "<tr><td>Change in balance</td><td align=\"right\">{}</td></tr>\n",
                code.change_in_balance
            ));
            blocks.push_str(&format!(
                "<tr><td>Money in</td><td align=\"right\">{}</td></tr>\n",
                code.money_in
            ));
            blocks.push_str(&format!(
                "<tr><td>Money out</td><td align=\"right\">{}</td></tr>\n",
                code.money_out
            ));
            for entry in &code.entries {
                blocks.push_str(&format!(
                    "<tr><td>{} {}</td><td align=\"right\">{}</td></tr>\n",
                    escape_html(&entry.date),
                    escape_html(&entry.description),
                    entry.money
                ));
            }
            blocks.push_str("</table>\n");
        }

        let sheet_link = match &self.sheet_url {
            Some(url) => format!(
                "<p><a href=\"{}\">View the updated ledger</a></p>",
                escape_html(url)
            ),
            None => String::new(),
        };

        REPORT_TEMPLATE
            .replace("{{SOCIETY_NAME}}", &escape_html(&self.society_name))
            .replace("{{LAST_CHECK}}", &escape_html(&self.last_check))
            .replace("{{COST_CODE_BLOCKS}}", &blocks)
            .replace("{{TOTAL_IN}}", &self.total_in)
            .replace("{{TOTAL_OUT}}", &self.total_out)
            .replace("{{BALANCE_BROUGHT_FORWARD}}", &self.balance_brought_forward)
            .replace("{{TOTAL_BALANCE}}", &self.total_balance)
            .replace("{{CHANGE_IN_TOTAL_BALANCE}}", &self.change_in_total_balance)
            .replace("{{SHEET_LINK}}", &sheet_link)
    }
}

/// Rough "3 hours ago" phrasing for the report header.
pub fn humanize_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    if secs < 60 {
        return "just now".to_string();
    }

    let (count, unit) = if secs < 3600 {
        (secs / 60, "minute")
    } else if secs < 86_400 {
        (secs / 3600, "hour")
    } else {
        (secs / 86_400, "day")
    };
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComparisonKey, CostCode, GrandTotal, LedgerArtifacts, LedgerEntry};
    use chrono::Duration;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn sample_diff() -> LedgerDiff {
        let mut cost_codes = BTreeMap::new();
        cost_codes.insert(
            "Socials".to_string(),
            CostCode {
                balance: 60.0,
                change_in_balance: 10.0,
                money_in: 100.0,
                money_out: 40.0,
                entries: vec![LedgerEntry {
                    date: "01/08/2026".to_string(),
                    description: "Pizza & drinks".to_string(),
                    money: 10.0,
                }],
            },
        );
        cost_codes.insert(
            "Unmoved".to_string(),
            CostCode {
                balance: 500.0,
                change_in_balance: 0.0,
                money_in: 500.0,
                money_out: 0.0,
                entries: Vec::new(),
            },
        );
        cost_codes.insert(
            "Travel".to_string(),
            CostCode {
                balance: -20.0,
                change_in_balance: -20.0,
                money_in: 0.0,
                money_out: 20.0,
                entries: Vec::new(),
            },
        );
        LedgerDiff {
            society_name: "Test Society".to_string(),
            cost_codes,
            grand_total: GrandTotal {
                total_in: 600.0,
                total_out: 60.0,
                total_balance: 540.0,
                balance_brought_forward: 0.0,
            },
            sheet_id: "sheet-3".to_string(),
            reference_timestamp: "2026-08-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_zero_change_cost_codes_are_dropped() {
        let report = ChangeReport::build(&sample_diff(), None, None, Utc::now());
        let names: Vec<_> = report.cost_codes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Socials", "Travel"]);
    }

    #[test]
    fn test_grand_total_change_is_summed() {
        let report = ChangeReport::build(&sample_diff(), None, None, Utc::now());
        // 10.00 - 20.00
        assert_eq!(report.change_in_total_balance, "-£10.00");
    }

    #[test]
    fn test_unknown_age_wording_without_prior() {
        let report = ChangeReport::build(&sample_diff(), None, None, Utc::now());
        assert!(report
            .last_check
            .contains("we don't know how new these changes are"));
    }

    #[test]
    fn test_last_check_wording_with_prior() {
        let now = Utc::now();
        let prior = Baseline {
            diff: sample_diff(),
            key: ComparisonKey::of(&sample_diff()),
            artifacts: LedgerArtifacts {
                pdf_path: PathBuf::from("/tmp/old.pdf"),
                filename: "old.pdf".to_string(),
                fetched_at: now - Duration::hours(3),
            },
        };
        let report = ChangeReport::build(&sample_diff(), Some(&prior), None, now);
        assert!(report.last_check.contains("since the last check 3 hours ago"));
    }

    #[test]
    fn test_renderings_share_content() {
        let report = ChangeReport::build(
            &sample_diff(),
            None,
            Some("https://sheets.example.org/sheet-3".to_string()),
            Utc::now(),
        );
        let plain = report.to_plain_text();
        let html = report.to_html();

        for value in ["£60.00", "£10.00", "£600.00", "-£10.00", "£540.00"] {
            assert!(plain.contains(value), "plain body missing {}", value);
            assert!(html.contains(value), "html body missing {}", value);
        }
        assert!(plain.contains("https://sheets.example.org/sheet-3"));
        assert!(html.contains("https://sheets.example.org/sheet-3"));
        assert!(plain.contains("Pizza & drinks"));
        assert!(html.contains("Pizza &amp; drinks"));
    }

    #[test]
    fn test_sheet_url_cannot_break_out_of_the_link_attribute() {
        let report = ChangeReport::build(
            &sample_diff(),
            None,
            Some("https://sheets.example.org/sheet-3?name=\"ledger\"".to_string()),
            Utc::now(),
        );
        let html = report.to_html();
        assert!(html.contains("href=\"https://sheets.example.org/sheet-3?name=&quot;ledger&quot;\""));
    }

    #[test]
    fn test_humanize_since() {
        let now = Utc::now();
        assert_eq!(humanize_since(now - Duration::seconds(30), now), "just now");
        assert_eq!(
            humanize_since(now - Duration::minutes(1), now),
            "1 minute ago"
        );
        assert_eq!(
            humanize_since(now - Duration::minutes(45), now),
            "45 minutes ago"
        );
        assert_eq!(humanize_since(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(humanize_since(now - Duration::days(2), now), "2 days ago");
        // A prior artifact from the future is clamped rather than negative.
        assert_eq!(humanize_since(now + Duration::hours(1), now), "just now");
    }
}
