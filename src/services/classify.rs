//! Registry page classification.
//!
//! Reduces a fetched page to one of: rate limited, blocked, or a company
//! page carrying a branch indicator. Marker checks run before any DOM work
//! because CAPTCHA and denial pages rarely parse into anything useful.

use scraper::{Html, Selector};

/// Classification of a fetched registry page, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClass {
    /// Rate-limit or CAPTCHA interstitial
    RateLimited,
    /// Access-denied page distinct from rate limiting
    Blocked,
    /// A page that reached the registry; carries the branch signal
    Company(BranchIndicator),
}

/// Branch/subsidiary signal extracted from a company page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchIndicator {
    /// Number of branch signals found; zero means a definitive "no branches"
    Count(u32),
    /// The page is not a registry company page (expected structure missing)
    Absent,
    /// The document has no recognizable head at all
    Malformed,
}

/// Substrings that mark a rate-limit / CAPTCHA interstitial.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "captcha",
    "too many requests",
    "rate limit",
    "unusual traffic",
];

/// Substrings that mark an access-denied page.
const BLOCKED_MARKERS: &[&str] = &[
    "access denied",
    "has been blocked",
    "attention required",
];

/// Title marker identifying a genuine registry page.
const REGISTRY_TITLE_MARKER: &str = "OpenCorporates";

pub fn classify_page(html: &str) -> PageClass {
    let lowered = html.to_lowercase();

    if RATE_LIMIT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return PageClass::RateLimited;
    }
    if BLOCKED_MARKERS.iter().any(|m| lowered.contains(m)) {
        return PageClass::Blocked;
    }

    PageClass::Company(extract_branch_indicator(html))
}

/// Extract the branch/subsidiary count from a company page.
///
/// Three signals, matching the aggregator's markup:
/// - rows of the dedicated branch-relationship data table
/// - "branch" entries in the similarly-named sidebar
/// - "branch" rows in the generic company data table
pub fn extract_branch_indicator(html: &str) -> BranchIndicator {
    let document = Html::parse_document(html);

    let title_sel = Selector::parse("title").expect("valid selector");
    let title = match document.select(&title_sel).next() {
        Some(el) => el.text().collect::<String>(),
        None => return BranchIndicator::Malformed,
    };
    if !title.contains(REGISTRY_TITLE_MARKER) {
        return BranchIndicator::Absent;
    }

    let mut count: u32 = 0;

    // Dedicated branch-relationship section: count its data rows.
    let branch_section_sel =
        Selector::parse("div#data-table-branch_relationship_subject").expect("valid selector");
    let row_sel = Selector::parse("tr").expect("valid selector");
    let td_sel = Selector::parse("td").expect("valid selector");
    if let Some(section) = document.select(&branch_section_sel).next() {
        let data_rows = section
            .select(&row_sel)
            .filter(|row| row.select(&td_sel).next().is_some())
            .count() as u32;
        // The section only renders when at least one branch exists.
        count += data_rows.max(1);
    }

    // Similarly-named sidebar: count entries mentioning a branch.
    let sidebar_li_sel =
        Selector::parse("div.sidebar-item#similarly_named li").expect("valid selector");
    count += document
        .select(&sidebar_li_sel)
        .filter(|li| li.text().collect::<String>().to_lowercase().contains("branch"))
        .count() as u32;

    // Company data table: count rows mentioning a branch.
    let data_table_row_sel =
        Selector::parse("table.company-data-object tr").expect("valid selector");
    count += document
        .select(&data_table_row_sel)
        .filter(|row| row.text().collect::<String>().to_lowercase().contains("branch"))
        .count() as u32;

    BranchIndicator::Count(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company_page(body: &str) -> String {
        format!(
            "<html><head><title>Acme B.V. :: OpenCorporates</title></head><body>{body}</body></html>"
        )
    }

    #[test]
    fn test_rate_limit_markers() {
        let html = "<html><body>Please solve this CAPTCHA to continue</body></html>";
        assert_eq!(classify_page(html), PageClass::RateLimited);

        let html = "<html><body>429 Too Many Requests</body></html>";
        assert_eq!(classify_page(html), PageClass::RateLimited);
    }

    #[test]
    fn test_blocked_markers() {
        let html = "<html><body><h1>Access Denied</h1></body></html>";
        assert_eq!(classify_page(html), PageClass::Blocked);

        let html = "<html><body>Your IP has been blocked.</body></html>";
        assert_eq!(classify_page(html), PageClass::Blocked);
    }

    #[test]
    fn test_rate_limit_takes_priority_over_blocked() {
        let html = "<html><body>Access denied: too many requests</body></html>";
        assert_eq!(classify_page(html), PageClass::RateLimited);
    }

    #[test]
    fn test_branch_section_detected() {
        let html = company_page(
            r#"<div id="data-table-branch_relationship_subject">
                 <table>
                   <tr><th>Name</th></tr>
                   <tr><td>Branch A</td></tr>
                   <tr><td>Branch B</td></tr>
                 </table>
               </div>"#,
        );
        assert_eq!(
            classify_page(&html),
            PageClass::Company(BranchIndicator::Count(2))
        );
    }

    #[test]
    fn test_sidebar_branch_mentions() {
        let html = company_page(
            r#"<div class="sidebar-item" id="similarly_named">
                 <ul>
                   <li>Acme branch office Rotterdam</li>
                   <li>Acme Holding B.V.</li>
                 </ul>
               </div>"#,
        );
        assert_eq!(
            classify_page(&html),
            PageClass::Company(BranchIndicator::Count(1))
        );
    }

    #[test]
    fn test_data_table_branch_rows() {
        let html = company_page(
            r#"<table class="company-data-object">
                 <tr><td>Company Type</td><td>Branch</td></tr>
                 <tr><td>Status</td><td>Active</td></tr>
               </table>"#,
        );
        assert_eq!(
            classify_page(&html),
            PageClass::Company(BranchIndicator::Count(1))
        );
    }

    #[test]
    fn test_no_branch_signals_is_count_zero() {
        let html = company_page(
            r#"<table class="company-data-object">
                 <tr><td>Status</td><td>Active</td></tr>
               </table>"#,
        );
        assert_eq!(
            classify_page(&html),
            PageClass::Company(BranchIndicator::Count(0))
        );
    }

    #[test]
    fn test_non_registry_page_is_absent() {
        let html = "<html><head><title>Some other site</title></head><body></body></html>";
        assert_eq!(
            classify_page(html),
            PageClass::Company(BranchIndicator::Absent)
        );
    }

    #[test]
    fn test_headless_document_is_malformed() {
        assert_eq!(
            classify_page("<div>fragment without a head</div>"),
            PageClass::Company(BranchIndicator::Malformed)
        );
    }
}
