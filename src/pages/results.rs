//! Result caption and listing number parsing shared by results and detail pages.

use crate::locator::Locator;
use crate::session::{Session, WaitState};
use crate::{Error, Result};

/// Number in a "Showing 1,234 results" caption; 0 when absent
pub fn parse_result_count(caption: Option<&str>) -> u64 {
    let text = match caption {
        Some(text) => text.replace(',', ""),
        None => return 0,
    };
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Text after the last `#`, trimmed; the whole trimmed text when there is no `#`
pub fn parse_listing_id(text: &str) -> String {
    match text.rfind('#') {
        Some(pos) => text[pos + 1..].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Read a results caption, waiting for it within the probe budget.
/// A caption that never appears counts as zero results.
pub async fn read_result_count(session: &Session, caption: Locator) -> Result<u64> {
    let caption = session.locator(caption);
    match caption
        .wait_for(WaitState::Attached, session.timeouts().probe())
        .await
    {
        Ok(()) => {}
        Err(Error::Timeout { .. }) => return Ok(0),
        Err(e) => return Err(e),
    }
    let text = caption.text_content().await?;
    Ok(parse_result_count(text.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result_count() {
        assert_eq!(parse_result_count(Some("Showing 1,234 results")), 1234);
        assert_eq!(parse_result_count(Some("Showing 7 results")), 7);
        assert_eq!(parse_result_count(Some("Showing 0 results")), 0);
        assert_eq!(parse_result_count(Some("No results")), 0);
        assert_eq!(parse_result_count(None), 0);
    }

    #[test]
    fn test_parse_listing_id() {
        assert_eq!(parse_listing_id("Listing #123456"), "123456");
        assert_eq!(parse_listing_id("  Listing # 42 \n"), "42");
        assert_eq!(parse_listing_id("Ref #1 then #99"), "99");
        assert_eq!(parse_listing_id("  5017722 "), "5017722");
    }
}
