//! System prompt sent with every model request.

use chrono::NaiveDate;

const CAPABILITIES: &str = "<SYSTEM_CAPABILITY>
* You control a single Chromium page through the tools provided. Do not try to open new windows or tabs.
* Use `navigate` to load a URL, `computer` for mouse, keyboard and screenshots, and `javascript` to read page state.
* Coordinates are CSS pixels inside the page viewport. Take a screenshot before clicking if you are unsure where things are.
* Tool calls can be slow. Batch related actions where you can.
* Scroll through the whole page before concluding that content is missing.
</SYSTEM_CAPABILITY>

<IMPORTANT>
* If a cookie banner or welcome screen appears, dismiss it and continue with the task.
* When a tool returns an error, read it before retrying the same action.
</IMPORTANT>";

/// Built-in prompt, or `custom` in its place, followed by today's date.
pub fn system_prompt(custom: Option<&str>, today: NaiveDate) -> String {
    let body = custom.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(CAPABILITIES);
    format!(
        "{}\n\nThe current date is {}.",
        body,
        today.format("%A, %B %-d, %Y")
    )
}

/// `system_prompt` for the local current date.
pub fn system_prompt_for_today(custom: Option<&str>) -> String {
    system_prompt(custom, chrono::Local::now().date_naive())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let prompt = system_prompt(None, date);
        assert!(prompt.starts_with("<SYSTEM_CAPABILITY>"));
        assert!(prompt.ends_with("The current date is Tuesday, March 5, 2024."));
    }

    #[test]
    fn test_custom_prompt_replaces_builtin() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let prompt = system_prompt(Some("  Be brief.  "), date);
        assert!(prompt.starts_with("Be brief.\n\n"));
        assert!(!prompt.contains("SYSTEM_CAPABILITY"));

        assert!(system_prompt(Some("   "), date).contains("SYSTEM_CAPABILITY"));
    }
}
