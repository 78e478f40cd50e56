// src/utils/html.rs

use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Question text is authored in the admin panel and rendered in the student's
/// browser, so it goes through a whitelist: safe inline tags (<b>, <code>, <sub>)
/// survive, scripts, iframes and event-handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
