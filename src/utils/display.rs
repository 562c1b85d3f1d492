//! Terminal rendering of paper lists.

use comfy_table::{presets, Attribute, Cell, Table};

use crate::models::Paper;

/// Truncate text to `max_chars` characters, ending with an ellipsis when cut.
///
/// ```
/// use paper_harvest::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
/// assert_eq!(truncate_with_ellipsis("Hi", 8), "Hi");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}

/// Build a table with one row per paper
pub fn papers_table(papers: &[Paper]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.set_header(vec![
        "ID", "Title", "Authors", "Year", "Source", "Cited", "Saved",
    ]);

    for paper in papers {
        table.add_row(vec![
            Cell::new(truncate_with_ellipsis(&paper.id, 28)),
            Cell::new(truncate_with_ellipsis(&paper.title, 50)).add_attribute(Attribute::Bold),
            Cell::new(truncate_with_ellipsis(&paper.author_line(), 30)),
            Cell::new(paper.year.map(|y| y.to_string()).unwrap_or_default()),
            Cell::new(paper.api_source.id()),
            Cell::new(paper.citation_count),
            Cell::new(if paper.downloaded { "yes" } else { "" }),
        ]);
    }
    table
}
