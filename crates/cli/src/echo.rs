use owo_colors::OwoColorize;
use shelfmark_core::ArticleRecord;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Shelfmark".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Preview what gets saved for a page\n".dimmed());
}

pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Field-by-field summary of what was extracted.
pub fn print_record_summary(record: &ArticleRecord) {
    let field = |label: &str, value: Option<&str>| match value {
        Some(value) => eprintln!("  {} {}", format!("{label}:").dimmed(), value.bright_white()),
        None => eprintln!("  {} {}", format!("{label}:").dimmed(), "none".dimmed()),
    };

    field("Title", Some(record.title.as_str()));
    field("Author", record.author.as_deref());
    field("Published", record.published_date.as_deref());
    field("Image", record.top_image.as_deref());
    eprintln!(
        "  {} {}\n",
        "Content:".dimmed(),
        format!("{} words", record.content.split_whitespace().count()).bright_white()
    );
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
