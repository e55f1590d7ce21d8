use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, gateway context, and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, gateway_url: &str, breadcrumb: &str) {
  // Extract domain from URL
  let domain = extract_domain(gateway_url);

  let header = Line::from(vec![
    Span::styled(" aquamon ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", domain), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", breadcrumb),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::raw("  "),
    // Shortcuts - keys highlighted, descriptions dimmed
    Span::styled("<:>", Style::default().fg(Color::Cyan)),
    Span::styled(" command", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("</>", Style::default().fg(Color::Cyan)),
    Span::styled(" filter", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("<q>", Style::default().fg(Color::Cyan)),
    Span::styled(" back", Style::default().fg(Color::DarkGray)),
  ]);

  let paragraph = Paragraph::new(header).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Extract domain from the gateway URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_domain_https() {
    assert_eq!(extract_domain("https://data.example.com/rest/v1"), "data.example.com");
  }

  #[test]
  fn test_extract_domain_bare() {
    assert_eq!(extract_domain("data.example.com"), "data.example.com");
  }
}
