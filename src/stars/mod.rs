//! Star rating presentation
//!
//! Renders ratings as five stars (HTML markup for pages, glyphs for the
//! terminal) and formats the accompanying rating text. The interactive
//! widget lives in [`widget`].

pub mod widget;

pub use widget::{initialize_star_events, StarEvent, StarKey, StarWidget, WidgetState};

use crate::ratings::{RatingSummary, MAX_STARS};

/// Visual state of a single star
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarFill {
    Full,
    Half,
    Empty,
}

impl StarFill {
    /// Bootstrap Icons classes for this state
    fn css_class(self) -> &'static str {
        match self {
            StarFill::Full => "bi-star-fill text-warning",
            StarFill::Half => "bi-star-half text-warning",
            StarFill::Empty => "bi-star text-muted",
        }
    }

    /// Single-character glyph for terminal output
    pub fn glyph(self) -> char {
        match self {
            StarFill::Full => '★',
            StarFill::Half => '⯪',
            StarFill::Empty => '☆',
        }
    }
}

/// Classifies each of the five stars for a rating
///
/// The rating is rounded to the nearest half; a star is full when its
/// position is at or below the rounded value and half when it sits exactly
/// half a star above it. Negative or non-finite ratings show no stars.
///
/// # Example
///
/// ```
/// use course_ratings::stars::{star_fills, StarFill};
///
/// let fills = star_fills(3.5);
/// assert_eq!(fills[3], StarFill::Half);
/// assert_eq!(fills[4], StarFill::Empty);
/// ```
pub fn star_fills(rating: f64) -> [StarFill; MAX_STARS as usize] {
    let rating = if rating.is_finite() { rating.max(0.0) } else { 0.0 };
    let rounded = (rating * 2.0).round() / 2.0;

    std::array::from_fn(|i| {
        let position = (i + 1) as f64;
        if position <= rounded {
            StarFill::Full
        } else if position - 0.5 == rounded {
            StarFill::Half
        } else {
            StarFill::Empty
        }
    })
}

/// Renders five stars as Bootstrap Icons markup
///
/// Interactive stars additionally carry the `rating-star` class, a pointer
/// cursor, button semantics, and a `Rate {n} stars` label; only the first is
/// in the tab order.
pub fn render_stars(rating: f64, interactive: bool) -> String {
    star_fills(rating)
        .iter()
        .zip(1..=MAX_STARS)
        .map(|(fill, value)| render_star(*fill, value, interactive))
        .collect()
}

fn render_star(fill: StarFill, value: u8, interactive: bool) -> String {
    if !interactive {
        return format!(
            r#"<i class="bi {}" data-value="{}"></i>"#,
            fill.css_class(),
            value
        );
    }

    let label = format!("Rate {} stars", value);
    let tabindex = if value == 1 { 0 } else { -1 };
    format!(
        r#"<i class="bi {} rating-star" style="cursor:pointer; transition: color 0.2s ease;" data-value="{}" role="button" tabindex="{}" title="{}" aria-label="{}"></i>"#,
        fill.css_class(),
        value,
        tabindex,
        label,
        label
    )
}

/// Renders five stars as glyphs separated by spaces
pub fn render_stars_text(rating: f64) -> String {
    star_fills(rating)
        .iter()
        .map(|fill| fill.glyph().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable rating count
pub fn format_rating_text(summary: &RatingSummary) -> String {
    match summary.count {
        0 => "No ratings yet".to_string(),
        1 => "1 rating".to_string(),
        n => format!("{} ratings", n),
    }
}

/// Whether a summary carries real ratings worth displaying
pub fn is_valid_rating(summary: &RatingSummary) -> bool {
    summary.count > 0 && summary.average > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_and_a_half_stars() {
        assert_eq!(
            star_fills(3.5),
            [
                StarFill::Full,
                StarFill::Full,
                StarFill::Full,
                StarFill::Half,
                StarFill::Empty
            ]
        );
    }

    #[test]
    fn test_rounds_to_nearest_half() {
        // 3.74 rounds to 3.5, 3.75 rounds to 4
        assert_eq!(star_fills(3.74)[3], StarFill::Half);
        assert_eq!(star_fills(3.75)[3], StarFill::Full);
        assert_eq!(star_fills(3.24)[3], StarFill::Empty);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(star_fills(0.0), [StarFill::Empty; 5]);
        assert_eq!(star_fills(5.0), [StarFill::Full; 5]);
        assert_eq!(star_fills(-3.0), [StarFill::Empty; 5]);
        assert_eq!(star_fills(f64::NAN), [StarFill::Empty; 5]);
        assert_eq!(star_fills(9.0), [StarFill::Full; 5]);
    }

    #[test]
    fn test_markup_counts_for_three_and_a_half() {
        let html = render_stars(3.5, false);

        assert_eq!(html.matches("bi-star-fill").count(), 3);
        assert_eq!(html.matches("bi-star-half").count(), 1);
        assert_eq!(html.matches("bi bi-star text-muted").count(), 1);
        assert!(!html.contains("rating-star"));
        assert!(!html.contains("aria-label"));
    }

    #[test]
    fn test_markup_preserves_star_order() {
        let html = render_stars(3.5, false);

        let half = html.find("bi-star-half").unwrap();
        let empty = html.find("bi-star text-muted").unwrap();
        let last_full = html.rfind("bi-star-fill").unwrap();
        assert!(last_full < half && half < empty);
    }

    #[test]
    fn test_interactive_markup_has_affordances() {
        let html = render_stars(0.0, true);

        assert_eq!(html.matches("rating-star").count(), 5);
        assert_eq!(html.matches(r#"role="button""#).count(), 5);
        assert_eq!(html.matches(r#"tabindex="0""#).count(), 1);
        assert_eq!(html.matches(r#"tabindex="-1""#).count(), 4);
        for n in 1..=5 {
            assert!(html.contains(&format!(r#"data-value="{}""#, n)));
            assert!(html.contains(&format!(r#"aria-label="Rate {} stars""#, n)));
        }
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(render_stars_text(3.5), "★ ★ ★ ⯪ ☆");
        assert_eq!(render_stars_text(0.0), "☆ ☆ ☆ ☆ ☆");
    }

    #[test]
    fn test_format_rating_text() {
        let summary = |count| RatingSummary { average: 4.0, count };
        assert_eq!(format_rating_text(&summary(0)), "No ratings yet");
        assert_eq!(format_rating_text(&summary(1)), "1 rating");
        assert_eq!(format_rating_text(&summary(27)), "27 ratings");
    }

    #[test]
    fn test_is_valid_rating() {
        assert!(is_valid_rating(&RatingSummary { average: 4.2, count: 3 }));
        assert!(!is_valid_rating(&RatingSummary::EMPTY));
        assert!(!is_valid_rating(&RatingSummary { average: 0.0, count: 3 }));
        assert!(!is_valid_rating(&RatingSummary { average: 3.0, count: 0 }));
    }
}
