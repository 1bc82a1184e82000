//! Reminder form rules and the color palette.
//!
//! The store accepts whatever it is given; these checks run in front of it,
//! where the reminder editor collects input.

use thiserror::Error;

/// Maximum reminder text length, in characters.
pub const MAX_TEXT_LENGTH: usize = 30;

/// Errors raised by reminder form validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please enter reminder text")]
    EmptyText,

    #[error("Reminder text cannot exceed 30 characters")]
    TextTooLong,
}

/// Validate reminder text.
///
/// # Errors
/// Returns `FormError::EmptyText` for empty or whitespace-only text and
/// `FormError::TextTooLong` past `MAX_TEXT_LENGTH` characters.
pub fn validate_reminder_text(text: &str) -> Result<(), FormError> {
    if text.trim().is_empty() {
        return Err(FormError::EmptyText);
    }

    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(FormError::TextTooLong);
    }

    Ok(())
}

/// A selectable reminder color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorOption {
    pub value: &'static str,
    pub name: &'static str,
}

pub const COLOR_OPTIONS: [ColorOption; 6] = [
    ColorOption { value: "#3b82f6", name: "Blue" },
    ColorOption { value: "#ef4444", name: "Red" },
    ColorOption { value: "#10b981", name: "Green" },
    ColorOption { value: "#f59e0b", name: "Orange" },
    ColorOption { value: "#8b5cf6", name: "Purple" },
    ColorOption { value: "#ec4899", name: "Pink" },
];

pub const DEFAULT_COLOR: &str = COLOR_OPTIONS[0].value;

/// Look up a palette entry by hex value (case-insensitive).
pub fn color_option(value: &str) -> Option<&'static ColorOption> {
    COLOR_OPTIONS
        .iter()
        .find(|c| c.value.eq_ignore_ascii_case(value))
}

/// Cities offered as suggestions in the reminder form. Free text is still
/// accepted.
pub const CITY_OPTIONS: [&str; 38] = [
    "New York",
    "Los Angeles",
    "Chicago",
    "Houston",
    "Phoenix",
    "Philadelphia",
    "San Antonio",
    "San Diego",
    "Dallas",
    "San Jose",
    "Austin",
    "Jacksonville",
    "Fort Worth",
    "Columbus",
    "Charlotte",
    "San Francisco",
    "Indianapolis",
    "Seattle",
    "Denver",
    "Washington",
    "Boston",
    "London",
    "Paris",
    "Tokyo",
    "Sydney",
    "Berlin",
    "Moscow",
    "Rio de Janeiro",
    "São Paulo",
    "Toronto",
    "Vancouver",
    "Madrid",
    "Rome",
    "Amsterdam",
    "Brussels",
    "Vienna",
    "Prague",
    "Dubai",
];

/// Suggested cities containing `input`, ignoring case, in list order.
/// Blank input matches everything.
pub fn matching_cities(input: &str) -> Vec<&'static str> {
    let needle = input.trim().to_lowercase();
    CITY_OPTIONS
        .iter()
        .copied()
        .filter(|city| city.to_lowercase().contains(&needle))
        .collect()
}

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Short name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_NAMES.get(index).copied()
}
