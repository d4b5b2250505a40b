//! Announcement phrasing and clip naming
//!
//! Ticket and counter numbers are spelled out one character at a time in
//! Urdu, so "A001" is read as "اے صفر صفر ایک" and never as a number.

use std::borrow::Cow;

/// Token spoken for spaces and dashes
pub const SEPARATOR: &str = "،";

/// Words that only the recall template contains
pub const RECALL_URGENCY: &str = "فوری طور پر";

/// Deterministic clip filename for a ticket at a counter
pub fn clip_filename(ticket_number: &str, counter_number: i32) -> String {
    format!("{}-counter{}.mp3", ticket_number, counter_number)
}

/// Spoken Urdu token for a single character.
///
/// Letters are matched case-insensitively. Anything outside `[A-Z0-9 -]`
/// is passed through unchanged.
pub fn spoken_token(c: char) -> Cow<'static, str> {
    let token = match c.to_ascii_uppercase() {
        'A' => "اے",
        'B' => "بی",
        'C' => "سی",
        'D' => "ڈی",
        'E' => "ای",
        'F' => "ایف",
        'G' => "جی",
        'H' => "ایچ",
        'I' => "آئی",
        'J' => "جے",
        'K' => "کے",
        'L' => "ایل",
        'M' => "ایم",
        'N' => "این",
        'O' => "او",
        'P' => "پی",
        'Q' => "کیو",
        'R' => "آر",
        'S' => "ایس",
        'T' => "ٹی",
        'U' => "یو",
        'V' => "وی",
        'W' => "ڈبلیو",
        'X' => "ایکس",
        'Y' => "وائی",
        'Z' => "زیڈ",
        '0' => "صفر",
        '1' => "ایک",
        '2' => "دو",
        '3' => "تین",
        '4' => "چار",
        '5' => "پانچ",
        '6' => "چھ",
        '7' => "سات",
        '8' => "آٹھ",
        '9' => "نو",
        ' ' | '-' => SEPARATOR,
        other => return Cow::Owned(other.to_string()),
    };
    Cow::Borrowed(token)
}

/// Spell out every character of `text`
pub fn spell_out(text: &str) -> String {
    text.chars()
        .map(spoken_token)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full announcement sentence for a first call or a recall
pub fn announcement_phrase(ticket_number: &str, counter_number: i32, is_recall: bool) -> String {
    let ticket = spell_out(ticket_number.trim());
    let counter = spell_out(&counter_number.to_string());

    if is_recall {
        format!(
            "ٹکٹ نمبر {}، براہ کرم {} کاؤنٹر نمبر {} پر تشریف لائیں",
            ticket, RECALL_URGENCY, counter
        )
    } else {
        format!(
            "ٹکٹ نمبر {}، براہ کرم کاؤنٹر نمبر {} پر تشریف لائیں",
            ticket, counter
        )
    }
}
