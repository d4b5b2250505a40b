//! Plain-text ticket slip for receipt printers

use crate::domain::entities::PrintPayload;

/// Printable width in characters (58mm thermal roll)
pub const SLIP_WIDTH: usize = 32;

const HEADER: &str = "PATIENT TOKEN";

fn centered(text: &str) -> String {
    let len = text.chars().count();
    if len >= SLIP_WIDTH {
        return text.to_string();
    }
    let pad = (SLIP_WIDTH - len) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

/// Render a payload as the text handed to OS print commands
pub fn render(payload: &PrintPayload) -> String {
    let rule = "=".repeat(SLIP_WIDTH);
    let mut lines = vec![
        rule.clone(),
        centered(HEADER),
        rule.clone(),
        centered(&payload.department_name),
    ];
    if !payload.department_code.is_empty() {
        lines.push(centered(&format!("({})", payload.department_code)));
    }
    lines.push(String::new());
    lines.push(centered(&payload.ticket_number));
    lines.push(String::new());
    lines.push(format!("Date: {}", payload.date));
    lines.push(format!("Time: {}", payload.time));
    lines.push(rule);
    lines.push(centered("Please wait for your number"));
    lines.push(String::new());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_ticket_fields() {
        let payload = PrintPayload {
            ticket_number: "C014".into(),
            department_name: "Cardiology".into(),
            department_code: "C".into(),
            date: "2026-10-19".into(),
            time: "11:05".into(),
        };

        let slip = render(&payload);

        assert!(slip.contains("C014"));
        assert!(slip.contains("Cardiology"));
        assert!(slip.contains("(C)"));
        assert!(slip.contains("Date: 2026-10-19"));
        assert!(slip.contains("Time: 11:05"));
    }
}
