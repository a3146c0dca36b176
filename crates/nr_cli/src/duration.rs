use std::str::FromStr;
use std::time::Duration;

/// Durations written like `10s`, `1m30s` or `500ms`. A bare number is seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total = Duration::ZERO;
        let mut current_number = String::new();
        let mut chars = s.trim().chars().peekable();
        let mut has_value = false;

        while let Some(c) = chars.next() {
            if c.is_ascii_digit() {
                current_number.push(c);
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
            let num = current_number
                .parse::<u64>()
                .map_err(|_| format!("Invalid duration: {}", s))?;
            total += match c {
                'm' if chars.peek() == Some(&'s') => {
                    chars.next();
                    Duration::from_millis(num)
                }
                's' => Duration::from_secs(num),
                'm' => Duration::from_secs(num * 60),
                'h' => Duration::from_secs(num * 3600),
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            current_number.clear();
            has_value = true;
        }

        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total += Duration::from_secs(num);
            has_value = true;
        }

        if !has_value {
            return Err("Duration must include a number".to_string());
        }
        Ok(HumanDuration(total))
    }
}
