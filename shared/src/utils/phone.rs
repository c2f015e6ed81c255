//! Recipient masking for log output

/// Digits and a leading `+`, with spaces, dashes and parentheses dropped
fn dial_chars(phone: &str) -> Vec<char> {
    phone
        .chars()
        .enumerate()
        .filter(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '+'))
        .map(|(_, c)| c)
        .collect()
}

/// Mask a recipient for logs, keeping the first three and last four characters
///
/// `13812345678` becomes `138****5678`. Anything shorter than seven dial
/// characters is masked entirely.
pub fn mask_phone_number(phone: &str) -> String {
    let chars = dial_chars(phone);
    if chars.len() < 7 {
        return "****".to_string();
    }

    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_domestic_and_international() {
        assert_eq!(mask_phone_number("13812345678"), "138****5678");
        assert_eq!(mask_phone_number("+8613812345678"), "+86****5678");
        assert_eq!(mask_phone_number("138-1234-5678"), "138****5678");
    }

    #[test]
    fn test_mask_short_or_empty() {
        assert_eq!(mask_phone_number("12345"), "****");
        assert_eq!(mask_phone_number(""), "****");
    }

    #[test]
    fn test_mask_ignores_non_ascii() {
        assert_eq!(mask_phone_number("电话13812345678"), "138****5678");
    }
}
