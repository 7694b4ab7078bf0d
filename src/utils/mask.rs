/// `+15551234567` -> `***4567`
pub fn mask_phone(phone: &str) -> String {
    let n = phone.chars().count();
    if n <= 4 {
        "****".to_string()
    } else {
        let tail: String = phone.chars().skip(n - 4).collect();
        format!("***{tail}")
    }
}

/// `user@example.com` -> `u***@example.com`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+15551234567"), "***4567");
        assert_eq!(mask_phone("123"), "****");
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("user@example.com"), "u***@example.com");
        assert_eq!(mask_email("nope"), "***");
    }
}
