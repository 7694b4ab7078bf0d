use rand::Rng;

/// Generates a 6-digit numeric code, uniform over 100000..=999999.
pub fn generate_six_digit_code() -> String {
    // ThreadRng is a CSPRNG seeded from the OS, reseeded per thread.
    let mut rng = rand::thread_rng();
    rng.gen_range(100000u32..=999999u32).to_string()
}

/// Exactly six ASCII digits.
pub fn is_six_digit_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}
