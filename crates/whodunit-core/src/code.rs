use rand::Rng;

/// Characters a session code is drawn from.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a session join code.
pub const CODE_LEN: usize = 6;

/// Generate a random session code such as `K7QZ2M`.
/// Uniqueness is the caller's job (see the registry).
pub fn generate_session_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Canonical form used as the registry key.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// True if `code` has the shape of a session code, ignoring case.
pub fn is_valid_session_code(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generated_codes_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let code = generate_session_code(&mut rng);
            assert!(is_valid_session_code(&code), "bad code {code}");
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn validation_is_case_insensitive() {
        assert!(is_valid_session_code("abc123"));
        assert!(is_valid_session_code("ABC123"));
        assert!(!is_valid_session_code("ABC12"));
        assert!(!is_valid_session_code("ABC1234"));
        assert!(!is_valid_session_code("ABC-12"));
        assert!(!is_valid_session_code("ÄBC123"));
    }

    #[test]
    fn normalize_uppercases_and_trims() {
        assert_eq!(normalize_code(" ab12cd "), "AB12CD");
    }
}
