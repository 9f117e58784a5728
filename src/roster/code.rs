//! Six-letter attendance codes.

use rand::Rng;

pub const CODE_LEN: usize = 6;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("Attendance code must be 6 letters.")]
    Malformed,
    #[error("Incorrect attendance code.")]
    Mismatch,
}

/// Generate a fresh uppercase code.
#[must_use]
pub fn generate() -> String {
    generate_with(&mut rand::thread_rng())
}

pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LEN)
        .filter_map(|_| {
            CODE_ALPHABET
                .get(rng.gen_range(0..CODE_ALPHABET.len()))
                .map(|&byte| byte as char)
        })
        .collect()
}

/// Trim and uppercase user input, rejecting anything that is not six ASCII letters.
///
/// # Errors
/// Returns [`CodeError::Malformed`] when the input has the wrong shape.
pub fn normalize(input: &str) -> Result<String, CodeError> {
    let normalized = input.trim().to_ascii_uppercase();
    if normalized.len() == CODE_LEN && normalized.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(normalized)
    } else {
        Err(CodeError::Malformed)
    }
}

/// Compare an entered code with the event's stored code.
///
/// # Errors
/// Returns [`CodeError::Malformed`] for badly shaped input and
/// [`CodeError::Mismatch`] when the codes differ.
pub fn check(entered: &str, stored: &str) -> Result<(), CodeError> {
    let entered = normalize(entered)?;
    if entered == stored.trim().to_ascii_uppercase() {
        Ok(())
    } else {
        Err(CodeError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn lowercase_input_matches() {
        assert_eq!(check("abcdef", "ABCDEF"), Ok(()));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(check("  AbCdEf\n", "ABCDEF"), Ok(()));
    }

    #[test]
    fn wrong_code_is_mismatch() {
        assert_eq!(check("ABCDEG", "ABCDEF"), Err(CodeError::Mismatch));
    }

    #[test]
    fn malformed_input_rejected_before_compare() {
        assert_eq!(check("ABC", "ABCDEF"), Err(CodeError::Malformed));
        assert_eq!(check("ABC123", "ABCDEF"), Err(CodeError::Malformed));
        assert_eq!(check("ABCDEFG", "ABCDEF"), Err(CodeError::Malformed));
        assert_eq!(check("", "ABCDEF"), Err(CodeError::Malformed));
    }

    #[test]
    fn generated_codes_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let code = generate_with(&mut rng);
            assert_eq!(normalize(&code), Ok(code.clone()));
        }
        assert_eq!(generate().len(), CODE_LEN);
    }
}
