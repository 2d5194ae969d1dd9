//! Invite code generation and validation.

use serde::Deserialize;
use validator::Validate;

/// Charset for invite codes. Avoids confusing chars: 0, O, I, 1.
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate a random invite code in XXX-XXX-XXX format.
pub fn generate_invite_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    let mut segment = || -> String {
        (0..3)
            .map(|_| {
                let idx = rng.gen_range(0..CODE_CHARSET.len());
                CODE_CHARSET[idx] as char
            })
            .collect()
    };

    format!("{}-{}-{}", segment(), segment(), segment())
}

lazy_static::lazy_static! {
    static ref INVITE_CODE_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Z0-9]{3}-[A-Z0-9]{3}-[A-Z0-9]{3}$").unwrap();
}

/// Request to join a group using an invite code.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct JoinGroupRequest {
    /// The invite code in XXX-XXX-XXX format.
    #[validate(length(equal = 11, message = "Invalid invite code format"))]
    #[validate(regex(
        path = *INVITE_CODE_REGEX,
        message = "Invalid invite code format. Expected XXX-XXX-XXX"
    ))]
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_invite_code_format() {
        let code = generate_invite_code();
        assert_eq!(code.len(), 11); // XXX-XXX-XXX
        assert_eq!(&code[3..4], "-");
        assert_eq!(&code[7..8], "-");

        for (i, c) in code.chars().enumerate() {
            if i == 3 || i == 7 {
                assert_eq!(c, '-');
            } else {
                assert!(
                    c.is_ascii_uppercase() || c.is_ascii_digit(),
                    "Invalid char: {}",
                    c
                );
                assert!(c != 'O' && c != 'I' && c != '0' && c != '1');
            }
        }
    }

    #[test]
    fn test_generated_codes_pass_join_validation() {
        for _ in 0..50 {
            let request = JoinGroupRequest {
                code: generate_invite_code(),
            };
            assert!(request.validate().is_ok());
        }
    }

    #[test]
    fn test_generate_invite_code_uniqueness() {
        let codes: Vec<String> = (0..100).map(|_| generate_invite_code()).collect();
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        // With a 32-char alphabet over 9 positions, collisions are vanishingly rare.
        assert!(unique.len() >= 99);
    }

    #[test]
    fn test_join_request_rejects_bad_formats() {
        for bad in ["", "ABCDEFGHJ", "abc-def-ghj", "AB-CDE-FGHJ", "ABC_DEF_GHJ"] {
            let request = JoinGroupRequest {
                code: bad.to_string(),
            };
            assert!(request.validate().is_err(), "accepted: {}", bad);
        }
    }
}
