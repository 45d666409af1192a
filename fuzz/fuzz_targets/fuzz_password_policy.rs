#![no_main]

use libfuzzer_sys::fuzz_target;
use payvault_auth::policy::{
    check_password, is_password_valid, PolicyViolation, MIN_PASSWORD_LENGTH,
};

fuzz_target!(|candidate: &str| {
    let violations = check_password(candidate);

    assert_eq!(is_password_valid(candidate), violations.is_empty());
    assert_eq!(
        violations.contains(&PolicyViolation::TooShort),
        candidate.chars().count() < MIN_PASSWORD_LENGTH
    );
    assert!(violations.len() <= 5);
});
