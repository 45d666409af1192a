#![no_main]

use libfuzzer_sys::fuzz_target;
use payvault_auth::hasher::{parse_stored, CredentialHasher, HasherConfig, HASH_LEN, SALT_LEN};

fuzz_target!(|data: &[u8]| {
    let Ok(stored) = std::str::from_utf8(data) else {
        return;
    };

    // Parsing arbitrary text should not panic
    if let Some((salt, hash)) = parse_stored(stored) {
        assert_eq!(salt.len(), SALT_LEN);
        assert_eq!(hash.len(), HASH_LEN);
    }

    // Verification should answer false, not panic, for anything it cannot parse
    let hasher = CredentialHasher::new(HasherConfig::low_cost());
    let matched = hasher.verify_password("Fuzz#Password1", stored);
    if parse_stored(stored).is_none() {
        assert!(!matched);
    }
});
