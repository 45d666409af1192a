#![no_main]

use libfuzzer_sys::fuzz_target;
use payvault_auth::AuthConfig;

fuzz_target!(|contents: &str| {
    // Any document that parses must also pass validation
    if let Ok(config) = AuthConfig::from_toml_str(contents) {
        assert!(config.validate().is_ok());
        assert!(config.lockout.threshold >= 1);
        assert!(config.hasher.params().is_ok());

        // Offsets and windows should be usable without overflow
        let _ = config.offset();
        let _ = config.session.timeout();
        let _ = config.reset.token_ttl();
        let _ = config.lockout.auto_unlock_after();
    }
});
