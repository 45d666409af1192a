#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use chrono::{Duration, TimeZone};
use libfuzzer_sys::fuzz_target;
use payvault_auth::{
    clock::canonical_offset, AuthConfig, AuthSession, AuthState, CredentialHasher, CredentialRecord,
    HasherConfig, ManualClock, Principal,
};

const PASSWORD: &str = "Fuzz#Password1";

#[derive(Arbitrary, Debug)]
enum Op {
    Authenticate { correct: bool },
    StartSession,
    Touch,
    EndSession,
    Logout,
    Unlock,
    IssueToken,
    Reset { use_token: bool, strong: bool },
    Advance { minutes: i16 },
}

fuzz_target!(|ops: Vec<Op>| {
    let config = AuthConfig {
        hasher: HasherConfig::low_cost(),
        ..Default::default()
    };
    let clock = ManualClock::new(canonical_offset().with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    let hasher = CredentialHasher::new(config.hasher);
    let credential = CredentialRecord::from_password(1, PASSWORD, &hasher).unwrap();
    let principal = Principal::new(1, "fuzz@example.com", "Fuzz", "Target", "Employee");
    let threshold = config.lockout.threshold;
    let mut auth = AuthSession::bound(principal, credential, config, Arc::new(clock.clone())).unwrap();

    let mut password = PASSWORD.to_string();
    let mut token: Option<String> = None;

    for op in ops.into_iter().take(64) {
        match op {
            Op::Authenticate { correct } => {
                let was_locked = auth.is_locked();
                let candidate = if correct { password.as_str() } else { "Wrong#Password1" };
                let ok = auth.authenticate(candidate);
                if was_locked {
                    assert!(!ok);
                } else {
                    assert_eq!(ok, correct);
                }
            }
            Op::StartSession => {
                let allowed = auth.is_authenticated();
                assert_eq!(auth.start_session("127.0.0.1", "fuzz"), allowed);
            }
            Op::Touch => {
                let _ = auth.update_session_activity();
            }
            Op::EndSession => auth.end_session(),
            Op::Logout => auth.logout(),
            Op::Unlock => auth.unlock(),
            Op::IssueToken => token = Some(auth.generate_password_reset_token()),
            Op::Reset { use_token, strong } => {
                let candidate = if use_token { token.clone().unwrap_or_default() } else { "0".repeat(64) };
                let new_password = if strong { "Fresh#Password2" } else { "weak" };
                if auth.reset_password(&candidate, new_password) {
                    password = new_password.to_string();
                    token = None;
                    assert!(!auth.is_locked());
                    assert_eq!(auth.failed_attempt_count(), 0);
                }
            }
            Op::Advance { minutes } => clock.advance(Duration::minutes(i64::from(minutes))),
        }

        assert!(auth.failed_attempt_count() <= threshold);
        assert!(auth.session_duration_minutes() >= 0);
        assert!(auth.time_until_expiry_minutes() >= 0);
        if auth.is_locked() {
            assert!(!auth.is_session_active());
        }
        if auth.is_session_active() {
            assert_eq!(auth.state(), AuthState::Authenticated { session_active: true });
        }
    }
});
