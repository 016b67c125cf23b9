use std::sync::Arc;

use super::common::*;
use chrono::{Duration, Utc};

use crate::workflows::delivery::CodeVerificationError;

#[tokio::test]
async fn code_round_trip_verifies_email() {
    let mailer = Arc::new(RecordingMailer::default());
    let service = code_service(mailer.clone());

    let issued = service
        .send_code("Homeowner@Example.co.uk")
        .await
        .expect("code sent");

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html.contains(&issued.code));
    assert_eq!(issued.email_hash, email().hash());

    service
        .verify_code("homeowner@example.co.uk", &issued.code)
        .expect("verified");
}

#[tokio::test]
async fn wrong_code_is_invalid() {
    let service = code_service(Arc::new(RecordingMailer::default()));
    let issued = service
        .send_code("homeowner@example.co.uk")
        .await
        .expect("code sent");
    let wrong = if issued.code == "000000" { "111111" } else { "000000" };

    assert!(matches!(
        service.verify_code("homeowner@example.co.uk", wrong),
        Err(CodeVerificationError::InvalidCode)
    ));
    assert!(matches!(
        service.verify_code("nobody@example.co.uk", &issued.code),
        Err(CodeVerificationError::InvalidCode)
    ));
}

#[tokio::test]
async fn stale_code_is_expired() {
    let service = code_service(Arc::new(RecordingMailer::default()));
    let issued = service
        .send_code("homeowner@example.co.uk")
        .await
        .expect("code sent");

    let result = service.verify_code_at(
        "homeowner@example.co.uk",
        &issued.code,
        Utc::now() + Duration::minutes(11),
    );
    assert!(matches!(result, Err(CodeVerificationError::Expired)));
}

#[tokio::test]
async fn attempts_past_the_limit_are_rate_limited_even_with_correct_code() {
    let service = code_service(Arc::new(RecordingMailer::default()));
    let issued = service
        .send_code("homeowner@example.co.uk")
        .await
        .expect("code sent");
    let wrong = if issued.code == "000000" { "111111" } else { "000000" };

    for _ in 0..5 {
        assert!(matches!(
            service.verify_code("homeowner@example.co.uk", wrong),
            Err(CodeVerificationError::InvalidCode)
        ));
    }

    assert!(matches!(
        service.verify_code("homeowner@example.co.uk", &issued.code),
        Err(CodeVerificationError::RateLimited)
    ));
}

#[tokio::test]
async fn resending_resets_attempts() {
    let service = code_service(Arc::new(RecordingMailer::default()));
    let first = service
        .send_code("homeowner@example.co.uk")
        .await
        .expect("code sent");
    let wrong = if first.code == "000000" { "111111" } else { "000000" };
    for _ in 0..6 {
        let _ = service.verify_code("homeowner@example.co.uk", wrong);
    }

    let second = service
        .send_code("homeowner@example.co.uk")
        .await
        .expect("code resent");
    service
        .verify_code("homeowner@example.co.uk", &second.code)
        .expect("verified after resend");
}

#[tokio::test]
async fn mailer_failure_is_surfaced() {
    let service = code_service(Arc::new(DownMailer));
    assert!(matches!(
        service.send_code("homeowner@example.co.uk").await,
        Err(CodeVerificationError::Delivery(_))
    ));
}

#[tokio::test]
async fn missing_inputs_are_rejected() {
    let service = code_service(Arc::new(RecordingMailer::default()));
    assert!(matches!(
        service.send_code("").await,
        Err(CodeVerificationError::Address(_))
    ));
    assert!(matches!(
        service.verify_code("homeowner@example.co.uk", "  "),
        Err(CodeVerificationError::MissingCode)
    ));
}
