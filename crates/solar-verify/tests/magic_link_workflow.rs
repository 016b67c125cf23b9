use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};
use solar_verify::workflows::delivery::{
    DeliveryOutcome, InMemoryAnalysisStore, InMemoryDeliveryGate, MagicLinkError,
    MagicLinkService, MailerError, OutboundEmail, ReportMailer, TokenError, TokenService,
};
use solar_verify::workflows::quotes::{
    QuoteAnalysisService, QuoteInput, SolarCostFallback, StaticBenchmarks,
};

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl Outbox {
    fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("outbox mutex poisoned")
            .iter()
            .map(|email| email.subject.clone())
            .collect()
    }
}

#[async_trait]
impl ReportMailer for Outbox {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        self.sent.lock().expect("outbox mutex poisoned").push(email);
        Ok(())
    }
}

fn link_service(
    outbox: Arc<Outbox>,
) -> MagicLinkService<InMemoryAnalysisStore, InMemoryDeliveryGate, Outbox> {
    MagicLinkService::new(
        TokenService::new("integration-secret", Duration::minutes(30)),
        Arc::new(InMemoryAnalysisStore::default()),
        Arc::new(InMemoryDeliveryGate::default()),
        outbox,
        "https://solarverify.co.uk",
    )
}

#[tokio::test]
async fn quote_to_report_delivery_round_trip() {
    let analysis = QuoteAnalysisService::new(
        Arc::new(StaticBenchmarks::default()),
        SolarCostFallback::default(),
    )
    .analyze(QuoteInput::solar_only(4.0, 5600.0))
    .expect("valid quote");

    let outbox = Arc::new(Outbox::default());
    let links = link_service(outbox.clone());
    let issued = links
        .send_link("homeowner@example.co.uk", analysis.clone())
        .await
        .expect("link sent");
    assert!(issued.link.starts_with("https://solarverify.co.uk/verify?token="));

    let (phone, laptop) = tokio::join!(
        links.verify_link(&issued.token),
        links.verify_link(&issued.token)
    );
    let phone = phone.expect("phone verified");
    let laptop = laptop.expect("laptop verified");

    assert_eq!(phone.analysis_snapshot, analysis);
    assert_eq!(laptop.analysis_snapshot, analysis);
    let sent_count = [phone.delivery, laptop.delivery]
        .iter()
        .filter(|delivery| **delivery == DeliveryOutcome::Sent)
        .count();
    assert_eq!(sent_count, 1);

    let later = links.verify_link(&issued.token).await.expect("still readable");
    assert_eq!(later.delivery, DeliveryOutcome::AlreadySent);

    assert_eq!(
        outbox.subjects(),
        vec![
            "Confirm your email to view your SolarVerify analysis".to_string(),
            "Your SolarVerify Analysis Report (Grade: B)".to_string(),
        ]
    );
}

#[tokio::test]
async fn expired_links_are_rejected_and_swept() {
    let analysis = QuoteAnalysisService::new(
        Arc::new(StaticBenchmarks::default()),
        SolarCostFallback::default(),
    )
    .analyze(QuoteInput::solar_only(6.0, 9000.0))
    .expect("valid quote");

    let links = link_service(Arc::new(Outbox::default()));
    let issued = links
        .send_link("homeowner@example.co.uk", analysis)
        .await
        .expect("link sent");

    let after_expiry = issued.expires_at + Duration::seconds(1);
    assert!(matches!(
        links.verify_link_at(&issued.token, after_expiry).await,
        Err(MagicLinkError::Token(TokenError::Expired))
    ));

    assert_eq!(links.sweep_at(Utc::now()).expect("sweep"), 0);
    assert_eq!(links.sweep_at(after_expiry).expect("sweep"), 1);
    assert!(matches!(
        links.verify_link(&issued.token).await,
        Err(MagicLinkError::NotFound)
    ));
}
