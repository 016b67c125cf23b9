use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::Duration;
use serde_json::Value;

use crate::workflows::delivery::{
    CodeVerificationService, EmailAddress, InMemoryAnalysisStore, InMemoryCodeStore,
    InMemoryDeliveryGate, MagicLinkService, MailerError, OutboundEmail, ReportMailer,
    TokenService,
};
use crate::workflows::quotes::{
    QuoteAnalysisService, QuoteInput, SolarCostFallback, StaticBenchmarks,
};

use super::super::token::AnalysisSnapshot;

pub(super) const SECRET: &str = "test-signing-secret";
pub(super) const PUBLIC_URL: &str = "https://solar.example.com/";

pub(super) type LinkService<M> = MagicLinkService<InMemoryAnalysisStore, InMemoryDeliveryGate, M>;

pub(super) fn token_service() -> TokenService {
    TokenService::new(SECRET, Duration::hours(24))
}

pub(super) fn email() -> EmailAddress {
    EmailAddress::parse("homeowner@example.co.uk").expect("valid address")
}

pub(super) fn analyze(input: QuoteInput) -> AnalysisSnapshot {
    QuoteAnalysisService::new(
        Arc::new(StaticBenchmarks::default()),
        SolarCostFallback::default(),
    )
    .analyze(input)
    .expect("valid quote")
}

pub(super) fn snapshot() -> AnalysisSnapshot {
    analyze(QuoteInput::solar_only(5.0, 15_000.0).with_battery("tesla-powerwall-3", 1, None))
}

pub(super) fn link_service<M>(mailer: Arc<M>) -> LinkService<M>
where
    M: ReportMailer + 'static,
{
    MagicLinkService::new(
        token_service(),
        Arc::new(InMemoryAnalysisStore::default()),
        Arc::new(InMemoryDeliveryGate::default()),
        mailer,
        PUBLIC_URL,
    )
}

pub(super) fn code_service<M>(mailer: Arc<M>) -> CodeVerificationService<InMemoryCodeStore, M>
where
    M: ReportMailer + 'static,
{
    CodeVerificationService::new(
        Arc::new(InMemoryCodeStore::default()),
        mailer,
        Duration::minutes(10),
        5,
    )
}

/// Records every message and succeeds.
#[derive(Default)]
pub(super) struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingMailer {
    pub(super) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    pub(super) fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|email| email.subject).collect()
    }

    pub(super) fn reports(&self) -> usize {
        self.subjects()
            .iter()
            .filter(|subject| subject.starts_with("Your SolarVerify Analysis Report"))
            .count()
    }
}

#[async_trait]
impl ReportMailer for RecordingMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        self.sent.lock().expect("mailer mutex poisoned").push(email);
        Ok(())
    }
}

/// Fails every report send until healed; link and code emails always succeed.
#[derive(Default)]
pub(super) struct FlakyMailer {
    pub(super) inner: RecordingMailer,
    pub(super) failures: AtomicUsize,
    healthy: AtomicBool,
}

impl FlakyMailer {
    pub(super) fn heal(&self) {
        self.healthy.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReportMailer for FlakyMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        let is_report = email.subject.starts_with("Your SolarVerify Analysis Report");
        if is_report && !self.healthy.load(Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(MailerError::Rejected {
                status: 503,
                body: "provider unavailable".to_string(),
            });
        }
        self.inner.send(email).await
    }
}

/// Always fails.
pub(super) struct DownMailer;

#[async_trait]
impl ReportMailer for DownMailer {
    async fn send(&self, _email: OutboundEmail) -> Result<(), MailerError> {
        Err(MailerError::Transport("connection refused".to_string()))
    }
}

/// Sleeps before recording so concurrent verifications overlap.
#[derive(Default)]
pub(super) struct SlowMailer {
    pub(super) inner: RecordingMailer,
}

#[async_trait]
impl ReportMailer for SlowMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        self.inner.send(email).await
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
