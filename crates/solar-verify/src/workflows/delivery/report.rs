//! HTML bodies for the magic-link, report, and verification-code emails.

use chrono::{DateTime, Utc};

use super::address::EmailAddress;
use super::mailer::OutboundEmail;
use super::token::AnalysisSnapshot;

pub(crate) fn magic_link_email(
    to: &EmailAddress,
    link: &str,
    expires_at: DateTime<Utc>,
) -> OutboundEmail {
    let link = escape(link);
    let expires = expires_at.format("%d %B %Y %H:%M UTC");
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<h2 style="color: #2c3e50;">Your SolarVerify analysis is ready</h2>
<p>Confirm your email address to view the full analysis and receive your report.</p>
<p style="text-align: center; margin: 30px 0;"><a href="{link}" style="background: #27ae60; color: #ffffff; padding: 12px 24px; border-radius: 6px; text-decoration: none;">View my analysis</a></p>
<p style="color: #7f8c8d; font-size: 13px;">This link expires at {expires}. If you did not request it you can ignore this email.</p>
</div>"#
    );

    OutboundEmail {
        to: to.to_string(),
        subject: "Confirm your email to view your SolarVerify analysis".to_string(),
        html,
        attachment: None,
    }
}

pub(crate) fn report_email(to: &EmailAddress, snapshot: &AnalysisSnapshot) -> OutboundEmail {
    let verdict = &snapshot.verdict;
    let breakdown = &snapshot.breakdown;
    let quote = &snapshot.quote;
    let grade = verdict
        .grade
        .map(|grade| grade.label())
        .unwrap_or("N/A");

    let mut rows = vec![
        row("System size", format!("{}kW", quote.system_size_kw)),
        row("Total price", pounds(quote.total_price)),
        row("Solar cost", pounds(breakdown.solar_cost)),
        row("Price per kWp", pounds(breakdown.price_per_kwp)),
    ];
    if quote.has_battery {
        let label = quote
            .battery_label
            .as_deref()
            .unwrap_or("Battery storage");
        rows.push(row(
            "Battery",
            format!("{} x {}", quote.battery_quantity, escape(label)),
        ));
        rows.push(row("Battery cost", pounds(breakdown.battery_cost)));
        if let Some(per_kwh) = breakdown.price_per_kwh {
            rows.push(row("Price per kWh", pounds(per_kwh)));
        }
        rows.push(row("Installation", pounds(breakdown.installation_cost)));
    }

    let recommendations = verdict
        .recommendations
        .iter()
        .map(|line| format!("<li>{}</li>", escape(line)))
        .collect::<String>();

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<h2 style="color: #2c3e50;">Your SolarVerify Analysis Report</h2>
<p style="font-size: 28px; font-weight: bold; margin: 10px 0;">Grade: {grade}</p>
<p><strong>{label}</strong>: {summary}</p>
<table style="width: 100%; border-collapse: collapse;">{rows}</table>
<h3 style="color: #2c3e50;">Recommended next steps</h3>
<ul>{recommendations}</ul>
<p style="color: #7f8c8d; font-size: 12px;">Benchmarks: {ruleset}. Prices are estimates against typical UK market rates.</p>
</div>"#,
        label = escape(&verdict.label),
        summary = escape(&verdict.summary),
        rows = rows.concat(),
        ruleset = escape(&verdict.ruleset),
    );

    OutboundEmail {
        to: to.to_string(),
        subject: format!("Your SolarVerify Analysis Report (Grade: {grade})"),
        html,
        attachment: None,
    }
}

pub(crate) fn verification_code_email(
    to: &EmailAddress,
    code: &str,
    ttl_minutes: i64,
) -> OutboundEmail {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<h2 style="color: #2c3e50;">Your SolarVerify verification code</h2>
<p style="font-size: 32px; letter-spacing: 6px; font-weight: bold;">{code}</p>
<p style="color: #7f8c8d; font-size: 13px;">The code is valid for {ttl_minutes} minutes.</p>
</div>"#
    );

    OutboundEmail {
        to: to.to_string(),
        subject: "Your SolarVerify verification code".to_string(),
        html,
        attachment: None,
    }
}

fn row(label: &str, value: String) -> String {
    format!(
        r#"<tr><td style="padding: 6px; border-bottom: 1px solid #ecf0f1;">{label}</td><td style="padding: 6px; border-bottom: 1px solid #ecf0f1; text-align: right;">{value}</td></tr>"#
    )
}

fn pounds(value: f64) -> String {
    format!("£{value:.0}")
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
