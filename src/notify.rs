//! Email alerts for critical conditions and degradation trends

use crate::config::{EmailConfig, NotificationsConfig};
use crate::error::{Error, Result};
use crate::history::TrendResult;
use crate::report::HealthStatus;
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

const CRITICAL_SUBJECT: &str = "CRITICAL: Mist Infrastructure Alert";
const MAJOR_SUBJECT: &str = "MAJOR: Mist Infrastructure Alert";
const TREND_SUBJECT: &str = "TREND: Infrastructure Degradation Detected";

#[derive(Debug, Clone)]
pub struct NotificationService {
    enabled: bool,
    email: EmailConfig,
}

impl NotificationService {
    #[must_use]
    pub fn new(config: &NotificationsConfig) -> Self {
        Self {
            enabled: config.enabled,
            email: config.email.clone(),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled && self.email.enabled
    }

    pub async fn send_critical_alert(&self, health: &HealthStatus) -> bool {
        if !self.is_enabled() {
            debug!("notifications disabled, skipping critical alert");
            return false;
        }
        self.send_email(CRITICAL_SUBJECT, &critical_body(health)).await
    }

    pub async fn send_major_alert(&self, health: &HealthStatus) -> bool {
        if !self.is_enabled() {
            debug!("notifications disabled, skipping major alert");
            return false;
        }
        self.send_email(MAJOR_SUBJECT, &major_body(health)).await
    }

    /// Only sent when the trend has degraded metrics
    pub async fn send_trend_alert(&self, trend: &TrendResult) -> bool {
        if !self.is_enabled() {
            debug!("notifications disabled, skipping trend alert");
            return false;
        }
        if !trend.has_degradation() {
            return false;
        }
        self.send_email(TREND_SUBJECT, &trend_body(trend)).await
    }

    /// Send an HTML mail to every configured recipient. Failures are logged
    /// and reported as `false`.
    pub async fn send_email(&self, subject: &str, html: &str) -> bool {
        if self.email.recipients.is_empty() {
            warn!("no email recipients configured");
            return false;
        }

        let result = async {
            let message = self.build_message(subject, html)?;
            let transport = self.transport()?;
            transport.send(message).await?;
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(
                    recipients = self.email.recipients.len(),
                    subject, "email sent"
                );
                true
            }
            Err(e) => {
                error!(subject, error = %e, "error sending email");
                false
            }
        }
    }

    fn build_message(&self, subject: &str, html: &str) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.email.from_address.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML);
        for recipient in &self.email.recipients {
            builder = builder.to(recipient.parse()?);
        }
        Ok(builder.body(html.to_string())?)
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let server = self.email.smtp_server.as_str();
        debug!(server, port = self.email.smtp_port, "connecting to SMTP server");
        let builder = if self.email.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server)
        };
        let mut builder = builder
            .port(self.email.smtp_port)
            .timeout(Some(SMTP_TIMEOUT));

        if let (Some(user), Some(pass)) = (&self.email.smtp_user, &self.email.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(builder.build())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn page(color: &str, tint: &str, title: &str, content: &str) -> String {
    format!(
        r#"<html>
<head>
<style>
  body {{ font-family: Arial, sans-serif; }}
  .header {{ background-color: {color}; color: white; padding: 20px; }}
  .content {{ padding: 20px; background-color: #f5f5f5; }}
  .alert-box {{ background-color: {tint}; border-left: 4px solid {color}; padding: 15px; margin: 10px 0; }}
  .metric {{ background-color: white; padding: 10px; margin: 5px 0; }}
  .footer {{ font-size: 12px; color: #666; padding: 10px; }}
</style>
</head>
<body>
<div class="header"><h1>{title}</h1></div>
<div class="content">
<p><strong>Timestamp:</strong> {now}</p>
{content}
</div>
<div class="footer">
<p>Mist Infrastructure Manager | Automated Alert</p>
<p>Please do not reply to this email</p>
</div>
</body>
</html>
"#,
        now = Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

fn list(items: &[&str]) -> String {
    let mut out = String::from("<ul>\n");
    for item in items {
        let _ = writeln!(out, "<li>{item}</li>");
    }
    out.push_str("</ul>\n");
    out
}

pub(crate) fn critical_body(health: &HealthStatus) -> String {
    let content = format!(
        r#"<div class="alert-box">
<h2>Critical Issues Detected</h2>
<p><strong>Critical Insights:</strong> {}</p>
<p><strong>Overall Health:</strong> {}</p>
</div>
<h3>Impact Summary</h3>
<div class="metric"><p><strong>Affected Sites:</strong> {}</p></div>
<h3>Immediate Actions Required</h3>
{}"#,
        health.counts.critical,
        health.overall.as_str(),
        health.affected_sites(),
        list(&[
            "Check dashboard for affected infrastructure",
            "Review detailed logs and insights",
            "Activate incident response procedures",
            "Notify operations team",
        ])
    );
    page("#d32f2f", "#ffebee", "CRITICAL INFRASTRUCTURE ALERT", &content)
}

pub(crate) fn major_body(health: &HealthStatus) -> String {
    let content = format!(
        r#"<div class="alert-box">
<h2>Major Issues Detected</h2>
<p><strong>Major Insights:</strong> {}</p>
<p><strong>Overall Health:</strong> {}</p>
</div>
<h3>Issue Summary</h3>
<div class="metric"><p><strong>Affected Sites:</strong> {}</p></div>
<h3>Recommended Actions</h3>
{}"#,
        health.counts.major,
        health.overall.as_str(),
        health.affected_sites(),
        list(&[
            "Monitor the situation closely",
            "Review affected infrastructure in dashboard",
            "Prepare contingency plans",
            "Keep team on standby",
        ])
    );
    page("#f57c00", "#ffe0b2", "MAJOR INFRASTRUCTURE ALERT", &content)
}

pub(crate) fn trend_body(trend: &TrendResult) -> String {
    let mut items = String::new();
    for metric in &trend.degraded {
        let change = metric
            .percent_change
            .map_or_else(|| "new, was 0".to_string(), |pct| format!("{pct:+.1}%"));
        let _ = write!(
            items,
            r#"<div class="metric">
<p><strong>{}</strong></p>
<p>Previous: {:.1} &rarr; Current: {:.1}</p>
<p>Change: {change} {}</p>
</div>
"#,
            escape(&metric.key),
            metric.old,
            metric.new,
            metric.direction.label()
        );
    }

    let content = format!(
        r#"<div class="alert-box">
<h2>Degradation Detected</h2>
<p>Infrastructure metrics are trending negatively compared to {}.</p>
</div>
<h3>Affected Metrics</h3>
{items}<h3>Next Steps</h3>
{}"#,
        trend.baseline_date,
        list(&[
            "Monitor trends closely over the next 24 hours",
            "Review recent changes to infrastructure",
            "Check for external factors affecting performance",
            "Consider proactive scaling if trend continues",
        ])
    );
    page("#1976d2", "#e3f2fd", "INFRASTRUCTURE TREND ALERT", &content)
}
