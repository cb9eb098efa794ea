use crate::channels::backoff;
use crate::error::{NotifyError, Result};
use crate::plugin::{parse_config, ChannelPlugin};
use crate::NotificationChannel;
use async_trait::async_trait;
use claimmon_common::types::Alert;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use serde_json::Value;

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailChannel {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        credentials: Option<(&str, &str)>,
        from: Mailbox,
        to: Vec<Mailbox>,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
            .map_err(|e| NotifyError::SmtpError(e.to_string()))?
            .port(smtp_port);

        if let Some((user, pass)) = credentials {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    fn subject(alert: &Alert) -> String {
        format!("[claimmon][{}] {}", alert.level, alert.title)
    }

    fn format_body(alert: &Alert) -> String {
        let mut body = format!(
            "Level: {level}\nCategory: {category}\nTitle: {title}\nMessage: {message}\nTime: {time}\nAlert ID: {id}",
            level = alert.level,
            category = alert.category,
            title = alert.title,
            message = alert.message,
            time = alert.timestamp.to_rfc3339(),
            id = alert.id,
        );
        if !alert.actions.is_empty() {
            body.push_str("\n\nSuggested actions:");
            for action in &alert.actions {
                body.push_str(&format!("\n- {} ({:?})", action.label, action.severity));
            }
        }
        body
    }

    fn build_message(&self, alert: &Alert) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(Self::subject(alert))
            .header(ContentType::TEXT_PLAIN);
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }
        builder
            .body(Self::format_body(alert))
            .map_err(|e| NotifyError::SmtpError(e.to_string()))
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let email = self.build_message(alert)?;

        let mut last_err = None;
        for attempt in 0..3u32 {
            match self.transport.send(email.clone()).await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "Email send failed, retrying"
                    );
                    last_err = Some(e);
                    if attempt < 2 {
                        tokio::time::sleep(backoff(attempt)).await;
                    }
                }
            }
        }

        let message = last_err.map(|e| e.to_string()).unwrap_or_default();
        tracing::error!(error = %message, "Email send failed after 3 attempts");
        Err(NotifyError::SmtpError(message))
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}

// Plugin

#[derive(Deserialize)]
struct EmailConfig {
    smtp_host: String,
    #[serde(default = "default_smtp_port")]
    smtp_port: u16,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
    from: String,
    to: Vec<String>,
}

fn default_smtp_port() -> u16 {
    587
}

impl EmailConfig {
    fn mailboxes(&self) -> Result<(Mailbox, Vec<Mailbox>)> {
        let from = self
            .from
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidConfig(format!("email: from '{}': {e}", self.from)))?;
        if self.to.is_empty() {
            return Err(NotifyError::InvalidConfig(
                "email: 'to' has no recipients".to_string(),
            ));
        }
        let to = self
            .to
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .map_err(|e| NotifyError::InvalidConfig(format!("email: to '{addr}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((from, to))
    }
}

pub struct EmailPlugin;

impl ChannelPlugin for EmailPlugin {
    fn name(&self) -> &str {
        "email"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        let cfg: EmailConfig = parse_config("email", config)?;
        cfg.mailboxes()?;
        Ok(())
    }

    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>> {
        let cfg: EmailConfig = parse_config("email", config)?;
        let (from, to) = cfg.mailboxes()?;
        let credentials = match (&cfg.smtp_username, &cfg.smtp_password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        };
        let channel = EmailChannel::new(&cfg.smtp_host, cfg.smtp_port, credentials, from, to)?;
        Ok(Box::new(channel))
    }
}
