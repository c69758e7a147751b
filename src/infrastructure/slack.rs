//! Slack incoming-webhook notifier.

use crate::application::ports::{NotificationError, Notifier};
use crate::domain::notification::Notification;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;

/// Upper bound on one webhook request, connect through response.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<Attachment<'a>>,
}

#[derive(Debug, Serialize)]
struct Attachment<'a> {
    color: &'static str,
    fields: Vec<Field<'a>>,
}

#[derive(Debug, Serialize)]
struct Field<'a> {
    title: &'a str,
    value: String,
    short: bool,
}

impl<'a> Field<'a> {
    fn short(title: &'a str, value: impl Into<String>) -> Self {
        Self {
            title,
            value: value.into(),
            short: true,
        }
    }
}

/// Posts notifications to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    webhook_url: Url,
    client: Client,
}

impl SlackNotifier {
    /// Create a notifier for `webhook_url`.
    ///
    /// # Errors
    /// Returns `NotificationError::InvalidWebhookUrl` unless the URL parses
    /// and uses `https`, or `NotificationError::Request` if the HTTP client
    /// cannot be built.
    pub fn new(webhook_url: &str) -> Result<Self, NotificationError> {
        let url = Url::parse(webhook_url)
            .ok()
            .filter(|url| url.scheme() == "https")
            .ok_or_else(|| {
                NotificationError::InvalidWebhookUrl(
                    "must be a valid URL and use https".to_string(),
                )
            })?;
        Self::with_url(url, REQUEST_TIMEOUT)
    }

    fn with_url(webhook_url: Url, timeout: Duration) -> Result<Self, NotificationError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            webhook_url,
            client,
        })
    }

    fn payload<'a>(notification: &'a Notification) -> SlackMessage<'a> {
        let mut fields = vec![
            Field::short("Action", notification.action.as_str()),
            Field::short("Time", notification.formatted_time()),
        ];
        if let Some(duration) = &notification.exec_duration {
            fields.push(Field::short("Duration", duration.as_str()));
        }
        if let Some(code) = &notification.exit_code {
            fields.push(Field::short("Exit Code", code.as_str()));
        }
        fields.extend(
            notification
                .labels
                .iter()
                .map(|(key, value)| Field::short(key, value.as_str())),
        );

        SlackMessage {
            text: format!(
                "{} Container Event: {}",
                icon(&notification.action, notification.exit_code.as_deref()),
                notification.container_name
            ),
            attachments: vec![Attachment {
                color: color(&notification.action),
                fields,
            }],
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&Self::payload(notification))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Status(status.as_u16()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "slack"
    }
}

/// Emoji prefix for a notification; exit codes take precedence over actions.
pub fn icon(action: &str, exit_code: Option<&str>) -> &'static str {
    match exit_code {
        Some("137") => return ":warning: :memory:",
        Some(code) if code != "0" => return ":x:",
        _ => {}
    }

    match action {
        "create" => ":package:",
        "start" => ":arrow_forward:",
        "die" => ":stop_sign:",
        "stop" => ":octagonal_sign:",
        "kill" => ":skull_and_crossbones:",
        "oom" => ":warning: :memory:",
        "pause" => ":pause_button:",
        "unpause" => ":play_pause:",
        "restart" => ":arrows_counterclockwise:",
        "update" => ":arrows_clockwise:",
        _ => ":information_source:",
    }
}

/// Attachment color for an action.
pub fn color(action: &str) -> &'static str {
    match action {
        "create" | "start" | "unpause" => "#36a64f",
        "die" | "stop" | "kill" => "#ff0000",
        "oom" => "#8B0000",
        "pause" => "#FFA500",
        "restart" | "update" => "#1E90FF",
        _ => "#808080",
    }
}
