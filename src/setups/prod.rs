//! Production server setup code

use crate::{
    settings,
    setups::{CodeSender, ServerSetup},
};
use anyhow::Result;
use async_trait::async_trait;
use mailgun_rs::{EmailAddress, Mailgun, MailgunRegion, Message};
use std::collections::HashMap;

/// Production implementation of `ServerSetup`.
/// Actually calls out to Mailgun as configured in `settings.toml`.
#[derive(Clone, Debug, Default)]
pub struct ProdSetup;

impl ServerSetup for ProdSetup {
    type CodeSender = MailgunCodeSender;
}

#[derive(Debug, Clone)]
/// Sends verification & reset codes over email
pub struct MailgunCodeSender {
    settings: settings::Mailgun,
}

impl MailgunCodeSender {
    /// Create a new MailgunCodeSender
    pub fn new(settings: settings::Mailgun) -> Self {
        Self { settings }
    }

    fn sender(&self) -> EmailAddress {
        EmailAddress::name_address(&self.settings.from_name, &self.settings.from_address)
    }

    fn message(&self, email: &str, code: &str, subject: &str, template: &str) -> Message {
        let delivery_address = EmailAddress::address(email);
        let template_vars = HashMap::from_iter([("code".to_string(), code.to_string())]);

        Message {
            to: vec![delivery_address],
            subject: subject.to_string(),
            template: template.to_string(),
            template_vars,
            ..Default::default()
        }
    }

    async fn send(&self, message: Message) -> Result<()> {
        tracing::debug!(
            subject = %message.subject,
            template = %message.template,
            "Sending code email",
        );

        let client = Mailgun {
            message,
            api_key: self.settings.api_key.clone(),
            domain: self.settings.domain.clone(),
        };

        client.async_send(MailgunRegion::US, &self.sender()).await?;

        Ok(())
    }
}

#[async_trait]
impl CodeSender for MailgunCodeSender {
    async fn send_verification_code(&self, email: &str, code: &str) -> Result<()> {
        let message = self.message(
            email,
            code,
            &self.settings.verify_subject,
            &self.settings.verify_template,
        );

        self.send(message).await
    }

    async fn send_reset_code(&self, email: &str, code: &str) -> Result<()> {
        let message = self.message(
            email,
            code,
            &self.settings.reset_subject,
            &self.settings.reset_template,
        );

        self.send(message).await
    }
}
