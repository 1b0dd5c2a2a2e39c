//! 邮件发送
//!
//! 配置了邮件服务器时使用 SMTP，否则只把邮件写进日志。
//! 一个连接最多发送 `mail.max_emails` 封，超出的部分换新连接继续发送。

pub mod messages;
pub mod reminders;

use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::MailConfig;
use crate::errors::{CGSystemError, Result};

pub use reminders::ReminderScheduler;

/// 一封待发送的邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// 发送一批邮件，返回成功数量；单封失败只记录日志
    async fn send_batch(&self, messages: Vec<MailMessage>) -> usize;
}

pub struct SmtpMailer {
    config: MailConfig,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let sender = config.default_sender.parse::<Mailbox>().map_err(|e| {
            CGSystemError::external_service(format!("无效的发件人地址 {}: {e}", config.default_sender))
        })?;
        Ok(Self {
            config: config.clone(),
            sender,
        })
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if self.config.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.server)
        } else if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.server)
        } else {
            Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &self.config.server,
            ))
        }
        .map_err(|e| CGSystemError::external_service(format!("创建 SMTP 连接失败: {e}")))?;

        let mut builder = builder.port(self.config.port);
        if !self.config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }
        Ok(builder.build())
    }

    fn build_message(&self, mail: &MailMessage) -> Result<Message> {
        let to = mail
            .to_email
            .parse()
            .map(|addr| Mailbox::new(Some(mail.to_name.clone()), addr))
            .map_err(|e| CGSystemError::invalid_param(format!("Invalid email address: {e}")))?;
        Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(&mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| CGSystemError::external_service(format!("构建邮件失败: {e}")))
    }
}

impl SmtpMailer {
    /// 用一个新连接发送一组邮件
    async fn send_chunk(&self, chunk: Vec<MailMessage>) -> usize {
        let transport = match self.transport() {
            Ok(transport) => transport,
            Err(e) => {
                warn!("Failed to connect to mail server: {}", e);
                return 0;
            }
        };

        let mut sent = 0;
        for mail in &chunk {
            let message = match self.build_message(mail) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Failed to build mail to {}: {}", mail.to_email, e);
                    continue;
                }
            };
            match transport.send(message).await {
                Ok(_) => sent += 1,
                Err(e) => warn!("Failed to send mail to {}: {}", mail.to_email, e),
            }
        }
        sent
    }
}

/// 按每个连接最多 `max` 封切分，逐组发送，返回成功总数
pub async fn send_chunked<F, Fut>(messages: Vec<MailMessage>, max: usize, mut send_chunk: F) -> usize
where
    F: FnMut(Vec<MailMessage>) -> Fut,
    Fut: Future<Output = usize>,
{
    let mut sent = 0;
    for chunk in messages.chunks(max.max(1)) {
        sent += send_chunk(chunk.to_vec()).await;
    }
    sent
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_batch(&self, messages: Vec<MailMessage>) -> usize {
        send_chunked(messages, self.config.max_emails, |chunk| self.send_chunk(chunk)).await
    }
}

/// 未配置邮件服务器时使用
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_batch(&self, messages: Vec<MailMessage>) -> usize {
        for mail in &messages {
            info!(
                "Mail server not configured, not sending \"{}\" to {}",
                mail.subject, mail.to_email
            );
        }
        messages.len()
    }
}

pub fn create_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    if config.server.is_empty() {
        info!("No mail server configured, mails will only be logged");
        Ok(Arc::new(LogMailer))
    } else {
        Ok(Arc::new(SmtpMailer::new(config)?))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::sync::Mutex;

    /// 记录所有邮件，测试用
    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        pub sent: Mutex<Vec<MailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_batch(&self, messages: Vec<MailMessage>) -> usize {
            let count = messages.len();
            self.sent.lock().await.extend(messages);
            count
        }
    }

    fn mail(to: &str) -> MailMessage {
        MailMessage {
            to_name: "Grader".into(),
            to_email: to.into(),
            subject: "subject".into(),
            body: "body".into(),
        }
    }

    #[tokio::test]
    async fn test_log_mailer_counts() {
        assert_eq!(LogMailer.send_batch(vec![mail("a@b.c"), mail("d@e.f")]).await, 2);
    }

    #[tokio::test]
    async fn test_batches_beyond_connection_limit_are_all_sent() {
        let chunks = Mutex::new(Vec::new());
        let record = &chunks;
        let sent = send_chunked(
            vec![mail("a@b.c"), mail("d@e.f"), mail("g@h.i")],
            1,
            |chunk| async move {
                let count = chunk.len();
                record.lock().await.push(chunk);
                count
            },
        )
        .await;
        assert_eq!(sent, 3);
        let chunks = chunks.into_inner();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 1));
        assert_eq!(chunks[2][0].to_email, "g@h.i");

        let sent = send_chunked(vec![mail("a@b.c"), mail("d@e.f"), mail("g@h.i")], 2, |chunk| async move {
            chunk.len()
        })
        .await;
        assert_eq!(sent, 3);
    }

    #[test]
    fn test_create_mailer_without_server() {
        assert!(create_mailer(&MailConfig::default()).is_ok());
    }

    #[test]
    fn test_smtp_message_building() {
        let config = MailConfig {
            server: "localhost".into(),
            default_sender: "CodeGrade <noreply@example.com>".into(),
            ..MailConfig::default()
        };
        let mailer = SmtpMailer::new(&config).unwrap();
        assert!(mailer.build_message(&mail("grader@example.com")).is_ok());
        assert!(mailer.build_message(&mail("not an address")).is_err());
    }
}
