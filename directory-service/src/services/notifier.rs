//! Composition and best-effort delivery of workflow emails.

use askama::Template;
use service_core::retry::{retry_async, RetryPolicy};
use std::sync::Arc;

use super::email::{EmailMessage, EmailProvider};
use super::error::WorkflowError;
use super::metrics;
use crate::models::AccessRequest;
use crate::utils::TemporaryPassword;

pub const ADMIN_NOTICE_SUBJECT: &str = "New User Access Request";
pub const CREDENTIALS_SUBJECT: &str = "Your JY Pala Account Has Been Approved - Login Credentials";
pub const APPROVED_SUBJECT: &str = "Your Account Has Been Approved";
pub const REJECTED_SUBJECT: &str = "Update on Your Access Request";

#[derive(Clone)]
pub struct Notifier {
    email: Arc<dyn EmailProvider>,
    admin_email: String,
    base_url: String,
    retry: RetryPolicy,
}

impl Notifier {
    pub fn new(
        email: Arc<dyn EmailProvider>,
        admin_email: impl Into<String>,
        base_url: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            email,
            admin_email: admin_email.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Tell the administrator a new request is waiting for review.
    pub async fn notify_admin(&self, request: &AccessRequest) -> bool {
        let message = admin_notice(request, &self.admin_email, &self.base_url);
        self.dispatch("admin_notice", &request.id, message).await
    }

    /// Send login credentials, or the generic approval notice when no
    /// credentials are available.
    pub async fn notify_approved(
        &self,
        request: &AccessRequest,
        credentials: Option<&TemporaryPassword>,
    ) -> bool {
        match credentials {
            Some(password) => {
                let message = credentials_notice(request, password, &self.base_url);
                self.dispatch("credentials", &request.id, message).await
            }
            None => {
                let message = approval_notice(request, &self.base_url);
                self.dispatch("approved", &request.id, message).await
            }
        }
    }

    pub async fn notify_rejected(&self, request: &AccessRequest) -> bool {
        let message = rejection_notice(request);
        self.dispatch("rejected", &request.id, message).await
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), WorkflowError> {
        retry_async(&self.retry, "email.send", || self.email.send(message))
            .await
            .map_err(|e| WorkflowError::Notification(e.to_string()))
    }

    /// Failures are logged and counted, never returned.
    async fn dispatch(
        &self,
        kind: &'static str,
        request_id: &str,
        message: Result<EmailMessage, askama::Error>,
    ) -> bool {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                metrics::record_notification(kind, "failed");
                tracing::error!(request_id = %request_id, kind, error = %err, "Failed to render notification");
                return false;
            }
        };

        match self.send(&message).await {
            Ok(()) => {
                metrics::record_notification(kind, "sent");
                tracing::info!(request_id = %request_id, kind, to = %message.to, "Notification sent");
                true
            }
            Err(err) => {
                metrics::record_notification(kind, "failed");
                tracing::error!(
                    request_id = %request_id,
                    kind,
                    to = %message.to,
                    error = %err,
                    "Notification failed"
                );
                false
            }
        }
    }
}

#[derive(Template)]
#[template(path = "email/admin_notice.html")]
struct AdminNoticeHtml<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    designation: &'a str,
    review_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/admin_notice.txt")]
struct AdminNoticeText<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    designation: &'a str,
    review_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/credentials.html")]
struct CredentialsHtml<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    login_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/credentials.txt")]
struct CredentialsText<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    login_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/approved.html")]
struct ApprovedHtml<'a> {
    name: &'a str,
    login_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/approved.txt")]
struct ApprovedText<'a> {
    name: &'a str,
    login_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/rejected.html")]
struct RejectedHtml<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/rejected.txt")]
struct RejectedText<'a> {
    name: &'a str,
}

// .html templates escape their fields; .txt templates render them verbatim.

pub fn admin_notice(
    request: &AccessRequest,
    admin_email: &str,
    base_url: &str,
) -> Result<EmailMessage, askama::Error> {
    let review_url = format!("{}/admin/approve-user/{}", base_url, request.id);

    Ok(EmailMessage {
        to: admin_email.to_string(),
        subject: ADMIN_NOTICE_SUBJECT.to_string(),
        body_text: AdminNoticeText {
            name: &request.name,
            email: &request.email,
            phone: &request.phone,
            designation: &request.designation,
            review_url: &review_url,
        }
        .render()?,
        body_html: AdminNoticeHtml {
            name: &request.name,
            email: &request.email,
            phone: &request.phone,
            designation: &request.designation,
            review_url: &review_url,
        }
        .render()?,
    })
}

pub fn credentials_notice(
    request: &AccessRequest,
    password: &TemporaryPassword,
    base_url: &str,
) -> Result<EmailMessage, askama::Error> {
    let login_url = format!("{}/login", base_url);

    Ok(EmailMessage {
        to: request.email.clone(),
        subject: CREDENTIALS_SUBJECT.to_string(),
        body_text: CredentialsText {
            name: &request.name,
            email: &request.email,
            password: password.expose(),
            login_url: &login_url,
        }
        .render()?,
        body_html: CredentialsHtml {
            name: &request.name,
            email: &request.email,
            password: password.expose(),
            login_url: &login_url,
        }
        .render()?,
    })
}

pub fn approval_notice(
    request: &AccessRequest,
    base_url: &str,
) -> Result<EmailMessage, askama::Error> {
    let login_url = format!("{}/login", base_url);

    Ok(EmailMessage {
        to: request.email.clone(),
        subject: APPROVED_SUBJECT.to_string(),
        body_text: ApprovedText {
            name: &request.name,
            login_url: &login_url,
        }
        .render()?,
        body_html: ApprovedHtml {
            name: &request.name,
            login_url: &login_url,
        }
        .render()?,
    })
}

pub fn rejection_notice(request: &AccessRequest) -> Result<EmailMessage, askama::Error> {
    Ok(EmailMessage {
        to: request.email.clone(),
        subject: REJECTED_SUBJECT.to_string(),
        body_text: RejectedText {
            name: &request.name,
        }
        .render()?,
        body_html: RejectedHtml {
            name: &request.name,
        }
        .render()?,
    })
}
