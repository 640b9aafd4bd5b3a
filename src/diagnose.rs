//! Diagnosis runner
//!
//! Walks the dependent Graph call sequence for one credential set and keeps
//! every outcome, success or failure, so that one broken asset does not hide
//! the state of the others:
//!
//! 1. debug the token, list the app's webhook subscriptions
//! 2. businesses, their WABAs, and per WABA its details, phone numbers and
//!    subscribed apps
//! 3. Pages, and per Page its subscribed apps and linked Instagram account
//!
//! Independent calls run concurrently. Nothing is retried.

use std::fmt;

use futures::{future::join_all, join};
use tracing::info;

use crate::{
    app::{TokenDebug, WebhookSubscription},
    client::Client,
    error::Error,
    me::BusinessInfo,
    page::{missing_fields, IgAccount, PageInfo, IG_SUBSCRIBED_FIELDS, PAGE_SUBSCRIBED_FIELDS},
    store::Credentials,
    waba::{PhoneNumber, SubscribedApp, WabaInfo},
};

/// Tokens expiring within this many seconds are flagged.
pub const EXPIRY_WARNING_SECS: i64 = 7 * 24 * 60 * 60;

pub type Outcome<T> = Result<T, Error>;

/// Everything one diagnosis run found.
#[derive(Debug)]
pub struct Report {
    pub app_id: String,
    pub token: Outcome<TokenDebug>,
    pub app_subscriptions: Outcome<Vec<WebhookSubscription>>,
    pub businesses: Outcome<Vec<BusinessReport>>,
    pub pages: Outcome<Vec<PageReport>>,
}

#[derive(Debug)]
pub struct BusinessReport {
    pub business: BusinessInfo,
    pub wabas: Outcome<Vec<WabaReport>>,
}

#[derive(Debug)]
pub struct WabaReport {
    /// The WABA as listed by its business.
    pub waba: WabaInfo,
    pub details: Outcome<WabaInfo>,
    pub phone_numbers: Outcome<Vec<PhoneNumber>>,
    pub subscribed_apps: Outcome<Vec<SubscribedApp>>,
}

#[derive(Debug)]
pub struct PageReport {
    pub page: PageInfo,
    pub subscribed_apps: Outcome<Vec<SubscribedApp>>,
    pub instagram: Outcome<Option<IgAccount>>,
}

/// Entry point of a diagnosis run.
#[derive(Debug)]
pub struct Diagnosis;

impl Diagnosis {
    /// Runs the full diagnosis.
    ///
    /// App-level calls use the app token; everything else uses `credentials.token`,
    /// except per-Page calls, which use each Page's own token.
    pub async fn run(client: &Client, credentials: &Credentials) -> Report {
        run(client, credentials).await
    }
}

async fn run(client: &Client, credentials: &Credentials) -> Report {
    let app_token = credentials.app_token();
    let token = credentials.token.as_str();
    let app = client.app(credentials.app_id.as_str());

    info!(app_id = %credentials.app_id, "running diagnosis");
    let (token_debug, app_subscriptions, businesses, pages) = join!(
        app.debug_token(token, &app_token),
        app.subscriptions(&app_token),
        inspect_businesses(client, token),
        inspect_pages(client, token),
    );

    Report {
        app_id: credentials.app_id.clone(),
        token: token_debug,
        app_subscriptions,
        businesses,
        pages,
    }
}

async fn inspect_businesses(client: &Client, token: &str) -> Outcome<Vec<BusinessReport>> {
    let businesses = client.me().businesses(token).await?;

    Ok(join_all(businesses.into_iter().map(|business| async move {
        let wabas = inspect_wabas(client, &business.id, token).await;
        BusinessReport { business, wabas }
    }))
    .await)
}

async fn inspect_wabas(client: &Client, business_id: &str, token: &str) -> Outcome<Vec<WabaReport>> {
    let wabas = client.business(business_id).owned_wabas(token).await?;

    Ok(join_all(wabas.into_iter().map(|waba| inspect_waba(client, waba, token))).await)
}

async fn inspect_waba(client: &Client, waba: WabaInfo, token: &str) -> WabaReport {
    let manager = client.waba(waba.id.as_str());
    let (details, phone_numbers, subscribed_apps) = join!(
        manager.info(token),
        manager.phone_numbers(token),
        manager.subscribed_apps(token),
    );

    WabaReport {
        waba,
        details,
        phone_numbers,
        subscribed_apps,
    }
}

async fn inspect_pages(client: &Client, token: &str) -> Outcome<Vec<PageReport>> {
    let pages = client.me().pages(token).await?;

    Ok(join_all(pages.into_iter().map(|page| inspect_page(client, page))).await)
}

async fn inspect_page(client: &Client, page: PageInfo) -> PageReport {
    let manager = client.page(page.id.as_str());
    let (subscribed_apps, instagram) = join!(
        manager.subscribed_apps(&page.access_token),
        manager.instagram_account(&page.access_token),
    );

    PageReport {
        page,
        subscribed_apps,
        instagram,
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Ok => "ok",
            Severity::Warning => "warn",
            Severity::Error => "error",
        })
    }
}

/// One health check result.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Finding {
    pub severity: Severity,
    /// What the finding is about, e.g. `token` or `waba 123`.
    pub subject: String,
    pub message: String,
}

impl Finding {
    fn new(severity: Severity, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.subject, self.message)
    }
}

impl Report {
    /// Health checks over the report. `now` is the current UNIX time in seconds.
    pub fn findings(&self, now: i64) -> Vec<Finding> {
        let mut findings = Vec::new();
        self.token_findings(now, &mut findings);
        self.subscription_findings(&mut findings);
        self.business_findings(&mut findings);
        self.page_findings(&mut findings);
        findings
    }

    /// The worst severity among the findings.
    pub fn severity(&self, now: i64) -> Severity {
        self.findings(now)
            .iter()
            .map(|finding| finding.severity)
            .max()
            .unwrap_or(Severity::Ok)
    }

    fn token_findings(&self, now: i64, findings: &mut Vec<Finding>) {
        let token = match &self.token {
            Ok(token) => token,
            Err(err) => {
                findings.push(Finding::new(Severity::Error, "token", format!("lookup failed: {err}")));
                return;
            }
        };

        if !token.is_valid {
            let reason = token
                .error
                .as_ref()
                .map(|error| error.message.as_str())
                .unwrap_or("no reason given");
            findings.push(Finding::new(Severity::Error, "token", format!("invalid: {reason}")));
            return;
        }

        if !token.app_id.is_empty() && token.app_id != self.app_id {
            findings.push(Finding::new(
                Severity::Warning,
                "token",
                format!("issued for app {}, not {}", token.app_id, self.app_id),
            ));
        }

        let expires_at = token.expires_at;
        if expires_at.is_never() {
            findings.push(Finding::new(Severity::Ok, "token", "valid, does not expire"));
        } else if expires_at.is_before(now) {
            findings.push(Finding::new(Severity::Error, "token", format!("expired at {expires_at}")));
        } else if expires_at.seconds() - now < EXPIRY_WARNING_SECS {
            findings.push(Finding::new(
                Severity::Warning,
                "token",
                format!("expires soon, at {expires_at}"),
            ));
        } else {
            findings.push(Finding::new(Severity::Ok, "token", format!("valid until {expires_at}")));
        }
    }

    fn subscription_findings(&self, findings: &mut Vec<Finding>) {
        match &self.app_subscriptions {
            Err(err) => findings.push(Finding::new(
                Severity::Error,
                "app webhooks",
                format!("lookup failed: {err}"),
            )),
            Ok(subscriptions) if subscriptions.is_empty() => findings.push(Finding::new(
                Severity::Warning,
                "app webhooks",
                "no webhook subscriptions configured",
            )),
            Ok(subscriptions) => {
                for subscription in subscriptions {
                    let subject = format!("app webhooks {}", subscription.object);
                    if !subscription.active {
                        findings.push(Finding::new(Severity::Warning, subject, "inactive"));
                        continue;
                    }

                    let missing = required_fields(subscription);
                    if missing.is_empty() {
                        findings.push(Finding::new(
                            Severity::Ok,
                            subject,
                            format!("active, {} field(s)", subscription.fields.len()),
                        ));
                    } else {
                        findings.push(Finding::new(
                            Severity::Warning,
                            subject,
                            format!("missing webhook fields: {}", missing.join(", ")),
                        ));
                    }
                }
            }
        }
    }

    fn business_findings(&self, findings: &mut Vec<Finding>) {
        let businesses = match &self.businesses {
            Ok(businesses) => businesses,
            Err(err) => {
                findings.push(Finding::new(
                    Severity::Error,
                    "businesses",
                    format!("lookup failed: {err}"),
                ));
                return;
            }
        };

        for report in businesses {
            match &report.wabas {
                Ok(wabas) => wabas
                    .iter()
                    .for_each(|waba| waba.findings(&self.app_id, findings)),
                Err(err) => findings.push(Finding::new(
                    Severity::Error,
                    format!("business {}", report.business.id),
                    format!("WABA lookup failed: {err}"),
                )),
            }
        }
    }

    fn page_findings(&self, findings: &mut Vec<Finding>) {
        match &self.pages {
            Ok(pages) => pages
                .iter()
                .for_each(|page| page.findings(&self.app_id, findings)),
            Err(err) => findings.push(Finding::new(
                Severity::Error,
                "pages",
                format!("lookup failed: {err}"),
            )),
        }
    }
}

// Fields an app-level subscription must carry for its object type.
fn required_fields(subscription: &WebhookSubscription) -> Vec<&'static str> {
    let wanted: &[&'static str] = match subscription.object.as_str() {
        "instagram" => &IG_SUBSCRIBED_FIELDS,
        _ => &[],
    };

    wanted
        .iter()
        .copied()
        .filter(|field| !subscription.has_field(field))
        .collect()
}

impl WabaReport {
    fn findings(&self, app_id: &str, findings: &mut Vec<Finding>) {
        let subject = format!("waba {}", self.waba.id);

        match &self.details {
            Ok(details) => match details.account_review_status.as_deref() {
                Some("APPROVED") | None => {}
                Some(status) => findings.push(Finding::new(
                    Severity::Warning,
                    &subject,
                    format!("account review status is {status}"),
                )),
            },
            Err(err) => findings.push(Finding::new(
                Severity::Error,
                &subject,
                format!("details lookup failed: {err}"),
            )),
        }

        match &self.subscribed_apps {
            Ok(apps) if apps.iter().any(|app| app.is_app(app_id)) => findings.push(Finding::new(
                Severity::Ok,
                &subject,
                "app receives webhooks",
            )),
            Ok(_) => findings.push(Finding::new(
                Severity::Error,
                &subject,
                "app is not subscribed to webhooks",
            )),
            Err(err) => findings.push(Finding::new(
                Severity::Error,
                &subject,
                format!("subscribed apps lookup failed: {err}"),
            )),
        }

        match &self.phone_numbers {
            Ok(numbers) if numbers.is_empty() => findings.push(Finding::new(
                Severity::Warning,
                &subject,
                "no phone numbers",
            )),
            Ok(numbers) => {
                for number in numbers {
                    let subject = format!("phone {}", number.display_phone_number);
                    if number.quality_rating.as_deref() == Some("RED") {
                        findings.push(Finding::new(Severity::Warning, &subject, "quality rating is RED"));
                    }
                    match number.code_verification_status.as_deref() {
                        Some("VERIFIED") | None => {}
                        Some(status) => findings.push(Finding::new(
                            Severity::Warning,
                            &subject,
                            format!("code verification status is {status}"),
                        )),
                    }
                }
            }
            Err(err) => findings.push(Finding::new(
                Severity::Error,
                &subject,
                format!("phone numbers lookup failed: {err}"),
            )),
        }
    }
}

impl PageReport {
    fn findings(&self, app_id: &str, findings: &mut Vec<Finding>) {
        let subject = format!("page {}", self.page.name);

        match &self.subscribed_apps {
            Ok(apps) => match apps.iter().find(|app| app.is_app(app_id)) {
                Some(app) => {
                    let missing = missing_fields(app, &PAGE_SUBSCRIBED_FIELDS);
                    if missing.is_empty() {
                        findings.push(Finding::new(Severity::Ok, &subject, "app receives webhooks"));
                    } else {
                        findings.push(Finding::new(
                            Severity::Warning,
                            &subject,
                            format!("missing webhook fields: {}", missing.join(", ")),
                        ));
                    }
                }
                None => findings.push(Finding::new(
                    Severity::Error,
                    &subject,
                    "app is not subscribed to webhooks",
                )),
            },
            Err(err) => findings.push(Finding::new(
                Severity::Error,
                &subject,
                format!("subscribed apps lookup failed: {err}"),
            )),
        }

        match &self.instagram {
            Ok(Some(account)) => findings.push(Finding::new(
                Severity::Ok,
                &subject,
                format!(
                    "linked Instagram account {}",
                    account.username.as_deref().unwrap_or(&account.id)
                ),
            )),
            Ok(None) => findings.push(Finding::new(
                Severity::Ok,
                &subject,
                "no linked Instagram account",
            )),
            Err(err) => findings.push(Finding::new(
                Severity::Error,
                &subject,
                format!("Instagram lookup failed: {err}"),
            )),
        }
    }
}
