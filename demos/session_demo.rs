use guardian_session::{Config, LoginRequest, RouteGuard, SessionClient};

#[derive(serde::Deserialize, Debug)]
struct AuditLogPage {
    total: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt().try_init();

    // GUARDIAN_API_BASE_URL, GUARDIAN_TOKEN_FILE, ...
    let cfg = Config::from_env()?;
    let client = SessionClient::new(cfg)?;

    let username = std::env::var("GUARDIAN_USERNAME").unwrap_or_else(|_| "admin".into());
    let password = std::env::var("GUARDIAN_PASSWORD").unwrap_or_default();
    let mut request = LoginRequest::new(username, password);
    if let Ok(code) = std::env::var("GUARDIAN_2FA_CODE") {
        request = request.with_two_fa_code(code);
    }
    client.login(&request).await?;

    let page: AuditLogPage = client.get_with_auth("/audit-logs?page=1&page_size=10").await?;
    println!("audit log entries: {}", page.total);

    let cookie = client.store().access_cookie().await;
    let header = cookie.map(|c| format!("access_token={}", c.value()));
    let decision = RouteGuard::default().evaluate_cookie_header("/dashboard", header.as_deref());
    println!("/dashboard -> {:?}", decision);
    if let Some(set_cookie) = decision.set_cookie_header() {
        println!("Set-Cookie: {}", set_cookie);
    }

    client.logout().await?;
    Ok(())
}
