use anyhow::Context;

use warden_auth::{RuleConfig, UnmatchedPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_observability::init();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let rules = match std::env::var("WARDEN_RULES") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read rules file {path}"))?;
            serde_json::from_str::<Vec<RuleConfig>>(&raw)
                .with_context(|| format!("failed to parse rules file {path}"))?
        }
        Err(_) => warden_api::app::default_rule_config(),
    };

    let unmatched = unmatched_policy(std::env::var("WARDEN_UNMATCHED_POLICY").ok().as_deref());

    let app = warden_api::app::build_app_with(jwt_secret, rules, unmatched).await?;

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .context("failed to bind 0.0.0.0:8080")?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Parse the unmatched-route policy, case-insensitively.
///
/// A typo must not silently weaken the policy: anything other than
/// `allow`/`deny` (or unset) is called out before falling back.
fn unmatched_policy(raw: Option<&str>) -> UnmatchedPolicy {
    match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        None | Some("") | Some("allow") => UnmatchedPolicy::Allow,
        Some("deny") => UnmatchedPolicy::Deny,
        Some(other) => {
            tracing::warn!(
                value = other,
                "unrecognized WARDEN_UNMATCHED_POLICY (expected 'allow' or 'deny'); using allow"
            );
            UnmatchedPolicy::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_policy_accepts_any_case() {
        assert_eq!(unmatched_policy(Some("deny")), UnmatchedPolicy::Deny);
        assert_eq!(unmatched_policy(Some("DENY")), UnmatchedPolicy::Deny);
        assert_eq!(unmatched_policy(Some(" Deny ")), UnmatchedPolicy::Deny);
        assert_eq!(unmatched_policy(Some("allow")), UnmatchedPolicy::Allow);
    }

    #[test]
    fn unmatched_policy_defaults_to_allow() {
        assert_eq!(unmatched_policy(None), UnmatchedPolicy::Allow);
        assert_eq!(unmatched_policy(Some("")), UnmatchedPolicy::Allow);
        assert_eq!(unmatched_policy(Some("denny")), UnmatchedPolicy::Allow);
    }
}
