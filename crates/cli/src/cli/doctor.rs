use ctms_client::{offered_providers, HalClient, Registry};
use ctms_domain::config::{Config, ConfigSeverity};

/// Run all diagnostic checks and print a summary. Nothing here logs in.
///
/// Returns `Ok(true)` when every check passes, `Ok(false)` when at least
/// one check failed.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("ctms doctor");
    println!("===========\n");

    let mut all_passed = true;

    // 1. Config file
    check_config_file(config_path, &mut all_passed);

    // 2. Config validation
    check_config_validation(config, &mut all_passed);

    // 3. Platform and identity providers
    match HalClient::new(&config.platform) {
        Ok(client) => {
            check_identity_providers(config, &client, &mut all_passed).await;
            check_registry(config, &client, &mut all_passed).await;
        }
        Err(e) => {
            print_check("Platform client", false, e.to_string());
            all_passed = false;
        }
    }

    // Summary
    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

// ── Individual checks ─────────────────────────────────────────────────

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} not found (using defaults)")
        },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check(
            "Config validation",
            error_count == 0,
            format!("{} issue(s) ({} error(s))", issues.len(), error_count),
        );
        for issue in &issues {
            println!("      {issue}");
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

async fn check_identity_providers(config: &Config, client: &HalClient, all_passed: &mut bool) {
    let url = client.url(ctms_client::session::AUTH_PATH);
    let kinds = match offered_providers(client).await {
        Ok(kinds) => {
            print_check("Platform reachable", true, url);
            kinds
        }
        Err(e) => {
            print_check("Platform reachable", false, format!("{url} ({e})"));
            *all_passed = false;
            return;
        }
    };

    let wanted = config.auth.provider.provider_kind();
    let offered = kinds.iter().any(|k| k == wanted);
    print_check(
        "Identity provider offered",
        offered,
        format!("'{wanted}' (platform offers: {})", kinds.join(", ")),
    );
    if !offered {
        *all_passed = false;
    }
}

/// The registry usually needs a session; a 401/403 still proves it exists.
async fn check_registry(config: &Config, client: &HalClient, all_passed: &mut bool) {
    let registry = Registry::new(client, config.platform.registry_version.clone());
    let url = registry.service_roots_url();
    let (ok, detail) = match registry.fetch_service_roots().await {
        Ok(roots) => (true, format!("{url} ({} resource(s))", roots.entries().count())),
        Err(e) if matches!(e.status(), Some(401 | 403)) => (true, format!("{url} (requires login)")),
        Err(e) => (false, format!("{url} ({e})")),
    };
    print_check("Service registry", ok, detail);
    if !ok {
        *all_passed = false;
    }
}

// ── Formatting helper ─────────────────────────────────────────────────

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
