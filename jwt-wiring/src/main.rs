use std::sync::Arc;

use jwt_wiring::config::WiringSettings;
use jwt_wiring::context::ServiceContainer;
use jwt_wiring::issuer::TokenIssuer;
use jwt_wiring::registry::{Namespace, Registry};
use jwt_wiring::time::SystemTimeSource;
use jwt_wiring::verifier::TokenVerifier;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jwt_wiring=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load settings from environment variables
    let settings = match WiringSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Failed to load settings: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded settings: config_path={}, hs256_secret={}, leeway_secs={}",
        settings
            .config_path
            .as_ref()
            .map_or_else(|| "<built-in>".to_string(), |path| path.display().to_string()),
        if settings.hs256_secret.is_some() { "set" } else { "unset" },
        settings.leeway_secs
    );

    let config = match settings.load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let container = ServiceContainer::with_builtins(Arc::new(SystemTimeSource), settings.leeway_secs);
    let registry = Registry::new(config, Arc::new(container));
    if let Err(e) = registry.register_all() {
        tracing::error!("Failed to register bindings: {e}");
        std::process::exit(1);
    }

    let bindings = match registry.bindings() {
        Ok(bindings) => bindings,
        Err(e) => {
            tracing::error!("Failed to list bindings: {e}");
            std::process::exit(1);
        }
    };

    // Materialize everything up front, so misconfiguration is reported at
    // startup rather than on the first token.
    let mut failures = 0;
    for binding in &bindings {
        let Some((namespace, alias)) = binding
            .split_once('#')
            .and_then(|(prefix, alias)| Namespace::from_prefix(prefix).map(|ns| (ns, alias)))
        else {
            continue;
        };
        match registry.get(namespace, alias) {
            Ok(component) => println!("{binding}: {}", component.kind()),
            Err(e) => {
                tracing::error!("Failed to materialize '{binding}': {e}");
                failures += 1;
            }
        }
    }
    match registry.algorithm_manager() {
        Ok(manager) => println!("algorithms: {}", manager.names().join(", ")),
        Err(e) => {
            tracing::error!("Failed to assemble algorithms: {e}");
            failures += 1;
        }
    }
    if failures > 0 {
        std::process::exit(1);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => tracing::info!("No token given; {} bindings are valid", bindings.len()),
        [command, claims] if command == "issue" => issue(&registry, claims),
        [token] => verify(&registry, token),
        _ => {
            tracing::error!("Usage: jwt-wiring [<token> | issue <claims-json>]");
            std::process::exit(1);
        }
    }
}

/// Sign `claims` with HS256 and the default key, and print the token.
fn issue(registry: &Registry, claims: &str) {
    let claims: serde_json::Value = match serde_json::from_str(claims) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::error!("Invalid claims: {e}");
            std::process::exit(1);
        }
    };

    let issuer = match TokenIssuer::from_registry(registry) {
        Ok(issuer) => issuer,
        Err(e) => {
            tracing::error!("Failed to assemble the token issuer: {e}");
            std::process::exit(1);
        }
    };

    match issuer.issue("HS256", &claims) {
        Ok(token) => println!("{token}"),
        Err(e) => {
            tracing::error!("Failed to issue token: {e}");
            std::process::exit(1);
        }
    }
}

/// Verify `token` against the default key set, and print its claims.
fn verify(registry: &Registry, token: &str) {
    let verifier = match TokenVerifier::from_registry(registry) {
        Ok(verifier) => verifier,
        Err(e) => {
            tracing::error!("Failed to assemble the token verifier: {e}");
            std::process::exit(1);
        }
    };

    match verifier.verify(token) {
        Ok(claims) => match serde_json::to_string_pretty(&claims) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                tracing::error!("Failed to print claims: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::warn!("Token rejected: {e}");
            std::process::exit(2);
        }
    }
}
