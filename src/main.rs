use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use evia_client::config::ClientConfig;
use evia_client::flows::register::fields;
use evia_client::flows::{RegistrationEvent, RegistrationFlow, SubmitOutcome};
use evia_client::navigation::HistoryNavigator;
use evia_client::request::ReqwestTransport;
use evia_client::storage::{CredentialVault, FileSecureStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env().context("invalid configuration")?;

    eprintln!("Evia client v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.base_url);
    eprintln!("   Secure store: {}\n", config.store_dir.display());

    let transport = Arc::new(ReqwestTransport::new(&config)?);
    let store = Arc::new(FileSecureStore::new(config.store_dir.clone()));
    let vault = Arc::new(CredentialVault::new(store, config.token_key.clone()));
    let navigator = Arc::new(HistoryNavigator::new());

    let mut flow = RegistrationFlow::mount(transport, vault, navigator.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        for (field, label) in [
            (fields::EMAIL, "Email"),
            (fields::PASSWORD, "Password"),
            (fields::PASSWORD_CONFIRMATION, "Confirm Password"),
        ] {
            print!("{label}: ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                flow.unmount();
                return Ok(());
            };
            flow.set_field(field, line.trim_end_matches(['\r', '\n']));
        }

        println!("Password must contain:");
        for hint in flow.password_hints() {
            println!("  [{}] {}", if hint.satisfied { "x" } else { " " }, hint.label);
        }

        match flow.submit() {
            SubmitOutcome::Submitted { .. } => {}
            SubmitOutcome::Invalid => {
                for field in [fields::EMAIL, fields::PASSWORD, fields::PASSWORD_CONFIRMATION] {
                    if let Some(message) = flow.form().visible_error(field) {
                        println!("  {field}: {message}");
                    }
                }
                continue;
            }
            other => {
                println!("Cannot submit right now ({other:?})");
                continue;
            }
        }

        let wait = config.request_timeout + std::time::Duration::from_secs(5);
        let event = tokio::time::timeout(wait, flow.next_event())
            .await
            .context("no response from registration request")?;

        match event {
            Some(RegistrationEvent::Registered { identity }) => {
                println!("Account created for {}", identity.email);
                println!("Navigation: {:?}", navigator.history());
                break;
            }
            Some(RegistrationEvent::RequestFailed { message }) => {
                println!("Error: {message}");
            }
            Some(RegistrationEvent::PersistenceFailed { message }) => {
                println!("Error: {message}");
                break;
            }
            None => break,
        }
    }

    flow.unmount();
    Ok(())
}
