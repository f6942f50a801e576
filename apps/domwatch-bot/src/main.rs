mod bot;
mod services;
mod settings;
mod state;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use domwatch_db::repositories::{DomainRepository, ProxyRepository, SubscriberRepository};

use crate::services::checker::DomainChecker;
use crate::services::egress::EgressSelector;
use crate::services::notification_service::{Notifier, TelegramNotifier};
use crate::services::probe::{HttpProber, Prober};
use crate::settings::Settings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .init();

    let settings = Settings::from_env()?;
    let pool = domwatch_db::connect(&settings.database_url).await?;

    let domains = DomainRepository::new(pool.clone());
    let proxies = ProxyRepository::new(pool.clone());
    let subscribers = SubscriberRepository::new(pool.clone());

    let bot = Bot::new(settings.bot_token.clone());
    let notifier: Arc<dyn Notifier> =
        Arc::new(TelegramNotifier::new(bot.clone(), subscribers.clone()));
    let prober: Arc<dyn Prober> = Arc::new(HttpProber::new(settings.probe_timeout));
    let egress = EgressSelector::new(proxies.clone(), settings.proxy_country.clone());

    let checker = Arc::new(DomainChecker::new(
        domains.clone(),
        egress,
        prober,
        notifier,
        settings.check_interval,
        settings.check_jitter,
    ));

    // Startup pass + jittered interval loop; the dispatcher below owns
    // the foreground.
    tokio::spawn({
        let checker = checker.clone();
        async move { checker.run().await }
    });

    let state = AppState {
        domains,
        proxies,
        subscribers,
        checker,
    };

    info!("domwatch starting");
    bot::run_bot(bot, state).await;

    Ok(())
}
