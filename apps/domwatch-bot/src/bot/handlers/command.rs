use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use tracing::error;

use domwatch_db::models::DomainStatus;
use domwatch_db::normalize::normalize_domain;

use crate::services::checker::CheckError;
use crate::state::AppState;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "Domain monitoring commands:")]
pub enum Command {
    #[command(description = "subscribe this chat to status notifications")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "add a domain to monitor")]
    AddDomain(String),
    #[command(description = "stop monitoring a domain")]
    RemoveDomain(String),
    #[command(description = "list monitored domains")]
    ListDomains,
    #[command(description = "run an on-demand check of one domain")]
    Check(String),
    #[command(description = "show the most recent checks of a domain")]
    CheckHistory(String),
    #[command(description = "add an outbound proxy: host port [username] [password] [country]")]
    AddProxy(String),
    #[command(description = "remove a proxy by id")]
    RemoveProxy(String),
    #[command(description = "list configured proxies")]
    ListProxies,
}

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: AppState,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;

    // Every interaction opts the chat into transition broadcasts.
    if let Err(e) = state.subscribers.add(chat_id.0).await {
        error!("Failed to register subscriber {}: {:#}", chat_id, e);
    }

    match cmd {
        Command::Start => {
            bot.send_message(
                chat_id,
                "👋 I monitor domain availability and alert this chat when a domain \
                 goes down or recovers.\nAdd one with /add_domain, see /help for all commands.",
            )
            .await?;
        }
        Command::Help => {
            bot.send_message(chat_id, Command::descriptions().to_string())
                .await?;
        }
        Command::AddDomain(arg) => {
            let arg = arg.trim();
            if arg.is_empty() {
                bot.send_message(chat_id, "Usage: /add_domain example.com")
                    .await?;
                return Ok(());
            }
            let name = normalize_domain(arg);
            match state.domains.add(&name).await {
                Ok(()) => {
                    bot.send_message(chat_id, format!("Domain <b>{name}</b> added."))
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                Err(e) => {
                    error!("Failed to add domain {name}: {e:#}");
                    bot.send_message(chat_id, "⚠️ Could not save the domain, try again later.")
                        .await?;
                }
            }
        }
        Command::RemoveDomain(arg) => {
            let arg = arg.trim();
            if arg.is_empty() {
                bot.send_message(chat_id, "Usage: /remove_domain example.com")
                    .await?;
                return Ok(());
            }
            let name = normalize_domain(arg);
            match state.domains.remove(&name).await {
                Ok(true) => {
                    bot.send_message(chat_id, format!("Domain <b>{name}</b> removed."))
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                Ok(false) => {
                    bot.send_message(chat_id, "That domain is not on the list.")
                        .await?;
                }
                Err(e) => {
                    error!("Failed to remove domain {name}: {e:#}");
                    bot.send_message(chat_id, "⚠️ Could not remove the domain, try again later.")
                        .await?;
                }
            }
        }
        Command::ListDomains => match state.domains.list().await {
            Ok(domains) if domains.is_empty() => {
                bot.send_message(chat_id, "No domains yet. Add one with /add_domain.")
                    .await?;
            }
            Ok(domains) => {
                let lines: Vec<String> = domains.into_iter().map(format_domain_line).collect();
                bot.send_message(chat_id, lines.join("\n"))
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
            Err(e) => {
                error!("Failed to list domains: {e:#}");
                bot.send_message(chat_id, "⚠️ Could not load the domain list, try again later.")
                    .await?;
            }
        },
        Command::Check(arg) => {
            let arg = arg.trim();
            if arg.is_empty() {
                bot.send_message(chat_id, "Usage: /check example.com").await?;
                return Ok(());
            }
            let name = normalize_domain(arg);
            match state.checker.check_by_name(&name).await {
                Ok(outcome) if outcome.is_up => {
                    bot.send_message(chat_id, format!("✅ <b>{name}</b> is reachable"))
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                Ok(outcome) => {
                    let reason = outcome.error.unwrap_or_else(|| "Unknown error".to_string());
                    bot.send_message(
                        chat_id,
                        format!("❌ <b>{name}</b> is unreachable: {reason}"),
                    )
                    .parse_mode(ParseMode::Html)
                    .await?;
                }
                Err(CheckError::DomainNotFound) => {
                    bot.send_message(
                        chat_id,
                        "That domain is not registered. Add it with /add_domain first.",
                    )
                    .await?;
                }
                Err(e) => {
                    error!("Manual check of {name} failed: {e:#}");
                    bot.send_message(chat_id, "⚠️ Check failed, try again later.")
                        .await?;
                }
            }
        }
        Command::CheckHistory(arg) => {
            let arg = arg.trim();
            if arg.is_empty() {
                bot.send_message(chat_id, "Usage: /check_history example.com")
                    .await?;
                return Ok(());
            }
            let name = normalize_domain(arg);
            match state.domains.get(&name).await {
                Ok(None) => {
                    bot.send_message(
                        chat_id,
                        "That domain is not registered. Add it with /add_domain first.",
                    )
                    .await?;
                }
                Ok(Some(domain)) => match state.domains.recent_checks(domain.id, 10).await {
                    Ok(logs) if logs.is_empty() => {
                        bot.send_message(chat_id, "No checks recorded yet.").await?;
                    }
                    Ok(logs) => {
                        let lines: Vec<String> = logs.iter().map(format_check_log_line).collect();
                        bot.send_message(
                            chat_id,
                            format!("Last checks of <b>{name}</b>:\n{}", lines.join("\n")),
                        )
                        .parse_mode(ParseMode::Html)
                        .await?;
                    }
                    Err(e) => {
                        error!("Failed to load check history for {name}: {e:#}");
                        bot.send_message(
                            chat_id,
                            "⚠️ Could not load the check history, try again later.",
                        )
                        .await?;
                    }
                },
                Err(e) => {
                    error!("Failed to fetch domain {name}: {e:#}");
                    bot.send_message(chat_id, "⚠️ Could not load the domain, try again later.")
                        .await?;
                }
            }
        }
        Command::AddProxy(args) => match parse_proxy_args(&args) {
            None => {
                bot.send_message(
                    chat_id,
                    "Usage: /add_proxy host port [username] [password] [country]",
                )
                .await?;
            }
            Some(spec) => {
                match state
                    .proxies
                    .add(
                        &spec.host,
                        spec.port,
                        spec.username.as_deref(),
                        spec.password.as_deref(),
                        spec.country.as_deref(),
                    )
                    .await
                {
                    Ok(id) => {
                        bot.send_message(chat_id, format!("Proxy #{id} added and activated."))
                            .await?;
                    }
                    Err(e) => {
                        error!("Failed to add proxy: {e:#}");
                        bot.send_message(chat_id, "⚠️ Could not save the proxy, try again later.")
                            .await?;
                    }
                }
            }
        },
        Command::RemoveProxy(arg) => match arg.trim().parse::<i64>() {
            Err(_) => {
                bot.send_message(chat_id, "Proxy id must be a number: /remove_proxy 1")
                    .await?;
            }
            Ok(id) => match state.proxies.remove(id).await {
                Ok(true) => {
                    bot.send_message(chat_id, "Proxy removed.").await?;
                }
                Ok(false) => {
                    bot.send_message(chat_id, "No proxy with that id.").await?;
                }
                Err(e) => {
                    error!("Failed to remove proxy {id}: {e:#}");
                    bot.send_message(chat_id, "⚠️ Could not remove the proxy, try again later.")
                        .await?;
                }
            },
        },
        Command::ListProxies => match state.proxies.list().await {
            Ok(proxies) if proxies.is_empty() => {
                bot.send_message(chat_id, "No proxies configured; checks go out directly.")
                    .await?;
            }
            Ok(proxies) => {
                let lines: Vec<String> = proxies
                    .iter()
                    .map(|p| {
                        let auth = if p.username.is_some() { " (auth)" } else { "" };
                        let country = p.country.as_deref().unwrap_or("—");
                        let status = if p.is_active { "active" } else { "inactive" };
                        format!("#{} {}:{}{auth}, country: {country}, {status}", p.id, p.host, p.port)
                    })
                    .collect();
                bot.send_message(chat_id, lines.join("\n")).await?;
            }
            Err(e) => {
                error!("Failed to list proxies: {e:#}");
                bot.send_message(chat_id, "⚠️ Could not load the proxy list, try again later.")
                    .await?;
            }
        },
    }

    Ok(())
}

fn format_domain_line(domain: domwatch_db::models::Domain) -> String {
    let emoji = match domain.last_status {
        DomainStatus::Up => "✅",
        DomainStatus::Down => "❌",
        DomainStatus::Unknown => "❔",
    };
    let checked = domain
        .last_checked
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "—".to_string());
    let mut line = format!("{emoji} <b>{}</b> (checked: {checked})", domain.name);
    if let Some(err) = domain.last_error {
        line.push_str(&format!("\n    Error: {err}"));
    }
    line
}

fn format_check_log_line(log: &domwatch_db::models::CheckLog) -> String {
    let emoji = match log.status {
        DomainStatus::Up => "✅",
        DomainStatus::Down => "❌",
        DomainStatus::Unknown => "❔",
    };
    let at = log
        .checked_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "—".to_string());
    let mut line = format!("{emoji} {at}");
    if let Some(err) = &log.error {
        line.push_str(&format!(" ({err})"));
    }
    line
}

struct ProxySpec {
    host: String,
    port: i64,
    username: Option<String>,
    password: Option<String>,
    country: Option<String>,
}

fn parse_proxy_args(args: &str) -> Option<ProxySpec> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }
    let port: i64 = parts[1].parse().ok()?;
    if !(1..=65535).contains(&port) {
        return None;
    }
    Some(ProxySpec {
        host: parts[0].to_string(),
        port,
        username: parts.get(2).map(|s| s.to_string()),
        password: parts.get(3).map(|s| s.to_string()),
        country: parts.get(4).map(|s| s.to_string()),
    })
}
