use teloxide::{dptree, prelude::*};
use tracing::{debug, info};

pub mod handlers;

pub async fn run_bot(bot: Bot, state: crate::state::AppState) {
    info!("Starting bot dispatcher...");

    let handler = Update::filter_message().branch(
        dptree::entry()
            .filter_command::<handlers::command::Command>()
            .endpoint(handlers::command::command_handler),
    );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd: std::sync::Arc<Update>| async move {
            debug!("Unhandled update: {:?}", upd);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
