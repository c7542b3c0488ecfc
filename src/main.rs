use std::env;
use std::sync::Arc;

use log::{debug, error, info};
use sea_orm::Database;
use tokio::sync::broadcast::error::RecvError;

use herald::entities;
use herald::host::Host;
use herald::plugin::{NotifyPlugin, PluginSettings};

#[tokio::main]
async fn main() {
    let working_dir = env::var("WORKDIR").unwrap_or(".".to_string());

    println!("Loading log config file at {}/config/log4rs.yaml", working_dir);
    if let Err(err) = log4rs::init_file(format!("{}/config/log4rs.yaml", working_dir), Default::default()) {
        println!("Error while loading logger config: {err:?}");
        return;
    }

    let db_url = env::var("DATABASE_URL").unwrap_or(format!("sqlite:{}/ctfd.db?mode=rwc", working_dir));
    let db = match Database::connect(db_url).await {
        Ok(db) => db,
        Err(err) => {
            error!("Error while connecting to database: {err:?}");
            return;
        }
    };
    if let Err(err) = db.ping().await {
        error!("Error while pinging database: {err:?}");
        return;
    }
    info!("Database is alive !");

    if let Err(err) = entities::create_tables(&db).await {
        error!("Error while creating database tables: {err:?}");
        return;
    }

    let host = Arc::new(Host::new(db));
    let mut feed = host.events.subscribe();
    tokio::spawn(async move {
        loop {
            match feed.recv().await {
                Ok(event) => info!("Published {} event: {}", event.kind, event.data),
                Err(RecvError::Lagged(skipped)) => debug!("Event feed skipped {skipped} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let settings = PluginSettings::from_env();
    debug!("Plugin settings: {settings:?}");
    let plugin = match NotifyPlugin::new(&host, &settings) {
        Ok(plugin) => plugin,
        Err(err) => {
            error!("Error while building the chat client: {err:?}");
            return;
        }
    };
    plugin.load(&host);

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Error while waiting for shutdown signal: {err:?}");
    }
    info!("Shutting down");
    if let Some(flags) = plugin.shutdown(&host).await {
        debug!("Timing poller stopped with {flags:?}");
    }
}
