pub mod config;
pub mod error;
pub mod indicator;
pub mod link;
pub mod mqtt;
pub mod retry;
pub mod state;
pub mod supervisor;

#[cfg(test)]
mod testing;

use crate::config::Config;
use crate::link::{InterfaceLink, LinkManager};
use crate::mqtt::{MqttConnector, SessionClient};
use crate::supervisor::Supervisor;
use color_eyre::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup()?;

    let config = Config::load().await?;
    info!(
        "Tally light for {} via {}:{} on {}",
        config.principal, config.broker.host, config.broker.port, config.link.interface
    );

    let indicator = indicator::gpio::open_driver(
        config.indicator.on_air_pin,
        config.indicator.on_camera_pin,
        config.blink_period(),
    )?;
    let link = LinkManager::new(
        InterfaceLink::new(config.link.interface.clone()),
        config.link_retry(),
    );
    let session = SessionClient::new(
        MqttConnector::new(config.open_timeout()),
        config.session_config(),
    );

    Supervisor::new(link, session, indicator).run().await;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;

    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| value.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
    Ok(())
}
