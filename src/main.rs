use clap::Parser;
use site_counters::display::{ACTIVE_CLASS, Element};
use site_counters::{Config, CounterName, Page, Site};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    let site = Site::open(&config).await?;
    let page = Page::in_memory(&config.buttons());

    site.on_page_ready(&page).await;
    info!("page ready");

    if config.download {
        if let Some(display) = page.counter(CounterName::Downloads) {
            site.counters().record(CounterName::Downloads, display).await;
        }
    }

    let interactions = site.interactions();
    for key in &config.toggles {
        match page.button(key) {
            Some(button) => interactions.click(button).await,
            None => warn!(key = %key, "no such button"),
        }
    }

    for counter in CounterName::ALL {
        if let Some(display) = page.counter(counter) {
            println!("{counter}: {}", display.element().text());
        }
    }
    for button in &page.buttons {
        let active = if button.has_class(ACTIVE_CLASS) { " (active)" } else { "" };
        if let Some(key) = site_counters::interactions::key_of(button) {
            println!("{key}: {}{active}", button.count_element().text());
        }
    }

    site.flush().await;
    Ok(())
}
