mod app;

use tracing_subscriber::util::SubscriberInitExt;
use winit::event_loop::EventLoop;

use vista_app::{cli, launch};

fn main() {
    // Parse CLI arguments
    let args = cli::parse();

    // Initialize logging before anything can log
    let (subscriber, log_handle) = launch::log_subscriber(&args, std::io::stdout);
    subscriber.init();

    tracing::info!("Vista v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load config; command-line flags win
    let mut config = launch::load_config(&args);
    launch::apply_overrides(&mut config, &args);
    launch::apply_log_level(&log_handle, &args, &config);
    tracing::debug!("Config: {}", vista_config::config_to_json(&config));

    let event_loop = match EventLoop::<app::AppEvent>::with_user_event().build() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            tracing::error!("Failed to create event loop: {e}");
            return;
        }
    };
    let content = launch::initial_content(&args);
    let mut app = app::VistaApp::new(config, content, event_loop.create_proxy());

    tracing::info!("Entering event loop");
    if let Err(e) = event_loop.run_app(&mut app) {
        tracing::error!("Event loop error: {e}");
    }
    tracing::info!("Exited");
}
