use shaderstack::{AppConfig, run};

fn main() {
    env_logger::init();

    if let Err(e) = run(AppConfig::new().title("Shaderstack")) {
        log::error!("Event loop failed: {}", e);
        std::process::exit(1);
    }
}
