use kiosk_health_agent::{cli, logger, server, settings};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    cli::manager::init();
    logger::manager::init();
    settings::manager::init(cli::manager::settings_file());

    server::manager::run(cli::manager::server_address()).await
}
