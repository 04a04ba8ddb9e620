use actix_web::{middleware, web, App, HttpServer};
use log::info;

use placerate::api;
use placerate::auth::JwtHandler;
use placerate::config::Config;
use placerate::db::Database;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = Config::load();

    // Initialize the database
    let db = Database::new(&config.database_path).expect("Failed to open database");
    db.create_schema().await.expect("Failed to create schema");
    info!("Schema created successfully");

    let jwt = JwtHandler::new(config.jwt_secret.clone());

    let address = format!("{}:{}", config.host, config.port);
    info!("listening on http://{}", &address);

    // Start the Actix Web server
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(jwt.clone()))
            .service(api::routes())
    })
    .bind(&address)?
    .run()
    .await
}
