mod api;
mod database;
mod jobs;
mod middleware;
mod models;
mod seeds;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::env;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Get configuration from environment
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let redis_url =
        env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

    log::info!("🚀 Starting Telemed Service...");
    log::info!("📊 Database: {}", database_url);

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&database_url)
        .await
        .expect("Failed to connect to MongoDB");

    let db_data = web::Data::new(db.clone());

    log::info!("✅ MongoDB connected successfully");

    // Initialize Redis (OTP store)
    let redis = database::RedisStore::new(&redis_url)
        .await
        .expect("Failed to connect to Redis");

    let redis_data = web::Data::new(redis.clone());

    log::info!("✅ Redis connected successfully");

    // SMS provider: Twilio when configured, console mock otherwise
    let sms = services::sms_service::from_env();
    let sms_data: web::Data<dyn services::sms_service::SmsSender> = web::Data::from(sms);

    // 🌱 Seed partner pharmacies
    seeds::pharmacies_seed::seed_default_pharmacies(&db).await;

    // 🧹 Start background jobs
    log::info!("📅 Starting background jobs...");
    jobs::cleanup_scheduler::start_cleanup_scheduler(db.clone()).await;
    log::info!("✅ Background jobs started");

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_origin("http://127.0.0.1:5173")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(redis_data.clone())
            .app_data(sms_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .wrap(Logger::new("%a %{User-Agent}i"))
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))
            // Metrics
            .route("/metrics", web::get().to(api::metrics::get_metrics))
            // Auth: registration, OTP flow, sessions
            .service(
                web::scope("/api/v1/auth")
                    .route("/register", web::post().to(api::auth::register))
                    .route("/otp/send", web::post().to(api::auth::send_otp))
                    .route("/otp/verify", web::post().to(api::auth::verify_otp))
                    .route("/login", web::post().to(api::auth::login))
                    .route("/refresh", web::post().to(api::auth::refresh_token))
                    .route("/me", web::get().to(api::auth::get_me))
                    .route("/account", web::delete().to(api::auth::delete_account)),
            )
            // Symptoms: every endpoint requires JWT
            .service(
                web::scope("/api/v1/symptoms")
                    .wrap(middleware::auth::AuthMiddleware)
                    .route("/analyze", web::post().to(api::symptoms::analyze))
                    .route("/history", web::get().to(api::symptoms::history))
                    .route("/emergency", web::post().to(api::symptoms::emergency)),
            )
            // Pharmacies: catalog is public, allocation requires JWT
            .service(
                web::scope("/api/v1/pharmacies")
                    .route("", web::get().to(api::pharmacies::list))
                    .route("/nearby", web::get().to(api::pharmacies::nearby))
                    .service(
                        web::resource("/allocate")
                            .wrap(middleware::auth::AuthMiddleware)
                            .route(web::post().to(api::pharmacies::allocate)),
                    )
                    .service(
                        web::resource("/allocations/confirm")
                            .wrap(middleware::auth::AuthMiddleware)
                            .route(web::post().to(api::pharmacies::confirm)),
                    ),
            )
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
