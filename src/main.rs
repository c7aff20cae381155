use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use giftwave_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{IdentityMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 多个服务共享同一连接
    let pool = std::sync::Arc::new(pool);

    // 创建服务
    let audit_log_service = AuditLogService::new(pool.clone());
    let participation_service = ParticipationService::new(
        pool.clone(),
        audit_log_service.clone(),
        config.participation.required_tile_count,
    );
    let gift_service = GiftService::new(pool.clone(), audit_log_service.clone());
    let event_service = EventService::new(pool.clone());
    let stats_service = StatsService::new(pool.clone());
    let admin_service = AdminService::new(pool.clone(), audit_log_service.clone());

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(IdentityMiddleware)
            .app_data(web::Data::new(participation_service.clone()))
            .app_data(web::Data::new(gift_service.clone()))
            .app_data(web::Data::new(event_service.clone()))
            .app_data(web::Data::new(stats_service.clone()))
            .app_data(web::Data::new(admin_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::participation_config)
                    .configure(handlers::event_config)
                    .configure(handlers::gift_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
