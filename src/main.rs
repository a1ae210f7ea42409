use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use academic_calendar::api::router;
use academic_calendar::config::Config;
use academic_calendar::db::{self, MIGRATOR};
use academic_calendar::mail::{Mailer, NoopMailer, SmtpMailer};
use academic_calendar::seed::seed_demo_data;
use academic_calendar::services::{NotificationDispatcher, NotificationScheduler};
use academic_calendar::session::SessionStore;
use academic_calendar::state::AppState;
use academic_calendar::uploads::UploadStore;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "academic_calendar=debug,tower_http=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url, 5).await?;
    MIGRATOR.run(&pool).await?;
    info!("Database ready at {}", config.database_url);

    let uploads = UploadStore::new(&config.disk_mount_path, config.max_upload_bytes);
    uploads.ensure_dir().await?;
    info!("Storing uploads in {}", uploads.uploads_dir().display());

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            let mailer = SmtpMailer::new(smtp)?;
            if !mailer.verify().await {
                warn!("SMTP check failed; emails may not be delivered");
            }
            Arc::new(mailer)
        }
        None => {
            info!("Email notifications are disabled");
            Arc::new(NoopMailer)
        }
    };

    if config.seed_demo_data {
        seed_demo_data(&pool).await?;
    }

    if mailer.is_enabled() {
        let dispatcher =
            NotificationDispatcher::new(pool.clone(), mailer.clone(), config.dispatch_item_delay);
        let scheduler = NotificationScheduler::new(dispatcher, config.dispatch_interval);
        tokio::spawn(scheduler.start());
    }

    let sessions = SessionStore::new(&config.session_secret, config.session_ttl);
    let purge_sessions = sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = purge_sessions.purge_expired().await;
            if purged > 0 {
                info!("Purged {} expired sessions", purged);
            }
        }
    });

    let state = AppState {
        db: pool,
        sessions,
        uploads,
        mailer,
        admin_signup_ip: config.admin_signup_ip,
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
