use std::{process, sync::Arc};

use nextconfig::{
    application::{
        admin::{
            AdminBlogService, AdminCommentService, AdminDashboardService, AdminFaqService,
            AdminPortfolioService, AdminReviewService, AdminTagService,
        },
        content::ContentService,
        error::AppError,
        images::ImageStore,
        mail::{LogMailer, Mailer},
        repos::{ContentRepository, ContentWriteRepository, DatabaseProbe},
        submissions::SubmissionService,
        writer::ContentWriter,
    },
    cache::{self, CacheConfig, CacheStore, Invalidator},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, PublicState},
        telemetry,
        uploads::ImageStorage,
    },
};
use tokio::{signal, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::FlushCache(_) => run_flush_cache(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let store = cache::connect_store(&CacheConfig::from(&settings.cache)).await?;
    let services = build_services(repositories, store, &settings)?;
    serve_http(&settings, services).await
}

async fn run_flush_cache(settings: config::Settings) -> Result<(), AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    cache_config.ensure_shared().map_err(AppError::from)?;

    let repositories = init_repositories(&settings).await?;
    let store = cache::connect_store(&cache_config).await?;
    let writer = build_writer(repositories, store);

    let report = writer.flush_cache().await?;
    if !report.is_clean() {
        warn!(
            target = "nextconfig::flush_cache",
            failed = ?report.failed_keys(),
            "some cache keys could not be deleted"
        );
        return Err(AppError::unexpected(format!(
            "{} of {} cache keys could not be flushed",
            report.failures.len(),
            report.attempted
        )));
    }

    info!(
        target = "nextconfig::flush_cache",
        keys = report.attempted,
        "cache flushed"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err)))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_writer(repositories: Arc<PostgresRepositories>, store: Arc<dyn CacheStore>) -> ContentWriter {
    let reads: Arc<dyn ContentRepository> = repositories.clone();
    let writes: Arc<dyn ContentWriteRepository> = repositories;
    ContentWriter::new(reads, writes, Invalidator::new(store))
}

struct Services {
    public: PublicState,
    admin: AdminState,
}

fn build_services(
    repositories: Arc<PostgresRepositories>,
    store: Arc<dyn CacheStore>,
    settings: &config::Settings,
) -> Result<Services, AppError> {
    let reads: Arc<dyn ContentRepository> = repositories.clone();
    let probe: Arc<dyn DatabaseProbe> = repositories.clone();
    let ttl = CacheConfig::from(&settings.cache).ttl;

    let content = ContentService::new(reads.clone(), store.clone(), ttl);
    let writer = build_writer(repositories, store);

    let images: Arc<dyn ImageStore> = Arc::new(
        ImageStorage::new(settings.uploads.directory.clone())
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );
    let max_image_bytes = settings.uploads.max_image_bytes.get();
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

    let submissions = SubmissionService::new(
        reads.clone(),
        writer.clone(),
        mailer,
        settings.mail.recipient.clone(),
    );

    let public = PublicState {
        content: content.clone(),
        submissions,
        images: images.clone(),
        db: probe.clone(),
    };

    let admin = AdminState {
        dashboard: Arc::new(AdminDashboardService::new(
            reads.clone(),
            content.clone(),
            writer.clone(),
        )),
        blog: Arc::new(AdminBlogService::new(
            reads.clone(),
            content.clone(),
            writer.clone(),
            images.clone(),
            max_image_bytes,
        )),
        portfolio: Arc::new(AdminPortfolioService::new(
            content.clone(),
            writer.clone(),
            images,
            max_image_bytes,
        )),
        comments: Arc::new(AdminCommentService::new(content.clone(), writer.clone())),
        reviews: Arc::new(AdminReviewService::new(
            reads.clone(),
            content.clone(),
            writer.clone(),
        )),
        faqs: Arc::new(AdminFaqService::new(content, writer.clone())),
        tags: Arc::new(AdminTagService::new(reads, writer.clone())),
        writer,
        db: probe,
    };

    Ok(Services { public, admin })
}

async fn serve_http(settings: &config::Settings, services: Services) -> Result<(), AppError> {
    let public_router = http::build_public_router(services.public);
    let upload_body_limit = usize::try_from(settings.uploads.max_request_bytes.get())
        .map_err(|_| AppError::unexpected("upload request limit exceeds addressable memory"))?;
    let admin_router = http::build_admin_router(services.admin, upload_body_limit);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "nextconfig::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "nextconfig::serve", "listeners stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(target = "nextconfig::serve", "received SIGINT"),
        () = terminate => info!(target = "nextconfig::serve", "received SIGTERM"),
    }
}
