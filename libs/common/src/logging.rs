//! Logging setup shared by the bridge binaries
//!
//! Console output always; optional daily rolling files with a separate
//! access log for the HTTP API (`api_access` target).

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    filter,
    fmt::{
        self,
        format::Writer,
        FmtContext, FormatEvent, FormatFields, MakeWriter,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Target used by [`http_request_logger`]; routed to the `_api` log file.
pub const API_ACCESS_TARGET: &str = "api_access";

fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Event formatter producing `timestamp [LEVEL] span{fields}: message`
///
/// Example output: `2025-12-02T00:50:44.809123Z [INFO] processor{channel=line1}: started`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m",
                Level::DEBUG => "\x1b[34m",
                Level::INFO => "\x1b[32m",
                Level::WARN => "\x1b[33m",
                Level::ERROR => "\x1b[31m",
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        // Span scope carries the channel name of processor tasks
        if let Some(scope) = ctx.event_scope() {
            let mut wrote_span = false;
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<fmt::FormattedFields<N>>() {
                    if !fields.fields.is_empty() {
                        write!(writer, "{{{}}}", fields.fields)?;
                    }
                }
                write!(writer, ":")?;
                wrote_span = true;
            }
            if wrote_span {
                write!(writer, " ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Default max file size before an intra-day rotation: 100MB
const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

fn log_file_name(date: &str, service_name: &str, suffix: &str, rotation: u32) -> String {
    if rotation == 0 {
        format!("{}_{}{}.log", date, service_name, suffix)
    } else {
        format!("{}_{}{}.{}.log", date, service_name, suffix, rotation)
    }
}

/// Daily rolling file writer named `{YYYYMMDD}_{service}{suffix}.log`
///
/// Rolls over at local midnight, when the file exceeds `max_file_size`
/// (`.N` suffix) and when the current file disappears from disk.
#[derive(Clone)]
struct DailyRollingWriter {
    service_name: String,
    suffix: &'static str,
    log_dir: PathBuf,
    current_date: Arc<Mutex<String>>,
    current_file: Arc<Mutex<Option<File>>>,
    current_size: Arc<AtomicU64>,
    max_file_size: u64,
    rotation_count: Arc<AtomicU32>,
}

impl DailyRollingWriter {
    fn new(service_name: &str, suffix: &'static str, log_dir: &Path) -> std::io::Result<Self> {
        Self::with_max_size(service_name, suffix, log_dir, DEFAULT_MAX_FILE_SIZE)
    }

    fn with_max_size(
        service_name: &str,
        suffix: &'static str,
        log_dir: &Path,
        max_file_size: u64,
    ) -> std::io::Result<Self> {
        let current_date = chrono::Local::now().format("%Y%m%d").to_string();
        fs::create_dir_all(log_dir)?;

        let file_path = log_dir.join(log_file_name(&current_date, service_name, suffix, 0));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;
        let initial_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            service_name: service_name.to_string(),
            suffix,
            log_dir: log_dir.to_path_buf(),
            current_date: Arc::new(Mutex::new(current_date)),
            current_file: Arc::new(Mutex::new(Some(file))),
            current_size: Arc::new(AtomicU64::new(initial_size)),
            max_file_size,
            rotation_count: Arc::new(AtomicU32::new(0)),
        })
    }

    fn file_path(&self, date: &str, rotation: u32) -> PathBuf {
        self.log_dir
            .join(log_file_name(date, &self.service_name, self.suffix, rotation))
    }

    fn open(&self, path: &Path) -> std::io::Result<File> {
        fs::create_dir_all(&self.log_dir)?;
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn swap_file(&self, file: File, size: u64) -> std::io::Result<()> {
        self.current_size.store(size, Ordering::SeqCst);
        let mut current = self
            .current_file
            .lock()
            .map_err(|e| std::io::Error::other(format!("Mutex poisoned: {}", e)))?;
        *current = Some(file);
        Ok(())
    }

    fn rotate_by_size(&self) -> std::io::Result<()> {
        let date = self
            .current_date
            .lock()
            .map_err(|e| std::io::Error::other(format!("Mutex poisoned: {}", e)))?
            .clone();
        let count = self.rotation_count.fetch_add(1, Ordering::SeqCst) + 1;
        let file = self.open(&self.file_path(&date, count))?;
        self.swap_file(file, 0)
    }

    fn roll_if_needed(&self) -> std::io::Result<()> {
        let today = chrono::Local::now().format("%Y%m%d").to_string();
        let mut current_date = self
            .current_date
            .lock()
            .map_err(|e| std::io::Error::other(format!("Mutex poisoned: {}", e)))?;

        let rotation = self.rotation_count.load(Ordering::SeqCst);
        let date_changed = *current_date != today;
        let file_deleted = !self.file_path(&current_date, rotation).exists();

        if date_changed || file_deleted {
            if date_changed {
                *current_date = today;
                self.rotation_count.store(0, Ordering::SeqCst);
            }
            let rotation = self.rotation_count.load(Ordering::SeqCst);
            let file = self.open(&self.file_path(&current_date, rotation))?;
            let size = file.metadata().map(|m| m.len()).unwrap_or(0);
            drop(current_date);
            self.swap_file(file, size)?;
        }
        Ok(())
    }
}

impl Write for DailyRollingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let current_size = self.current_size.load(Ordering::Relaxed);
        if current_size + buf.len() as u64 > self.max_file_size {
            self.rotate_by_size()?;
        }
        self.roll_if_needed()?;

        let mut guard = self
            .current_file
            .lock()
            .map_err(|e| std::io::Error::other(format!("Mutex poisoned: {}", e)))?;
        match guard.as_mut() {
            Some(file) => {
                let written = file.write(buf)?;
                self.current_size
                    .fetch_add(written as u64, Ordering::Relaxed);
                Ok(written)
            },
            None => Ok(0),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut guard = self
            .current_file
            .lock()
            .map_err(|e| std::io::Error::other(format!("Mutex poisoned: {}", e)))?;
        match guard.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Non-blocking writer that can be swapped out on SIGHUP
#[derive(Clone)]
struct ReloadableWriter {
    inner: Arc<Mutex<Option<NonBlocking>>>,
}

impl ReloadableWriter {
    fn new(writer: NonBlocking) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(writer))),
        }
    }

    fn reload(&self, new_writer: NonBlocking) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some(new_writer);
        }
    }
}

impl Write for ReloadableWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut guard) = self.inner.lock() {
            if let Some(ref mut writer) = *guard {
                return writer.write(buf);
            }
        }
        Ok(0)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Ok(mut guard) = self.inner.lock() {
            if let Some(ref mut writer) = *guard {
                return writer.flush();
            }
        }
        Ok(())
    }
}

impl MakeWriter<'_> for ReloadableWriter {
    type Writer = Self;

    fn make_writer(&'_ self) -> Self::Writer {
        self.clone()
    }
}

/// One file sink: the writer handle, its worker guard and the file suffix
struct FileSink {
    suffix: &'static str,
    writer: ReloadableWriter,
    guard: Option<WorkerGuard>,
}

struct LogRuntime {
    service_name: String,
    log_dir: PathBuf,
    sinks: Vec<FileSink>,
}

static LOG_RUNTIME: OnceLock<Mutex<LogRuntime>> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Service name, used for file names and the default filter
    pub service_name: String,
    /// Directory for log files; `None` logs to the console only
    pub log_dir: Option<PathBuf>,
    /// Filter directive when `RUST_LOG` is not set (e.g. "info")
    pub level: String,
    /// ANSI colors on the console
    pub ansi: bool,
    /// Write the file log as JSON lines
    pub enable_json: bool,
    /// Separate `{date}_{service}_api.log` for HTTP access logs
    pub enable_api_log: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".to_string(),
            log_dir: None,
            level: "info".to_string(),
            ansi: true,
            enable_json: false,
            enable_api_log: true,
        }
    }
}

/// Build the filter directive: `RUST_LOG` wins, the configured level otherwise.
fn build_filter_directive(config: &LogConfig, rust_log: Option<&str>) -> String {
    match rust_log {
        Some(env) if env.contains(API_ACCESS_TARGET) => env.to_string(),
        Some(env) => format!("{},{}=info", env, API_ACCESS_TARGET),
        None => format!("{},{}=info", config.level, API_ACCESS_TARGET),
    }
}

/// Initialize the global subscriber
///
/// Installs a console layer and, when `log_dir` is set, a business file
/// layer plus the API access file layer. Fails if a global subscriber is
/// already installed.
pub fn init_with_config(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = build_filter_directive(&config, rust_log.as_deref());
    let env_filter = EnvFilter::try_new(&directive)?;

    let console_layer = fmt::layer()
        .with_ansi(config.ansi)
        .event_format(BracketedLevelFormat)
        .boxed();

    let mut file_layers = Vec::new();
    let mut sinks = Vec::new();

    if let Some(log_dir) = &config.log_dir {
        fs::create_dir_all(log_dir)?;

        let (writer, guard) = open_sink(&config.service_name, "", log_dir)?;
        file_layers.push(business_layer(config.enable_json, writer.clone()));
        sinks.push(FileSink {
            suffix: "",
            writer,
            guard: Some(guard),
        });

        if config.enable_api_log {
            let (writer, guard) = open_sink(&config.service_name, "_api", log_dir)?;
            file_layers.push(
                fmt::layer()
                    .with_writer(writer.clone())
                    .with_ansi(false)
                    .event_format(BracketedLevelFormat)
                    .with_filter(filter::filter_fn(|m| m.target() == API_ACCESS_TARGET))
                    .boxed(),
            );
            sinks.push(FileSink {
                suffix: "_api",
                writer,
                guard: Some(guard),
            });
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layers)
        .try_init()?;

    if let Some(log_dir) = config.log_dir {
        tracing::info!("Logging: {} @ {}", config.service_name, log_dir.display());
        let runtime = LogRuntime {
            service_name: config.service_name.clone(),
            log_dir: log_dir.clone(),
            sinks,
        };
        if LOG_RUNTIME.set(Mutex::new(runtime)).is_err() {
            tracing::warn!("Log runtime already registered");
        }
        start_log_compression_task(log_dir, config.service_name);
    } else {
        tracing::debug!("Logging: {} @ console", config.service_name);
    }

    Ok(())
}

/// File layer for everything except the access log; JSON lines when `json`
fn business_layer<S, W>(json: bool, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let not_access = filter::filter_fn(|m| m.target() != API_ACCESS_TARGET);
    if json {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_filter(not_access)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .event_format(BracketedLevelFormat)
            .with_filter(not_access)
            .boxed()
    }
}

fn open_sink(
    service_name: &str,
    suffix: &'static str,
    log_dir: &Path,
) -> std::io::Result<(ReloadableWriter, WorkerGuard)> {
    let file_writer = DailyRollingWriter::new(service_name, suffix, log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_writer);
    Ok((ReloadableWriter::new(non_blocking), guard))
}

/// Reopen every file sink (after logrotate moved or deleted the files)
pub fn reopen_logs_now() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = LOG_RUNTIME.get().ok_or("file logging not initialized")?;
    let mut runtime = runtime.lock().map_err(|_| "poisoned lock")?;
    let LogRuntime {
        service_name,
        log_dir,
        sinks,
    } = &mut *runtime;

    for sink in sinks.iter_mut() {
        let file_writer = DailyRollingWriter::new(service_name, sink.suffix, log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_writer);
        sink.writer.reload(non_blocking);
        // Dropping the old guard flushes and closes the stale handle
        sink.guard = Some(guard);
    }

    tracing::debug!("Log reopened");
    Ok(())
}

/// Install SIGHUP listener to reopen logs on demand (Unix only)
pub fn enable_sighup_log_reopen() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        tokio::spawn(async move {
            match signal(SignalKind::hangup()) {
                Ok(mut hup) => loop {
                    if hup.recv().await.is_none() {
                        break;
                    }
                    if let Err(e) = reopen_logs_now() {
                        tracing::warn!("SIGHUP reopen: {}", e);
                    }
                },
                Err(e) => tracing::warn!("SIGHUP handler: {}", e),
            }
        });
    }
}

// ==================== Log Compression Support ====================

use tokio::time::{interval, Duration};

/// Compress week-old logs once a day, starting a minute after boot
pub fn start_log_compression_task(log_dir: PathBuf, service_name: String) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        let mut interval = interval(Duration::from_secs(86400));

        loop {
            interval.tick().await;
            if let Err(e) = compress_old_logs(&log_dir, &service_name).await {
                tracing::error!("Log compression error for {}: {}", service_name, e);
            }
        }
    });
}

/// Compress log files older than 7 days, delete compressed logs older than 365 days
async fn compress_old_logs(
    log_dir: &Path,
    service_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::time::SystemTime;

    let mut entries = tokio::fs::read_dir(log_dir).await?;
    let marker = format!("_{}", service_name);

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };
        if !file_name.contains(&marker) {
            continue;
        }

        let modified = tokio::fs::metadata(&path).await?.modified()?;
        let age = SystemTime::now().duration_since(modified)?;

        if file_name.ends_with(".log") {
            if age > Duration::from_secs(7 * 86400) {
                compress_file(&path).await?;
                tokio::fs::remove_file(&path).await?;
                tracing::debug!("Compressed: {}", file_name);
            }
        } else if file_name.ends_with(".log.gz") && age > Duration::from_secs(365 * 86400) {
            tokio::fs::remove_file(&path).await?;
            tracing::debug!("Deleted: {}", file_name);
        }
    }

    Ok(())
}

async fn compress_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let buffer = tokio::fs::read(path).await?;
    let output_path = format!("{}.gz", path.display());

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let output = File::create(&output_path)?;
        let mut encoder = GzEncoder::new(output, Compression::best());
        encoder.write_all(&buffer)?;
        encoder.finish()?;
        Ok(())
    })
    .await??;

    Ok(())
}

// ============================================================================
// HTTP API Request Logging Middleware
// ============================================================================

/// Truncate a body to `max_length` bytes on a char boundary
fn truncate_body(body: &str, max_length: usize) -> String {
    if body.len() <= max_length {
        return body.to_string();
    }
    let mut cut = max_length;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}[truncated {} bytes]", &body[..cut], body.len() - cut)
}

/// HTTP access log middleware
///
/// - **INFO**: state-changing requests (POST/PUT/PATCH/DELETE) without body
/// - **DEBUG**: every request; text bodies of state-changing requests are
///   included, truncated to 256 bytes
///
/// Events use the `api_access` target so they land in the `_api` log file.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/health", get(health))
///     .layer(axum::middleware::from_fn(common::logging::http_request_logger))
///     .with_state(state);
/// ```
#[cfg(feature = "axum")]
pub async fn http_request_logger(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    use axum::body::Body;
    use std::time::Instant;
    use tracing::{debug, info, level_enabled};

    const MAX_BODY_LENGTH: usize = 256;
    const MAX_READ: usize = 64 * 1024;

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let mutating = matches!(method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE");

    let (req, body_str) = if mutating && level_enabled!(Level::DEBUG) {
        let (parts, body) = req.into_parts();
        let bytes = match axum::body::to_bytes(body, MAX_READ).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Failed to read request body: {}", e);
                let new_req = axum::extract::Request::from_parts(parts, Body::empty());
                return next.run(new_req).await;
            },
        };
        let body_str = match std::str::from_utf8(&bytes) {
            Ok(s) => truncate_body(s.trim_end(), MAX_BODY_LENGTH),
            Err(_) => "<binary data>".to_string(),
        };
        (
            axum::extract::Request::from_parts(parts, Body::from(bytes)),
            Some(body_str),
        )
    } else {
        (req, None)
    };

    let response = next.run(req).await;
    let duration = start.elapsed();
    let status = response.status().as_u16();

    if mutating {
        info!(
            target: "api_access",
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "HTTP request"
        );
    }

    match body_str {
        Some(body) => debug!(
            target: "api_access",
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            request_body = %body,
            "HTTP request (detailed)"
        ),
        None if !mutating => debug!(
            target: "api_access",
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration.as_millis(),
            "HTTP request"
        ),
        None => {},
    }

    response
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_events(json: bool) -> String {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let subscriber = tracing_subscriber::registry()
            .with(business_layer(json, move || Capture(Arc::clone(&sink))));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "mbridge::bridge", "polling started");
            tracing::info!(target: API_ACCESS_TARGET, "GET /health");
        });
        let bytes = buf.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_business_layer_json_lines() {
        let text = capture_events(true);
        assert_eq!(text.lines().count(), 1);
        let line: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(line["fields"]["message"], "polling started");
        assert_eq!(line["target"], "mbridge::bridge");
    }

    #[test]
    fn test_business_layer_bracketed_text() {
        let text = capture_events(false);
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("[INFO]"));
        assert!(text.contains("polling started"));
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("0x10", 256), "0x10");
        let long = "a".repeat(300);
        let truncated = truncate_body(&long, 256);
        assert!(truncated.starts_with(&"a".repeat(256)));
        assert!(truncated.ends_with("[truncated 44 bytes]"));
    }

    #[test]
    fn test_truncate_body_char_boundary() {
        // 'µ' is two bytes; cutting at 1 must back off to 0
        let truncated = truncate_body("µs", 1);
        assert_eq!(truncated, "[truncated 3 bytes]");
    }

    #[test]
    fn test_filter_directive() {
        let config = LogConfig {
            level: "debug".to_string(),
            ..Default::default()
        };
        assert_eq!(build_filter_directive(&config, None), "debug,api_access=info");
        assert_eq!(
            build_filter_directive(&config, Some("warn,mbridge=trace")),
            "warn,mbridge=trace,api_access=info"
        );
        assert_eq!(
            build_filter_directive(&config, Some("api_access=off")),
            "api_access=off"
        );
    }

    #[test]
    fn test_daily_writer_file_naming() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DailyRollingWriter::new("mbridge", "_api", dir.path()).unwrap();
        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();

        let date = chrono::Local::now().format("%Y%m%d").to_string();
        let path = dir.path().join(format!("{}_mbridge_api.log", date));
        assert_eq!(fs::read_to_string(path).unwrap(), "hello\n");
    }

    #[test]
    fn test_daily_writer_rotates_by_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            DailyRollingWriter::with_max_size("mbridge", "", dir.path(), 8).unwrap();
        writer.write_all(b"12345678").unwrap();
        writer.write_all(b"abc").unwrap();
        writer.flush().unwrap();

        let date = chrono::Local::now().format("%Y%m%d").to_string();
        let rotated = dir.path().join(format!("{}_mbridge.1.log", date));
        assert_eq!(fs::read_to_string(rotated).unwrap(), "abc");
    }

    #[test]
    fn test_daily_writer_recreates_deleted_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = DailyRollingWriter::new("mbridge", "", dir.path()).unwrap();
        let date = chrono::Local::now().format("%Y%m%d").to_string();
        let path = dir.path().join(format!("{}_mbridge.log", date));

        fs::remove_file(&path).unwrap();
        writer.write_all(b"after\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "after\n");
    }
}
