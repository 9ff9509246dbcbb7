/*
 * Logger implementation
 *
 * - A single global logger behind OnceCell + Mutex
 * - Configuration from TOML files, plugin options or a LogConfig value
 * - Optional asynchronous writing through a bounded Tokio channel drained by
 *   a background task; a full channel falls back to a synchronous write and
 *   bumps the dropped counter, so a log call never waits on I/O backpressure
 * - Records logged before initialisation go to stderr
 * - Shutdown drains the worker and stops the private runtime
 */

use chrono::Utc;
use once_cell::sync::OnceCell;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::time::{timeout, Duration};

use crate::config::{LogConfig, LogLevel};
use crate::outputs::{create_outputs, AsyncLogOutput, AsyncLogOutputTrait, BrokerSink, LogOutput, LogRecord};

const CHANNEL_CAPACITY: usize = 256;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

static LOGGER_INSTANCE: OnceCell<Mutex<LoggerInner>> = OnceCell::new();
static RUNTIME: Mutex<Option<Runtime>> = Mutex::new(None);
static BROKER_SINK: OnceCell<BrokerSink> = OnceCell::new();

enum LogCommand {
    Entry(LogRecord),
    Shutdown(oneshot::Sender<()>),
}

struct LoggerInner {
    threshold: Option<LogLevel>,
    output: Option<Box<dyn LogOutput>>,
    async_sender: Option<Sender<LogCommand>>,
    dropped_logs: AtomicU64,
}

impl LoggerInner {
    fn new() -> Self {
        LoggerInner {
            threshold: None,
            output: None,
            async_sender: None,
            dropped_logs: AtomicU64::new(0),
        }
    }

    fn init_with_config(&mut self, config: LogConfig) -> Result<(), String> {
        let (output, async_output) = create_outputs(&config, BROKER_SINK.get().copied())?;

        self.async_sender = match async_output {
            Some(async_output) => Some(spawn_worker(async_output)?),
            None => None,
        };
        self.output = Some(output);
        self.threshold = Some(config.threshold);
        Ok(())
    }

    fn accepts(&self, level: LogLevel) -> bool {
        match self.threshold {
            Some(threshold) => level >= threshold,
            None => true,
        }
    }

    fn log(&mut self, record: LogRecord) {
        if !self.accepts(record.level) {
            return;
        }

        let record = match &self.async_sender {
            Some(sender) => match sender.try_send(LogCommand::Entry(record)) {
                Ok(()) => return,
                Err(err) => {
                    self.dropped_logs.fetch_add(1, Ordering::Relaxed);
                    match err.into_inner() {
                        LogCommand::Entry(record) => record,
                        LogCommand::Shutdown(_) => return,
                    }
                }
            },
            None => record,
        };
        self.log_sync(&record);
    }

    fn log_sync(&mut self, record: &LogRecord) {
        match self.output.as_mut() {
            Some(output) => {
                if let Err(e) = output.write_log(record) {
                    let _ = writeln!(io::stderr(), "Failed to write log: {}", e);
                }
            }
            None => {
                let _ = writeln!(io::stderr(), "{}", record.format_full());
            }
        }
    }
}

fn spawn_worker(output: AsyncLogOutput) -> Result<Sender<LogCommand>, String> {
    let mut runtime = RUNTIME
        .lock()
        .map_err(|_| "Logging runtime mutex poisoned".to_string())?;
    if runtime.is_none() {
        let built = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("liblogger")
            .enable_time()
            .build()
            .map_err(|e| format!("Failed to create logging runtime: {}", e))?;
        *runtime = Some(built);
    }
    let Some(runtime) = runtime.as_ref() else {
        return Err("Logging runtime unavailable".to_string());
    };

    let (tx, rx) = mpsc::channel::<LogCommand>(CHANNEL_CAPACITY);
    runtime.spawn(process_log_commands(rx, output));
    Ok(tx)
}

fn drain_worker(runtime: &Runtime, sender: Sender<LogCommand>) -> Result<(), String> {
    let (done_tx, done_rx) = oneshot::channel();
    runtime.block_on(async move {
        sender
            .send(LogCommand::Shutdown(done_tx))
            .await
            .map_err(|_| "Logging worker already stopped".to_string())?;
        match timeout(SHUTDOWN_TIMEOUT, done_rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err("Shutdown completion channel was closed".to_string()),
            Err(_) => Err("Logger shutdown timed out".to_string()),
        }
    })
}

async fn process_log_commands(mut receiver: Receiver<LogCommand>, mut output: AsyncLogOutput) {
    while let Some(cmd) = receiver.recv().await {
        match cmd {
            LogCommand::Entry(record) => {
                if let Err(e) = output.write_log_async(&record).await {
                    eprintln!("Async logging error: {}", e);
                }
            }
            LogCommand::Shutdown(done) => {
                let _ = done.send(());
                break;
            }
        }
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub struct Logger;

impl Logger {
    /// Sets where `LogType::Broker` records go. Must be called before the
    /// logger is initialised with a broker output; only the first sink sticks.
    pub fn set_broker_sink(sink: BrokerSink) {
        let _ = BROKER_SINK.set(sink);
    }

    pub fn init_with_config_file(config_path: &str) -> Result<(), String> {
        Self::init_with_config(LogConfig::from_file(config_path)?)
    }

    /// Initialises (or reconfigures) the global logger
    pub fn init_with_config(config: LogConfig) -> Result<(), String> {
        let logger = LOGGER_INSTANCE.get_or_init(|| Mutex::new(LoggerInner::new()));
        let mut guard = match logger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.init_with_config(config)
    }

    pub fn debug(message: &str, context: Option<String>, file: &'static str, line: u32, module: &'static str) {
        Self::log_with_metadata(LogLevel::Debug, message, context, file, line, module)
    }

    pub fn info(message: &str, context: Option<String>, file: &'static str, line: u32, module: &'static str) {
        Self::log_with_metadata(LogLevel::Info, message, context, file, line, module)
    }

    pub fn warn(message: &str, context: Option<String>, file: &'static str, line: u32, module: &'static str) {
        Self::log_with_metadata(LogLevel::Warn, message, context, file, line, module)
    }

    pub fn error(message: &str, context: Option<String>, file: &'static str, line: u32, module: &'static str) {
        Self::log_with_metadata(LogLevel::Error, message, context, file, line, module)
    }

    fn log_with_metadata(
        level: LogLevel,
        message: &str,
        context: Option<String>,
        file: &str,
        line: u32,
        module: &str,
    ) {
        let file_name = Path::new(file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file);

        let record = LogRecord {
            timestamp: timestamp(),
            level,
            message: message.to_string(),
            context,
            file: file_name.to_string(),
            line,
            module: module.to_string(),
        };

        let logger = LOGGER_INSTANCE.get_or_init(|| Mutex::new(LoggerInner::new()));
        match logger.lock() {
            Ok(mut inner) => inner.log(record),
            Err(_) => {
                let _ = writeln!(io::stderr(), "{} | MUTEX POISONED", record.format_full());
            }
        };
    }

    /// Drains the background worker, waiting at most five seconds, then stops
    /// the logging runtime. Later records are written synchronously.
    pub fn shutdown() -> Result<(), String> {
        let sender = match LOGGER_INSTANCE.get() {
            Some(logger) => match logger.lock() {
                Ok(mut inner) => inner.async_sender.take(),
                Err(_) => return Err("Logger mutex poisoned".to_string()),
            },
            None => None,
        };
        let runtime = match RUNTIME.lock() {
            Ok(mut runtime) => runtime.take(),
            Err(_) => return Err("Logging runtime mutex poisoned".to_string()),
        };
        let Some(runtime) = runtime else {
            return Ok(());
        };

        let drained = match sender {
            Some(sender) => drain_worker(&runtime, sender),
            None => Ok(()),
        };
        runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
        drained
    }

    /// Records that could not be queued and were written synchronously
    pub fn get_dropped_log_count() -> u64 {
        LOGGER_INSTANCE
            .get()
            .and_then(|logger| logger.lock().ok().map(|inner| inner.dropped_logs.load(Ordering::Relaxed)))
            .unwrap_or(0)
    }
}
