/*
 * Log output implementations
 *
 * - ConsoleOutput: writes formatted records to stdout
 * - FileOutput: appends formatted records to a file
 * - BrokerOutput: hands a short line to the broker sink, which routes it to
 *   the broker's own log at the matching level
 *
 * Every output implements the synchronous LogOutput trait; the async variants
 * used by the background worker implement AsyncLogOutputTrait.
 */

use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{stdout, AsyncWriteExt};

use crate::config::{LogConfig, LogLevel, LogType};

/// Receives one finished line for the broker log
pub type BrokerSink = fn(LogLevel, &str);

/// A single log record, formatted by each output as it sees fit
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub context: Option<String>,
    pub file: String,
    pub line: u32,
    pub module: String,
}

impl LogRecord {
    /// `timestamp [LEVEL] [file:line] [module] message | context`
    pub fn format_full(&self) -> String {
        match &self.context {
            Some(ctx) => format!(
                "{} [{}] [{}:{}] [{}] {} | {}",
                self.timestamp,
                self.level.as_str(),
                self.file,
                self.line,
                self.module,
                self.message,
                ctx
            ),
            None => format!(
                "{} [{}] [{}:{}] [{}] {}",
                self.timestamp,
                self.level.as_str(),
                self.file,
                self.line,
                self.module,
                self.message
            ),
        }
    }

    /// The broker stamps time and level itself, so only module and text remain
    pub fn format_short(&self) -> String {
        match &self.context {
            Some(ctx) => format!("{}: {} | {}", self.module, self.message, ctx),
            None => format!("{}: {}", self.module, self.message),
        }
    }
}

pub trait LogOutput: Send {
    fn write_log(&mut self, record: &LogRecord) -> Result<(), String>;
}

#[async_trait]
pub trait AsyncLogOutputTrait: Send + Sync {
    async fn write_log_async(&mut self, record: &LogRecord) -> Result<(), String>;
}

pub enum AsyncLogOutput {
    Console(ConsoleOutput),
    File(FileOutput),
    Broker(BrokerOutput),
}

pub struct ConsoleOutput;

impl LogOutput for ConsoleOutput {
    fn write_log(&mut self, record: &LogRecord) -> Result<(), String> {
        writeln!(io::stdout(), "{}", record.format_full())
            .map_err(|e| format!("Failed to write to console: {}", e))
    }
}

#[async_trait]
impl AsyncLogOutputTrait for ConsoleOutput {
    async fn write_log_async(&mut self, record: &LogRecord) -> Result<(), String> {
        let mut line = record.format_full().into_bytes();
        line.push(b'\n');

        let mut out = stdout();
        out.write_all(&line)
            .await
            .map_err(|e| format!("Failed to write to console: {}", e))?;
        out.flush()
            .await
            .map_err(|e| format!("Failed to flush console output: {}", e))
    }
}

/// Append-only file output. Clones share one handle, so the sync fallback and
/// the background worker never interleave partial lines.
#[derive(Clone)]
pub struct FileOutput {
    file_handle: Arc<Mutex<File>>,
    force_flush: bool,
}

impl FileOutput {
    pub fn open(path: &Path, force_flush: bool) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create log directory: {}", e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| format!("Failed to open log file: {}", e))?;

        Ok(FileOutput {
            file_handle: Arc::new(Mutex::new(file)),
            force_flush,
        })
    }

    fn append(&self, record: &LogRecord) -> Result<(), String> {
        let mut file = self
            .file_handle
            .lock()
            .map_err(|_| "Failed to lock file mutex".to_string())?;

        let mut line = record.format_full().into_bytes();
        line.push(b'\n');
        file.write_all(&line)
            .map_err(|e| format!("Failed to write to log file: {}", e))?;

        if self.force_flush {
            file.flush()
                .map_err(|e| format!("Failed to flush log file: {}", e))?;
        }
        Ok(())
    }
}

impl LogOutput for FileOutput {
    fn write_log(&mut self, record: &LogRecord) -> Result<(), String> {
        self.append(record)
    }
}

#[async_trait]
impl AsyncLogOutputTrait for FileOutput {
    async fn write_log_async(&mut self, record: &LogRecord) -> Result<(), String> {
        self.append(record)
    }
}

pub struct BrokerOutput {
    sink: BrokerSink,
}

impl BrokerOutput {
    pub fn new(sink: BrokerSink) -> Self {
        BrokerOutput { sink }
    }
}

impl LogOutput for BrokerOutput {
    fn write_log(&mut self, record: &LogRecord) -> Result<(), String> {
        (self.sink)(record.level, &record.format_short());
        Ok(())
    }
}

#[async_trait]
impl AsyncLogOutputTrait for BrokerOutput {
    async fn write_log_async(&mut self, record: &LogRecord) -> Result<(), String> {
        (self.sink)(record.level, &record.format_short());
        Ok(())
    }
}

#[async_trait]
impl AsyncLogOutputTrait for AsyncLogOutput {
    async fn write_log_async(&mut self, record: &LogRecord) -> Result<(), String> {
        match self {
            AsyncLogOutput::Console(output) => output.write_log_async(record).await,
            AsyncLogOutput::File(output) => output.write_log_async(record).await,
            AsyncLogOutput::Broker(output) => output.write_log_async(record).await,
        }
    }
}

/// Creates the synchronous output and, when `async_logging` is set, its async
/// twin for the background worker
pub fn create_outputs(
    config: &LogConfig,
    sink: Option<BrokerSink>,
) -> Result<(Box<dyn LogOutput>, Option<AsyncLogOutput>), String> {
    match config.log_type {
        LogType::Console => {
            let twin = config.async_logging.then(|| AsyncLogOutput::Console(ConsoleOutput));
            Ok((Box::new(ConsoleOutput), twin))
        }
        LogType::File => {
            let path = config
                .resolved_file_path()
                .ok_or_else(|| "File path not specified in configuration".to_string())?;
            let output = FileOutput::open(&path, config.force_flush)?;
            let twin = config.async_logging.then(|| AsyncLogOutput::File(output.clone()));
            Ok((Box::new(output), twin))
        }
        LogType::Broker => {
            let sink = sink.ok_or_else(|| "Broker output needs a sink".to_string())?;
            let twin = config
                .async_logging
                .then(|| AsyncLogOutput::Broker(BrokerOutput::new(sink)));
            Ok((Box::new(BrokerOutput::new(sink)), twin))
        }
    }
}
