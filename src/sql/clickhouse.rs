//! ClickHouse access through the `clickhouse` HTTP client.
//!
//! The engine is synchronous, so every connection drives the async client on
//! a private current-thread runtime. Results are fetched as `TabSeparated`
//! text, which gives every column as a string and NULL as `\N`. Do not call
//! into a connection from inside another tokio runtime.

use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ::clickhouse::{error::Error as ClickHouseError, query::BytesCursor, Client};
use tokio::io::{AsyncBufReadExt, Lines};
use tokio::runtime::Runtime;

use super::connection::{ConnectionFactory, RowCursor, SqlConnection, SqlQuery};
use super::errors::ExecutionError;

#[derive(Debug, Clone, PartialEq)]
pub struct ClickHouseSettings {
    pub url: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ClickHouseSettings {
    /// Reads `CLICKHOUSE_URL`, `CLICKHOUSE_USER`, `CLICKHOUSE_PASSWORD` and
    /// `CLICKHOUSE_DATABASE`, after loading a `.env` file if there is one.
    pub fn from_env() -> Result<Self, ExecutionError> {
        dotenvy::dotenv().ok();
        let missing = |key: &str| ExecutionError::Connect {
            database: "clickhouse".to_string(),
            message: format!("{} not set", key),
        };
        Ok(ClickHouseSettings {
            url: env::var("CLICKHOUSE_URL").map_err(|_| missing("CLICKHOUSE_URL"))?,
            user: env::var("CLICKHOUSE_USER").map_err(|_| missing("CLICKHOUSE_USER"))?,
            // Allow empty password for local development
            password: env::var("CLICKHOUSE_PASSWORD").unwrap_or_default(),
            database: env::var("CLICKHOUSE_DATABASE").unwrap_or_else(|_| "default".to_string()),
        })
    }

    fn client(&self) -> Client {
        Client::default()
            .with_url(&self.url)
            .with_user(&self.user)
            .with_password(&self.password)
            .with_database(&self.database)
            .with_option("join_use_nulls", "1") // NULL for unmatched LEFT JOIN columns
    }
}

/// Opens [`ClickHouseConnection`]s sharing one runtime.
pub struct ClickHouseConnector {
    settings: ClickHouseSettings,
    runtime: Arc<Runtime>,
}

impl ClickHouseConnector {
    pub fn new(settings: ClickHouseSettings) -> Result<Self, ExecutionError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ExecutionError::Connect {
                database: settings.database.clone(),
                message: format!("failed to start runtime: {}", e),
            })?;
        Ok(ClickHouseConnector {
            settings,
            runtime: Arc::new(runtime),
        })
    }

    pub fn from_env() -> Result<Self, ExecutionError> {
        ClickHouseConnector::new(ClickHouseSettings::from_env()?)
    }
}

impl ConnectionFactory for ClickHouseConnector {
    fn connect(&self) -> Result<Box<dyn SqlConnection>, ExecutionError> {
        let mut connection = ClickHouseConnection {
            client: self.settings.client(),
            runtime: self.runtime.clone(),
            closed: false,
        };
        connection.ping().map_err(|e| ExecutionError::Connect {
            database: self.settings.database.clone(),
            message: e.to_string(),
        })?;
        log::info!(
            "ClickHouse: connected to {} (database {})",
            self.settings.url,
            self.settings.database
        );
        Ok(Box::new(connection))
    }
}

pub struct ClickHouseConnection {
    client: Client,
    runtime: Arc<Runtime>,
    closed: bool,
}

impl SqlConnection for ClickHouseConnection {
    fn execute(&mut self, query: &SqlQuery) -> Result<Box<dyn RowCursor>, ExecutionError> {
        if self.closed {
            return Err(ExecutionError::Closed);
        }
        let mut client = self.client.clone();
        if let Some(timeout) = query.timeout {
            client = client.with_option("max_execution_time", server_timeout_secs(timeout).to_string());
        }
        if let Some(fetch_size) = query.fetch_size {
            client = client.with_option("max_block_size", fetch_size.to_string());
        }
        let _runtime = self.runtime.enter();
        // The client treats `?` as a bind placeholder; `??` is a literal one.
        let lines = client
            .query(&query.sql.replace('?', "??"))
            .fetch_bytes("TabSeparated")
            .map_err(|e| classify(e, &query.sql, query.timeout))?
            .lines();
        Ok(Box::new(ClickHouseCursor {
            lines: Some(lines),
            runtime: self.runtime.clone(),
            sql: query.sql.clone(),
            timeout: query.timeout,
            deadline: query.timeout.map(|t| Instant::now() + t),
            width: query.columns.len(),
        }))
    }

    fn ping(&mut self) -> Result<(), ExecutionError> {
        if self.closed {
            return Err(ExecutionError::Closed);
        }
        let client = self.client.clone();
        self.runtime
            .block_on(async move { client.query("SELECT 1").fetch_one::<u8>().await })
            .map(|_| ())
            .map_err(|e| classify(e, "SELECT 1", None))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Whole seconds for `max_execution_time`, rounded up so the server never
/// gives up before the client deadline.
fn server_timeout_secs(timeout: Duration) -> u128 {
    timeout.as_millis().div_ceil(1000).max(1)
}

/// `TIMEOUT_EXCEEDED` (159) and `TOO_SLOW` (160), the latter raised when the
/// server estimates the statement would overrun its limit.
fn is_server_timeout(message: &str) -> bool {
    message.contains("Code: 159.")
        || message.contains("Code: 160.")
        || message.contains("TIMEOUT_EXCEEDED")
        || message.contains("TOO_SLOW")
}

fn classify_message(message: String, sql: &str, timeout: Option<Duration>) -> ExecutionError {
    if is_server_timeout(&message) {
        return ExecutionError::QueryTimeout {
            sql: sql.to_string(),
            timeout: timeout.unwrap_or_default(),
        };
    }
    ExecutionError::Sql {
        sql: sql.to_string(),
        message,
    }
}

fn classify(error: ClickHouseError, sql: &str, timeout: Option<Duration>) -> ExecutionError {
    match error {
        ClickHouseError::Network(e) => ExecutionError::ConnectionLost {
            message: e.to_string(),
        },
        other => classify_message(other.to_string(), sql, timeout),
    }
}

fn classify_io(error: std::io::Error, sql: &str, timeout: Option<Duration>) -> ExecutionError {
    use std::io::ErrorKind;
    match error.kind() {
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => ExecutionError::ConnectionLost {
            message: error.to_string(),
        },
        _ => classify_message(error.to_string(), sql, timeout),
    }
}

/// ClickHouse reports a failure after the response has started by writing
/// the exception into the body, either bare or after an `__exception__`
/// marker line.
fn is_exception_line(line: &str) -> bool {
    line.starts_with("__exception__")
        || (line.starts_with("Code: ") && line.contains("DB::Exception"))
}

struct ClickHouseCursor {
    lines: Option<Lines<BytesCursor>>,
    runtime: Arc<Runtime>,
    sql: String,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    width: usize,
}

impl ClickHouseCursor {
    fn read_line(&mut self) -> Result<Option<String>, ExecutionError> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };
        let line = match (self.deadline, self.timeout) {
            (Some(deadline), Some(timeout)) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let next = self.runtime.block_on(async {
                    tokio::time::timeout(remaining, lines.next_line()).await
                });
                match next {
                    Ok(line) => line,
                    Err(_) => {
                        self.close();
                        return Err(ExecutionError::QueryTimeout {
                            sql: self.sql.clone(),
                            timeout,
                        });
                    }
                }
            }
            _ => self.runtime.block_on(lines.next_line()),
        };
        match line {
            Ok(Some(line)) => Ok(Some(line)),
            Ok(None) => {
                self.close();
                Ok(None)
            }
            Err(e) => {
                self.close();
                Err(classify_io(e, &self.sql, self.timeout))
            }
        }
    }
}

impl RowCursor for ClickHouseCursor {
    fn next_row(&mut self) -> Result<Option<Vec<Option<String>>>, ExecutionError> {
        let Some(line) = self.read_line()? else {
            return Ok(None);
        };
        if is_exception_line(&line) {
            let message = if line.starts_with("__exception__") {
                self.read_line().ok().flatten().unwrap_or(line)
            } else {
                line
            };
            self.close();
            return Err(classify_message(message, &self.sql, self.timeout));
        }
        let values = parse_tab_separated(&line);
        if self.width > 0 && values.len() != self.width {
            return Err(ExecutionError::Sql {
                sql: self.sql.clone(),
                message: format!("expected {} columns, got {}", self.width, values.len()),
            });
        }
        Ok(Some(values))
    }

    fn close(&mut self) {
        // Dropping the response aborts the HTTP request.
        self.lines = None;
    }
}

/// Splits a `TabSeparated` line into values, `\N` being NULL.
pub fn parse_tab_separated(line: &str) -> Vec<Option<String>> {
    line.split('\t')
        .map(|field| {
            if field == "\\N" {
                return None;
            }
            let mut out = String::with_capacity(field.len());
            let mut chars = field.chars();
            while let Some(c) = chars.next() {
                if c != '\\' {
                    out.push(c);
                    continue;
                }
                match chars.next() {
                    Some('t') => out.push('\t'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('b') => out.push('\u{8}'),
                    Some('f') => out.push('\u{c}'),
                    Some('0') => out.push('\0'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                }
            }
            Some(out)
        })
        .collect()
}
