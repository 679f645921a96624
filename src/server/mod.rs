//! TCP Server for csvdb
//!
//! This module implements a line-oriented TCP server: every line a client
//! sends is one statement, and every reply is a block of lines ended by a
//! line holding a single `.`. Body lines starting with `.` get one extra
//! leading `.` so they cannot be mistaken for the terminator.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::executor::{ExecutionEngine, QueryResult};
use crate::storage::Database;

/// Default server port
pub const DEFAULT_PORT: u16 = 7432;

/// Line that closes a connection
pub const QUIT_COMMAND: &str = "quit";

/// Line that ends every reply
pub const END_OF_RESPONSE: &str = ".";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Schema document to open
    pub schema_path: PathBuf,
    /// Directory holding the schema directory
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            schema_path: PathBuf::from("schema.json"),
            data_dir: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// Create a new server config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host address
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = path.into();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Get the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// csvdb TCP Server
pub struct Server {
    config: ServerConfig,
    db: Arc<Database>,
    /// Serializes INSERT and DELETE across connections
    write_lock: Arc<Mutex<()>>,
}

impl Server {
    /// Create a new server over an open database
    pub fn new(config: ServerConfig, db: Arc<Database>) -> Self {
        Self {
            config,
            db,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address
    pub fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.config.bind_address())?;
        info!(address = %listener.local_addr()?, "csvdb server listening");
        Ok(listener)
    }

    /// Bind and serve until the listener fails
    pub fn start(&self) -> Result<()> {
        let listener = self.bind()?;
        self.serve(listener)
    }

    /// Accept connections, one thread per client
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let engine = ExecutionEngine::new(self.db.clone());
                    let write_lock = self.write_lock.clone();
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, engine, write_lock) {
                            warn!(error = %e, "connection error");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                }
            }
        }

        Ok(())
    }
}

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    /// Comma-joined lines
    Csv,
    Json,
}

/// Handle a client connection
fn handle_connection(
    stream: TcpStream,
    engine: ExecutionEngine,
    write_lock: Arc<Mutex<()>>,
) -> Result<()> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    info!(peer = %peer_addr, "client connected");

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    let mut format = OutputFormat::Csv;

    let mut line = String::new();
    loop {
        line.clear();

        match reader.read_line(&mut line) {
            Ok(0) => {
                info!(peer = %peer_addr, "client disconnected");
                break;
            }
            Ok(_) => {
                let query = line.trim();

                if query.is_empty() {
                    continue;
                }

                if query == QUIT_COMMAND {
                    send_response(&mut writer, "Bye!\n")?;
                    info!(peer = %peer_addr, "client quit");
                    break;
                }

                // Handle special commands
                if query.starts_with('.') {
                    let response = match query {
                        ".mode json" => {
                            format = OutputFormat::Json;
                            "Output mode set to JSON\n".to_string()
                        }
                        ".mode csv" => {
                            format = OutputFormat::Csv;
                            "Output mode set to CSV\n".to_string()
                        }
                        ".tables" => {
                            format!("{}\n", engine.database().table_names().join(", "))
                        }
                        _ => format!("Unknown command: {}\n", query),
                    };
                    send_response(&mut writer, &response)?;
                    continue;
                }

                let response = execute_query(&engine, &write_lock, query, format);
                send_response(&mut writer, &response)?;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "read error");
                break;
            }
        }
    }

    Ok(())
}

/// Execute one statement and render the reply.
///
/// INSERT and DELETE run while holding `write_lock`; SELECT does not.
pub fn execute_query(
    engine: &ExecutionEngine,
    write_lock: &Mutex<()>,
    sql: &str,
    format: OutputFormat,
) -> String {
    let statement = match engine.parse(sql) {
        Ok(statement) => statement,
        Err(e) => return format_error(&e, format),
    };

    let _guard = statement
        .is_mutation()
        .then(|| write_lock.lock().unwrap_or_else(PoisonError::into_inner));

    match engine.execute(statement) {
        Ok(result) => format_result(&result, format),
        Err(e) => format_error(&e, format),
    }
}

/// Format query result for sending to client
pub fn format_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Csv => result.to_text(),
        OutputFormat::Json => {
            if let Some(ref msg) = result.message {
                return serde_json::json!({
                    "status": "success",
                    "message": msg,
                    "affected_rows": result.affected_rows
                })
                .to_string()
                    + "\n";
            }
            match serde_json::to_string(result) {
                Ok(json) => json + "\n",
                Err(e) => format_error(&Error::Json(e), format),
            }
        }
    }
}

/// Format a per-statement error
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    debug!(error = %error, "statement failed");
    match format {
        OutputFormat::Csv => format!("Error: {}\n", error),
        OutputFormat::Json => {
            serde_json::json!({
                "status": "error",
                "message": error.to_string()
            })
            .to_string()
                + "\n"
        }
    }
}

/// Frame a reply body: escape leading dots and append the terminator line
pub fn frame_response(body: &str) -> String {
    let mut framed = String::with_capacity(body.len() + 3);
    for line in body.lines() {
        if line.starts_with('.') {
            framed.push('.');
        }
        framed.push_str(line);
        framed.push('\n');
    }
    framed.push_str(END_OF_RESPONSE);
    framed.push('\n');
    framed
}

/// Read one framed reply. Returns `None` when the connection closed first.
pub fn read_response<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut body = String::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let content = line.trim_end_matches(['\r', '\n']);
        if content == END_OF_RESPONSE {
            return Ok(Some(body));
        }
        body.push_str(content.strip_prefix('.').unwrap_or(content));
        body.push('\n');
    }
}

/// Send a framed response to the client
fn send_response(writer: &mut TcpStream, message: &str) -> Result<()> {
    writer.write_all(frame_response(message).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Connect to a server
pub fn connect(host: &str, port: u16) -> Result<TcpStream> {
    let addr = format!("{}:{}", host, port);
    TcpStream::connect(&addr).map_err(Error::from)
}
