//! csvdb - TCP client
//!
//! Forwards each typed line to a `csvdb-server` and prints the reply.

use std::io::{BufReader, Write};

use anyhow::{Context, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use csvdb::server::{connect, read_response, DEFAULT_PORT, QUIT_COMMAND};

/// Interactive csvdb client
#[derive(Parser, Debug)]
#[command(name = "csvdb-client", version, about = "Talk to a csvdb server")]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "CSVDB_HOST")]
    host: String,

    /// Server port
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT, env = "CSVDB_PORT")]
    port: u16,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let stream = connect(&args.host, args.port)
        .with_context(|| format!("Failed to connect to {}:{}", args.host, args.port))?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    println!("Connected to {}:{}", args.host, args.port);

    let mut editor = DefaultEditor::new().context("Failed to initialize line editor")?;
    let prompt = format!("{}:{}> ", args.host, args.port);

    loop {
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => QUIT_COMMAND.to_string(),
            Err(e) => return Err(e).context("Failed to read input"),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        writeln!(writer, "{}", line).context("Failed to send statement")?;
        writer.flush()?;

        match read_response(&mut reader).context("Failed to read reply")? {
            Some(reply) => print!("{}", reply),
            None => {
                eprintln!("Server closed the connection");
                break;
            }
        }

        if line == QUIT_COMMAND {
            break;
        }
    }

    Ok(())
}
