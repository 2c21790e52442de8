//! Console chat client.
//!
//! A listener task prints every line from the relay while the main loop
//! forwards typed lines. Typing `quit` (any case) sends it and then leaves.

use std::sync::Arc;

use relaychat_protocol::is_quit_command;
use relaychat_transport::{Connection, TcpLineConnection, TransportError};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::cli::ClientArgs;
use crate::RelayError;

type SharedOutput<O> = Arc<Mutex<O>>;

/// Runs the client against the process's stdin and stdout, reporting any
/// failure on stderr.
pub async fn run(args: ClientArgs) -> Result<(), RelayError> {
    let stdin = BufReader::new(io::stdin());
    let result = chat(&args.server, args.max_line_length, stdin, io::stdout()).await;

    match &result {
        Ok(()) => {}
        Err(RelayError::Transport(TransportError::ConnectFailed { source, .. })) => {
            eprintln!("Couldn't connect to server at {}: {source}", args.server);
            println!("Client shut down.");
        }
        Err(e) => eprintln!("Error: {e}"),
    }
    result
}

/// Connects to `addr`, then relays `input` lines to the server and server
/// lines to `output` until the user quits, `input` ends, or the server
/// closes the connection.
///
/// # Errors
/// Returns [`RelayError::Transport`] if the connection cannot be opened or
/// a line cannot be sent, and [`RelayError::Io`] if `input` or `output`
/// fails.
pub async fn chat<I, O>(
    addr: &str,
    max_line_length: usize,
    input: I,
    output: O,
) -> Result<(), RelayError>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin + Send + 'static,
{
    let conn = Arc::new(TcpLineConnection::connect(addr, max_line_length).await?);
    let output = Arc::new(Mutex::new(output));

    print_line(&output, &format!("Connected to the chat server at {addr}")).await?;
    print_line(&output, "You can start typing messages. Type 'quit' to exit.").await?;

    let mut listener = tokio::spawn(print_server_lines(Arc::clone(&conn), Arc::clone(&output)));
    let mut lines = input.lines();

    let result = loop {
        let line = tokio::select! {
            _ = &mut listener => break Ok(()),
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(RelayError::Io(e)),
        };
        if let Err(e) = conn.send(&line).await {
            break Err(e.into());
        }
        if is_quit_command(&line) {
            break print_line(&output, "Disconnecting...").await.map_err(RelayError::from);
        }
    };

    listener.abort();
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "close failed");
    }
    print_line(&output, "Client shut down.").await?;
    result
}

/// Prints server lines until the connection ends.
async fn print_server_lines<O>(conn: Arc<TcpLineConnection>, output: SharedOutput<O>)
where
    O: AsyncWrite + Unpin,
{
    loop {
        let printed = match conn.recv().await {
            Ok(Some(line)) => print_line(&output, &line).await,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "error reading from server");
                break;
            }
        };
        if let Err(e) = printed {
            tracing::warn!(error = %e, "failed to write to console");
            return;
        }
    }

    if let Err(e) = print_line(&output, "Connection to server closed.").await {
        tracing::warn!(error = %e, "failed to write to console");
    }
}

async fn print_line<O: AsyncWrite + Unpin>(output: &SharedOutput<O>, line: &str) -> io::Result<()> {
    let mut out = output.lock().await;
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}
