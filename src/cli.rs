//! A thin line-oriented command shell over the node's put/get API.
//!
//! Three commands: `put <text>`, `get <40-hex-key>`, `exit`. This shell owns
//! no DHT state and performs no validation beyond what the core already does
//! at its boundary (SPEC_FULL §6b).

use kadnode::node::Node;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

pub async fn run(node: &Node) -> io::Result<()> {
    let stdin = io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        match command {
            "put" => handle_put(node, rest, &mut stdout).await?,
            "get" => handle_get(node, rest, &mut stdout).await?,
            "exit" => break,
            _ => {
                stdout.write_all(b"ERR\n").await?;
            }
        }
    }

    Ok(())
}

async fn handle_put(node: &Node, value: &str, stdout: &mut io::Stdout) -> io::Result<()> {
    match node.put(value.as_bytes()).await {
        Ok(key_hex) => {
            stdout.write_all(key_hex.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
        Err(e) => {
            log::warn!("put failed: {e}");
            stdout.write_all(b"ERR\n").await?;
        }
    }
    Ok(())
}

async fn handle_get(node: &Node, key_hex: &str, stdout: &mut io::Stdout) -> io::Result<()> {
    match node.get(key_hex).await {
        Ok(Some((value, responder))) => {
            stdout.write_all(&value).await?;
            stdout.write_all(b"\n").await?;
            stdout
                .write_all(format!("from {}\n", responder.address).as_bytes())
                .await?;
        }
        Ok(None) => {
            stdout.write_all(b"NOTFOUND\n").await?;
        }
        Err(e) => {
            log::debug!("get rejected: {e}");
            stdout.write_all(b"ERR\n").await?;
        }
    }
    Ok(())
}
