//! Line-delimited JSON host over a pair of byte streams.
//!
//! Each request line is handled on its own task so a long `extractAudio`
//! never blocks `cancelExport`. Replies and job events go through a single
//! writer task, one JSON object per line.

pub mod handlers;
pub mod protocol;

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::state::AppState;

/// Serialized lines waiting for the writer task.
pub type Outbox = mpsc::UnboundedSender<String>;

/// Serve requests from `reader` until it reaches EOF, then wait for in-flight
/// requests and jobs to finish. Returns the writer once everything is flushed.
pub async fn serve<R, W>(state: Arc<AppState>, reader: R, writer: W) -> std::io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbox, rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(write_lines(rx, writer));

    let mut requests = JoinSet::new();
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if state.is_shutdown() {
            tracing::info!("shutting down, ignoring further requests");
            break;
        }
        requests.spawn(handlers::handle_line(state.clone(), line.to_string(), outbox.clone()));

        // Reap finished request tasks as we go.
        while let Some(done) = requests.try_join_next() {
            if let Err(e) = done {
                tracing::error!(error = %e, "request task failed");
            }
        }
    }

    tracing::debug!(pending = requests.len(), "input closed, waiting for pending requests");
    while let Some(done) = requests.join_next().await {
        if let Err(e) = done {
            tracing::error!(error = %e, "request task failed");
        }
    }
    drop(outbox);

    writer_task
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
}

async fn write_lines<W>(mut rx: mpsc::UnboundedReceiver<String>, mut writer: W) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Service;
    use crate::config::AppConfig;
    use crate::export::{ExportBackend, ExportContext, ExportRequest};
    use serde_json::Value;
    use std::path::PathBuf;
    use std::time::Duration;

    /// Renders until cancelled.
    struct StubbornBackend;

    impl ExportBackend for StubbornBackend {
        fn render(&self, _request: &ExportRequest, ctx: &ExportContext) -> crate::Result<PathBuf> {
            loop {
                ctx.check_cancelled()?;
                std::thread::sleep(Duration::from_millis(2));
            }
        }

        fn name(&self) -> &str {
            "stubborn"
        }
    }

    fn state() -> Arc<AppState> {
        let config = AppConfig::default();
        Arc::new(AppState::new(
            Service::with_backend(&config, Arc::new(StubbornBackend)),
            config,
        ))
    }

    fn parse(out: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(out)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_serve_replies_per_line() {
        let input = b"{\"id\":1,\"method\":\"nope\"}\n\n{\"id\":2,\"method\":\"extractAudio\",\"params\":{}}\n";
        let out = serve(state(), &input[..], Vec::new()).await.unwrap();
        let mut ids: Vec<i64> = parse(&out).iter().map(|v| v["id"].as_i64().unwrap()).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_serve_cancel_running_job() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, mut client_write) = tokio::io::split(client);
        let host = tokio::spawn(serve(
            state(),
            tokio::io::BufReader::new(server_read),
            server_write,
        ));

        client_write
            .write_all(
                b"{\"id\":1,\"method\":\"mergeSubtitles\",\"params\":{\"videoPath\":\"/in.mp4\",\"outputPath\":\"/out.mp4\",\"cues\":[]}}\n",
            )
            .await
            .unwrap();

        let mut replies = tokio::io::BufReader::new(client_read).lines();
        let started: Value = serde_json::from_str(&replies.next_line().await.unwrap().unwrap()).unwrap();
        let job_id = started["result"]["jobId"].as_str().unwrap().to_string();

        let cancel = format!(
            "{{\"id\":2,\"method\":\"cancelExport\",\"params\":{{\"jobId\":\"{}\"}}}}\n",
            job_id
        );
        client_write.write_all(cancel.as_bytes()).await.unwrap();
        client_write.shutdown().await.unwrap();

        let mut saw_cancel_reply = false;
        let mut terminal = None;
        while !(saw_cancel_reply && terminal.is_some()) {
            let line = replies.next_line().await.unwrap().unwrap();
            let v: Value = serde_json::from_str(&line).unwrap();
            if v["id"] == 2 {
                assert_eq!(v["result"]["cancelled"], true);
                saw_cancel_reply = true;
            }
            if v["event"] == "error" {
                terminal = Some(v);
            }
        }
        assert!(saw_cancel_reply);
        let terminal = terminal.unwrap();
        assert_eq!(terminal["code"], "EXPORT_CANCELLED");
        assert_eq!(terminal["jobId"], job_id.as_str());
        host.await.unwrap().unwrap();
    }
}
