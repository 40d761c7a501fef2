/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX acceptor with SQLite-backed sequence numbers.
//!
//! Accepts TCP connections for one session and logs every application
//! message it receives. Sequence numbers and sent messages survive restarts.
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run -p fixgate-engine --example sqlite_acceptor
//! ```
//!
//! `FIXGATE_ADDR` and `FIXGATE_DB` override the listen address and the
//! database path.

use async_trait::async_trait;
use bytes::BytesMut;
use fixgate_core::{Message, SessionId};
use fixgate_engine::{
    Application, ChannelSender, Engine, EngineBuilder, RejectReason, SessionConfig,
};
use fixgate_store::{SqlStoreConfig, SqlStoreFactory, StoreSettings};
use fixgate_tagvalue::frame_length;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

/// Logs application traffic.
struct LoggingApplication;

#[async_trait]
impl Application for LoggingApplication {
    async fn on_create(&self, session_id: &SessionId) {
        info!(session = %session_id, "session created");
    }

    async fn on_logon(&self, session_id: &SessionId) {
        info!(session = %session_id, "logged on");
    }

    async fn on_logout(&self, session_id: &SessionId) {
        info!(session = %session_id, "logged out");
    }

    async fn to_admin(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_admin(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), RejectReason> {
        Ok(())
    }

    async fn to_app(&self, _message: &mut Message, _session_id: &SessionId) {}

    async fn from_app(&self, message: &Message, session_id: &SessionId) -> Result<(), RejectReason> {
        let msg_type = message
            .msg_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default();
        info!(session = %session_id, msg_type = %msg_type, "application message");
        Ok(())
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let addr = std::env::var("FIXGATE_ADDR").unwrap_or_else(|_| "127.0.0.1:9876".to_string());
    let db = std::env::var("FIXGATE_DB").unwrap_or_else(|_| "fixgate.db".to_string());
    let session_id = SessionId::new("FIX.4.4", "GATEWAY", "CLIENT");

    let settings = StoreSettings::new(SqlStoreConfig::sqlite(db.clone()))
        .with_session(session_id.clone(), SqlStoreConfig::sqlite(db));
    let engine = Arc::new(
        EngineBuilder::new()
            .with_application(LoggingApplication)
            .with_store_factory(SqlStoreFactory::new(settings))
            .add_session(SessionConfig::new(session_id.clone()))
            .build()?,
    );

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, session = %session_id, "acceptor listening");

    loop {
        let (socket, peer) = listener.accept().await?;
        info!(%peer, "connection accepted");
        let engine = Arc::clone(&engine);
        let session_id = session_id.clone();
        tokio::spawn(async move {
            if let Err(err) = serve(&engine, &session_id, socket).await {
                error!(%peer, error = %err, "connection failed");
            }
            info!(%peer, "connection closed");
        });
    }
}

async fn serve(
    engine: &Engine<LoggingApplication>,
    session_id: &SessionId,
    socket: TcpStream,
) -> anyhow::Result<()> {
    let (mut reader, mut writer) = socket.into_split();
    let (sender, mut outbound) = ChannelSender::channel();
    let handle = engine.start_session(session_id, Arc::new(sender)).await?;
    handle.accept().await?;
    let max_frame_size = engine
        .session_config(session_id)
        .map_or(4096, |config| config.max_message_size);

    let writer_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(err) = writer.write_all(&frame).await {
                warn!(error = %err, "write failed");
                break;
            }
        }
    });

    let mut buf = BytesMut::with_capacity(4096);
    let result: anyhow::Result<()> = loop {
        tokio::select! {
            read = reader.read_buf(&mut buf) => {
                match read {
                    Ok(0) => break Ok(()),
                    Ok(_) => {}
                    Err(err) => break Err(err.into()),
                }
                let mut failed: Option<anyhow::Error> = None;
                loop {
                    match frame_length(&buf, max_frame_size) {
                        Ok(Some(len)) => {
                            let frame = buf.split_to(len).freeze();
                            if let Err(err) = handle.inbound(frame).await {
                                failed = Some(err.into());
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            failed = Some(err.into());
                            break;
                        }
                    }
                }
                if let Some(err) = failed {
                    break Err(err);
                }
            }
            () = handle.closed() => break Ok(()),
        }
    };

    handle.shutdown().await?;
    // The writer ends once the runner drops its sender.
    let _ = writer_task.await;
    result
}
