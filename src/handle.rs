use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::config::NodeConfig;
use crate::node::{Node, Sockets};
use crate::output::LightOutput;

/// A running node.
///
/// All sockets, timers and transitions are served by one worker thread with
/// a single-threaded runtime, so node state is never touched concurrently.
/// Dropping the handle stops the worker and waits for it.
pub struct Handle {
    thread: Option<std::thread::JoinHandle<()>>,
    shutdown: Option<oneshot::Sender<()>>,
    connected: Arc<AtomicBool>,
    session_addr: SocketAddr,
    command_addr: SocketAddr,
}

impl Handle {
    /// Binds both sockets and starts the worker. Bind and registration errors
    /// are returned here rather than inside the worker.
    pub fn spawn<O: LightOutput>(config: &NodeConfig, output: O) -> anyhow::Result<Handle> {
        let node = Node::new(config, output).context("invalid node configuration")?;

        let session = UdpSocket::bind(config.session_addr())
            .with_context(|| format!("failed to bind session socket {}", config.session_addr()))?;
        let command = UdpSocket::bind(config.command_addr())
            .with_context(|| format!("failed to bind command socket {}", config.command_addr()))?;
        let session_addr = session.local_addr()?;
        let command_addr = command.local_addr()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build runtime")?;

        // Registration needs the runtime's reactor but not a running runtime.
        let sockets = {
            let _guard = runtime.enter();
            Sockets::from_std(session, command).context("failed to register sockets")?
        };

        let connected = node.connected_flag();
        let (tx, rx) = oneshot::channel();
        let name = config.name.clone();
        let thread = std::thread::Builder::new()
            .name(format!("lightnode-{}", name))
            .spawn(move || {
                runtime.block_on(node.run(sockets, rx));
            })
            .context("failed to spawn node thread")?;

        info!(
            node = %name,
            session = %session_addr,
            command = %command_addr,
            "node listening"
        );
        return Ok(Handle {
            thread: Some(thread),
            shutdown: Some(tx),
            connected,
            session_addr,
            command_addr,
        });
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn session_addr(&self) -> SocketAddr {
        self.session_addr
    }

    pub fn command_addr(&self) -> SocketAddr {
        self.command_addr
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        // The "option dance": join needs the JoinHandle by value.
        if let Some(thread) = self.thread.take() {
            if let Err(err) = thread.join() {
                error!("error while joining node thread: {:?}", err);
            }
        }
    }
}
