//! The single event loop that owns every piece of mutable state.
//!
//! Connection transitions, event decoding, registry updates and frame
//! rendering all run on one task, so no locking is needed. Observers get
//! read-only views through watch channels.

use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};
use tokio_tungstenite::tungstenite::Message;

use crate::{
    connection::transport::{self, FeatureSocket, PendingConnect},
    decode, AppConfig, Canvas, ConnectionMachine, Entropy, ParticleRegistry, RenderScheduler,
    Result, Snapshot, VisualiserConfig,
};

/// Requests coming from the controls outside of the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    Pause,
    TogglePlayback,
    /// Drops every live particle.
    Reset,
    Resize { width: f32, height: f32 },
    ToggleTheme,
    /// Starts over with a fresh retry budget.
    Reconnect,
    Shutdown,
}

pub struct Visualiser<C, E> {
    endpoint: String,
    connection: ConnectionMachine,
    registry: ParticleRegistry,
    scheduler: RenderScheduler,
    canvas: C,
    entropy: E,
    config: watch::Receiver<VisualiserConfig>,
    status_tx: watch::Sender<String>,
    particles_tx: watch::Sender<Snapshot>,
}

impl<C: Canvas, E: Entropy> Visualiser<C, E> {
    pub fn new(
        app: &AppConfig,
        config: watch::Receiver<VisualiserConfig>,
        canvas: C,
        entropy: E,
    ) -> Self {
        let connection = ConnectionMachine::new(app.retry);
        let registry = ParticleRegistry::new();
        let scheduler = RenderScheduler::new(app.frame_rate, canvas.size(), app.theme);
        let (status_tx, _) = watch::channel(connection.status().to_string());
        let (particles_tx, _) = watch::channel(registry.snapshot());

        Self {
            endpoint: app.endpoint.clone(),
            connection,
            registry,
            scheduler,
            canvas,
            entropy,
            config,
            status_tx,
            particles_tx,
        }
    }

    /// Connection status text, updated on every transition.
    pub fn subscribe_status(&self) -> watch::Receiver<String> {
        self.status_tx.subscribe()
    }

    /// Registry snapshots, published after each fully applied event.
    pub fn subscribe_particles(&self) -> watch::Receiver<Snapshot> {
        self.particles_tx.subscribe()
    }

    pub fn registry(&self) -> &ParticleRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    /// Runs until [`Command::Shutdown`] arrives or every command sender is
    /// dropped, then hands the visualiser back.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<Self> {
        let mut socket: Option<FeatureSocket> = None;
        let mut pending: Option<PendingConnect> = Some(transport::connect(&self.endpoint));
        let mut retry_at: Option<Instant> = None;
        tracing::info!(endpoint = %self.endpoint, "visualiser started");

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command.unwrap_or(Command::Shutdown) {
                    Command::Shutdown => break,
                    Command::Reconnect => {
                        socket = None;
                        retry_at = None;
                        self.connection.restart();
                        self.publish_status();
                        pending = Some(transport::connect(&self.endpoint));
                    }
                    command => self.handle_command(command),
                },

                _ = self.scheduler.next_frame() => {
                    let snapshot = self.registry.snapshot();
                    if let Err(err) = self.scheduler.draw_frame(&snapshot, &mut self.canvas) {
                        tracing::error!(%err, "failed to draw frame");
                    }
                }

                outcome = transport::finish_connect(&mut pending) => {
                    pending = None;
                    match outcome {
                        Ok(opened) => {
                            self.connection.on_open();
                            self.publish_status();
                            socket = Some(opened);
                        }
                        Err(err) => {
                            self.connection.on_error(&err);
                            retry_at = self.handle_close();
                        }
                    }
                }

                message = transport::next_message(&mut socket) => match message {
                    Some(Ok(Message::Text(payload))) => self.handle_payload(&payload),
                    Some(Ok(Message::Binary(bytes))) => {
                        tracing::warn!(len = bytes.len(), "dropping binary frame");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        self.connection.on_error(&err);
                        socket = None;
                        retry_at = self.handle_close();
                    }
                    None => {
                        socket = None;
                        retry_at = self.handle_close();
                    }
                },

                _ = transport::wait_until(retry_at) => {
                    retry_at = None;
                    if self.connection.on_retry_elapsed() {
                        self.publish_status();
                        pending = Some(transport::connect(&self.endpoint));
                    }
                }
            }
        }

        if let Some(mut socket) = socket {
            if let Err(err) = socket.close(None).await {
                tracing::debug!(%err, "feature stream did not close cleanly");
            }
        }
        tracing::info!(
            frames = self.scheduler.frames_drawn(),
            live = self.registry.len(),
            "visualiser stopped"
        );
        Ok(self)
    }

    fn handle_command(&mut self, command: Command) {
        tracing::debug!(?command, "handling command");
        match command {
            Command::Play => self.scheduler.play(),
            Command::Pause => self.scheduler.pause(),
            Command::TogglePlayback => self.scheduler.toggle(),
            Command::Reset => {
                self.registry.reset();
                self.particles_tx.send_replace(self.registry.snapshot());
            }
            Command::Resize { width, height } => {
                self.canvas.resize(width, height);
                self.scheduler.on_resize(&self.canvas);
            }
            Command::ToggleTheme => self.scheduler.toggle_theme(),
            Command::Reconnect | Command::Shutdown => {}
        }
    }

    /// Decodes and applies one inbound message. Malformed payloads are
    /// logged and dropped without touching any state.
    fn handle_payload(&mut self, payload: &str) {
        let event = match decode(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(%err, payload, "dropping malformed feature event");
                return;
            }
        };

        let config = *self.config.borrow();
        self.registry.apply_event(
            &event,
            &config,
            self.scheduler.geometry(),
            &mut self.entropy,
        );
        self.particles_tx.send_replace(self.registry.snapshot());
    }

    fn handle_close(&mut self) -> Option<Instant> {
        let delay = self.connection.on_close();
        self.publish_status();
        delay.map(|delay| Instant::now() + delay)
    }

    fn publish_status(&self) {
        let status = self.connection.status().to_string();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            tracing::info!(%status, "connection status");
            *current = status;
            true
        });
    }
}
