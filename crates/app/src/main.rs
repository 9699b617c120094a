use std::path::PathBuf;

use clap::Parser;
use pulse_visualiser_core::{
    AppConfig, Canvas, CanvasGeometry, Command, FrameRecorder, RngEntropy, SvgCanvas, Theme,
    Visualiser, VisualiserConfig, VisualiserError,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, watch},
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> pulse_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    tracing::info!(
        endpoint = %config.endpoint,
        max_shapes = config.visuals.max_shapes,
        frame_rate = config.frame_rate,
        headless = cli.headless,
        "starting visualiser"
    );

    if cli.headless {
        let canvas = FrameRecorder::new(config.canvas);
        let visualiser = run(&config, canvas).await?;
        tracing::info!(
            frames = visualiser.canvas().frames_presented(),
            "headless run finished"
        );
        return Ok(());
    }

    let visualiser = run(&config, SvgCanvas::new(config.canvas)).await?;
    if let Some(path) = &cli.svg_out {
        match visualiser.canvas().write_to(path) {
            Ok(()) => tracing::info!(path = %path.display(), "wrote last frame"),
            Err(err) => tracing::warn!(%err, path = %path.display(), "could not write last frame"),
        }
    }
    Ok(())
}

async fn run<C: Canvas>(
    config: &AppConfig,
    canvas: C,
) -> pulse_visualiser_core::Result<Visualiser<C, RngEntropy>> {
    let (settings_tx, settings_rx) = watch::channel(config.visuals);
    let entropy = match config.seed {
        Some(seed) => RngEntropy::seeded(seed),
        None => RngEntropy::from_os(),
    };
    let visualiser = Visualiser::new(config, settings_rx, canvas, entropy);

    let mut status = visualiser.subscribe_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let text = status.borrow_and_update().clone();
            println!("{text}");
        }
    });

    let (commands_tx, commands_rx) = mpsc::channel(32);
    tokio::spawn(read_controls(commands_tx.clone(), settings_tx));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            let _ = commands_tx.send(Command::Shutdown).await;
        }
    });

    visualiser.run(commands_rx).await
}

/// Stdin stands in for the on-screen controls.
async fn read_controls(
    commands: mpsc::Sender<Command>,
    settings: watch::Sender<VisualiserConfig>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(%err, "failed to read controls");
                break;
            }
        };
        let control = match parse_control(&line) {
            Ok(Some(control)) => control,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(%err, "ignoring control");
                continue;
            }
        };
        match control {
            Control::Command(command) => {
                let shutdown = command == Command::Shutdown;
                if commands.send(command).await.is_err() || shutdown {
                    break;
                }
            }
            Control::Setting(apply) => {
                settings.send_modify(apply);
                tracing::info!(settings = ?*settings.borrow(), "settings updated");
            }
        }
    }
}

enum Control {
    Command(Command),
    Setting(Box<dyn FnOnce(&mut VisualiserConfig) + Send>),
}

fn parse_control(line: &str) -> pulse_visualiser_core::Result<Option<Control>> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };
    let mut number = |name: &str| -> pulse_visualiser_core::Result<f32> {
        let raw = parts
            .next()
            .ok_or_else(|| VisualiserError::msg(format!("`{name}` needs a value")))?;
        match raw.parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(format!("`{raw}` is not a finite number").into()),
        }
    };

    let control = match word {
        "play" => Control::Command(Command::Play),
        "pause" => Control::Command(Command::Pause),
        "toggle" => Control::Command(Command::TogglePlayback),
        "reset" => Control::Command(Command::Reset),
        "theme" => Control::Command(Command::ToggleTheme),
        "reconnect" => Control::Command(Command::Reconnect),
        "quit" | "exit" => Control::Command(Command::Shutdown),
        "resize" => {
            let width = number("resize")?;
            let height = number("resize")?;
            if width <= 0.0 || height <= 0.0 {
                return Err(format!("cannot resize to {width}x{height}").into());
            }
            Control::Command(Command::Resize { width, height })
        }
        "rhythm" => {
            let value = number("rhythm")?;
            Control::Setting(Box::new(move |config: &mut VisualiserConfig| {
                config.set_rhythm_factor(value)
            }))
        }
        "decay" => {
            let value = number("decay")?;
            Control::Setting(Box::new(move |config: &mut VisualiserConfig| {
                config.set_decay_rate(value)
            }))
        }
        "max" => {
            let value = number("max")?.max(0.0).round() as usize;
            Control::Setting(Box::new(move |config: &mut VisualiserConfig| {
                config.set_max_shapes(value)
            }))
        }
        other => return Err(format!("unknown control `{other}`").into()),
    };
    Ok(Some(control))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive particle visualiser", long_about = None)]
struct Cli {
    /// JSON configuration file; flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// WebSocket address of the feature backend.
    #[arg(short, long)]
    endpoint: Option<String>,
    #[arg(long)]
    rhythm_factor: Option<f32>,
    #[arg(long)]
    decay_rate: Option<f32>,
    #[arg(long)]
    max_shapes: Option<usize>,
    #[arg(long)]
    width: Option<f32>,
    #[arg(long)]
    height: Option<f32>,
    /// Frames per second while playing.
    #[arg(long)]
    fps: Option<u32>,
    /// Seed for reproducible particle placement.
    #[arg(long)]
    seed: Option<u64>,
    /// Start with the light theme.
    #[arg(long)]
    light: bool,
    /// Write the last rendered frame to this SVG file on exit.
    #[arg(long, conflicts_with = "headless")]
    svg_out: Option<PathBuf>,
    /// Render into an in-memory recorder and write no output.
    #[arg(long)]
    headless: bool,
}

impl Cli {
    fn resolve_config(&self) -> pulse_visualiser_core::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(value) = self.rhythm_factor {
            config.visuals.rhythm_factor = value;
        }
        if let Some(value) = self.decay_rate {
            config.visuals.decay_rate = value;
        }
        if let Some(value) = self.max_shapes {
            config.visuals.max_shapes = value;
        }
        let CanvasGeometry { width, height } = config.canvas;
        config.canvas = CanvasGeometry::new(
            self.width.unwrap_or(width),
            self.height.unwrap_or(height),
        );
        if let Some(fps) = self.fps {
            config.frame_rate = fps;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.light {
            config.theme = Theme::Light;
        }

        config.visuals = config.visuals.clamped();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> Command {
        match parse_control(line).unwrap() {
            Some(Control::Command(command)) => command,
            _ => panic!("`{line}` is not a command"),
        }
    }

    #[test]
    fn parses_playback_commands() {
        assert_eq!(command("pause"), Command::Pause);
        assert_eq!(command("  play "), Command::Play);
        assert_eq!(command("quit"), Command::Shutdown);
        assert_eq!(
            command("resize 1024 768"),
            Command::Resize {
                width: 1024.0,
                height: 768.0
            }
        );
    }

    #[test]
    fn settings_clamp_through_config() {
        let mut config = VisualiserConfig::default();
        match parse_control("decay 2").unwrap() {
            Some(Control::Setting(apply)) => apply(&mut config),
            _ => panic!("expected a setting"),
        }
        assert_eq!(config.decay_rate, 0.999);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_control("").unwrap().is_none());
        assert!(parse_control("resize 10").is_err());
        assert!(parse_control("rhythm fast").is_err());
        assert!(parse_control("explode").is_err());
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert!(parse_control("resize -5 10").is_err());
        assert!(parse_control("resize 0 10").is_err());
        assert!(parse_control("resize 640 -1").is_err());
        assert!(parse_control("resize NaN 10").is_err());
        assert!(parse_control("resize 640 inf").is_err());
    }

    #[test]
    fn rejects_non_finite_settings() {
        assert!(parse_control("decay NaN").is_err());
        assert!(parse_control("rhythm inf").is_err());
        assert!(parse_control("max -inf").is_err());
    }

    #[test]
    fn non_finite_flags_fall_back_to_defaults() {
        let cli = Cli::parse_from([
            "pulse-visualiser",
            "--decay-rate",
            "NaN",
            "--rhythm-factor",
            "inf",
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.visuals, VisualiserConfig::default());
    }

    #[test]
    fn headless_flag_is_parsed() {
        let cli = Cli::parse_from(["pulse-visualiser", "--headless", "--fps", "30"]);
        assert!(cli.headless);
        assert!(cli.svg_out.is_none());
        assert_eq!(cli.resolve_config().unwrap().frame_rate, 30);

        assert!(!Cli::parse_from(["pulse-visualiser"]).headless);
        assert!(Cli::try_parse_from([
            "pulse-visualiser",
            "--headless",
            "--svg-out",
            "frame.svg"
        ])
        .is_err());
    }

    #[test]
    fn flags_override_defaults_and_clamp() {
        let cli = Cli::parse_from([
            "pulse-visualiser",
            "--endpoint",
            "ws://127.0.0.1:9001",
            "--max-shapes",
            "500",
            "--width",
            "1280",
            "--light",
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.endpoint, "ws://127.0.0.1:9001");
        assert_eq!(config.visuals.max_shapes, 200);
        assert_eq!(config.canvas, CanvasGeometry::new(1280.0, 600.0));
        assert_eq!(config.theme, Theme::Light);
    }
}
