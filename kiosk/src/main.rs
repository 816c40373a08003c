use std::path::PathBuf;
use std::process;

use clap::Parser;
use jukebox::prelude::*;

/// Length of every clip played by the simulated decoder.
const SIMULATED_CLIP_SECONDS: f64 = 30.0;

#[derive(Debug, Parser)]
#[command(name = "jukebox-kiosk", version, about = "Media jukebox kiosk")]
struct Args {
    /// Kiosk configuration (YAML)
    #[arg(long, default_value = "jukebox.yml")]
    config: PathBuf,

    /// Directory holding settings.json [default: user config dir]
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    #[arg(long)]
    skip_intro: bool,

    /// Scripted button presses, e.g. "120:next,121:select,400:quit"
    #[arg(long)]
    press: Option<String>,

    /// Open the configured DRM device, list its modes, allocate a scanout
    /// surface for the saved display mode and exit (needs the `kms` feature)
    #[arg(long)]
    check_display: bool,
}

fn main() {
    init_logger();
    let args = Args::parse();

    if let Err(err) = run(args) {
        error!("{}", err);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), InitError> {
    let config = KioskConfig::load_or_default(&args.config)
        .map_err(|err| InitError::new(InitStage::Config, err.to_string()))?;

    let settings_dir = args.settings.or_else(storage::config_dir);
    let settings = load_settings(settings_dir.as_ref());

    if args.check_display {
        return check_display(&config, settings.display_mode);
    }

    let library = match &config.library {
        Some(path) => Library::load(path).map_err(|err| {
            InitError::new(InitStage::Config, err.to_string())
        })?,
        None => {
            warn!("no library manifest configured");
            Library::default()
        }
    };

    let input = match &args.press {
        Some(script) => ScriptedInput::parse(script)
            .map_err(|err| InitError::new(InitStage::Config, err))?,
        None => ScriptedInput::default(),
    };

    let modes = config
        .virtual_modes
        .iter()
        .enumerate()
        .map(|(index, resolution)| (*resolution, index == 0))
        .collect();
    let mut display = DisplayHandle::new(VirtualDisplay::new(modes));
    let mode = display
        .select_mode(settings.display_mode, &config.display)
        .map_err(|err| InitError::new(InitStage::Mode, err.to_string()))?;
    let buffers = config.virtual_buffers;
    let gpu = VirtualGpu::new(mode.resolution, buffers);
    let presenter = FramePresenter::new(display, gpu);

    let orchestrator = Orchestrator::new(library, config.timings.clone())
        .with_display_mode(settings.display_mode)
        .with_volume(settings.volume)
        .with_intro_video(config.intro_video.clone());

    let frame = FrameClock::new(config.fps).frame_duration();
    let collaborators = Collaborators {
        video: Box::new(
            SimulatedVideo::new(SIMULATED_CLIP_SECONDS)
                .with_step(frame.as_secs_f64()),
        ),
        ui: Box::new(SimulatedUi::default()),
        render_context: Box::new(VirtualRenderContext::default()),
        input: Box::new(input),
        launcher: Box::new(EmulatorLauncher::new(&config.emulator)),
    };

    let (commands_tx, commands_rx) = command_channel();
    let _watch = settings_dir.as_ref().and_then(|dir| {
        match SettingsWatch::start(storage::settings_path(dir), commands_tx) {
            Ok(watch) => Some(watch),
            Err(err) => {
                warn!("settings watcher unavailable: {}", err);
                None
            }
        }
    });

    let mut runtime = Runtime::new(
        presenter,
        orchestrator,
        collaborators,
        config.display.clone(),
    )?
    .with_surface_factory(move |resolution| {
        Ok(VirtualGpu::new(resolution, buffers))
    })
    .with_fps(config.fps)
    .with_max_frames(args.frames)
    .with_commands(commands_rx)
    .with_settings_dir(settings_dir);

    runtime.start(args.skip_intro);
    runtime.run();
    Ok(())
}

#[cfg(feature = "kms")]
fn check_display(
    config: &KioskConfig,
    display_mode: DisplayMode,
) -> Result<(), InitError> {
    let presenter = jukebox::backend::kms::open_presenter(
        &config.device,
        display_mode,
        &config.display,
    )?;

    let display = presenter.display();
    let modes = display
        .device()
        .modes()
        .map_err(|err| InitError::new(InitStage::Mode, err.to_string()))?;
    for mode in &modes {
        info!(
            "{:>3}: {} @ {}Hz{}",
            mode.index,
            mode.resolution,
            mode.refresh_hz,
            if mode.preferred { " (preferred)" } else { "" }
        );
    }

    info!(
        "{} selects {}; scanout surface is {}",
        display_mode.label(),
        display.screen_size().map_or("nothing".to_string(), |size| {
            size.to_string()
        }),
        presenter.surface().resolution()
    );
    Ok(())
}

#[cfg(not(feature = "kms"))]
fn check_display(
    config: &KioskConfig,
    _display_mode: DisplayMode,
) -> Result<(), InitError> {
    Err(InitError::new(
        InitStage::Display,
        format!(
            "cannot open '{}': built without the kms feature",
            config.device.display()
        ),
    ))
}

fn load_settings(dir: Option<&PathBuf>) -> Settings {
    let Some(dir) = dir else {
        return Settings::default();
    };
    match storage::load_settings_if_exists(dir) {
        Ok(Some(settings)) => {
            info!("loaded settings from '{}'", dir.display());
            settings
        }
        Ok(None) => Settings::default(),
        Err(err) => {
            warn!("ignoring unreadable settings: {}", err);
            Settings::default()
        }
    }
}
