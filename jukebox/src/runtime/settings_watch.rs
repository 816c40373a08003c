use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{info, trace, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::events::{RuntimeCommand, RuntimeCommandSender};
use super::settings::Settings;

/// Watches the settings file and forwards display-mode edits made outside
/// the kiosk (e.g. over ssh) to the main loop.
pub struct SettingsWatch {
    _watcher: RecommendedWatcher,
}

impl SettingsWatch {
    pub fn start(
        path: PathBuf,
        commands: RuntimeCommandSender,
    ) -> Result<Self, notify::Error> {
        let initial = read_settings(&path).ok();
        let last_hash = Arc::new(Mutex::new(initial.as_ref().map(|s| s.0)));
        let last_mode = Arc::new(Mutex::new(initial.map(|s| s.1.display_mode)));
        let settings_path = path.clone();
        let watch_dir = settings_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        if let Err(err) = fs::create_dir_all(&watch_dir) {
            warn!("cannot create '{}': {}", watch_dir.display(), err);
        }
        info!("watching settings file '{}'", settings_path.display());

        let mut watcher = notify::recommended_watcher(move |result| {
            let event: Event = match result {
                Ok(event) => event,
                Err(err) => {
                    warn!("settings watcher failed: {}", err);
                    return;
                }
            };

            if !settings_changed(&event, &settings_path) {
                return;
            }

            let (hash, settings) = match read_settings(&settings_path) {
                Ok(read) => read,
                Err(err) => {
                    trace!("settings not readable yet: {}", err);
                    return;
                }
            };

            if let Ok(mut guard) = last_hash.lock() {
                if *guard == Some(hash) {
                    return;
                }
                *guard = Some(hash);
            }

            if let Ok(mut guard) = last_mode.lock() {
                if *guard == Some(settings.display_mode) {
                    return;
                }
                *guard = Some(settings.display_mode);
            }

            info!("settings file changed display mode");
            if commands
                .send(RuntimeCommand::DisplayModeChanged(settings.display_mode))
                .is_err()
            {
                trace!("runtime gone; dropping settings change");
            }
        })?;

        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        Ok(Self { _watcher: watcher })
    }
}

fn read_settings(path: &Path) -> Result<(u64, Settings), String> {
    let bytes = fs::read(path).map_err(|err| err.to_string())?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    let settings = serde_json::from_slice::<Settings>(&bytes)
        .map_err(|err| err.to_string())?;
    Ok((hasher.finish(), settings))
}

fn settings_changed(event: &Event, target: &Path) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }

    if event.paths.is_empty() {
        return true;
    }

    event
        .paths
        .iter()
        .any(|path| path == target || path.file_name() == target.file_name())
}
