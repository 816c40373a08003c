use std::process::Command;

use log::info;

use crate::config::EmulatorConfig;
use crate::playback::library::GameEntry;

/// Runs a game to completion. The display must already be released; the
/// call blocks until the external process exits.
pub trait GameLauncher {
    fn launch(&mut self, game: &GameEntry) -> Result<(), String>;
}

#[derive(Clone, Debug)]
pub struct EmulatorLauncher {
    command: String,
    args: Vec<String>,
}

impl EmulatorLauncher {
    pub fn new(config: &EmulatorConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    fn build(&self, game: &GameEntry) -> Command {
        let mut command = Command::new(&self.command);
        command.args(&self.args).arg(&game.path);
        command
    }
}

impl GameLauncher for EmulatorLauncher {
    fn launch(&mut self, game: &GameEntry) -> Result<(), String> {
        if self.command.trim().is_empty() {
            return Err("no emulator command configured".to_string());
        }

        info!("starting {} for '{}'", self.command, game.name);
        let status = self
            .build(game)
            .status()
            .map_err(|err| {
                format!("failed to start {}: {}", self.command, err)
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with {}", self.command, status))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn game() -> GameEntry {
        GameEntry {
            name: "Pong".to_string(),
            path: PathBuf::from("/roms/pong.bin"),
        }
    }

    #[test]
    fn appends_game_path_to_args() {
        let launcher = EmulatorLauncher::new(&EmulatorConfig {
            command: "emu".to_string(),
            args: vec!["--fullscreen".to_string()],
        });
        let command = launcher.build(&game());
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(command.get_program(), "emu");
        assert_eq!(args, vec!["--fullscreen", "/roms/pong.bin"]);
    }

    #[test]
    fn missing_command_is_an_error() {
        let mut launcher = EmulatorLauncher::new(&EmulatorConfig::default());
        assert!(launcher.launch(&game()).is_err());
    }
}
