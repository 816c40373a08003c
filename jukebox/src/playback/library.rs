use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use rand::Rng;
use serde::Deserialize;

pub const MASTER_SHUFFLE_NAME: &str = "Master Shuffle";

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PlaylistItem {
    pub title: String,
    pub path: PathBuf,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Playlist {
    pub name: String,
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    #[serde(skip)]
    synthetic: bool,
}

impl Playlist {
    pub fn new(name: impl Into<String>, items: Vec<PlaylistItem>) -> Self {
        Self {
            name: name.into(),
            items,
            synthetic: false,
        }
    }

    /// The master-shuffle entry has no files of its own.
    pub fn master_shuffle() -> Self {
        Self {
            name: MASTER_SHUFFLE_NAME.to_string(),
            items: Vec::new(),
            synthetic: true,
        }
    }

    pub fn is_master_shuffle(&self) -> bool {
        self.synthetic
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GameEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Playlists and games as described by the library manifest (yaml).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Library {
    #[serde(default)]
    pub playlists: Vec<Playlist>,
    #[serde(default)]
    pub games: Vec<GameEntry>,
}

impl Library {
    pub fn new(playlists: Vec<Playlist>, games: Vec<GameEntry>) -> Self {
        Self { playlists, games }
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let yaml = fs::read_to_string(path)?;
        let library = Self::parse(&yaml)?;
        info!(
            "loaded library '{}': {} playlists, {} games",
            path.display(),
            library.playlists.len(),
            library.games.len()
        );
        Ok(library)
    }

    pub fn parse(yaml: &str) -> Result<Self, Box<dyn Error>> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Prepends the master-shuffle pseudo-playlist. Idempotent.
    pub fn with_master_shuffle(mut self) -> Self {
        let present = self
            .playlists
            .first()
            .is_some_and(|playlist| playlist.is_master_shuffle());
        if !present {
            self.playlists.insert(0, Playlist::master_shuffle());
        }
        self
    }

    pub fn item(
        &self,
        playlist_index: usize,
        item_index: usize,
    ) -> Option<&PlaylistItem> {
        self.playlists.get(playlist_index)?.items.get(item_index)
    }

    pub fn total_items(&self) -> usize {
        self.playlists.iter().map(|p| p.items.len()).sum()
    }

    /// Uniform pick across every real item. Avoids `exclude` unless it is the
    /// only item in the library.
    pub fn random_item<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        exclude: Option<(usize, usize)>,
    ) -> Option<(usize, usize)> {
        let candidates: Vec<(usize, usize)> = self
            .playlists
            .iter()
            .enumerate()
            .filter(|(_, playlist)| !playlist.is_master_shuffle())
            .flat_map(|(p, playlist)| {
                (0..playlist.items.len()).map(move |i| (p, i))
            })
            .collect();

        let filtered: Vec<(usize, usize)> = candidates
            .iter()
            .copied()
            .filter(|candidate| Some(*candidate) != exclude)
            .collect();

        let pool = if filtered.is_empty() {
            &candidates
        } else {
            &filtered
        };

        if pool.is_empty() {
            return None;
        }

        Some(pool[rng.random_range(0..pool.len())])
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const MANIFEST: &str = r#"
playlists:
  - name: Cartoons
    items:
      - title: Intro Toons
        path: /media/toons/01.mp4
      - title: More Toons
        path: /media/toons/02.mp4
  - name: Music
    items:
      - title: Song
        path: /media/music/01.mp4
games:
  - name: Pinball
    path: /roms/pinball.sfc
"#;

    #[test]
    fn parses_manifest() {
        let library = Library::parse(MANIFEST).unwrap();
        assert_eq!(library.playlists.len(), 2);
        assert_eq!(library.playlists[0].items[1].title, "More Toons");
        assert_eq!(library.games[0].name, "Pinball");
        assert_eq!(library.total_items(), 3);
    }

    #[test]
    fn master_shuffle_is_prepended_once() {
        let library = Library::parse(MANIFEST)
            .unwrap()
            .with_master_shuffle()
            .with_master_shuffle();
        assert_eq!(library.playlists.len(), 3);
        assert!(library.playlists[0].is_master_shuffle());
        assert!(library.playlists[0].items.is_empty());
        assert_eq!(library.playlists[1].name, "Cartoons");
    }

    #[test]
    fn random_item_never_picks_master_shuffle_or_excluded() {
        let library = Library::parse(MANIFEST).unwrap().with_master_shuffle();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let pick = library.random_item(&mut rng, Some((1, 0))).unwrap();
            assert_ne!(pick.0, 0);
            assert_ne!(pick, (1, 0));
            assert!(library.item(pick.0, pick.1).is_some());
        }
    }

    #[test]
    fn random_item_with_single_entry_repeats_it() {
        let library = Library::new(
            vec![Playlist::new(
                "Solo",
                vec![PlaylistItem {
                    title: "Only".to_string(),
                    path: PathBuf::from("/only.mp4"),
                }],
            )],
            vec![],
        );
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(library.random_item(&mut rng, Some((0, 0))), Some((0, 0)));
    }
}
