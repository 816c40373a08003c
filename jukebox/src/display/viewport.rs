use super::device::Resolution;
use super::mode_policy::DisplayMode;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn full(screen: Resolution) -> Self {
        Self {
            x: 0,
            y: 0,
            width: screen.width,
            height: screen.height,
        }
    }

    pub fn size(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// The rectangle video and UI are composited into. CRT output uses the whole
/// native canvas; modern TVs get a centered 4:3 box (pillarbox on wide
/// screens, letterbox on tall ones).
pub fn content_viewport(mode: DisplayMode, screen: Resolution) -> Viewport {
    match mode {
        DisplayMode::CrtNative => Viewport::full(screen),
        DisplayMode::ModernTv => centered_4_3(screen),
    }
}

fn centered_4_3(screen: Resolution) -> Viewport {
    let (w, h) = (screen.width as u64, screen.height as u64);

    if w * 3 > h * 4 {
        let width = (h * 4 / 3) as u32;
        Viewport {
            x: (screen.width - width) / 2,
            y: 0,
            width,
            height: screen.height,
        }
    } else {
        let height = (w * 3 / 4) as u32;
        Viewport {
            x: 0,
            y: (screen.height - height) / 2,
            width: screen.width,
            height,
        }
    }
}
