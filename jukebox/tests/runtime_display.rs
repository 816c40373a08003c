mod support;

use jukebox::backend::virtual_display::DisplayOp;
use jukebox::display::FramebufferId;
use jukebox::prelude::*;
use serial_test::serial;

use support::Harness;

#[test]
fn first_frame_is_shown_with_a_modeset() {
    let h = Harness::started();
    let display = h.display();

    assert_eq!(h.runtime.frames(), 1);
    assert_eq!(display.modeset_count(), 1);
    assert_eq!(display.page_flip_count(), 2);

    let first_submit = display.ops().iter().find(|op| {
        matches!(op, DisplayOp::SetCrtc(..) | DisplayOp::PageFlip(_))
    });
    assert!(matches!(
        first_submit,
        Some(DisplayOp::SetCrtc(_, resolution))
            if *resolution == Resolution::new(1920, 1080)
    ));

    let context = h.context.borrow();
    assert_eq!(context.black_clears, 3);
    assert_eq!(context.swaps, 3);
    assert_eq!(h.runtime.viewport().size(), Resolution::new(1920, 1080));
}

#[test]
#[serial]
fn settings_menu_switches_to_modern_tv_and_saves() {
    let dir = support::temp_dir("display-mode");
    let mut h = Harness::builder()
        .settings_dir(dir.clone())
        .build()
        .start();
    let modesets = h.modesets();

    h.press(Action::Menu);
    assert_eq!(h.modesets(), modesets);

    h.press(Action::Select);
    assert_eq!(
        h.runtime.orchestrator().display_mode(),
        DisplayMode::ModernTv
    );
    assert_eq!(h.modesets(), modesets + 1);

    let viewport = h.runtime.viewport();
    assert_eq!((viewport.x, viewport.y), (240, 0));
    assert_eq!(viewport.size(), Resolution::new(1440, 1080));

    let ui = h.ui.borrow();
    assert_eq!(ui.bezel_count(), 1);
    assert_eq!(ui.last_render().map(|(_, v, _)| *v), Some(viewport));
    drop(ui);

    let saved = storage::load_settings(&dir).expect("settings saved");
    assert_eq!(saved.display_mode, DisplayMode::ModernTv);
    assert_eq!(saved.volume, 100.0);
}

#[test]
fn external_mode_change_is_applied_on_the_next_tick() {
    let (commands, commands_rx) = command_channel();
    let (events_tx, events) = event_channel();
    let mut h = Harness::builder()
        .commands(commands_rx)
        .events(events_tx)
        .build()
        .start();
    let modesets = h.modesets();

    commands
        .send(RuntimeCommand::DisplayModeChanged(DisplayMode::CrtNative))
        .unwrap();
    commands
        .send(RuntimeCommand::DisplayModeChanged(DisplayMode::ModernTv))
        .unwrap();
    h.tick();

    let applied: Vec<_> = events
        .try_iter()
        .filter(|event| matches!(event, RuntimeEvent::DisplayModeApplied(_)))
        .collect();
    assert_eq!(
        applied,
        vec![RuntimeEvent::DisplayModeApplied(DisplayMode::ModernTv)]
    );
    assert_eq!(h.runtime.viewport().width, 1440);
    assert_eq!(h.modesets(), modesets + 1);
}

#[test]
fn game_launch_hands_off_and_recovers_the_display() {
    let (events_tx, events) = event_channel();
    let mut h = Harness::builder().events(events_tx).build().start();

    h.press(Action::Menu);
    h.press(Action::Next);
    h.press(Action::Next);
    h.press(Action::Select);
    h.press(Action::Next);
    h.press(Action::Select);

    assert_eq!(h.launcher.launched(), vec!["Pinball".to_string()]);
    assert!(!h.display().is_master());
    assert!(!h.runtime.presenter().display().has_master());
    assert_eq!(h.display().ops().last(), Some(&DisplayOp::ReleaseMaster));

    let modesets = h.modesets();
    h.tick();

    assert!(h.display().is_master());
    assert!(h.modesets() > modesets);
    let state = h.runtime.presenter().state();
    assert!(state.forced_modeset_frames_remaining() > 0);

    let release = h
        .display()
        .ops()
        .iter()
        .position(|op| *op == DisplayOp::ReleaseMaster)
        .unwrap();
    assert_eq!(h.display().ops()[release + 1], DisplayOp::AcquireMaster);

    let video = h.video.borrow();
    assert_eq!(video.invalidations(), 1);
    assert_eq!(video.init_count(), 2);
    assert!(video.is_initialized());
    let ui = h.ui.borrow();
    assert_eq!(ui.invalidations(), 1);
    assert!(ui.is_initialized());

    let events: Vec<_> = events.try_iter().collect();
    let exited = events
        .iter()
        .position(|e| *e == RuntimeEvent::GameExited("Pinball".to_string()))
        .unwrap();
    let reset = events
        .iter()
        .position(|e| *e == RuntimeEvent::DisplayReset)
        .unwrap();
    assert!(exited < reset);
}

#[test]
fn handoff_waits_until_master_is_available() {
    let mut h = Harness::started();
    h.runtime
        .presenter_mut()
        .display_mut()
        .release_master()
        .unwrap();
    h.runtime
        .presenter_mut()
        .display_mut()
        .device_mut()
        .fail_acquire_master = true;
    h.runtime.request_display_reset();

    h.tick();
    assert!(!h.runtime.presenter().display().has_master());
    assert_eq!(h.video.borrow().invalidations(), 0);

    h.runtime
        .presenter_mut()
        .display_mut()
        .device_mut()
        .fail_acquire_master = false;
    h.tick();
    assert!(h.runtime.presenter().display().has_master());
    assert_eq!(h.video.borrow().invalidations(), 1);
}

fn last_modeset(h: &Harness) -> (FramebufferId, Resolution) {
    h.display()
        .ops()
        .iter()
        .rev()
        .find_map(|op| match op {
            DisplayOp::SetCrtc(framebuffer, resolution) => {
                Some((*framebuffer, *resolution))
            }
            _ => None,
        })
        .expect("a modeset was issued")
}

fn small_preferred_modes() -> Vec<(Resolution, bool)> {
    vec![
        (Resolution::new(1280, 720), true),
        (Resolution::new(1920, 1080), false),
    ]
}

#[test]
fn mode_change_to_a_larger_resolution_rebuilds_the_surface() {
    let mut h = Harness::builder()
        .modes(small_preferred_modes())
        .resizable()
        .build()
        .start();
    assert_eq!(h.surface_size(), Resolution::new(1280, 720));

    h.press(Action::Menu);
    h.press(Action::Select);
    assert_eq!(
        h.runtime.orchestrator().display_mode(),
        DisplayMode::ModernTv
    );
    h.ticks(2);

    let (framebuffer, resolution) = last_modeset(&h);
    assert_eq!(resolution, Resolution::new(1920, 1080));
    assert_eq!(
        h.display().framebuffer_size(framebuffer),
        Some(Resolution::new(1920, 1080))
    );
    assert_eq!(h.surface_size(), Resolution::new(1920, 1080));
    assert_eq!(h.display().scanout_size(), Some(h.surface_size()));
    assert_eq!(h.runtime.viewport().size(), Resolution::new(1440, 1080));

    // And back down again.
    h.press(Action::Select);
    h.ticks(2);
    let (framebuffer, resolution) = last_modeset(&h);
    assert_eq!(resolution, Resolution::new(1280, 720));
    assert_eq!(
        h.display().framebuffer_size(framebuffer),
        Some(Resolution::new(1280, 720))
    );
    assert!(h.runtime.presenter().state().current_framebuffer().is_some());
}

#[test]
fn without_a_surface_factory_the_mode_follows_the_surface() {
    let mut h = Harness::builder()
        .modes(small_preferred_modes())
        .build()
        .start();

    h.press(Action::Menu);
    h.press(Action::Select);
    h.ticks(2);

    let (framebuffer, resolution) = last_modeset(&h);
    assert_eq!(resolution, Resolution::new(1280, 720));
    assert_eq!(
        h.display().framebuffer_size(framebuffer),
        Some(Resolution::new(1280, 720))
    );
    assert_eq!(h.surface_size(), Resolution::new(1280, 720));
    assert_eq!(h.runtime.viewport().size(), Resolution::new(960, 720));
}

#[test]
fn runtime_refuses_a_surface_that_does_not_fit_the_mode() {
    let presenter = FramePresenter::new(
        DisplayHandle::new(VirtualDisplay::new(small_preferred_modes())),
        VirtualGpu::new(Resolution::new(1920, 1080), 3),
    );
    let collaborators = Collaborators {
        video: Box::new(SimulatedVideo::new(30.0)),
        ui: Box::new(SimulatedUi::default()),
        render_context: Box::new(VirtualRenderContext::default()),
        input: Box::new(ScriptedInput::default()),
        launcher: Box::new(support::RecordingLauncher::default()),
    };

    let err = Runtime::new(
        presenter,
        Orchestrator::new(support::library(), Timings::default()),
        collaborators,
        ResolutionPolicy::default(),
    )
    .err()
    .expect("mismatched surface is rejected");
    assert_eq!(err.stage, InitStage::GpuSurface);
}
