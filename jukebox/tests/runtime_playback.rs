mod support;

use std::path::PathBuf;

use jukebox::prelude::*;

use support::Harness;

#[test]
fn intro_plays_without_overlay_then_hands_over_to_the_browser() {
    let mut h = Harness::builder().intro("/media/intro.mp4").build();
    h.runtime.start(false);

    assert!(matches!(
        h.runtime.orchestrator().mode(),
        Mode::BootIntro(_)
    ));

    h.ticks(10);
    assert!(h.video.borrow().render_count() > 0);
    assert!(h.ui.borrow().last_render().is_none());

    h.press(Action::Select);
    h.ticks(25);

    assert_eq!(h.runtime.orchestrator().mode(), Mode::Idle);
    assert!(h.ui.borrow().last_render().is_some());

    let video = h.video.borrow();
    assert!(video.stop_count() >= 1);
    assert_eq!(video.volume(), 100.0);
}

#[test]
fn selected_playlist_renders_into_the_viewport() {
    let mut h = Harness::started();

    h.press(Action::Next);
    h.press(Action::Select);
    assert_eq!(
        h.video.borrow().loaded(),
        &[PathBuf::from("/media/toons/1.mp4")]
    );

    h.ticks(30);

    assert_eq!(
        h.runtime.orchestrator().mode(),
        Mode::VideoActive {
            master_shuffle: false
        }
    );
    let video = h.video.borrow();
    assert!(video.render_count() > 0);
    assert_eq!(video.last_viewport(), Some(h.runtime.viewport()));
    assert_eq!(video.volume(), 100.0);
}

#[test]
fn game_launch_stops_playback_first() {
    let mut h = Harness::started();

    h.press(Action::Next);
    h.press(Action::Select);
    h.ticks(30);
    let stops = h.video.borrow().stop_count();

    // Hidden overlay: the first Menu press brings it back.
    h.press(Action::Menu);
    h.press(Action::Menu);
    h.press(Action::Next);
    h.press(Action::Next);
    h.press(Action::Select);
    h.press(Action::Next);
    h.press(Action::Select);

    assert_eq!(h.launcher.launched(), vec!["Pinball".to_string()]);
    assert!(h.video.borrow().stop_count() > stops);
    assert!(!h.runtime.orchestrator().session().video_active);
}

#[test]
fn quit_command_ends_the_run_loop() {
    let (commands, commands_rx) = command_channel();
    let (events_tx, events) = event_channel();
    let mut h = Harness::builder()
        .commands(commands_rx)
        .events(events_tx)
        .build()
        .start();

    commands.send(RuntimeCommand::Quit).unwrap();
    h.runtime.run();

    assert!(!h.runtime.is_running());
    assert_eq!(events.try_iter().last(), Some(RuntimeEvent::Stopped));
}

#[test]
fn quit_button_stops_the_orchestrator() {
    let mut h = Harness::started();
    h.press(Action::Quit);

    assert!(!h.runtime.orchestrator().is_running());
    assert!(!h.runtime.is_running());
}
