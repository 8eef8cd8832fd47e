use bart_core::TaskInput;
use bart_rendering_macroquad::{KeyPresses, ViewportTracker};

fn replay(frames: &[KeyPresses]) -> Vec<TaskInput> {
    frames.iter().flat_map(|keys| keys.inputs()).collect()
}

#[test]
fn key_sequence_maps_to_task_inputs_deterministically() {
    let frames = [
        KeyPresses {
            enter: true,
            ..KeyPresses::default()
        },
        KeyPresses::default(),
        KeyPresses {
            right: true,
            ..KeyPresses::default()
        },
        KeyPresses {
            right: true,
            left: true,
            ..KeyPresses::default()
        },
        KeyPresses {
            q: true,
            ..KeyPresses::default()
        },
    ];
    let expected = vec![
        TaskInput::Confirm,
        TaskInput::Pump,
        TaskInput::Pump,
        TaskInput::CashIn,
        TaskInput::Decline,
    ];

    let first_run = replay(&frames);
    let second_run = replay(&frames);

    assert_eq!(first_run, expected);
    assert_eq!(first_run, second_run);
}

#[test]
fn viewport_tracker_reports_initial_size_and_changes_only() {
    let mut tracker = ViewportTracker::default();
    let observed: Vec<Option<TaskInput>> = [(1280, 720), (1280, 720), (1024, 768), (1024, 768)]
        .into_iter()
        .map(|(width, height)| tracker.observe(width, height))
        .collect();

    assert_eq!(
        observed,
        vec![
            Some(TaskInput::Resize {
                width: 1280,
                height: 720,
            }),
            None,
            Some(TaskInput::Resize {
                width: 1024,
                height: 768,
            }),
            None,
        ]
    );
}
