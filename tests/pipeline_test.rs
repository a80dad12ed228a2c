//! End-to-end test: a JSON-lines landmark stream in, transforms out over a
//! real loopback socket.


use head_pose_stream::app::{FrameOutcome, HeadPoseApp};
use head_pose_stream::config::Config;
use head_pose_stream::landmarks::JsonlLandmarkSource;
use head_pose_stream::streaming::PoseSubscriber;
use head_pose_stream::transform::RenderTransform;
use nalgebra::Vector3;
use std::io::Cursor;
use std::time::{Duration, Instant};
use test_helpers::{landmarks_to_jsonl, synthetic_landmarks};

fn loopback_config() -> Config {
    let mut config = Config::default();
    config.transport.bind_addr = "127.0.0.1".to_string();
    config.transport.port = 0;
    config
}

#[test]
fn test_stream_of_frames_end_to_end() {
    let config = loopback_config();
    let calibration = config.to_calibration().unwrap();

    let rvec = Vector3::new(0.1, -0.15, 0.05);
    let tvec = Vector3::new(2.0, -1.0, 490.0);
    let frames = vec![
        None,
        Some(synthetic_landmarks(&calibration, Vector3::zeros(), Vector3::new(0.0, 0.0, 500.0))),
        Some(synthetic_landmarks(&calibration, rvec, tvec)),
    ];
    let source = JsonlLandmarkSource::new(Cursor::new(landmarks_to_jsonl(&frames)));

    let mut app = HeadPoseApp::new(&config, source).unwrap();
    let addr = app.publisher().local_addr().unwrap();
    let mut subscriber = PoseSubscriber::connect(addr).unwrap();
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(app.process_frame().unwrap(), FrameOutcome::NoFace);
    assert_eq!(app.process_frame().unwrap(), FrameOutcome::Published);
    assert_eq!(app.process_frame().unwrap(), FrameOutcome::Published);
    assert_eq!(app.process_frame().unwrap(), FrameOutcome::EndOfStream);

    let stats = app.stats();
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.published, 2);
    assert_eq!(stats.no_face, 1);
    assert_eq!(stats.unsolvable, 0);

    // The subscriber ends up with the transform of the last published pose
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut got = None;
    while Instant::now() < deadline {
        if let Ok(Some(t)) = subscriber.latest() {
            got = Some(t);
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    let got = got.expect("no transform received");

    let solved = test_helpers::default_estimator()
        .solve(&synthetic_landmarks(&calibration, rvec, tvec))
        .unwrap();
    assert_eq!(got, RenderTransform::from_pose(&solved));
}

#[test]
fn test_garbage_lines_do_not_stop_the_run() {
    let config = loopback_config();
    let calibration = config.to_calibration().unwrap();

    let good = landmarks_to_jsonl(&[Some(synthetic_landmarks(
        &calibration,
        Vector3::zeros(),
        Vector3::new(0.0, 0.0, 500.0),
    ))]);
    let input = format!("not json at all\n[[1,2],[3,4]]\n{good}");
    let source = JsonlLandmarkSource::new(Cursor::new(input));

    let mut app = HeadPoseApp::new(&config, source).unwrap();
    let stats = app.run().unwrap();

    assert_eq!(stats.frames, 3);
    assert_eq!(stats.published, 1);
    assert_eq!(stats.no_face, 2);
}
