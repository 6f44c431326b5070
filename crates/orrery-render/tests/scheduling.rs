//! Camera scheduling and publication against the mock backend.

use orrery_core::{Namespace, ParamTree, SimTime};
use orrery_render::{
    ChannelPublisher, Encoding, OffscreenRenderScheduler, OverlayScene, Publication,
};
use orrery_test_utils::{MockBackend, MockModel, MockState};

const DT: f64 = 0.002;

fn step_until(
    scheduler: &mut OffscreenRenderScheduler,
    model: &MockModel,
    state: &mut MockState,
    backend: &mut MockBackend,
    publisher: &ChannelPublisher,
    last_step: u64,
) -> Vec<(u64, usize)> {
    let overlay = OverlayScene::default();
    let mut fires = Vec::new();
    while state.steps < last_step {
        state.steps += 1;
        let fired = scheduler.evaluate(model, &*state, &overlay, backend, publisher);
        if fired > 0 {
            fires.push((state.steps, fired));
        }
    }
    fires
}

#[test]
fn default_camera_first_fires_at_step_34() {
    let model = MockModel::new(DT).with_camera("front", 45.0);
    let mut state = MockState::new(DT);
    let mut backend = MockBackend::new();
    let (publisher, rx) = ChannelPublisher::unbounded();
    let ns = Namespace::new("env0");
    let mut scheduler =
        OffscreenRenderScheduler::build(&ns, &model, &ParamTree::new(), true, SimTime(0.0));

    let fires = step_until(&mut scheduler, &model, &mut state, &mut backend, &publisher, 34);
    assert_eq!(fires, vec![(34, 1)]);

    let published: Vec<Publication> = rx.try_iter().collect();
    assert_eq!(published.len(), 2);
    match &published[0] {
        Publication::Image { channel, image } => {
            assert_eq!(channel, "/env0/cameras/front/rgb");
            assert_eq!(image.encoding, Encoding::Rgb8);
            assert_eq!(image.data.len(), 720 * 480 * 3);
            assert_eq!((image.width, image.height), (720, 480));
            assert_eq!(image.frame_id, "front_optical_frame");
            assert!((image.stamp.as_secs() - 0.068).abs() < 1e-12);
        }
        other => panic!("expected image, got {other:?}"),
    }
    assert_eq!(published[1].channel(), "/env0/cameras/front/camera_info");
    assert_eq!(published[1].stamp(), published[0].stamp());
}

#[test]
fn thirty_hz_fires_every_17_steps() {
    let model = MockModel::new(DT).with_camera("c", 45.0);
    let params = ParamTree::new()
        .with("cam_config/c/frequency", 30)
        .with("cam_config/c/width", 4)
        .with("cam_config/c/height", 2);
    let mut state = MockState::new(DT);
    let mut backend = MockBackend::new();
    let (publisher, rx) = ChannelPublisher::unbounded();
    let mut scheduler =
        OffscreenRenderScheduler::build(&Namespace::root(), &model, &params, true, SimTime(0.0));

    let fires = step_until(&mut scheduler, &model, &mut state, &mut backend, &publisher, 60);
    let steps: Vec<u64> = fires.iter().map(|(s, _)| *s).collect();
    assert_eq!(steps, vec![17, 34, 51]);

    let stamps: Vec<f64> = rx
        .try_iter()
        .filter(|p| p.channel() == "cameras/c/rgb")
        .map(|p| p.stamp().as_secs())
        .collect();
    for (stamp, expected) in stamps.iter().zip([0.034, 0.068, 0.102]) {
        assert!((stamp - expected).abs() < 1e-12);
    }
}

#[test]
fn rgb_d_s_publishes_three_streams_with_one_stamp() {
    let model = MockModel::new(DT).with_camera("c", 45.0);
    let params = ParamTree::new()
        .with("cam_config/c/stream_type", "RGB_D_S")
        .with("cam_config/c/width", 3)
        .with("cam_config/c/height", 2)
        .with("cam_config/c/frequency", 250);
    let mut state = MockState::new(DT);
    let mut backend = MockBackend::new();
    let calls = backend.call_counter();
    let (publisher, rx) = ChannelPublisher::unbounded();
    let mut scheduler =
        OffscreenRenderScheduler::build(&Namespace::new("arm"), &model, &params, true, SimTime(0.0));

    let fires = step_until(&mut scheduler, &model, &mut state, &mut backend, &publisher, 2);
    assert_eq!(fires, vec![(2, 1)]);
    // One view evaluation for all three sub-streams.
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    let images: Vec<Publication> = rx
        .try_iter()
        .filter(|p| matches!(p, Publication::Image { .. }))
        .collect();
    let channels: Vec<&str> = images.iter().map(|p| p.channel()).collect();
    assert_eq!(
        channels,
        ["/arm/cameras/c/rgb", "/arm/cameras/c/depth", "/arm/cameras/c/segmented"]
    );
    assert!(images.iter().all(|p| p.stamp() == images[0].stamp()));
}

#[test]
fn rows_arrive_top_down() {
    let model = MockModel::new(DT).with_camera("c", 45.0);
    let params = ParamTree::new()
        .with("cam_config/c/stream_type", "SEGMENTED")
        .with("cam_config/c/width", 2)
        .with("cam_config/c/height", 3)
        .with("cam_config/c/frequency", 500);
    let mut state = MockState::new(DT);
    let mut backend = MockBackend::new();
    let (publisher, rx) = ChannelPublisher::unbounded();
    let mut scheduler =
        OffscreenRenderScheduler::build(&Namespace::root(), &model, &params, true, SimTime(0.0));
    step_until(&mut scheduler, &model, &mut state, &mut backend, &publisher, 1);

    match rx.try_recv().unwrap() {
        Publication::Image { image, .. } => {
            assert_eq!(image.encoding, Encoding::Mono8);
            // Backend filled bottom row with 0, top row with 2.
            assert_eq!(image.data, vec![2, 2, 1, 1, 0, 0]);
        }
        other => panic!("expected image, got {other:?}"),
    }
}

#[test]
fn no_backend_means_no_cameras() {
    let model = MockModel::new(DT).with_camera("a", 45.0).with_camera("b", 45.0);
    let scheduler =
        OffscreenRenderScheduler::build(&Namespace::root(), &model, &ParamTree::new(), false, SimTime(0.0));
    assert!(scheduler.is_empty());
}

#[test]
fn invalid_camera_config_is_skipped() {
    let model = MockModel::new(DT).with_camera("good", 45.0).with_camera("bad", 45.0);
    let params = ParamTree::new().with("cam_config/bad/stream_type", "THERMAL");
    let scheduler =
        OffscreenRenderScheduler::build(&Namespace::root(), &model, &params, true, SimTime(0.0));
    let names: Vec<&str> = scheduler.cameras().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["good"]);
}

#[test]
fn failed_render_publishes_nothing_but_keeps_schedule() {
    let model = MockModel::new(DT).with_camera("c", 45.0);
    let params = ParamTree::new()
        .with("cam_config/c/width", 2)
        .with("cam_config/c/height", 2)
        .with("cam_config/c/frequency", 250);
    let mut state = MockState::new(DT);
    let mut backend = MockBackend::failing();
    let (publisher, rx) = ChannelPublisher::unbounded();
    let mut scheduler =
        OffscreenRenderScheduler::build(&Namespace::root(), &model, &params, true, SimTime(0.0));

    let fires = step_until(&mut scheduler, &model, &mut state, &mut backend, &publisher, 4);
    assert!(fires.is_empty());
    assert_eq!(rx.try_iter().count(), 0);
    assert_eq!(scheduler.schedule("c").unwrap().next_trigger_step(), 6);
}

#[test]
fn short_buffer_publishes_nothing() {
    let model = MockModel::new(DT).with_camera("c", 45.0);
    let params = ParamTree::new()
        .with("cam_config/c/stream_type", "RGB_D")
        .with("cam_config/c/width", 2)
        .with("cam_config/c/height", 2)
        .with("cam_config/c/frequency", 500);
    let mut state = MockState::new(DT);
    let mut backend = MockBackend::truncating();
    let (publisher, rx) = ChannelPublisher::unbounded();
    let mut scheduler =
        OffscreenRenderScheduler::build(&Namespace::root(), &model, &params, true, SimTime(0.0));
    step_until(&mut scheduler, &model, &mut state, &mut backend, &publisher, 1);
    assert_eq!(rx.try_iter().count(), 0);
}

#[test]
fn build_mid_run_anchors_to_current_time() {
    let model = MockModel::new(DT).with_camera("c", 45.0);
    let scheduler = OffscreenRenderScheduler::build(
        &Namespace::root(),
        &model,
        &ParamTree::new(),
        true,
        SimTime::from_steps(100, DT),
    );
    assert_eq!(scheduler.schedule("c").unwrap().next_trigger_step(), 134);
}
