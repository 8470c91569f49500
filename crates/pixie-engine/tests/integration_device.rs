//! Whole-device behaviour: orchestrator, managers and panel driven through
//! the in-process broker with paused time.
//!
//! Run with: cargo test -p pixie-engine --test integration_device

#![allow(clippy::arithmetic_side_effects)]

use core::time::Duration;
use std::sync::{Arc, Mutex};

use pixie_display::{PackedColor, PixelDisplay};
use pixie_engine::mocks::{MockBroker, Request};
use pixie_engine::{
    DisplayMode, Intent, LinkEvent, MessagingClient, Orchestrator, OrchestratorHandle,
};
use pixie_protocol::{encode_cover, CommandMessage, RequestKind};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Log = Arc<Mutex<Vec<Request>>>;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Photo response: JSON header, line feed, 4096 copies of `rgb`
fn photo_body(title: &str, author: &str, rgb: [u8; 3]) -> Vec<u8> {
    let mut body = format!(r#"{{"title":"{title}","author":"{author}"}}"#).into_bytes();
    body.push(b'\n');
    for _ in 0..4096 {
        body.extend_from_slice(&rgb);
    }
    body
}

fn command(json: &str) -> CommandMessage {
    CommandMessage::parse(json.as_bytes()).unwrap()
}

fn requests_of(log: &Log, kind: RequestKind) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|r| r.kind == kind)
        .map(|r| String::from_utf8(r.payload.clone()).unwrap())
        .collect()
}

/// A device whose broker answers photos with a red "Dawn" by "A.K."
fn red_photo_device() -> (Orchestrator, Log) {
    init_logging();
    let (client, _inbox, link) = MessagingClient::new(12);
    let log: Log = Arc::default();
    let seen = Arc::clone(&log);
    MockBroker::new(link).serve(move |request| {
        seen.lock().unwrap().push(request.clone());
        match request.kind {
            RequestKind::Photo => Some(photo_body("Dawn", "A.K.", [255, 0, 0])),
            _ => None,
        }
    });
    (Orchestrator::new(PixelDisplay::new(), client), log)
}

fn any_white(
    orchestrator: &Orchestrator,
    xs: core::ops::Range<i32>,
    ys: core::ops::RangeInclusive<i32>,
) -> bool {
    let framebuffer = orchestrator.display().framebuffer();
    xs.flat_map(|x| ys.clone().map(move |y| (x, y)))
        .any(|(x, y)| framebuffer.get(x, y) == Some(PackedColor::WHITE))
}

// ---------------------------------------------------------------------------
// Carousel
// ---------------------------------------------------------------------------

/// First tick fetches index 0, fades it in and lays out the caption
#[tokio::test(start_paused = true)]
async fn test_carousel_shows_red_photo_with_caption() {
    let (mut orchestrator, log) = red_photo_device();

    orchestrator.tick(Instant::now()).await;

    assert_eq!(requests_of(&log, RequestKind::Photo), vec![r#"{"index":0}"#]);
    assert_eq!(orchestrator.photos().index(), 1);

    let framebuffer = orchestrator.display().framebuffer();
    for y in 0..48 {
        for x in 0..64 {
            assert_eq!(
                framebuffer.get(x, y),
                Some(PackedColor::from_raw(0xF800)),
                "pixel ({x}, {y}) must be pure red"
            );
        }
    }

    let scroll = orchestrator.scroll();
    assert_eq!(scroll.title(), "Dawn");
    assert_eq!(scroll.author(), "A.K.");
    assert!(scroll.same_line(), "18 + 12 + 4 fits in 64 columns");
    assert!(!scroll.needs_scroll());
    // Title left-aligned, author right-aligned, both on the bottom row
    assert!(any_white(&orchestrator, 1..20, 57..=62));
    assert!(any_white(&orchestrator, 52..64, 57..=62));
    assert!(!any_white(&orchestrator, 0..64, 46..=52));
    assert_eq!(orchestrator.mode(), DisplayMode::Carousel);
}

/// Photos advance on the carousel interval and wrap at the configured maximum
#[tokio::test(start_paused = true)]
async fn test_carousel_interval_and_wrap() {
    let (mut orchestrator, log) = red_photo_device();
    orchestrator
        .handle_command(
            command(r#"{"action":"update_info","pictures_on_queue":2,"secs_between_photos":10}"#),
            Instant::now(),
        )
        .await;

    orchestrator.tick(Instant::now()).await;
    tokio::time::advance(Duration::from_secs(5)).await;
    orchestrator.tick(Instant::now()).await;
    assert_eq!(requests_of(&log, RequestKind::Photo).len(), 1);

    tokio::time::advance(Duration::from_secs(6)).await;
    orchestrator.tick(Instant::now()).await;
    tokio::time::advance(Duration::from_secs(11)).await;
    orchestrator.tick(Instant::now()).await;

    assert_eq!(
        requests_of(&log, RequestKind::Photo),
        vec![r#"{"index":0}"#, r#"{"index":1}"#, r#"{"index":0}"#]
    );
}

/// Previous-photo intent steps back two and refreshes on the next tick
#[tokio::test(start_paused = true)]
async fn test_previous_photo_intent() {
    let (mut orchestrator, log) = red_photo_device();
    for _ in 0..3 {
        orchestrator.apply_intent(Intent::NextPhoto);
        orchestrator.tick(Instant::now()).await;
    }
    orchestrator.apply_intent(Intent::PreviousPhoto);
    orchestrator.tick(Instant::now()).await;

    let photos = requests_of(&log, RequestKind::Photo);
    assert_eq!(photos.len(), 4);
    assert_eq!(photos.last().unwrap(), r#"{"index":1}"#);
}

/// `update_photo` fetches by id and records the change
#[tokio::test(start_paused = true)]
async fn test_pushed_photo_by_id() {
    let (mut orchestrator, log) = red_photo_device();
    orchestrator
        .handle_command(command(r#"{"action":"update_photo","id":42}"#), Instant::now())
        .await;

    assert_eq!(requests_of(&log, RequestKind::Photo), vec![r#"{"id":42}"#]);
    assert_eq!(
        orchestrator.display().framebuffer().get(0, 0),
        Some(PackedColor::from_raw(0xF800))
    );
    assert_eq!(orchestrator.scroll().title(), "Dawn");

    // The pushed photo restarts the carousel interval
    orchestrator.tick(Instant::now()).await;
    assert_eq!(requests_of(&log, RequestKind::Photo).len(), 1);
}

/// An unanswered photo request skips the cycle without touching the panel
#[tokio::test(start_paused = true)]
async fn test_missing_photo_skips_cycle() {
    init_logging();
    let (client, _inbox, link) = MessagingClient::new(12);
    MockBroker::new(link).serve(|_| None);
    let mut orchestrator = Orchestrator::new(PixelDisplay::new(), client);

    orchestrator.tick(Instant::now()).await;

    assert_eq!(orchestrator.photos().index(), 0);
    assert!(orchestrator.scroll().title().is_empty());
    assert!(orchestrator
        .display()
        .framebuffer()
        .pixels()
        .iter()
        .all(|&p| p == PackedColor::BLACK));
}

// ---------------------------------------------------------------------------
// Now playing
// ---------------------------------------------------------------------------

/// A playing song replaces the carousel with its cover; when playback stops
/// the carousel resumes immediately
#[tokio::test(start_paused = true)]
async fn test_now_playing_cover_flow() {
    init_logging();
    let (client, _inbox, link) = MessagingClient::new(12);
    let log: Log = Arc::default();
    let song = Arc::new(Mutex::new(String::from("song-1")));

    let seen = Arc::clone(&log);
    let playing = Arc::clone(&song);
    MockBroker::new(link).serve(move |request| {
        seen.lock().unwrap().push(request.clone());
        match request.kind {
            RequestKind::Song => {
                let id = playing.lock().unwrap().clone();
                Some(format!(r#"{{"id":"{id}"}}"#).into_bytes())
            }
            RequestKind::Cover => Some(encode_cover(&vec![PackedColor::BLUE; 4096])),
            RequestKind::Photo => Some(photo_body("Dawn", "A.K.", [255, 0, 0])),
            RequestKind::Config => None,
        }
    });

    let mut orchestrator = Orchestrator::new(PixelDisplay::new(), client);
    let modes = orchestrator.subscribe_mode();
    orchestrator
        .handle_command(command(r#"{"action":"update_info","spotify_enabled":true}"#), Instant::now())
        .await;

    orchestrator.tick(Instant::now()).await;
    assert_eq!(requests_of(&log, RequestKind::Cover), vec![r#"{"songId":"song-1"}"#]);
    assert!(requests_of(&log, RequestKind::Photo).is_empty());
    assert_eq!(orchestrator.now_playing().showing(), Some("song-1"));
    assert_eq!(*modes.borrow(), DisplayMode::NowPlaying);
    assert!(orchestrator
        .display()
        .framebuffer()
        .pixels()
        .iter()
        .all(|&p| p == PackedColor::BLUE));

    // Same song again: no second cover fetch
    tokio::time::advance(Duration::from_secs(5)).await;
    orchestrator.tick(Instant::now()).await;
    assert_eq!(requests_of(&log, RequestKind::Cover).len(), 1);
    assert_eq!(requests_of(&log, RequestKind::Song).len(), 2);

    song.lock().unwrap().clear();
    tokio::time::advance(Duration::from_secs(5)).await;
    orchestrator.tick(Instant::now()).await;
    assert_eq!(orchestrator.now_playing().showing(), None);
    assert_eq!(requests_of(&log, RequestKind::Photo), vec![r#"{"index":0}"#]);
    assert_eq!(orchestrator.mode(), DisplayMode::Carousel);
}

// ---------------------------------------------------------------------------
// Drawing through the run loop
// ---------------------------------------------------------------------------

/// Commands pushed on the bus reach the canvas; config is fetched on start
#[tokio::test(start_paused = true)]
async fn test_run_loop_drawing_and_config() {
    init_logging();
    let (client, inbox, link) = MessagingClient::new(12);
    let broker = MockBroker::new(link);
    let router = broker.router();
    let command_topic = router.topics().command().to_owned();
    broker.serve(|request| match request.kind {
        RequestKind::Config => Some(br#"{"brightness":80,"clock_enabled":false}"#.to_vec()),
        RequestKind::Photo => Some(photo_body("Dawn", "A.K.", [255, 0, 0])),
        _ => None,
    });

    for json in [
        r#"{"action":"enter_draw_mode"}"#,
        r##"{"action":"draw_pixel","x":10,"y":10,"color":"#00FF00"}"##,
        r##"{"action":"draw_pixel","x":20,"y":20,"color":"#0000FF","size":3}"##,
    ] {
        router.handle(LinkEvent::Message {
            topic: command_topic.clone(),
            payload: json.as_bytes().to_vec(),
        });
    }

    let (handle, intents) = OrchestratorHandle::channel();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            handle.stop();
        }
    });

    let mut orchestrator = Orchestrator::new(PixelDisplay::new(), client);
    orchestrator.run(inbox, intents).await;

    assert_eq!(orchestrator.config().brightness, 80);
    assert_eq!(orchestrator.display().brightness(), 80);
    assert_eq!(orchestrator.mode(), DisplayMode::Drawing);
    let framebuffer = orchestrator.display().framebuffer();
    assert_eq!(framebuffer.get(10, 10), Some(PackedColor::GREEN));
    assert_eq!(framebuffer.get(19, 19), Some(PackedColor::BLUE));
    assert_eq!(framebuffer.get(21, 21), Some(PackedColor::BLUE));
    assert_eq!(orchestrator.drawing().queued(), 0);
    assert!(!handle.stop(), "run loop dropped its intent receiver");
}

/// Sixty idle seconds end drawing mode and force a fresh photo
#[tokio::test(start_paused = true)]
async fn test_drawing_idle_timeout_returns_to_carousel() {
    let (mut orchestrator, log) = red_photo_device();
    let start = Instant::now();
    orchestrator
        .handle_command(
            command(r##"{"action":"draw_pixel","x":3,"y":3,"color":"#FFFFFF"}"##),
            start,
        )
        .await;
    orchestrator.service_drawing(start);
    assert_eq!(orchestrator.mode(), DisplayMode::Drawing);
    assert_eq!(
        orchestrator.display().framebuffer().get(3, 3),
        Some(PackedColor::WHITE)
    );

    orchestrator.service_drawing(start + Duration::from_millis(60_001));
    assert_eq!(orchestrator.mode(), DisplayMode::Carousel);
    assert!(orchestrator
        .display()
        .framebuffer()
        .pixels()
        .iter()
        .all(|&p| p == PackedColor::BLACK));

    orchestrator.tick(Instant::now()).await;
    assert_eq!(requests_of(&log, RequestKind::Photo).len(), 1);
}

/// A photo pushed while drawing waits until the canvas closes
#[tokio::test(start_paused = true)]
async fn test_pushed_photo_deferred_while_drawing() {
    let (mut orchestrator, log) = red_photo_device();
    let now = Instant::now();
    orchestrator
        .handle_command(command(r#"{"action":"enter_draw_mode"}"#), now)
        .await;
    orchestrator
        .handle_command(command(r#"{"action":"update_photo","id":7}"#), now)
        .await;
    orchestrator.tick(now).await;
    assert!(requests_of(&log, RequestKind::Photo).is_empty());

    orchestrator
        .handle_command(command(r#"{"action":"exit_draw_mode"}"#), now)
        .await;
    orchestrator.tick(Instant::now()).await;
    let photos = requests_of(&log, RequestKind::Photo);
    assert_eq!(photos.first().map(String::as_str), Some(r#"{"id":7}"#));
}

// ---------------------------------------------------------------------------
// Out-of-range values from the bus
// ---------------------------------------------------------------------------

/// An extreme timezone offset still yields a clock overlay
#[tokio::test(start_paused = true)]
async fn test_extreme_timezone_offset_draws_clock() {
    let (mut orchestrator, _log) = red_photo_device();
    orchestrator
        .handle_command(
            command(r#"{"action":"update_info","clock_enabled":true,"timezone_offset":2147483647}"#),
            Instant::now(),
        )
        .await;
    assert_eq!(orchestrator.config().timezone_offset_minutes, i32::MAX);

    orchestrator.tick(Instant::now()).await;
    assert!(any_white(&orchestrator, 40..64, 0..=7));
}

/// Brush stamps far off the panel or absurdly large are clipped, not fatal
#[tokio::test(start_paused = true)]
async fn test_extreme_draw_pixel_is_clipped() {
    let (mut orchestrator, _log) = red_photo_device();
    let start = Instant::now();
    for json in [
        r##"{"action":"draw_pixel","x":-2147483648,"y":5,"color":"#FF0000","size":3}"##,
        r##"{"action":"draw_pixel","x":2147483647,"y":2147483647,"color":"#FF0000","size":9}"##,
    ] {
        orchestrator.handle_command(command(json), start).await;
    }
    orchestrator.service_drawing(start);
    assert!(orchestrator
        .display()
        .framebuffer()
        .pixels()
        .iter()
        .all(|&p| p == PackedColor::BLACK));

    orchestrator
        .handle_command(
            command(r##"{"action":"draw_pixel","x":10,"y":10,"color":"#00FF00","size":4294967295}"##),
            start,
        )
        .await;
    orchestrator.service_drawing(start + Duration::from_millis(20));
    assert!(orchestrator
        .display()
        .framebuffer()
        .pixels()
        .iter()
        .all(|&p| p == PackedColor::GREEN));
}
