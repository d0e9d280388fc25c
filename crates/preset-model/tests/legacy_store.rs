//! Stores written before presets carried a `kind` tag must keep loading.

use reelsmith_preset_model::{Position, Preset, PresetStore, SegmentKind};

const LEGACY_STORE: &str = r#"{
  "VideoEdit 1": {
    "name": "VideoEdit 1",
    "description": "Default video editing configuration",
    "segments": [
      { "type": "video", "source": "clips", "duration": 2.3, "extensions": [".mp4", ".mov"] },
      { "type": "image", "source": "stills", "duration": 1.3, "extensions": [".jpg", ".jpeg", ".png"] }
    ],
    "endVideos": { "source": "broll", "count": 9, "duration": 0.3778, "extensions": [".mp4", ".mov"] },
    "outroVideo": { "source": "outro", "duration": 1.6, "extensions": [".mp4", ".mov"] },
    "audio": { "source": "music", "duration": 10.6, "extensions": [".mp3", ".wav"] },
    "textOverlays": [
      { "text": "Hello", "startTime": 0, "endTime": 2.3, "x": "center", "y": 180, "fontSize": 70, "color": "white", "borderColor": "black", "borderWidth": 6 },
      { "text": "Boxed", "startTime": 3.6, "endTime": 4.8, "x": "center", "y": "h/2+50", "box": true, "boxColor": "black@1.0", "boxBorderWidth": 10 }
    ],
    "output": { "resolution": "1080x1920", "fps": 25, "codec": "libx264", "preset": "fast", "crf": 23 },
    "createdAt": "2024-05-01T10:00:00.000Z",
    "updatedAt": "2024-05-02T10:00:00.000Z"
  },
  "tiktok_iphone13_europe": {
    "name": "tiktok_iphone13_europe",
    "source": { "video": "tiktokvideos", "images": "tiktokimages" },
    "edits": [
      { "type": "image_overlay", "startTime": 1.2, "endTime": 1.3, "opacity": 0.5, "x": "(W-w)/2", "y": "(H-h)/2", "randomImage": true },
      { "type": "image_overlay", "startTime": 2.7, "endTime": 2.9, "opacity": 0.5, "x": "(W-w)/2", "y": "(H-h)/2", "randomImage": true }
    ],
    "output": { "resolution": "1080x1920", "fps": 30, "codec": "libx264", "videoBitrate": "12M", "audioCodec": "aac", "audioBitrate": "192k" },
    "metadata": { "device": "iPhone 13", "region": "Europe", "platform": "none" }
  }
}"#;

#[test]
fn legacy_store_loads_both_variants() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("video-presets.json");
    std::fs::write(&path, LEGACY_STORE).unwrap();

    let store = PresetStore::open(&path).unwrap();
    assert_eq!(store.len(), 2);

    let stored = store.get("VideoEdit 1").unwrap();
    assert_eq!(stored.created_at.as_deref(), Some("2024-05-01T10:00:00.000Z"));
    let Preset::Standard(standard) = stored.preset else {
        panic!("expected standard preset");
    };
    assert_eq!(standard.segments[1].kind, SegmentKind::Image);
    assert_eq!(standard.end_videos.count, 9);
    assert_eq!(standard.text_overlays[0].y, Position::Pixels(180));
    assert_eq!(
        standard.text_overlays[1].y,
        Position::Expr("h/2+50".to_string())
    );
    assert_eq!(standard.output.resolution().unwrap().height, 1920);

    let short = store.load("tiktok_iphone13_europe").unwrap();
    assert_eq!(short.kind(), "short_form");
    assert_eq!(short.output().video_bitrate.as_deref(), Some("12M"));
}

#[test]
fn rewriting_legacy_store_adds_kind_tags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("video-presets.json");
    std::fs::write(&path, LEGACY_STORE).unwrap();

    let mut store = PresetStore::open(&path).unwrap();
    let preset = store.load("VideoEdit 1").unwrap();
    store.put(preset).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["VideoEdit 1"]["kind"], "standard");
    assert_eq!(raw["VideoEdit 1"]["createdAt"], "2024-05-01T10:00:00.000Z");
    assert!(raw["tiktok_iphone13_europe"].get("kind").is_none());
}

#[test]
fn malformed_record_does_not_hide_others() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("video-presets.json");
    std::fs::write(
        &path,
        r#"{ "broken": { "segments": "nope" }, "ok": { "source": { "video": "v", "images": "i" }, "output": { "resolution": "720x1280" } } }"#,
    )
    .unwrap();

    let store = PresetStore::open(&path).unwrap();
    assert!(store.get("broken").is_err());
    store.load("ok").unwrap();
}
