#[cfg(feature = "media-ffmpeg")]
mod ffmpeg_render {
    use std::{
        path::{Path, PathBuf},
        process::Command,
        sync::Arc,
    };

    use shotplan::{
        AudioKind, AudioTrackPlan, FfmpegConfig, FfmpegRenderer, Orchestrator, OverlayKind,
        OverlayPlan, RenderInputs, RenderOptions, ScenePlan, ShotPlan, ShotReference,
        SidecarCaptionManager,
    };

    fn ffmpeg_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn synth(args: &[&str], out: &Path) -> anyhow::Result<()> {
        let status = Command::new("ffmpeg")
            .args(["-v", "error", "-y"])
            .args(args)
            .arg(out)
            .status()?;
        anyhow::ensure!(status.success(), "ffmpeg failed creating {}", out.display());
        Ok(())
    }

    fn synth_media(root: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(root)?;
        for (name, src) in [("red", "color=c=red"), ("blue", "color=c=blue")] {
            synth(
                &[
                    "-f",
                    "lavfi",
                    "-i",
                    &format!("{src}:size=320x240:rate=30"),
                    "-t",
                    "1",
                    "-pix_fmt",
                    "yuv420p",
                    "-c:v",
                    "libx264",
                ],
                &root.join(format!("{name}.mp4")),
            )?;
        }
        synth(
            &["-f", "lavfi", "-i", "color=c=white:size=64x32", "-frames:v", "1"],
            &root.join("cta.png"),
        )?;
        synth(
            &[
                "-f",
                "lavfi",
                "-i",
                "sine=frequency=330:sample_rate=48000",
                "-t",
                "2",
                "-c:a",
                "pcm_s16le",
            ],
            &root.join("vo.wav"),
        )?;
        Ok(())
    }

    fn shot(root: &Path, id: &str, trim_to: Option<f64>) -> ShotReference {
        ShotReference {
            id: id.to_string(),
            src: root.join(format!("{id}.mp4")).to_string_lossy().into_owned(),
            duration: 1.0,
            start_offset: None,
            trim_to,
        }
    }

    fn voiceover(root: &Path) -> AudioTrackPlan {
        AudioTrackPlan {
            kind: AudioKind::Voiceover,
            src: root.join("vo.wav").to_string_lossy().into_owned(),
            gain: Some(0.5),
        }
    }

    fn media_info(path: &Path, entries: &str) -> Option<String> {
        let output = Command::new("ffprobe")
            .args(["-v", "error", "-show_entries", entries, "-of", "csv=p=0"])
            .arg(path)
            .output()
            .ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn plan(root: &Path) -> ShotPlan {
        ShotPlan {
            id: "ffmpeg-e2e".to_string(),
            brand_id: "default".to_string(),
            safe_zone_preset_id: "square-1x1".to_string(),
            output_path: root.join("out").join("final.mp4"),
            scenes: vec![
                ScenePlan {
                    id: "second".to_string(),
                    order: 1,
                    shots: vec![shot(root, "blue", None)],
                    audio: Some(voiceover(root)),
                    overlays: Some(vec![OverlayPlan {
                        kind: OverlayKind::Cta,
                        src: root.join("cta.png").to_string_lossy().into_owned(),
                        start: Some(0.2),
                        end: None,
                        safe_zone: None,
                    }]),
                    caption_hints: None,
                },
                ScenePlan {
                    id: "first".to_string(),
                    order: 0,
                    shots: vec![shot(root, "red", Some(0.5)), shot(root, "blue", None)],
                    audio: None,
                    overlays: None,
                    caption_hints: None,
                },
            ],
            metadata: None,
        }
    }

    #[tokio::test]
    async fn renders_stitches_and_captions_with_ffmpeg() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg not on PATH");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let root = PathBuf::from(dir.path());
        synth_media(&root).unwrap();

        let renderer = FfmpegRenderer::new(FfmpegConfig {
            work_dir: Some(root.join("work")),
            ..FfmpegConfig::default()
        })
        .unwrap();
        let orchestrator = Orchestrator::new(
            Arc::new(renderer),
            Arc::new(SidecarCaptionManager::default()),
        )
        .with_concurrency(2)
        .unwrap();

        let options = RenderOptions {
            languages: Some(vec!["en".to_string()]),
            caption_prompt: Some("Shop now".to_string()),
        };
        let outcome = orchestrator
            .render(&RenderInputs { plan: plan(&root) }, &options)
            .await
            .unwrap();

        assert!(outcome.stitched_path.exists());
        assert!(std::fs::metadata(&outcome.stitched_path).unwrap().len() > 0);
        for scene in &outcome.scenes {
            assert!(scene.output_path.exists(), "{}", scene.output_path.display());
        }
        let srt = std::fs::read_to_string(&outcome.captioning.bundles[0].srt_path).unwrap();
        assert!(srt.contains("00:00:00,000 --> 00:00:01,500\nShop now"));
    }

    #[tokio::test]
    async fn relative_output_path_stitches_with_mixed_audio() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg not on PATH");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let root = PathBuf::from(dir.path());
        synth_media(&root).unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(&root).unwrap();

        let renderer = FfmpegRenderer::new(FfmpegConfig {
            work_dir: Some(root.join("work")),
            ..FfmpegConfig::default()
        })
        .unwrap();
        let orchestrator = Orchestrator::new(
            Arc::new(renderer),
            Arc::new(SidecarCaptionManager::default()),
        );
        let mut relative = plan(&root);
        relative.output_path = PathBuf::from("out/final.mp4");
        let outcome = orchestrator
            .render(&RenderInputs { plan: relative }, &RenderOptions::default())
            .await;
        std::env::set_current_dir(previous).unwrap();
        let outcome = outcome.unwrap();

        let stitched = root.join("out").join("final.mp4");
        assert!(stitched.exists());
        assert!(std::fs::metadata(&stitched).unwrap().len() > 0);

        // 1.5s + 1.0s of video; the 2s voiceover on the second scene is cut to 1s.
        if let Some(duration) = media_info(&stitched, "format=duration") {
            let duration: f64 = duration.parse().unwrap();
            assert!((duration - 2.5).abs() < 0.2, "stitched duration {duration}");
        }
        for scene in &outcome.scenes {
            let streams = media_info(&root.join(&scene.output_path), "stream=codec_type");
            if let Some(streams) = streams {
                assert!(streams.lines().any(|l| l == "audio"), "{}", scene.scene_id);
            }
        }
    }
}
