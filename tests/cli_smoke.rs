use std::path::PathBuf;

use shotplan::{ScenePlan, ShotPlan, ShotReference};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_shotplan")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "shotplan.exe"
            } else {
                "shotplan"
            });
            p
        })
}

fn write_plan(dir: &std::path::Path) -> PathBuf {
    let plan = ShotPlan {
        id: "smoke".to_string(),
        brand_id: "mono".to_string(),
        safe_zone_preset_id: "square-1x1".to_string(),
        output_path: PathBuf::from("out/smoke.mp4"),
        scenes: vec![ScenePlan {
            id: "only".to_string(),
            order: 0,
            shots: vec![ShotReference {
                id: "a".to_string(),
                src: "a.mp4".to_string(),
                duration: 2.0,
                start_offset: None,
                trim_to: None,
            }],
            audio: None,
            overlays: None,
            caption_hints: None,
        }],
        metadata: None,
    };
    let path = dir.join("plan.json");
    let f = std::fs::File::create(&path).unwrap();
    serde_json::to_writer_pretty(f, &plan).unwrap();
    path
}

#[test]
fn cli_jobs_prints_fingerprinted_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let plan_path = write_plan(dir.path());

    let output = std::process::Command::new(exe())
        .args(["jobs", "--in"])
        .arg(&plan_path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["planId"], "smoke");
    assert_eq!(json["jobs"][0]["jobId"], "smoke:only");
    assert_eq!(json["fingerprint"].as_str().unwrap().len(), 32);
}

#[test]
fn cli_mutate_writes_child_plan() {
    let dir = tempfile::tempdir().unwrap();
    let plan_path = write_plan(dir.path());
    let mutation_path = dir.path().join("mutation.json");
    std::fs::write(
        &mutation_path,
        r#"{ "type": "trim", "sceneId": "only", "shotId": "a", "trimEnd": 1.25 }"#,
    )
    .unwrap();
    let out_path = dir.path().join("child").join("plan.json");

    let status = std::process::Command::new(exe())
        .args(["mutate", "--strict", "--in"])
        .arg(&plan_path)
        .arg("--mutation")
        .arg(&mutation_path)
        .arg("--out")
        .arg(&out_path)
        .status()
        .unwrap();
    assert!(status.success());

    let child: ShotPlan =
        serde_json::from_reader(std::fs::File::open(&out_path).unwrap()).unwrap();
    assert!(child.id.starts_with("smoke-edit-"));
    assert_eq!(child.parent_id(), Some("smoke"));
    assert_eq!(child.scenes[0].shots[0].trim_to, Some(1.25));
}

#[test]
fn cli_validate_rejects_unknown_preset() {
    let dir = tempfile::tempdir().unwrap();
    let plan_path = write_plan(dir.path());
    let mut json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&plan_path).unwrap()).unwrap();
    json["safeZonePresetId"] = serde_json::json!("imax");
    std::fs::write(&plan_path, json.to_string()).unwrap();

    let status = std::process::Command::new(exe())
        .args(["validate", "--in"])
        .arg(&plan_path)
        .status()
        .unwrap();
    assert!(!status.success());
}
