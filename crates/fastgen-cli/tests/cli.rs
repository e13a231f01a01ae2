use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../fastgen-core/tests/fixtures")
}

fn run(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fast_type_gen"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .expect("run fast_type_gen")
}

fn fixture_arg(name: &str) -> String {
    fixtures().join(name).display().to_string()
}

#[test]
fn writes_outputs_per_unit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("gen");
    let session = fixture_arg("session.xml");
    let orders = fixture_arg("orders.xml");
    let res = run(
        &[
            &session,
            &orders,
            "--out-dir",
            out.to_str().expect("utf-8 path"),
            "--metadata-json",
        ],
        dir.path(),
    );
    assert!(res.status.success(), "{}", String::from_utf8_lossy(&res.stderr));

    for name in [
        "session.inl",
        "session.cpp",
        "session.metadata.json",
        "orders.inl",
        "orders.cpp",
        "orders.metadata.json",
    ] {
        assert!(out.join(name).is_file(), "missing {name}");
    }
    let cpp = std::fs::read_to_string(out.join("orders.cpp")).expect("read");
    assert!(cpp.starts_with("#include \"orders.h\""));
    let meta: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out.join("session.metadata.json")).expect("read"))
            .expect("json");
    assert_eq!(meta["unit"], "session");
    assert_eq!(meta["templates"][1]["name"], "Logon");
}

#[test]
fn unresolved_reference_exits_2() {
    let dir = tempfile::tempdir().expect("tempdir");
    let orders = fixture_arg("orders.xml");
    let res = run(&[&orders], dir.path());
    assert_eq!(res.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&res.stderr);
    assert!(stderr.contains("Header"), "{stderr}");
    assert!(stderr.starts_with("error[FTG0200]: "), "{stderr}");
    assert!(!dir.path().join("orders.cpp").exists());
}

#[test]
fn load_failure_exits_3() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("bad.xml"), "<templates><template").expect("write");
    let res = run(&["bad.xml"], dir.path());
    assert_eq!(res.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&res.stderr).contains("error[FTG0001]: "));

    let res = run(&["missing.xml"], dir.path());
    assert_eq!(res.status.code(), Some(3));
}

#[test]
fn invalid_literal_exits_2() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("lit.xml"),
        r#"<templates><template name="T"><decimal name="P"><constant value="1.2.3"/></decimal></template></templates>"#,
    )
    .expect("write");
    let res = run(&["lit.xml"], dir.path());
    assert_eq!(res.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&res.stderr);
    assert!(stderr.contains("1.2.3 is not a valid decimal number"), "{stderr}");
    assert!(stderr.starts_with("error[FTG0100]: "), "{stderr}");
}

#[test]
fn check_mode_compares_without_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let session = fixture_arg("session.xml");
    let res = run(&[&session], dir.path());
    assert!(res.status.success(), "{}", String::from_utf8_lossy(&res.stderr));

    let res = run(&[&session, "--check"], dir.path());
    assert!(res.status.success(), "{}", String::from_utf8_lossy(&res.stderr));

    std::fs::write(dir.path().join("session.cpp"), "stale").expect("write");
    let res = run(&[&session, "--check"], dir.path());
    assert!(!res.status.success());
    assert!(String::from_utf8_lossy(&res.stderr).contains("generated output differs"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("session.cpp")).expect("read"),
        "stale"
    );
}

#[test]
fn manifest_lists_inputs_relative_to_itself() {
    let dir = tempfile::tempdir().expect("tempdir");
    let schemas = dir.path().join("schemas");
    std::fs::create_dir_all(&schemas).expect("mkdir");
    for name in ["session.xml", "orders.xml"] {
        std::fs::copy(fixtures().join(name), schemas.join(name)).expect("copy");
    }
    let manifest = serde_json::json!({
        "schema_version": fastgen_contracts::FASTGEN_MANIFEST_SCHEMA_VERSION,
        "out_dir": "../out",
        "inputs": ["session.xml", "orders.xml"],
    });
    std::fs::write(
        schemas.join("fastgen.json"),
        serde_json::to_vec_pretty(&manifest).expect("encode"),
    )
    .expect("write");

    let res = run(&["--manifest", "schemas/fastgen.json"], dir.path());
    assert!(res.status.success(), "{}", String::from_utf8_lossy(&res.stderr));
    assert!(dir.path().join("out/orders.inl").is_file());

    std::fs::write(
        schemas.join("old.json"),
        r#"{"schema_version":"fastgen.manifest@0.0.1","inputs":[]}"#,
    )
    .expect("write");
    let res = run(&["--manifest", "schemas/old.json"], dir.path());
    assert_eq!(res.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&res.stderr);
    assert!(stderr.contains("schema_version mismatch"), "{stderr}");
    assert!(stderr.starts_with("error: "), "{stderr}");
}

#[test]
fn diagnostics_catalog() {
    let dir = tempfile::tempdir().expect("tempdir");
    let res = run(&["--diagnostics-md"], dir.path());
    assert!(res.status.success());
    let md = String::from_utf8_lossy(&res.stdout);
    assert!(md.starts_with("# fastgen diagnostics catalog"));
    assert!(md.contains("| FTG0200 |"));
}
