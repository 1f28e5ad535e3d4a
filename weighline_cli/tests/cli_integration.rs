use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid config; the simulation serves the unwired sensors
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[line]
name = "packing-2"
weight_unit = "kg"

[sensors]
polling_interval_ms = 5

[[products]]
code = "BRD-250"
name = "Rye loaf"
target_weight = 250
min_weight = 245
max_weight = 255
unit = "g"
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn weighline() -> Command {
    let mut cmd = Command::cargo_bin("weighline_cli").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("WEIGHLINE_SIM");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["--help"], 0, "[default: info]", "stdout")]
#[case(&["convert", "--value", "0.25", "--from", "kg", "--to", "g"], 0, "250.0 g", "stdout")]
#[case(&["convert", "--value", "1", "--from", "lb", "--to", "oz", "--precision", "2"], 0, "16.00 oz", "stdout")]
#[case(&["convert", "--value", "1", "--from", "stone", "--to", "g"], 4, "Unknown weight unit", "stderr")]
#[case(&["convert", "--value", "1", "--from", "kg"], 2, "required", "stderr")]
#[case(&["self-check"], 0, "OK: line packing-2", "stdout")]
#[case(&["monitor", "--product", "NOPE", "--ticks", "1"], 4, "Unknown product", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = weighline();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn convert_does_not_need_a_config_file() {
    weighline()
        .args(["--config", "/definitely/missing.toml"])
        .args(["convert", "--value", "2500", "--from", "mg", "--to", "g"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2.5 g"));
}

#[test]
fn zero_polling_interval_is_a_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[sensors]\npolling_interval_ms = 0\n").unwrap();

    weighline()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("polling_interval_ms must be >= 1"));
}

#[test]
fn self_check_reports_bad_product_csv_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("products.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "code,target,min,max").unwrap();
    writeln!(f, "X,1,0,2").unwrap();

    weighline()
        .arg("--config")
        .arg(&cfg)
        .arg("--products")
        .arg(&bad_csv)
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("product CSV must have headers"));
}

#[test]
fn self_check_merges_csv_products() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let csv = dir.path().join("products.csv");
    fs::write(
        &csv,
        "code,name,target_weight,min_weight,max_weight,unit\nCHS-1,Cheese wheel,1,0.98,1.05,kg\n",
    )
    .unwrap();

    weighline()
        .arg("--config")
        .arg(&cfg)
        .arg("--products")
        .arg(&csv)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("products:  2 [BRD-250, CHS-1]"));
}

#[test]
fn simulated_monitor_captures_and_judges_a_piece() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    weighline()
        .env("WEIGHLINE_SIM", "1")
        .arg("--config")
        .arg(&cfg)
        .args(["monitor", "--product", "brd-250", "--ticks", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("piece #1: 250.0 g [stable] ok"))
        .stdout(predicate::str::contains("pieces: 1"))
        .stdout(predicate::str::contains("pass rate: 100.0%"));
}

#[test]
fn monitor_refuses_an_unwired_line() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    weighline()
        .arg("--config")
        .arg(&cfg)
        .args(["monitor", "--ticks", "1"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no sensor is wired"));
}

#[test]
fn simulated_probe_prints_one_snapshot() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    weighline()
        .env("WEIGHLINE_SIM", "1")
        .arg("--config")
        .arg(&cfg)
        .arg("probe")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.000 kg [stable] (connected)"))
        .stdout(predicate::str::contains("photocell http://sim.local/photocell: 0"));
}

#[test]
fn unreachable_scale_probe_reports_disconnected() {
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(
        &path,
        format!(
            "[sensors]\nscale_url = \"http://127.0.0.1:{port}/weight\"\n[http]\nrequest_timeout_ms = 500\n"
        ),
    )
    .unwrap();

    weighline()
        .arg("--config")
        .arg(&path)
        .arg("probe")
        .assert()
        .success()
        .stdout(predicate::str::contains("[disconnected] (disconnected)"))
        .stdout(predicate::str::contains("photocell not wired"))
        .stdout(predicate::str::contains("error:"));
}
