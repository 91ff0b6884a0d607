use std::time::Duration;

use assert_cmd::Command;

const TIMEOUT_DURATION: Duration = Duration::from_secs(20);

#[test]
fn main_doesnt_panic() -> Result<(), anyhow::Error> {
    Command::cargo_bin(env!("CARGO_PKG_NAME"))?
        .env("HEADLESS", "true")
        .timeout(TIMEOUT_DURATION)
        .assert()
        .success();
    Ok(())
}

#[test]
fn missing_shaders_halt_cleanly() -> Result<(), anyhow::Error> {
    let assert = Command::cargo_bin(env!("CARGO_PKG_NAME"))?
        .env("HEADLESS", "true")
        .env("ASSETS_DIR", "/nonexistent/colored-triangle")
        .timeout(TIMEOUT_DURATION)
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    // Without a usable adapter the run stops before any shader is fetched.
    assert!(
        stdout.contains("could not fetch ColoredTriangle.")
            || stdout.contains("Could not acquire a graphics context"),
        "fetch failure was not reported:\n{stdout}"
    );
    assert!(!stdout.contains("Headless run finished"));
    Ok(())
}

#[test]
fn bad_timeout_value_is_ignored() -> Result<(), anyhow::Error> {
    Command::cargo_bin(env!("CARGO_PKG_NAME"))?
        .env("HEADLESS", "true")
        .env("FETCH_TIMEOUT_MS", "soon")
        .timeout(TIMEOUT_DURATION)
        .assert()
        .success();
    Ok(())
}
