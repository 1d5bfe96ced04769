//! Check that the configured external tools are usable.

use recast_common::EngineConfig;

pub async fn run(config: &EngineConfig) -> anyhow::Result<()> {
    println!("Recast system check");
    println!();

    let mut ok = true;
    ok &= check_binary(&config.transcode.ffmpeg).await;
    ok &= check_binary(&config.transcode.ffprobe).await;

    println!();
    if config.sprites_dir.is_dir() {
        println!("  [ok] sprites dir: {}", config.sprites_dir.display());
    } else {
        println!(
            "  [--] sprites dir missing: {} (cursor overlay will be skipped)",
            config.sprites_dir.display()
        );
    }

    if ok {
        println!("\nAll required tools available.");
        Ok(())
    } else {
        Err(anyhow::anyhow!("Missing required tools"))
    }
}

async fn check_binary(name: &str) -> bool {
    let result = tokio::process::Command::new(name)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) if status.success() => {
            println!("  [ok] {name}");
            true
        }
        Ok(status) => {
            println!("  [!!] {name} exited with {status}");
            false
        }
        Err(e) => {
            println!("  [!!] {name} not found: {e}");
            false
        }
    }
}
