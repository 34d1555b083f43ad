//! CLI for generating a random weft module and lowering it.
//!
//! Usage:
//!   weft-smith < random_bytes
//!   weft-smith --seed 12345 [--platform js|native|jvm]
//!
//! Prints the module before and after lowering. Pass `RUST_LOG=debug` to
//! see the per-pass counts.

use std::io::{self, Read};

use arbitrary::Unstructured;
use tracing_subscriber::EnvFilter;
use weft_core::{lower_module, LowerContext, LowerOptions, Platform};
use weft_smith::{seed_bytes, Config, GeneratedModule};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let platform = match flag(&args, "--platform") {
        None | Some("jvm") => Platform::Jvm,
        Some("js") => Platform::Js,
        Some("native") => Platform::Native,
        Some(other) => anyhow::bail!("unknown platform `{}`", other),
    };

    let data: Vec<u8> = match flag(&args, "--seed") {
        Some(seed) => seed_bytes(seed.parse()?),
        None => {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data)?;
            if data.is_empty() {
                seed_bytes(
                    std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)?
                        .as_nanos() as u64,
                )
            } else {
                data
            }
        }
    };

    let mut u = Unstructured::new(&data);
    let mut generated = GeneratedModule::arbitrary_with_config(&mut u, &Config::default())?;
    println!("// ---- before ----\n{}", generated.dump());

    let ctx = LowerContext::new(LowerOptions::for_platform(platform));
    let stats = lower_module(&mut generated.module, &ctx)?;
    tracing::info!(?stats, ?platform, "module lowered");
    println!("// ---- after ----\n{}", generated.dump());

    Ok(())
}

/// The value following `name` on the command line.
fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
