//! osc_choir — interactive entry point.

use osc_choir::app::{run, AppConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        OSC Choir — Phone Motion Controlled Voices            ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let cfg = AppConfig::default();
    let router = match cfg.router() {
        Ok(router) => router,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    for (voice, vc) in router.voices().iter().zip(&cfg.voices) {
        println!(
            "  {:<6} port {}  channel {}  program {}  pitches {}",
            voice.name(), vc.port, voice.channel(), voice.program(), voice.pitch_set()
        );
    }
    println!("  OSC address: {}", cfg.osc_address);
    println!();

    if let Err(e) = run(cfg) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
