//! Terminal looper on the default input and output devices.
//!
//! Run with: cargo run --example live_looper
//!
//! A terminal can't report key releases, so recording is driven by commands:
//!
//!   r <n>        start recording loop n (key down)
//!   p <n>        stop recording loop n, play it back (key up)
//!   g <n> <x>    set loop n's gain to x
//!   s            show every loop that isn't silent
//!   q            quit
//!
//! Set RUST_LOG=eddy=debug to see state changes.

use std::io::{self, BufRead, Write};

use eddy::{
    engine_pair, CpalDevice, DuplexStream, EngineConfig, LoopState, TriggerEvent, TriggerMap,
};
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> eddy::LooperResult<()> {
    let config = EngineConfig::default().with_loop_count(10);

    let input = CpalDevice::default_input()?;
    let output = CpalDevice::default_output()?;
    println!(
        "Input:  {} ({} Hz, {} ch)",
        input.name(),
        input.sample_rate(),
        input.channels()
    );
    println!(
        "Output: {} ({} Hz, {} ch)",
        output.name(),
        output.sample_rate(),
        output.channels()
    );

    let (engine, controller) = engine_pair(&config)?;
    let stream = DuplexStream::start(&input, &output, engine, &config)?;
    let keys = TriggerMap::identity();

    println!(
        "\n{} loops of {:.1}s. Commands: r <n>, p <n>, g <n> <gain>, s, q",
        config.loop_count,
        config.loop_capacity as f32 / config.sample_rate as f32
    );

    let stdin = io::stdin();
    let mut snaps = Vec::with_capacity(config.loop_count);
    let mut samples = Vec::with_capacity(config.loop_capacity);

    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }

        // A dead stream ends the session
        stream.check()?;

        let mut words = line.split_whitespace();
        match (words.next(), words.next().and_then(|n| n.parse::<u32>().ok())) {
            (Some("r"), Some(n)) => {
                keys.apply(TriggerEvent::press(n), &controller);
            }
            (Some("p"), Some(n)) => {
                keys.apply(TriggerEvent::release(n), &controller);
            }
            (Some("g"), Some(n)) => match words.next().and_then(|g| g.parse::<f32>().ok()) {
                Some(gain) => {
                    controller.set_gain(n as usize, gain);
                }
                None => println!("usage: g <n> <gain>"),
            },
            (Some("s"), _) => {
                controller.snapshot_all(&mut snaps);
                for (i, snap) in snaps.iter().enumerate() {
                    controller.copy_samples(i, &mut samples);
                    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
                    if peak > 0.0 || snap.state == LoopState::Recording {
                        println!(
                            "  [{}] {:?} at {:>3.0}%  peak {:.3}",
                            i,
                            snap.state,
                            snap.phase() * 100.0,
                            peak
                        );
                    }
                }
                println!(
                    "  input underruns: {}, overruns: {}",
                    stream.input_underruns(),
                    stream.input_overruns()
                );
            }
            (Some("q"), _) => break,
            (None, _) => {}
            _ => println!("unknown command"),
        }
    }

    Ok(())
}
