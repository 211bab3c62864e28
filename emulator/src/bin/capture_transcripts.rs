use std::io;
use std::path::Path;
use std::process;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::Session;
use tribander_core::config::ControllerConfig;

const TRANSCRIPT_DIR: &str = "transcripts";

/// Scripted sessions, each written to `transcripts/<name>.log`.
const SCENARIOS: &[(&str, &[&str])] = &[
    (
        "band-cycle",
        &["release 4", "tap", "tap", "tap", "status", "log"],
    ),
    ("long-hold", &["release 2", "press 600", "release 20", "status"]),
    (
        "contact-bounce",
        &[
            "release 2",
            "press 3",
            "release",
            "press 5",
            "release 2",
            "press 13",
            "release 12",
            "status",
        ],
    ),
    ("counter-rollover", &["tick 240", "tap", "tick 10", "status"]),
];

fn main() -> io::Result<()> {
    for (name, commands) in SCENARIOS {
        record_scenario(name, commands)?;
    }
    Ok(())
}

fn record_scenario(name: &str, commands: &[&str]) -> io::Result<()> {
    let path = Path::new(TRANSCRIPT_DIR).join(format!("{name}.log"));
    let mut session = Session::new(ControllerConfig::default(), Some(path.as_path()))
        .unwrap_or_else(|err| {
            eprintln!("{name}: {err}");
            process::exit(2);
        });
    for command in commands {
        let _ = session.handle_command(command)?;
    }
    println!("wrote {}", path.display());
    Ok(())
}
