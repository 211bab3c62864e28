mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use crossterm::tty::IsTty;
use tribander_core::config::ControllerConfig;

use session::Session;

const USAGE: &str = "Usage: tribander-emulator [--transcript <path>] [--pulse <ticks>] [--no-color]";

#[derive(Debug, Default)]
struct Options {
    transcript: Option<PathBuf>,
    pulse: Option<u8>,
    no_color: bool,
}

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let mut config = ControllerConfig::new();
    if let Some(pulse) = options.pulse {
        config = config.with_pulse_duration(pulse);
    }

    let mut session = Session::new(config, options.transcript.as_deref()).unwrap_or_else(|err| {
        eprintln!("{err}");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let color = !options.no_color && stdout.is_tty();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Tribander Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_command(trimmed)? {
            writeln!(writer, "{}", response.render(color))?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options(args: impl IntoIterator<Item = String>) -> Result<Options, String> {
    let mut options = Options::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        match flag.as_str() {
            "--transcript" => {
                let value = inline
                    .or_else(|| args.next())
                    .ok_or("Expected a path after --transcript")?;
                options.transcript = Some(PathBuf::from(value));
            }
            "--pulse" => {
                let value = inline
                    .or_else(|| args.next())
                    .ok_or("Expected a tick count after --pulse")?;
                let ticks = value
                    .parse::<u8>()
                    .map_err(|_| format!("`{value}` is not a tick count"))?;
                options.pulse = Some(ticks);
            }
            "--no-color" => options.no_color = true,
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }
    Ok(options)
}
