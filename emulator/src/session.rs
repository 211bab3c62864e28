use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant as HostInstant};

use crossterm::style::Stylize;
use tribander_core::bands::{Band, BandIndicators};
use tribander_core::config::{ConfigError, ControllerConfig};
use tribander_core::controller::{BandController, ButtonInput, OutputDriver};
use tribander_core::pulse::{RELAY_LINE_COUNT, RelayLine};
use tribander_core::telemetry::{EventId, TelemetryPayload, TelemetryRecord, TelemetryRecorder};
use tribander_core::ticks::{Tick, TickCounter, TickSource};

/// Largest tick count a single command may run.
const MAX_COMMAND_TICKS: u32 = 100_000;

/// Loop iterations simulated per tick; only the first one sees a new tick.
const POLLS_PER_TICK: usize = 2;

const TELEMETRY_CAPACITY: usize = 256;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "press",
        "press [ticks]      - hold the button down for a number of ticks (default 1)",
    ),
    (
        "release",
        "release [ticks]    - leave the button up for a number of ticks (default 1)",
    ),
    (
        "tap",
        "tap                - one clean press and release long enough to register",
    ),
    (
        "tick",
        "tick [n]           - advance n ticks without touching the button",
    ),
    (
        "status",
        "status             - show band, tick and output line states",
    ),
    ("log", "log                - list the retained telemetry records"),
    ("help", "help [topic]       - show help for a command"),
];

/// Errors raised while opening a session.
#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    Io(io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(err) => write!(f, "invalid configuration: {err}"),
            SessionError::Io(err) => write!(f, "transcript: {err}"),
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        SessionError::Config(err)
    }
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        SessionError::Io(err)
    }
}

/// Parsed REPL command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Press(u32),
    Release(u32),
    Tap,
    Tick(u32),
    Status,
    Log,
    Help(Option<String>),
}

impl Command {
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut words = input.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };
        let argument = words.next();
        if let Some(extra) = words.next() {
            return Err(format!("unexpected argument `{extra}`"));
        }

        match verb.to_ascii_lowercase().as_str() {
            "press" => parse_ticks(argument).map(Command::Press),
            "release" => parse_ticks(argument).map(Command::Release),
            "tick" => parse_ticks(argument).map(Command::Tick),
            "tap" => no_argument(argument, Command::Tap),
            "status" => no_argument(argument, Command::Status),
            "log" => no_argument(argument, Command::Log),
            "help" => Ok(Command::Help(argument.map(str::to_string))),
            other => Err(format!("unknown command `{other}`")),
        }
    }
}

fn parse_ticks(argument: Option<&str>) -> Result<u32, String> {
    let Some(raw) = argument else {
        return Ok(1);
    };
    match raw.parse::<u32>() {
        Ok(ticks) if (1..=MAX_COMMAND_TICKS).contains(&ticks) => Ok(ticks),
        Ok(_) => Err(format!("tick count must be 1..={MAX_COMMAND_TICKS}")),
        Err(_) => Err(format!("`{raw}` is not a tick count")),
    }
}

fn no_argument(argument: Option<&str>, command: Command) -> Result<Command, String> {
    match argument {
        None => Ok(command),
        Some(extra) => Err(format!("unexpected argument `{extra}`")),
    }
}

/// Simulated active-low push button.
#[derive(Debug)]
pub struct SimButton {
    pressed: bool,
}

impl ButtonInput for SimButton {
    fn is_high(&mut self) -> bool {
        !self.pressed
    }
}

/// Simulated output pins.
#[derive(Debug, Default)]
pub struct SimOutputs {
    indicators: BandIndicators,
    relays: [bool; RELAY_LINE_COUNT],
    calibration: bool,
}

impl OutputDriver for SimOutputs {
    fn set_indicators(&mut self, indicators: BandIndicators) {
        self.indicators = indicators;
    }

    fn set_relay(&mut self, line: RelayLine, asserted: bool) {
        self.relays[line.as_index()] = asserted;
    }

    fn set_calibration(&mut self, high: bool) {
        self.calibration = high;
    }
}

/// Output line levels at one instant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineSnapshot {
    pub band: Band,
    pub previous: Option<Band>,
    pub tick: Tick,
    pub indicators: BandIndicators,
    pub relays: [bool; RELAY_LINE_COUNT],
    pub calibration: bool,
}

impl LineSnapshot {
    fn render(&self, color: bool) -> String {
        let previous = self.previous.map_or("-", Band::label);
        let mut levels = vec![
            level("15m", self.indicators.meters15, color),
            level("20m", self.indicators.meters20, color),
        ];
        for line in RelayLine::ALL {
            levels.push(level(line.label(), self.relays[line.as_index()], color));
        }
        levels.push(level("cal", self.calibration, color));

        format!(
            "band={} previous={} tick={} | {}",
            self.band,
            previous,
            self.tick,
            levels.join(" ")
        )
    }
}

fn level(label: &str, high: bool, color: bool) -> String {
    let text = format!("{label}={}", u8::from(high));
    match (color, high) {
        (false, _) => text,
        (true, true) => text.green().bold().to_string(),
        (true, false) => text.dark_grey().to_string(),
    }
}

/// One line of session output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OutputLine {
    Text(String),
    Lines(LineSnapshot),
}

impl OutputLine {
    pub fn render(&self, color: bool) -> String {
        match self {
            OutputLine::Text(text) => text.clone(),
            OutputLine::Lines(snapshot) => snapshot.render(color),
        }
    }
}

pub struct Session {
    controller: BandController<SimButton, SimOutputs>,
    telemetry: TelemetryRecorder<TELEMETRY_CAPACITY>,
    ticks: TickCounter,
    reported: EventId,
    transcript: Option<TranscriptLogger>,
    started_at: HostInstant,
}

impl Session {
    /// Opens a session; `transcript` names the file that records the session.
    pub fn new(config: ControllerConfig, transcript: Option<&Path>) -> Result<Self, SessionError> {
        let controller = BandController::new(
            config,
            SimButton { pressed: false },
            SimOutputs::default(),
        )?;
        let transcript = transcript
            .map(|path| TranscriptLogger::new(path, &config))
            .transpose()?;

        Ok(Self {
            controller,
            telemetry: TelemetryRecorder::new(),
            ticks: TickCounter::new(),
            reported: 0,
            transcript,
            started_at: HostInstant::now(),
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<OutputLine>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        self.record(elapsed, TranscriptRole::Host, trimmed)?;

        let lines = match Command::parse(trimmed) {
            Ok(command) => self.execute(command),
            Err(err) => vec![OutputLine::Text(format!("ERR {err}"))],
        };

        for output in &lines {
            self.record(elapsed, TranscriptRole::Emulator, &output.render(false))?;
        }
        Ok(lines)
    }

    fn execute(&mut self, command: Command) -> Vec<OutputLine> {
        match command {
            Command::Press(ticks) => self.hold(Some(true), ticks),
            Command::Release(ticks) => self.hold(Some(false), ticks),
            Command::Tick(ticks) => self.hold(None, ticks),
            Command::Tap => {
                let span = u32::from(self.controller.config().debounce_samples) + 1;
                let mut lines = self.run(Some(true), span);
                lines.extend(self.run(Some(false), span));
                lines.push(OutputLine::Lines(self.snapshot()));
                lines
            }
            Command::Status => vec![OutputLine::Lines(self.snapshot())],
            Command::Log => self.log_lines(),
            Command::Help(topic) => help_lines(topic.as_deref()),
        }
    }

    fn hold(&mut self, pressed: Option<bool>, ticks: u32) -> Vec<OutputLine> {
        let mut lines = self.run(pressed, ticks);
        lines.push(OutputLine::Lines(self.snapshot()));
        lines
    }

    /// Advances `ticks` ticks with the button at `pressed` (unchanged for
    /// `None`) and returns the telemetry produced on the way.
    fn run(&mut self, pressed: Option<bool>, ticks: u32) -> Vec<OutputLine> {
        if let Some(pressed) = pressed {
            self.controller.button_mut().pressed = pressed;
        }

        let mut lines = Vec::new();
        for _ in 0..ticks {
            self.ticks.advance();
            let now = self.ticks.now();
            for _ in 0..POLLS_PER_TICK {
                self.controller.poll(now, &mut self.telemetry);
            }
            lines.extend(self.drain_telemetry());
        }
        lines
    }

    fn drain_telemetry(&mut self) -> Vec<OutputLine> {
        let lines = self
            .telemetry
            .since(self.reported)
            .map(|record| OutputLine::Text(describe_record(record)))
            .collect();
        self.reported = self.telemetry.next_event_id();
        lines
    }

    fn log_lines(&self) -> Vec<OutputLine> {
        if self.telemetry.is_empty() {
            return vec![OutputLine::Text("telemetry: empty".to_string())];
        }
        self.telemetry
            .oldest_first()
            .map(|record| OutputLine::Text(format!("#{} {}", record.id, describe_record(record))))
            .collect()
    }

    pub fn snapshot(&self) -> LineSnapshot {
        let outputs = self.controller.outputs();
        LineSnapshot {
            band: self.controller.band(),
            previous: self.controller.previous_band(),
            tick: self.ticks.now(),
            indicators: outputs.indicators,
            relays: outputs.relays,
            calibration: outputs.calibration,
        }
    }

    #[cfg(test)]
    pub fn telemetry(&self) -> &TelemetryRecorder<TELEMETRY_CAPACITY> {
        &self.telemetry
    }

    fn record(&mut self, elapsed: Duration, role: TranscriptRole, line: &str) -> io::Result<()> {
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(elapsed, role, line),
            None => Ok(()),
        }
    }
}

fn describe_record(record: &TelemetryRecord) -> String {
    match record.details {
        TelemetryPayload::Relay(relay) => match relay.ticks_since_previous {
            Some(delta) => format!("{} {} (+{delta})", record.tick, record.event),
            None => format!("{} {}", record.tick, record.event),
        },
        TelemetryPayload::Band {
            previous: Some(previous),
        } => format!("{} {} (from {previous})", record.tick, record.event),
        TelemetryPayload::Band { previous: None } | TelemetryPayload::None => {
            format!("{} {}", record.tick, record.event)
        }
    }
}

fn help_lines(topic: Option<&str>) -> Vec<OutputLine> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("  exit | quit         - leave the emulator".to_string());
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines.into_iter().map(OutputLine::Text).collect()
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path, config: &ControllerConfig) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(config)?;
        Ok(logger)
    }

    fn write_header(&mut self, config: &ControllerConfig) -> io::Result<()> {
        writeln!(self.writer, "# Tribander emulator transcript")?;
        writeln!(
            self.writer,
            "# pulse={} ticks debounce={} samples tick={}us",
            config.pulse_duration,
            config.debounce_samples,
            config.tick_period.as_micros()
        )?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
