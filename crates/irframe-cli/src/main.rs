use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::debug;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use irframe_core::protocols::panasonic;
use irframe_core::{CaptureConfig, CaptureHandle, Edges, PinSource};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("IRFRAME_BUILD_COMMIT"),
    " ",
    env!("IRFRAME_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "irframe")]
#[command(version = VERSION)]
#[command(
    about = "Panasonic infrared remote decoder for GPIO-attached receivers.",
    long_about = None,
    after_help = "Examples:\n  irframe listen --pin 4\n  irframe listen --pin 4 --labels remote.json --json\n  irframe listen --pin 4 --count 1 --quiet"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sample a GPIO pin and print decoded codes as they arrive.
    #[command(
        after_help = "Examples:\n  irframe listen --pin 4 --labels remote.json\n  irframe listen --pin 4 --json --duration 30"
    )]
    Listen {
        /// GPIO line number of the receiver's data pin
        #[arg(long)]
        pin: u64,

        /// Treat a high level as active (receivers are active-low by default)
        #[arg(long)]
        active_high: bool,

        /// Inactivity timeout ending a frame, in microseconds
        #[arg(long, default_value_t = 10_000)]
        timeout_us: u64,

        /// Pin polling cadence, in microseconds
        #[arg(long, default_value_t = 20)]
        cadence_us: u64,

        /// Frame queue depth between sampler and decoder
        #[arg(long, default_value_t = irframe_core::DEFAULT_QUEUE_DEPTH)]
        queue_depth: usize,

        /// JSON file mapping codes to labels, e.g. {"0x0BD0CC0C0B02": "power"}
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Emit one JSON object per frame instead of text
        #[arg(long)]
        json: bool,

        /// Exit after this many successfully decoded codes
        #[arg(long)]
        count: Option<u64>,

        /// Stop listening after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Dump the raw edge timings of frames that fail to decode
        #[arg(long)]
        dump_frames: bool,

        /// Suppress non-error status output
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Listen {
            pin,
            active_high,
            timeout_us,
            cadence_us,
            queue_depth,
            labels,
            json,
            count,
            duration,
            dump_frames,
            quiet,
        } => cmd_listen(ListenArgs {
            pin,
            active_high,
            timeout_us,
            cadence_us,
            queue_depth,
            labels,
            json,
            count,
            duration,
            dump_frames,
            quiet,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

#[derive(Debug)]
struct ListenArgs {
    pin: u64,
    active_high: bool,
    timeout_us: u64,
    cadence_us: u64,
    queue_depth: usize,
    labels: Option<PathBuf>,
    json: bool,
    count: Option<u64>,
    duration: Option<u64>,
    dump_frames: bool,
    quiet: bool,
}

#[derive(Debug, Serialize)]
struct CodeEvent<'a> {
    /// RFC3339 timestamp of frame completion.
    at: String,
    code: u64,
    code_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RejectEvent<'a> {
    at: String,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame: Option<&'a Edges>,
}

fn cmd_listen(args: ListenArgs) -> Result<(), CliError> {
    if args.cadence_us == 0 || args.timeout_us == 0 {
        return Err(CliError::new(
            "cadence and timeout must be non-zero",
            Some("see --cadence-us and --timeout-us".to_string()),
        ));
    }
    if args.timeout_us <= args.cadence_us {
        return Err(CliError::new(
            format!(
                "timeout ({} µs) must exceed the sampling cadence ({} µs)",
                args.timeout_us, args.cadence_us
            ),
            Some("a frame boundary needs at least one quiet sample".to_string()),
        ));
    }

    let labels = match args.labels.as_ref() {
        Some(path) => load_labels(path)?,
        None => HashMap::new(),
    };
    if !labels.is_empty() {
        debug!("loaded {} code labels", labels.len());
    }

    let pin = open_pin(args.pin, args.active_high)?;
    let config = CaptureConfig {
        cadence: Duration::from_micros(args.cadence_us),
        timeout: Duration::from_micros(args.timeout_us),
        queue_depth: args.queue_depth,
    };
    let (handle, frames) = CaptureHandle::spawn(pin, config)
        .context("failed to start capture")
        .map_err(CliError::from)?;

    if !args.quiet {
        eprintln!(
            "listening on GPIO {} (cadence {} µs, timeout {} µs)",
            args.pin, args.cadence_us, args.timeout_us
        );
    }

    let deadline = args
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut decoded = 0u64;
    let mut rejected = 0u64;

    loop {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
        let frame = match frames.recv_timeout(Duration::from_millis(200)) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        match panasonic::decode(frame.payload()) {
            Ok(code) => {
                decoded += 1;
                print_code(code, &labels, args.json);
                if args.count.is_some_and(|count| decoded >= count) {
                    break;
                }
            }
            Err(err) => {
                rejected += 1;
                print_reject(&err, &frame, args.json, args.dump_frames);
            }
        }
    }

    handle.stop();
    if !args.quiet {
        eprintln!("OK: {decoded} codes decoded, {rejected} frames rejected");
    }
    Ok(())
}

fn print_code(code: u64, labels: &HashMap<u64, String>, json: bool) {
    let label = labels.get(&code).map(String::as_str);
    if json {
        let event = CodeEvent {
            at: now_rfc3339(),
            code,
            code_hex: format!("{code:#014x}"),
            label,
        };
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("error: event serialization failed: {err}"),
        }
        return;
    }
    match label {
        Some(label) => println!("{code:#014x} {label}"),
        None => println!("{code:#014x}"),
    }
}

fn print_reject(
    err: &panasonic::DecodeError,
    frame: &Edges,
    json: bool,
    dump_frames: bool,
) {
    if json {
        let event = RejectEvent {
            at: now_rfc3339(),
            error: err.to_string(),
            frame: dump_frames.then_some(frame),
        };
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("error: event serialization failed: {err}"),
        }
        return;
    }
    eprintln!("decode error: {err}");
    if dump_frames {
        eprint!("{frame}");
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

fn load_labels(path: &PathBuf) -> Result<HashMap<u64, String>, CliError> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read labels file: {}", path.display()))
        .map_err(|err| {
            CliError::new(
                format!("{err:#}"),
                Some("pass a JSON object mapping codes to labels".to_string()),
            )
        })?;
    let entries: HashMap<String, String> = serde_json::from_str(&raw).map_err(|err| {
        CliError::new(
            format!("invalid labels file {}: {err}", path.display()),
            Some(r#"expected {"0x0BD0CC0C0B02": "power", ...}"#.to_string()),
        )
    })?;

    let mut labels = HashMap::with_capacity(entries.len());
    for (key, label) in entries {
        let code = parse_code_key(&key).ok_or_else(|| {
            CliError::new(
                format!("invalid code '{key}' in {}", path.display()),
                Some("codes are decimal or 0x-prefixed hex integers".to_string()),
            )
        })?;
        labels.insert(code, label);
    }
    Ok(labels)
}

fn parse_code_key(key: &str) -> Option<u64> {
    let key = key.trim();
    match key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => key.parse().ok(),
    }
}

#[cfg(target_os = "linux")]
fn open_pin(number: u64, active_high: bool) -> Result<impl PinSource + Send + 'static, CliError> {
    gpio::SysfsPin::open(number, active_high).map_err(|err| {
        CliError::new(
            format!("failed to open GPIO {number}: {err:#}"),
            Some("the line must be exportable via /sys/class/gpio".to_string()),
        )
    })
}

#[cfg(not(target_os = "linux"))]
fn open_pin(number: u64, active_high: bool) -> Result<impl PinSource + Send + 'static, CliError> {
    let _ = (number, active_high);
    let unsupported: Result<(), CliError> = Err(CliError::new(
        "GPIO capture requires Linux",
        Some("sysfs GPIO lines exist only on Linux hosts".to_string()),
    ));
    unsupported?;
    Ok(|| false)
}

#[cfg(target_os = "linux")]
mod gpio {
    use anyhow::Context;
    use irframe_core::PinSource;
    use sysfs_gpio::{Direction, Pin};

    /// Polled sysfs GPIO line. Receivers are active-low, so by default a
    /// read of 0 is the active level.
    pub struct SysfsPin {
        pin: Pin,
        active_high: bool,
        last: bool,
    }

    impl SysfsPin {
        pub fn open(number: u64, active_high: bool) -> anyhow::Result<Self> {
            let pin = Pin::new(number);
            pin.export()
                .with_context(|| format!("exporting GPIO {number}"))?;
            pin.set_direction(Direction::In)
                .with_context(|| format!("setting GPIO {number} direction"))?;
            Ok(Self {
                pin,
                active_high,
                last: false,
            })
        }
    }

    impl PinSource for SysfsPin {
        fn is_active(&mut self) -> bool {
            // A transient sysfs read failure repeats the previous level
            // rather than fabricating an edge.
            match self.pin.get_value() {
                Ok(value) => {
                    self.last = (value != 0) == self.active_high;
                    self.last
                }
                Err(_) => self.last,
            }
        }
    }
}
